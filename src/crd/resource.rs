//! Primitive status records
//!
//! Every provisioned artifact is tracked by a small record holding the name
//! of what was generated, the checksum of the input it was generated from,
//! and when that happened. A reconciler compares the stored checksum with
//! the checksum of the current desired input to decide whether the artifact
//! must be regenerated.

use std::fmt;

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Where a record stands relative to a desired checksum
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Convergence {
    /// The artifact was never generated
    NotProvisioned,
    /// The artifact exists but was generated from a different input
    Stale,
    /// The artifact matches the desired input
    UpToDate,
}

impl fmt::Display for Convergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Convergence::NotProvisioned => write!(f, "NotProvisioned"),
            Convergence::Stale => write!(f, "Stale"),
            Convergence::UpToDate => write!(f, "UpToDate"),
        }
    }
}

/// A status record whose validity is decided by a checksum comparison.
pub trait Checksummed {
    /// Checksum of the input the artifact was last generated from
    fn checksum(&self) -> &str;

    /// Whether the artifact was ever generated
    fn is_provisioned(&self) -> bool;

    /// Last time the artifact was (re)generated
    fn last_update(&self) -> Option<DateTime<Utc>>;

    /// Compare the stored checksum with the desired one.
    fn convergence(&self, desired: &str) -> Convergence {
        if !self.is_provisioned() {
            Convergence::NotProvisioned
        } else if self.checksum() != desired {
            Convergence::Stale
        } else {
            Convergence::UpToDate
        }
    }

    /// True when the artifact must be (re)generated for `desired`.
    ///
    /// A record that was never provisioned always needs an update, even when
    /// `desired` happens to equal its (empty) checksum.
    fn needs_update(&self, desired: &str) -> bool {
        self.convergence(desired) != Convergence::UpToDate
    }
}

/// Pick the timestamp to store for a new record.
///
/// `lastUpdate` is monotonic: a `now` older than the stored value keeps the
/// stored value.
pub(crate) fn advance(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(previous) if previous > now => {
            warn!(
                previous = %previous.to_rfc3339(),
                now = %now.to_rfc3339(),
                "Clock skew detected, keeping previous lastUpdate"
            );
            previous
        }
        _ => now,
    }
}

/// A generated Secret (or other named artifact) tracked by checksum
///
/// This is the shape shared by kubeconfig, SQL certificate, key pair and
/// etcd certificate records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChecksumedResource {
    /// Name of the Secret holding the generated artifact
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_name: String,

    /// Checksum of the input the artifact was generated from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,

    /// Last time the artifact was (re)generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl ChecksumedResource {
    /// Return the record describing an artifact freshly generated from `checksum`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::Utc;
    /// use tenant_control_plane::crd::{ChecksumedResource, Checksummed};
    ///
    /// let empty = ChecksumedResource::default();
    /// assert!(empty.needs_update("abc123"));
    ///
    /// let recorded = empty.record("admin-kubeconfig", "abc123", Utc::now());
    /// assert!(!recorded.needs_update("abc123"));
    /// assert!(recorded.needs_update("def456"));
    /// ```
    pub fn record(
        &self,
        secret_name: impl Into<String>,
        checksum: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let record = Self {
            secret_name: secret_name.into(),
            checksum: checksum.into(),
            last_update: Some(advance(self.last_update, now)),
        };
        debug!(secret = %record.secret_name, checksum = %record.checksum, "Recorded resource");
        record
    }
}

impl Checksummed for ChecksumedResource {
    fn checksum(&self) -> &str {
        &self.checksum
    }

    fn is_provisioned(&self) -> bool {
        !self.secret_name.is_empty()
    }

    fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

/// Drift between a recorded and an observed resource version
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectDrift {
    /// Nothing was recorded yet, so nothing can have drifted
    Untracked,
    /// The object still carries the resource version we last wrote
    InSync,
    /// The object was modified out of band
    Drifted { recorded: String, observed: String },
}

/// Weak reference to an object living in the management cluster
///
/// The reference is a lookup key only. Its resource version is compared with
/// the live object to detect changes nobody in the reconciler asked for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalObjectRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Resource version of the object as last written by the reconciler
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,

    /// Last time the object was updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl ExternalObjectRef {
    pub fn record(
        &self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        resource_version: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            resource_version: resource_version.into(),
            last_update: Some(advance(self.last_update, now)),
        }
    }

    /// Record the identity and resource version found in an object's metadata.
    pub fn from_meta(&self, meta: &ObjectMeta, now: DateTime<Utc>) -> Self {
        self.record(
            meta.name.clone().unwrap_or_default(),
            meta.namespace.clone().unwrap_or_default(),
            meta.resource_version.clone().unwrap_or_default(),
            now,
        )
    }

    /// Whether the reference points at anything yet
    pub fn is_tracked(&self) -> bool {
        !self.name.is_empty()
    }

    /// Compare the recorded resource version with the one observed on the live object.
    pub fn drift(&self, observed_resource_version: &str) -> ObjectDrift {
        if self.resource_version.is_empty() {
            return ObjectDrift::Untracked;
        }
        if self.resource_version == observed_resource_version {
            return ObjectDrift::InSync;
        }

        warn!(
            name = %self.name,
            namespace = %self.namespace,
            recorded = %self.resource_version,
            observed = %observed_resource_version,
            "Managed object modified out of band"
        );
        ObjectDrift::Drifted {
            recorded: self.resource_version.clone(),
            observed: observed_resource_version.to_string(),
        }
    }
}
