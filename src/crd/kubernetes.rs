//! Status of the Kubernetes objects realizing a tenant control plane
//!
//! The Deployment, Service and Ingress live in the management cluster. Their
//! native status is mirrored verbatim next to the identity of the object; on
//! the wire the mirrored fields sit inline with the identity fields.

use std::fmt;

use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::DeploymentStatus;
use k8s_openapi::api::core::v1::ServiceStatus;
use k8s_openapi::api::networking::v1::IngressStatus;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::resource::advance;
use crate::error::{Error, Result};

/// Convergence of the running Kubernetes version
///
/// - `Provisioning` (default) - the control plane is being created
/// - `Upgrading` - a new version is rolling out
/// - `Ready` - the running version matches the desired one
/// - `NotReady` - the control plane is not healthy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum VersionStatus {
    #[default]
    Provisioning,
    Upgrading,
    Ready,
    NotReady,
}

impl VersionStatus {
    /// Whether the state machine has an edge from `self` to `next`.
    pub fn can_transition_to(self, next: VersionStatus) -> bool {
        use VersionStatus::*;

        match self {
            Provisioning => matches!(next, Ready | NotReady),
            Ready => matches!(next, Upgrading | NotReady),
            Upgrading => matches!(next, Ready | NotReady),
            NotReady => matches!(next, Provisioning | Ready),
        }
    }

    /// A previously ready control plane stopped being ready
    pub fn is_regression(self, next: VersionStatus) -> bool {
        self == VersionStatus::Ready && next == VersionStatus::NotReady
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionStatus::Provisioning => write!(f, "Provisioning"),
            VersionStatus::Upgrading => write!(f, "Upgrading"),
            VersionStatus::Ready => write!(f, "Ready"),
            VersionStatus::NotReady => write!(f, "NotReady"),
        }
    }
}

/// Running Kubernetes version and its upgrade status
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesVersion {
    /// Running Kubernetes version of the tenant control plane
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default)]
    pub status: VersionStatus,
}

impl KubernetesVersion {
    /// Move to `next`, rejecting edges the state machine does not have.
    ///
    /// Staying in the current state is always allowed. Regressions are
    /// reported, never corrected here.
    pub fn transition_to(&mut self, next: VersionStatus) -> Result<()> {
        let current = self.status;
        if current == next {
            return Ok(());
        }
        if !current.can_transition_to(next) {
            return Err(Error::InvalidVersionTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        if current.is_regression(next) {
            warn!(version = %self.version, "Tenant control plane is no longer ready");
        } else {
            info!(version = %self.version, from = %current, to = %next, "Kubernetes version status changed");
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn is_ready(&self) -> bool {
        self.status == VersionStatus::Ready
    }
}

/// The control plane Deployment in the management cluster
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesDeploymentStatus {
    #[serde(flatten)]
    observed: DeploymentStatus,

    /// Name of the Deployment
    #[serde(default)]
    pub name: String,

    /// Namespace the Deployment runs in
    #[serde(default)]
    pub namespace: String,

    /// Last time the Deployment status was mirrored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl KubernetesDeploymentStatus {
    pub fn observed(&self) -> &DeploymentStatus {
        &self.observed
    }

    /// Replace the mirrored status and identity, refreshing the timestamp.
    pub fn mirror(
        &self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        observed: DeploymentStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            observed,
            name: name.into(),
            namespace: namespace.into(),
            last_update: Some(advance(self.last_update, now)),
        }
    }

    /// Every desired replica is updated, ready and available.
    ///
    /// A Deployment whose controller has not reported replica counts yet is
    /// not rolled out.
    pub fn is_rolled_out(&self) -> bool {
        if self.last_update.is_none() {
            return false;
        }
        let Some(desired) = self.observed.replicas else {
            return false;
        };

        self.observed.updated_replicas.unwrap_or(0) >= desired
            && self.observed.ready_replicas.unwrap_or(0) >= desired
            && self.observed.unavailable_replicas.unwrap_or(0) == 0
    }
}

/// The Service exposing the tenant API server
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesServiceStatus {
    #[serde(flatten)]
    observed: ServiceStatus,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    /// Port the API server is exposed on
    #[serde(default)]
    pub port: i32,
}

impl KubernetesServiceStatus {
    pub fn observed(&self) -> &ServiceStatus {
        &self.observed
    }

    pub fn mirror(
        &self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        port: i32,
        observed: ServiceStatus,
    ) -> Self {
        Self {
            observed,
            name: name.into(),
            namespace: namespace.into(),
            port,
        }
    }

    /// IPs and hostnames assigned by the load balancer
    pub fn load_balancer_addresses(&self) -> Vec<&str> {
        self.observed
            .load_balancer
            .as_ref()
            .and_then(|lb| lb.ingress.as_ref())
            .map(|ingress| {
                ingress
                    .iter()
                    .filter_map(|i| i.ip.as_deref().or(i.hostname.as_deref()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The Ingress exposing the tenant API server, if any
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesIngressStatus {
    #[serde(flatten)]
    observed: IngressStatus,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub namespace: String,
}

impl KubernetesIngressStatus {
    pub fn observed(&self) -> &IngressStatus {
        &self.observed
    }

    pub fn mirror(
        &self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        observed: IngressStatus,
    ) -> Self {
        Self {
            observed,
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn load_balancer_addresses(&self) -> Vec<&str> {
        self.observed
            .load_balancer
            .as_ref()
            .and_then(|lb| lb.ingress.as_ref())
            .map(|ingress| {
                ingress
                    .iter()
                    .filter_map(|i| i.ip.as_deref().or(i.hostname.as_deref()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Status of the resources deployed in the management cluster
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesStatus {
    #[serde(default)]
    pub version: KubernetesVersion,

    #[serde(default)]
    pub deployment: KubernetesDeploymentStatus,

    #[serde(default)]
    pub service: KubernetesServiceStatus,

    #[serde(default)]
    pub ingress: KubernetesIngressStatus,
}
