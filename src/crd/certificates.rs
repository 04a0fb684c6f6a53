//! Certificate and key pair status
//!
//! One record per logical identity of the control plane PKI. The etcd
//! client certificates are only tracked when the tenant stores its state in
//! etcd.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::resource::{advance, ChecksumedResource, Checksummed};

/// A certificate and its private key, stored together in one Secret
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePrivateKeyPairStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_name: String,

    /// Checksum of the certificate request the pair was issued from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,

    /// Resource version of the Secret right after it was written
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
}

impl CertificatePrivateKeyPairStatus {
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
            resource_version: String::new(),
        };
        debug!(secret = %record.secret_name, checksum = %record.checksum, "Recorded certificate");
        record
    }

    /// Attach the resource version the API server returned for the Secret.
    pub fn with_resource_version(mut self, resource_version: impl Into<String>) -> Self {
        self.resource_version = resource_version.into();
        self
    }
}

impl Checksummed for CertificatePrivateKeyPairStatus {
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

/// Asymmetric key pair without a certificate (service account signing key)
pub type PublicKeyPrivateKeyPairStatus = ChecksumedResource;

/// A client certificate used to reach etcd
pub type EtcdCertificateStatus = ChecksumedResource;

/// Certificates the API server presents to etcd
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EtcdCertificatesStatus {
    #[serde(default)]
    pub api_server: EtcdCertificateStatus,

    #[serde(default)]
    pub ca: EtcdCertificateStatus,
}

/// Observed state of the control plane certificates
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificatesStatus {
    #[serde(default)]
    pub ca: CertificatePrivateKeyPairStatus,

    #[serde(default)]
    pub api_server: CertificatePrivateKeyPairStatus,

    #[serde(default)]
    pub api_server_kubelet_client: CertificatePrivateKeyPairStatus,

    #[serde(default, rename = "frontProxyCA")]
    pub front_proxy_ca: CertificatePrivateKeyPairStatus,

    #[serde(default)]
    pub front_proxy_client: CertificatePrivateKeyPairStatus,

    #[serde(default)]
    pub sa: PublicKeyPrivateKeyPairStatus,

    /// Present only for etcd-backed tenants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etcd: Option<EtcdCertificatesStatus>,
}

impl CertificatesStatus {
    /// Every certificate record, keyed by its field name in the status document.
    ///
    /// etcd records are listed as `etcd.apiServer` and `etcd.ca` when present.
    pub fn entries(&self) -> Vec<(&'static str, &dyn Checksummed)> {
        let mut entries: Vec<(&'static str, &dyn Checksummed)> = Vec::with_capacity(8);
        entries.push(("ca", &self.ca));
        entries.push(("apiServer", &self.api_server));
        entries.push(("apiServerKubeletClient", &self.api_server_kubelet_client));
        entries.push(("frontProxyCA", &self.front_proxy_ca));
        entries.push(("frontProxyClient", &self.front_proxy_client));
        entries.push(("sa", &self.sa));
        if let Some(etcd) = &self.etcd {
            entries.push(("etcd.apiServer", &etcd.api_server));
            entries.push(("etcd.ca", &etcd.ca));
        }
        entries
    }

    /// Names of the certificates that were never provisioned
    pub fn pending(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter(|(_, record)| !record.is_provisioned())
            .map(|(name, _)| name)
            .collect()
    }
}
