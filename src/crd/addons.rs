//! Addon status
//!
//! CoreDNS and kube-proxy are tracked by a single checksum. Konnectivity
//! needs its own certificate and kubeconfig plus a handful of objects
//! created inside the tenant cluster.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::certificates::CertificatePrivateKeyPairStatus;
use super::kubeadm::KubeconfigStatus;
use super::kubernetes::KubernetesServiceStatus;
use super::resource::{advance, Checksummed, ExternalObjectRef};

/// Observed state of a simple addon
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonStatus {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl AddonStatus {
    /// Record the addon as installed from the manifests hashing to `checksum`.
    pub fn record(&self, checksum: impl Into<String>, now: DateTime<Utc>) -> Self {
        let record = Self {
            enabled: true,
            checksum: checksum.into(),
            last_update: Some(advance(self.last_update, now)),
        };
        debug!(checksum = %record.checksum, "Recorded addon");
        record
    }

    /// Record the addon as removed.
    pub fn disable(&self) -> Self {
        Self::default()
    }
}

impl Checksummed for AddonStatus {
    fn checksum(&self) -> &str {
        &self.checksum
    }

    fn is_provisioned(&self) -> bool {
        self.enabled && self.last_update.is_some()
    }

    fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

/// Observed state of the Konnectivity addon
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KonnectivityStatus {
    #[serde(default)]
    pub enabled: bool,

    /// Name of the egress selector configuration handed to the API server
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub egress_selector_configuration: String,

    #[serde(default)]
    pub certificate: CertificatePrivateKeyPairStatus,

    #[serde(default)]
    pub kubeconfig: KubeconfigStatus,

    #[serde(default, rename = "sa")]
    pub service_account: ExternalObjectRef,

    #[serde(default, rename = "clusterrolebinding")]
    pub cluster_role_binding: ExternalObjectRef,

    #[serde(default)]
    pub agent: ExternalObjectRef,

    #[serde(default)]
    pub service: KubernetesServiceStatus,
}

impl KonnectivityStatus {
    /// Objects created inside the tenant cluster, keyed by their field name
    pub fn tenant_objects(&self) -> [(&'static str, &ExternalObjectRef); 3] {
        [
            ("sa", &self.service_account),
            ("clusterrolebinding", &self.cluster_role_binding),
            ("agent", &self.agent),
        ]
    }

    /// Whether anything besides the `enabled` flag was ever recorded
    pub fn has_records(&self) -> bool {
        self.certificate.is_provisioned()
            || self.kubeconfig.is_provisioned()
            || self.tenant_objects().iter().any(|(_, o)| o.is_tracked())
            || !self.service.name.is_empty()
    }

    /// Record the addon as removed.
    pub fn disable(&self) -> Self {
        Self::default()
    }
}

/// Observed state of every addon
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonsStatus {
    #[serde(default, rename = "coreDNS")]
    pub core_dns: AddonStatus,

    #[serde(default)]
    pub kube_proxy: AddonStatus,

    #[serde(default)]
    pub konnectivity: KonnectivityStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_always_serialized() {
        let json = serde_json::to_value(AddonsStatus::default()).unwrap();
        assert_eq!(json["coreDNS"], serde_json::json!({"enabled": false}));
        assert_eq!(json["kubeProxy"], serde_json::json!({"enabled": false}));
        assert_eq!(json["konnectivity"]["enabled"], false);
    }

    #[test]
    fn test_addon_record_and_disable() {
        let core_dns = AddonStatus::default();
        assert!(core_dns.needs_update("abc"));

        let core_dns = core_dns.record("abc", Utc::now());
        assert!(core_dns.enabled);
        assert!(!core_dns.needs_update("abc"));
        assert!(core_dns.needs_update("def"));

        let disabled = core_dns.disable();
        assert!(!disabled.enabled);
        assert!(disabled.needs_update("abc"));
    }

    #[test]
    fn test_konnectivity_wire_names() {
        let json = serde_json::to_value(KonnectivityStatus::default()).unwrap();
        for key in ["certificate", "kubeconfig", "sa", "clusterrolebinding", "agent", "service"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_konnectivity_has_records() {
        let mut konnectivity = KonnectivityStatus::default();
        assert!(!konnectivity.has_records());

        konnectivity.agent =
            konnectivity
                .agent
                .record("konnectivity-agent", "kube-system", "42", Utc::now());
        assert!(konnectivity.has_records());
        assert!(!konnectivity.disable().has_records());
    }
}
