//! TenantControlPlane status aggregate
//!
//! The aggregate owns one record per provisioning concern. Every section is
//! written independently by the reconciler pass that touched it; nothing
//! here propagates a change from one section to another.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::addons::AddonsStatus;
use super::certificates::CertificatesStatus;
use super::kubeadm::{KubeadmConfigStatus, KubeadmPhasesStatus, KubeconfigsStatus};
use super::kubernetes::KubernetesStatus;
use super::resource::Checksummed;
use super::storage::{self, StorageStatus, StorageStatusFields};
use crate::error::Result;

/// Structured validation error for `TenantControlPlaneStatus`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusValidationError {
    pub field: String,
    pub message: String,
    pub how_to_fix: String,
}

impl StatusValidationError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        how_to_fix: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            how_to_fix: how_to_fix.into(),
        }
    }
}

impl fmt::Display for StatusValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.field, self.message, self.how_to_fix)
    }
}

/// Observed state of a TenantControlPlane
///
/// Created empty together with the resource and filled in section by section
/// as each subsystem converges. The whole document goes away with the
/// resource; sections are never deleted on their own.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantControlPlaneStatus {
    /// Kubernetes storage backend of the tenant
    #[serde(
        default,
        deserialize_with = "storage::deserialize_optional",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "StorageStatusFields")]
    pub storage: Option<StorageStatus>,

    /// Certificates required to run a Kubernetes control plane
    #[serde(default)]
    pub certificates: CertificatesStatus,

    /// Kubeconfigs the control plane components need
    #[serde(default, rename = "kubeconfig")]
    pub kube_config: KubeconfigsStatus,

    /// Resources deployed in the management cluster
    #[serde(default, rename = "kubernetesResources")]
    pub kubernetes: KubernetesStatus,

    /// Configuration required by kubeadm
    #[serde(default, rename = "kubeadmconfig")]
    pub kubeadm_config: KubeadmConfigStatus,

    /// kubeadm phase actions
    #[serde(default)]
    pub kubeadm_phase: KubeadmPhasesStatus,

    /// Endpoint the tenant API server is reachable at
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub control_plane_endpoint: String,

    #[serde(default)]
    pub addons: AddonsStatus,
}

/// Independently writable sections of the status document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusSection {
    Storage,
    Certificates,
    Kubeconfig,
    KubernetesResources,
    KubeadmConfig,
    KubeadmPhase,
    ControlPlaneEndpoint,
    Addons,
}

impl StatusSection {
    pub const ALL: [StatusSection; 8] = [
        StatusSection::Storage,
        StatusSection::Certificates,
        StatusSection::Kubeconfig,
        StatusSection::KubernetesResources,
        StatusSection::KubeadmConfig,
        StatusSection::KubeadmPhase,
        StatusSection::ControlPlaneEndpoint,
        StatusSection::Addons,
    ];

    /// Key of the section in the status document
    pub fn field_name(self) -> &'static str {
        match self {
            StatusSection::Storage => "storage",
            StatusSection::Certificates => "certificates",
            StatusSection::Kubeconfig => "kubeconfig",
            StatusSection::KubernetesResources => "kubernetesResources",
            StatusSection::KubeadmConfig => "kubeadmconfig",
            StatusSection::KubeadmPhase => "kubeadmPhase",
            StatusSection::ControlPlaneEndpoint => "controlPlaneEndpoint",
            StatusSection::Addons => "addons",
        }
    }
}

impl fmt::Display for StatusSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl TenantControlPlaneStatus {
    /// Encoded value of a single section.
    ///
    /// A storage backend that was not recorded yet encodes as an empty
    /// object.
    pub fn section_value(&self, section: StatusSection) -> Result<serde_json::Value> {
        let value = match section {
            StatusSection::Storage => match &self.storage {
                Some(storage) => serde_json::to_value(storage)?,
                None => serde_json::json!({}),
            },
            StatusSection::Certificates => serde_json::to_value(&self.certificates)?,
            StatusSection::Kubeconfig => serde_json::to_value(&self.kube_config)?,
            StatusSection::KubernetesResources => serde_json::to_value(&self.kubernetes)?,
            StatusSection::KubeadmConfig => serde_json::to_value(&self.kubeadm_config)?,
            StatusSection::KubeadmPhase => serde_json::to_value(&self.kubeadm_phase)?,
            StatusSection::ControlPlaneEndpoint => {
                serde_json::Value::String(self.control_plane_endpoint.clone())
            }
            StatusSection::Addons => serde_json::to_value(&self.addons)?,
        };
        Ok(value)
    }

    /// Check the cross-section invariants the status itself can observe.
    ///
    /// - etcd client certificates are tracked exactly when the recorded
    ///   storage backend is etcd (certificates may precede the storage record)
    /// - a recorded Kine configuration names its driver
    /// - Konnectivity carries records only while enabled
    pub fn validate(&self) -> Result<(), Vec<StatusValidationError>> {
        let mut errors = Vec::new();

        match &self.storage {
            Some(StorageStatus::Etcd(_)) if self.certificates.etcd.is_none() => {
                errors.push(StatusValidationError::new(
                    "status.certificates.etcd",
                    "storage backend is etcd but no etcd certificates are recorded",
                    "Issue the etcd client certificates before recording the etcd storage status.",
                ));
            }
            Some(StorageStatus::Kine(kine)) => {
                if self.certificates.etcd.is_some() {
                    errors.push(StatusValidationError::new(
                        "status.certificates.etcd",
                        "storage backend is kine but etcd certificates are recorded",
                        "Remove status.certificates.etcd for Kine backed tenants.",
                    ));
                }
                if kine.config.is_provisioned() && kine.driver.is_empty() {
                    errors.push(StatusValidationError::new(
                        "status.storage.kine.driver",
                        "kine configuration is recorded without a driver",
                        "Record the SQL driver together with the Kine configuration.",
                    ));
                }
            }
            _ => {}
        }

        let konnectivity = &self.addons.konnectivity;
        if !konnectivity.enabled && konnectivity.has_records() {
            errors.push(StatusValidationError::new(
                "status.addons.konnectivity",
                "konnectivity is disabled but still carries records",
                "Clear the Konnectivity status when the addon is disabled.",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{EtcdCertificatesStatus, EtcdStatus, KineStatus};

    #[test]
    fn test_empty_status_serializes_sections() {
        let json = serde_json::to_value(TenantControlPlaneStatus::default()).unwrap();

        assert!(json.get("storage").is_none());
        assert!(json.get("controlPlaneEndpoint").is_none());
        for key in [
            "certificates",
            "kubeconfig",
            "kubernetesResources",
            "kubeadmconfig",
            "kubeadmPhase",
            "addons",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_empty_storage_object_decodes_to_none() {
        let status: TenantControlPlaneStatus =
            serde_json::from_value(serde_json::json!({"storage": {}})).unwrap();
        assert_eq!(status.storage, None);
    }

    #[test]
    fn test_both_storage_backends_fail_to_decode() {
        let json = serde_json::json!({"storage": {"etcd": {}, "kine": {"driver": "MySQL"}}});
        assert!(serde_json::from_value::<TenantControlPlaneStatus>(json).is_err());
    }

    #[test]
    fn test_section_names_match_wire() {
        let status = TenantControlPlaneStatus {
            storage: Some(StorageStatus::Etcd(EtcdStatus::default())),
            control_plane_endpoint: "192.0.2.10:6443".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&status).unwrap();

        for section in StatusSection::ALL {
            assert_eq!(
                json[section.field_name()],
                status.section_value(section).unwrap(),
                "{section}"
            );
        }
    }

    #[test]
    fn test_unrecorded_storage_section_is_empty_object() {
        let value = TenantControlPlaneStatus::default()
            .section_value(StatusSection::Storage)
            .unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn test_validate_accepts_empty_status() {
        assert!(TenantControlPlaneStatus::default().validate().is_ok());
    }

    #[test]
    fn test_validate_etcd_certificates_follow_backend() {
        let mut status = TenantControlPlaneStatus {
            storage: Some(StorageStatus::Etcd(EtcdStatus::default())),
            ..Default::default()
        };
        let errors = status.validate().unwrap_err();
        assert_eq!(errors[0].field, "status.certificates.etcd");

        status.certificates.etcd = Some(EtcdCertificatesStatus::default());
        assert!(status.validate().is_ok());

        status.storage = Some(StorageStatus::Kine(KineStatus {
            driver: "MySQL".to_string(),
            ..Default::default()
        }));
        let errors = status.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("kine"));
    }

    #[test]
    fn test_validate_certificates_may_precede_storage() {
        let status = TenantControlPlaneStatus {
            certificates: CertificatesStatus {
                etcd: Some(EtcdCertificatesStatus::default()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(status.validate().is_ok());
    }

    #[test]
    fn test_validate_kine_driver() {
        let mut kine = KineStatus::default();
        kine.config = kine.config.record("tenant-a-kine-config", "abc");
        let status = TenantControlPlaneStatus {
            storage: Some(StorageStatus::Kine(kine)),
            ..Default::default()
        };

        let errors = status.validate().unwrap_err();
        assert_eq!(errors[0].field, "status.storage.kine.driver");
    }

    #[test]
    fn test_validate_disabled_konnectivity() {
        let mut status = TenantControlPlaneStatus::default();
        status.addons.konnectivity.agent = status.addons.konnectivity.agent.record(
            "konnectivity-agent",
            "kube-system",
            "1",
            chrono::Utc::now(),
        );

        let errors = status.validate().unwrap_err();
        assert_eq!(errors[0].field, "status.addons.konnectivity");
        assert!(errors[0].to_string().starts_with("status.addons.konnectivity: "));

        status.addons.konnectivity.enabled = true;
        assert!(status.validate().is_ok());
    }
}
