//! Kubeconfig and kubeadm phase status
//!
//! Each kubeadm phase is tracked independently: re-running one phase (for
//! example to rotate the bootstrap token) never touches the others.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::resource::{advance, ChecksumedResource, Checksummed};

/// A generated kubeconfig Secret
pub type KubeconfigStatus = ChecksumedResource;

/// Kubeconfigs generated for the control plane components
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeconfigsStatus {
    #[serde(default)]
    pub admin: KubeconfigStatus,

    #[serde(default)]
    pub controller_manager: KubeconfigStatus,

    #[serde(default)]
    pub scheduler: KubeconfigStatus,
}

/// The ConfigMap holding the rendered kubeadm configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeadmConfigStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub configmap_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,

    /// Checksum of the kubeadm configuration
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

impl KubeadmConfigStatus {
    pub fn record(
        &self,
        configmap_name: impl Into<String>,
        checksum: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            configmap_name: configmap_name.into(),
            last_update: Some(advance(self.last_update, now)),
            checksum: checksum.into(),
        }
    }
}

impl Checksummed for KubeadmConfigStatus {
    fn checksum(&self) -> &str {
        &self.checksum
    }

    fn is_provisioned(&self) -> bool {
        !self.configmap_name.is_empty()
    }

    fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

/// State of a single kubeadm phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseState<'a> {
    NotDone,
    Done {
        checksum: &'a str,
        last_update: DateTime<Utc>,
    },
}

/// Result of the last successful run of a kubeadm phase
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeadmPhaseStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl KubeadmPhaseStatus {
    pub fn record(&self, checksum: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            checksum: checksum.into(),
            last_update: Some(advance(self.last_update, now)),
        }
    }

    pub fn state(&self) -> PhaseState<'_> {
        match self.last_update {
            Some(last_update) => PhaseState::Done {
                checksum: &self.checksum,
                last_update,
            },
            None => PhaseState::NotDone,
        }
    }
}

impl Checksummed for KubeadmPhaseStatus {
    fn checksum(&self) -> &str {
        &self.checksum
    }

    fn is_provisioned(&self) -> bool {
        self.last_update.is_some()
    }

    fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

/// The kubeadm phases run against a tenant control plane
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KubeadmPhase {
    UploadConfigKubeadm,
    UploadConfigKubelet,
    BootstrapToken,
}

impl KubeadmPhase {
    pub const ALL: [KubeadmPhase; 3] = [
        KubeadmPhase::UploadConfigKubeadm,
        KubeadmPhase::UploadConfigKubelet,
        KubeadmPhase::BootstrapToken,
    ];
}

impl fmt::Display for KubeadmPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KubeadmPhase::UploadConfigKubeadm => write!(f, "uploadConfigKubeadm"),
            KubeadmPhase::UploadConfigKubelet => write!(f, "uploadConfigKubelet"),
            KubeadmPhase::BootstrapToken => write!(f, "bootstrapToken"),
        }
    }
}

/// Status of every kubeadm phase
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeadmPhasesStatus {
    #[serde(default)]
    pub upload_config_kubeadm: KubeadmPhaseStatus,

    #[serde(default)]
    pub upload_config_kubelet: KubeadmPhaseStatus,

    #[serde(default)]
    pub bootstrap_token: KubeadmPhaseStatus,
}

impl KubeadmPhasesStatus {
    pub fn phase(&self, phase: KubeadmPhase) -> &KubeadmPhaseStatus {
        match phase {
            KubeadmPhase::UploadConfigKubeadm => &self.upload_config_kubeadm,
            KubeadmPhase::UploadConfigKubelet => &self.upload_config_kubelet,
            KubeadmPhase::BootstrapToken => &self.bootstrap_token,
        }
    }

    /// Return a copy with exactly one phase recorded as done for `checksum`.
    pub fn record_phase(
        &self,
        phase: KubeadmPhase,
        checksum: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut phases = self.clone();
        let recorded = self.phase(phase).record(checksum, now);
        debug!(%phase, checksum = %recorded.checksum, "Recorded kubeadm phase");

        match phase {
            KubeadmPhase::UploadConfigKubeadm => phases.upload_config_kubeadm = recorded,
            KubeadmPhase::UploadConfigKubelet => phases.upload_config_kubelet = recorded,
            KubeadmPhase::BootstrapToken => phases.bootstrap_token = recorded,
        }
        phases
    }

    /// Phases that must run for the given desired checksums
    pub fn outdated<'a>(
        &self,
        desired: impl IntoIterator<Item = (KubeadmPhase, &'a str)>,
    ) -> Vec<KubeadmPhase> {
        desired
            .into_iter()
            .filter(|(phase, checksum)| self.phase(*phase).needs_update(checksum))
            .map(|(phase, _)| phase)
            .collect()
    }
}
