//! Error types for the tenant control plane status model

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Both the etcd and the Kine storage status are populated
    #[error("storage status cannot carry both etcd and kine backends")]
    ConflictingStorageBackends,

    /// Neither storage status is populated where one is required
    #[error("storage status carries no backend")]
    MissingStorageBackend,

    /// KubernetesVersion status moved along an edge the state machine does not have
    #[error("invalid Kubernetes version transition from {from} to {to}")]
    InvalidVersionTransition { from: String, to: String },

    /// The named TenantControlPlane has no status yet
    #[error("TenantControlPlane {0} has no status")]
    MissingStatus(String),

    /// Kubernetes API error when patching status
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
