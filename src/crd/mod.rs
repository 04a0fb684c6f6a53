//! Status model for the TenantControlPlane custom resource
//!
//! This module defines the observed state a reconciler records while it
//! provisions a tenant control plane.

pub mod addons;
pub mod certificates;
pub mod kubeadm;
pub mod kubernetes;
pub mod resource;
pub mod storage;
mod tenant_control_plane;


pub use addons::{AddonStatus, AddonsStatus, KonnectivityStatus};
pub use certificates::{
    CertificatePrivateKeyPairStatus, CertificatesStatus, EtcdCertificateStatus,
    EtcdCertificatesStatus, PublicKeyPrivateKeyPairStatus,
};
pub use kubeadm::{
    KubeadmConfigStatus, KubeadmPhase, KubeadmPhaseStatus, KubeadmPhasesStatus,
    KubeconfigStatus, KubeconfigsStatus, PhaseState,
};
pub use kubernetes::{
    KubernetesDeploymentStatus, KubernetesIngressStatus, KubernetesServiceStatus,
    KubernetesStatus, KubernetesVersion, VersionStatus,
};
pub use resource::{ChecksumedResource, Checksummed, Convergence, ExternalObjectRef, ObjectDrift};
pub use storage::{
    DataStoreKind, EtcdPermission, EtcdRole, EtcdStatus, EtcdUser, KineStatus, PermissionType,
    SqlCertificateStatus, SqlConfigStatus, SqlSetupStatus, StorageStatus, StorageStatusFields,
};
pub use tenant_control_plane::{StatusSection, StatusValidationError, TenantControlPlaneStatus};
