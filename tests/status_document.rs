//! Decoding, validating and re-encoding full TenantControlPlane status documents

use chrono::{TimeZone, Utc};
use schemars::gen::SchemaSettings;
use tenant_control_plane::crd::{
    Checksummed, Convergence, DataStoreKind, EtcdCertificatesStatus, KubeadmPhase, ObjectDrift,
    PermissionType, TenantControlPlaneStatus, VersionStatus,
};

const ETCD_TENANT: &str = include_str!("fixtures/etcd-tenant-status.yaml");
const KINE_TENANT: &str = include_str!("fixtures/kine-tenant-status.yaml");

fn etcd_tenant() -> TenantControlPlaneStatus {
    serde_yaml::from_str(ETCD_TENANT).expect("fixture should decode")
}

fn kine_tenant() -> TenantControlPlaneStatus {
    serde_yaml::from_str(KINE_TENANT).expect("fixture should decode")
}

#[test]
fn decodes_etcd_tenant_document() {
    let status = etcd_tenant();

    let storage = status.storage.as_ref().expect("storage recorded");
    assert_eq!(storage.kind(), DataStoreKind::Etcd);
    let etcd = storage.etcd().unwrap();
    assert!(etcd.role.exists);
    assert_eq!(
        etcd.role.permissions[0].permission_type,
        PermissionType::ReadWrite
    );

    assert_eq!(status.certificates.ca.resource_version, "1001");
    assert_eq!(
        status.certificates.ca.last_update,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
    );
    assert!(status.certificates.etcd.is_some());
    assert!(status.certificates.pending().is_empty());

    assert_eq!(status.kubernetes.version.status, VersionStatus::Ready);
    assert_eq!(status.kubernetes.deployment.observed().replicas, Some(2));
    assert!(status.kubernetes.deployment.is_rolled_out());
    assert_eq!(
        status.kubernetes.service.load_balancer_addresses(),
        vec!["192.0.2.10"]
    );
    assert_eq!(status.kubernetes.service.port, 6443);

    assert_eq!(status.addons.konnectivity.service.port, 8132);
    assert_eq!(status.control_plane_endpoint, "192.0.2.10:6443");
}

#[test]
fn fixture_satisfies_invariants() {
    let status = etcd_tenant();
    assert_eq!(status.validate(), Ok(()));
}

#[test]
fn reconciler_decisions_on_decoded_document() {
    let status = etcd_tenant();

    assert_eq!(
        status.kube_config.admin.convergence("aa11"),
        Convergence::UpToDate
    );
    assert_eq!(
        status.kube_config.admin.convergence("aa12"),
        Convergence::Stale
    );
    assert!(!status
        .kubeadm_phase
        .phase(KubeadmPhase::BootstrapToken)
        .needs_update("0077"));
    assert!(status.addons.core_dns.needs_update("new-manifests"));

    let agent = &status.addons.konnectivity.agent;
    assert_eq!(agent.drift("514"), ObjectDrift::InSync);
    assert!(matches!(agent.drift("600"), ObjectDrift::Drifted { .. }));
}

#[test]
fn re_encoding_preserves_document() {
    let status = etcd_tenant();

    let json = serde_json::to_string(&status).unwrap();
    let from_json: TenantControlPlaneStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(from_json, status);

    let yaml = serde_yaml::to_string(&status).unwrap();
    let from_yaml: TenantControlPlaneStatus = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(from_yaml, status);
}

#[test]
fn mirrored_status_stays_inline() {
    let status = etcd_tenant();
    let json = serde_json::to_value(&status).unwrap();

    let deployment = &json["kubernetesResources"]["deployment"];
    assert_eq!(deployment["availableReplicas"], 2);
    assert_eq!(deployment["conditions"][0]["type"], "Available");
    assert_eq!(deployment["name"], "tenant-a");
}

#[test]
fn schema_describes_every_section() {
    let schema = SchemaSettings::openapi3()
        .into_generator()
        .into_root_schema_for::<TenantControlPlaneStatus>();
    let json = serde_json::to_value(&schema).unwrap();
    let properties = json["properties"].as_object().expect("object schema");

    for key in [
        "storage",
        "certificates",
        "kubeconfig",
        "kubernetesResources",
        "kubeadmconfig",
        "kubeadmPhase",
        "controlPlaneEndpoint",
        "addons",
    ] {
        assert!(properties.contains_key(key), "schema misses {key}");
    }
}

#[test]
fn decodes_kine_tenant_document() {
    let status = kine_tenant();

    let storage = status.storage.as_ref().expect("storage recorded");
    assert_eq!(storage.kind(), DataStoreKind::Kine);
    assert!(storage.etcd().is_none());
    let kine = storage.kine().unwrap();
    assert_eq!(kine.driver, "PostgreSQL");
    assert_eq!(kine.config.secret_name, "tenant-b-kine-config");
    assert_eq!(kine.setup.schema, "tenant_b");
    assert!(kine.setup.is_provisioned());
    assert!(!kine.certificate.needs_update("9e0f"));
    assert!(kine.certificate.needs_update("9e10"));

    assert!(status.certificates.etcd.is_none());
    assert_eq!(status.kubernetes.version.status, VersionStatus::Upgrading);
    assert!(!status.kubernetes.deployment.is_rolled_out());
    assert!(status
        .kubeadm_phase
        .phase(KubeadmPhase::BootstrapToken)
        .needs_update("0077"));
    assert!(status.kube_config.scheduler.needs_update("cc33"));
    assert!(!status.addons.konnectivity.enabled);
}

#[test]
fn kine_fixture_satisfies_invariants() {
    assert_eq!(kine_tenant().validate(), Ok(()));
}

#[test]
fn kine_document_with_etcd_certificates_is_invalid() {
    let mut status = kine_tenant();
    status.certificates.etcd = Some(EtcdCertificatesStatus::default());

    let errors = status.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "status.certificates.etcd");
}

#[test]
fn re_encoding_preserves_kine_document() {
    let status = kine_tenant();

    let json = serde_json::to_value(&status).unwrap();
    assert!(json["storage"].get("etcd").is_none());
    assert_eq!(json["storage"]["kine"]["driver"], "PostgreSQL");
    assert!(json["certificates"].get("etcd").is_none());

    let from_json: TenantControlPlaneStatus = serde_json::from_value(json).unwrap();
    assert_eq!(from_json, status);

    let yaml = serde_yaml::to_string(&status).unwrap();
    let from_yaml: TenantControlPlaneStatus = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(from_yaml, status);
}
