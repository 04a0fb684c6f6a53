//! Reading and writing the status sub-resource
//!
//! The status lives inside the TenantControlPlane object. Writers patch one
//! section at a time so independent reconcile tasks never overwrite each
//! other's work, and may guard the write with the resource version they read
//! so the API server rejects it if someone else got there first.

use kube::{
    api::{Api, ApiResource, DynamicObject, GroupVersionKind, Patch, PatchParams},
    Client, ResourceExt,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::crd::{StatusSection, TenantControlPlaneStatus};
use crate::error::{Error, Result};

pub const TENANT_CONTROL_PLANE_GROUP: &str = "kamaji.clastix.io";
pub const TENANT_CONTROL_PLANE_VERSION: &str = "v1alpha1";
pub const TENANT_CONTROL_PLANE_KIND: &str = "TenantControlPlane";
pub const TENANT_CONTROL_PLANE_PLURAL: &str = "tenantcontrolplanes";

/// Field manager used when no other is configured
pub const DEFAULT_FIELD_MANAGER: &str = "tenant-control-plane-status";

/// API resource describing the TenantControlPlane kind
pub fn tenant_control_plane_resource() -> ApiResource {
    let gvk = GroupVersionKind::gvk(
        TENANT_CONTROL_PLANE_GROUP,
        TENANT_CONTROL_PLANE_VERSION,
        TENANT_CONTROL_PLANE_KIND,
    );
    ApiResource::from_gvk_with_plural(&gvk, TENANT_CONTROL_PLANE_PLURAL)
}

/// Decode the status of a TenantControlPlane object.
///
/// An object without a status yet decodes to the empty aggregate.
pub fn read_status(object: &DynamicObject) -> Result<TenantControlPlaneStatus> {
    match object.data.get("status") {
        None | Some(Value::Null) => Ok(TenantControlPlaneStatus::default()),
        Some(status) => Ok(serde_json::from_value(status.clone())?),
    }
}

/// Decode the status of an object that must already have one.
pub fn require_status(object: &DynamicObject) -> Result<TenantControlPlaneStatus> {
    match object.data.get("status") {
        None | Some(Value::Null) => Err(Error::MissingStatus(object.name_any())),
        Some(status) => Ok(serde_json::from_value(status.clone())?),
    }
}

/// Merge patch turning `previous` into `next`.
///
/// Keys present in `previous` but missing from `next` are written as `null`,
/// which a JSON merge patch treats as a deletion. Nested objects are diffed
/// recursively; every other value is replaced as a whole.
pub fn merge_diff(previous: &Value, next: &Value) -> Value {
    match (previous, next) {
        (Value::Object(previous), Value::Object(next)) => {
            let mut patch = Map::new();
            for (key, value) in next {
                let value = match previous.get(key) {
                    Some(old) => merge_diff(old, value),
                    None => value.clone(),
                };
                patch.insert(key.clone(), value);
            }
            for key in previous.keys() {
                if !next.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            Value::Object(patch)
        }
        (_, next) => next.clone(),
    }
}

/// Merge patch writing a single status section.
///
/// `previous` is the status the caller read; anything it holds that `status`
/// no longer does is cleared. With a resource version the patch also carries
/// `metadata.resourceVersion`, which makes the API server answer 409 Conflict
/// when the object changed since it was read.
pub fn section_patch(
    previous: &TenantControlPlaneStatus,
    status: &TenantControlPlaneStatus,
    section: StatusSection,
    resource_version: Option<&str>,
) -> Result<Value> {
    sections_patch(previous, status, &[section], resource_version)
}

/// Merge patch writing several status sections at once.
pub fn sections_patch(
    previous: &TenantControlPlaneStatus,
    status: &TenantControlPlaneStatus,
    sections: &[StatusSection],
    resource_version: Option<&str>,
) -> Result<Value> {
    let mut body = Map::new();
    for section in sections {
        let old = previous.section_value(*section)?;
        let new = status.section_value(*section)?;
        body.insert(section.field_name().to_string(), merge_diff(&old, &new));
    }

    let mut patch = json!({ "status": Value::Object(body) });
    if let Some(resource_version) = resource_version {
        patch["metadata"] = json!({ "resourceVersion": resource_version });
    }
    Ok(patch)
}

/// Whether an error is an optimistic concurrency conflict worth retrying
pub fn is_conflict(error: &Error) -> bool {
    matches!(error, Error::KubeError(kube::Error::Api(response)) if response.code == 409)
}

/// Writes status sections of TenantControlPlane objects in one namespace
#[derive(Clone)]
pub struct StatusWriter {
    api: Api<DynamicObject>,
    field_manager: String,
}

impl StatusWriter {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced_with(client, namespace, &tenant_control_plane_resource()),
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
        }
    }

    pub fn with_field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.field_manager = field_manager.into();
        self
    }

    /// Fetch the current status together with the object's resource version.
    pub async fn get(&self, name: &str) -> Result<(TenantControlPlaneStatus, Option<String>)> {
        let object = self.api.get(name).await?;
        let status = read_status(&object)?;
        Ok((status, object.resource_version()))
    }

    /// Write one section and return the status the API server stored.
    ///
    /// `previous` is the status returned by [`StatusWriter::get`].
    pub async fn patch_section(
        &self,
        name: &str,
        previous: &TenantControlPlaneStatus,
        status: &TenantControlPlaneStatus,
        section: StatusSection,
        resource_version: Option<&str>,
    ) -> Result<TenantControlPlaneStatus> {
        self.patch_sections(name, previous, status, &[section], resource_version)
            .await
    }

    /// Write several sections in a single request.
    pub async fn patch_sections(
        &self,
        name: &str,
        previous: &TenantControlPlaneStatus,
        status: &TenantControlPlaneStatus,
        sections: &[StatusSection],
        resource_version: Option<&str>,
    ) -> Result<TenantControlPlaneStatus> {
        let patch = sections_patch(previous, status, sections, resource_version)?;
        debug!(tenant = %name, patch = %patch, "Patching TenantControlPlane status");

        let updated = self
            .api
            .patch_status(
                name,
                &PatchParams::apply(&self.field_manager),
                &Patch::Merge(&patch),
            )
            .await?;

        let names: Vec<&str> = sections.iter().map(|s| s.field_name()).collect();
        info!(
            tenant = %name,
            sections = ?names,
            resource_version = ?updated.resource_version(),
            "Updated TenantControlPlane status"
        );
        read_status(&updated)
    }
}
