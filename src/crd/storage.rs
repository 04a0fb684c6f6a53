//! Storage backend status
//!
//! A tenant keeps its Kubernetes state either as a logical member of a shared
//! etcd cluster or in a SQL database behind Kine. The choice is made once at
//! creation and never changes, so [`StorageStatus`] is a sum type: exactly one
//! backend is ever recorded.
//!
//! On the wire the status keeps the `{ "etcd": {...} }` / `{ "kine": {...} }`
//! shape. A document carrying both keys is rejected when decoded.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use super::resource::{advance, ChecksumedResource, Checksummed};
use crate::error::{Error, Result};

/// Access granted by an etcd role permission
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum PermissionType {
    #[default]
    Read,
    Write,
    ReadWrite,
}

impl PermissionType {
    fn is_read(&self) -> bool {
        *self == PermissionType::Read
    }
}

impl From<PermissionType> for i32 {
    fn from(value: PermissionType) -> Self {
        match value {
            PermissionType::Read => 0,
            PermissionType::Write => 1,
            PermissionType::ReadWrite => 2,
        }
    }
}

impl TryFrom<i32> for PermissionType {
    type Error = String;

    fn try_from(value: i32) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(PermissionType::Read),
            1 => Ok(PermissionType::Write),
            2 => Ok(PermissionType::ReadWrite),
            other => Err(format!("unknown etcd permission type {other}")),
        }
    }
}

/// A key range an etcd role is allowed to touch
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EtcdPermission {
    #[serde(default, rename = "type", skip_serializing_if = "PermissionType::is_read")]
    #[schemars(with = "i32")]
    pub permission_type: PermissionType,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub range_end: String,
}

/// The tenant's role in the shared etcd cluster
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EtcdRole {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<EtcdPermission>,

    #[serde(default)]
    pub exists: bool,
}

/// The tenant's user in the shared etcd cluster
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EtcdUser {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    #[serde(default)]
    pub exists: bool,
}

/// Last observed etcd membership of the tenant
///
/// Uniqueness of the role/user pair across tenants is owned by whoever
/// manages etcd membership; this is only its last observed record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EtcdStatus {
    #[serde(default)]
    pub role: EtcdRole,

    #[serde(default)]
    pub user: EtcdUser,
}

/// The Kine SQL connection configuration Secret
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SqlConfigStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

impl SqlConfigStatus {
    pub fn record(&self, secret_name: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            secret_name: secret_name.into(),
            checksum: checksum.into(),
        }
    }
}

impl Checksummed for SqlConfigStatus {
    fn checksum(&self) -> &str {
        &self.checksum
    }

    fn is_provisioned(&self) -> bool {
        !self.secret_name.is_empty()
    }

    fn last_update(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// One-time creation of the tenant schema and SQL user
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SqlSetupStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub schema: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

impl SqlSetupStatus {
    pub fn record(
        &self,
        schema: impl Into<String>,
        user: impl Into<String>,
        checksum: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            schema: schema.into(),
            user: user.into(),
            last_update: Some(advance(self.last_update, now)),
            checksum: checksum.into(),
        }
    }
}

impl Checksummed for SqlSetupStatus {
    fn checksum(&self) -> &str {
        &self.checksum
    }

    fn is_provisioned(&self) -> bool {
        !self.schema.is_empty()
    }

    fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

/// Client certificate for the SQL connection
pub type SqlCertificateStatus = ChecksumedResource;

/// Observed state of a Kine (SQL) backed tenant
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KineStatus {
    /// SQL driver in use (e.g. MySQL, PostgreSQL)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub driver: String,

    #[serde(default)]
    pub config: SqlConfigStatus,

    #[serde(default)]
    pub setup: SqlSetupStatus,

    #[serde(default)]
    pub certificate: SqlCertificateStatus,
}

/// Which kind of storage backend a tenant uses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataStoreKind {
    Etcd,
    Kine,
}

impl fmt::Display for DataStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataStoreKind::Etcd => write!(f, "etcd"),
            DataStoreKind::Kine => write!(f, "kine"),
        }
    }
}

/// Observed state of the tenant's storage backend
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "StorageStatusFields", into = "StorageStatusFields")]
pub enum StorageStatus {
    Etcd(EtcdStatus),
    Kine(KineStatus),
}

/// Wire form of [`StorageStatus`]: one optional key per backend
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatusFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etcd: Option<EtcdStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kine: Option<KineStatus>,
}

impl StorageStatus {
    /// Build a storage status from its optional parts.
    ///
    /// Returns `Ok(None)` when neither backend was recorded yet and an error
    /// when both are.
    pub fn from_parts(
        etcd: Option<EtcdStatus>,
        kine: Option<KineStatus>,
    ) -> Result<Option<StorageStatus>> {
        match (etcd, kine) {
            (Some(_), Some(_)) => Err(Error::ConflictingStorageBackends),
            (Some(etcd), None) => Ok(Some(StorageStatus::Etcd(etcd))),
            (None, Some(kine)) => Ok(Some(StorageStatus::Kine(kine))),
            (None, None) => Ok(None),
        }
    }

    pub fn kind(&self) -> DataStoreKind {
        match self {
            StorageStatus::Etcd(_) => DataStoreKind::Etcd,
            StorageStatus::Kine(_) => DataStoreKind::Kine,
        }
    }

    pub fn etcd(&self) -> Option<&EtcdStatus> {
        match self {
            StorageStatus::Etcd(etcd) => Some(etcd),
            StorageStatus::Kine(_) => None,
        }
    }

    pub fn kine(&self) -> Option<&KineStatus> {
        match self {
            StorageStatus::Etcd(_) => None,
            StorageStatus::Kine(kine) => Some(kine),
        }
    }
}

impl TryFrom<StorageStatusFields> for StorageStatus {
    type Error = Error;

    fn try_from(fields: StorageStatusFields) -> Result<Self> {
        StorageStatus::from_parts(fields.etcd, fields.kine)?.ok_or(Error::MissingStorageBackend)
    }
}

impl From<StorageStatus> for StorageStatusFields {
    fn from(status: StorageStatus) -> Self {
        match status {
            StorageStatus::Etcd(etcd) => StorageStatusFields {
                etcd: Some(etcd),
                kine: None,
            },
            StorageStatus::Kine(kine) => StorageStatusFields {
                etcd: None,
                kine: Some(kine),
            },
        }
    }
}

impl JsonSchema for StorageStatus {
    fn schema_name() -> String {
        "StorageStatus".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        StorageStatusFields::json_schema(gen)
    }
}

/// Decode an optional storage status where an empty object means "not yet recorded".
pub(crate) fn deserialize_optional<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<StorageStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StorageStatusFields>::deserialize(deserializer)? {
        Some(fields) => {
            StorageStatus::from_parts(fields.etcd, fields.kine).map_err(serde::de::Error::custom)
        }
        None => Ok(None),
    }
}
