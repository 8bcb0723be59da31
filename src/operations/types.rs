//! Wire types of the operation service `/operations` API

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle state of a remote operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl OperationState {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationState::Pending => "PENDING",
            OperationState::Running => "RUNNING",
            OperationState::Completed => "COMPLETED",
            OperationState::Cancelled => "CANCELLED",
            OperationState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reported by one node of an operation
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OperationError {
    #[serde(default, deserialize_with = "nullable")]
    pub source: String,
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
}

/// Upload/download retry policy
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Retry {
    #[serde(default)]
    pub interval: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub strategy: String,
    #[serde(default)]
    pub max_attempts: i64,
    #[serde(default)]
    pub enabled: bool,
}

/// Bandwidth limit
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DataRate {
    pub value: i64,
    pub unit: String,
}

/// Body of `POST /operations` for a backup
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub storage_location: String,
    pub data_dirs: Vec<String>,
    pub global_request: bool,
    pub snapshot_tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub k8s_namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub k8s_secret_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<DataRate>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub concurrent_connections: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dc: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entities: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timeout: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metadata_directive: String,
    pub insecure: bool,
    pub create_missing_bucket: bool,
    pub skip_refreshing: bool,
    pub skip_bucket_verification: bool,
    pub retry: Retry,
}

/// Names of the listed fields whose values differ between two values
macro_rules! differing_fields {
    ($a:expr, $b:expr; $($field:ident),+ $(,)?) => {{
        let mut fields = Vec::new();
        $(
            if $a.$field != $b.$field {
                fields.push(stringify!($field));
            }
        )+
        fields
    }};
}

impl BackupRequest {
    /// Configuration fields that differ between two requests.
    ///
    /// The snapshot tag is the join key between an intent and its operations, so it is
    /// not part of the configuration and never listed.
    pub fn config_differences(&self, other: &Self) -> Vec<&'static str> {
        differing_fields!(self, other;
            kind,
            storage_location,
            data_dirs,
            global_request,
            k8s_namespace,
            k8s_secret_name,
            duration,
            bandwidth,
            concurrent_connections,
            dc,
            entities,
            timeout,
            metadata_directive,
            insecure,
            create_missing_bucket,
            skip_refreshing,
            skip_bucket_verification,
            retry,
        )
    }
}

/// Backup operation as recorded by the operation service
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub creation_time: String,
    pub state: OperationState,
    #[serde(default, deserialize_with = "nullable")]
    pub errors: Vec<OperationError>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub start_time: String,
    #[serde(default, deserialize_with = "nullable")]
    pub storage_location: String,
    #[serde(default)]
    pub concurrent_connections: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub metadata_directive: String,
    #[serde(default, deserialize_with = "nullable")]
    pub entities: String,
    #[serde(default, deserialize_with = "nullable")]
    pub snapshot_tag: String,
    #[serde(default)]
    pub global_request: bool,
    #[serde(default)]
    pub timeout: i64,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub schema_version: String,
    #[serde(default)]
    pub create_missing_bucket: bool,
    #[serde(default)]
    pub skip_bucket_verification: bool,
    #[serde(default)]
    pub upload_cluster_topology: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub retry: Retry,
    #[serde(default)]
    pub skip_refreshing: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub data_dirs: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub dc: String,
    #[serde(default, deserialize_with = "nullable")]
    pub k8s_namespace: String,
    #[serde(default, deserialize_with = "nullable")]
    pub k8s_secret_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub duration: String,
    #[serde(default)]
    pub bandwidth: Option<DataRate>,
}

/// sstable import options of a restore
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreImport {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub source_dir: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub keep_level: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_verify: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_verify_tokens: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_invalidate_caches: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub quick: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub extended_verify: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub keep_repaired: bool,
}

/// Body of `POST /operations` for a restore
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub storage_location: String,
    pub snapshot_tag: String,
    pub data_dirs: Vec<String>,
    pub global_request: bool,
    pub restoration_strategy_type: String,
    pub restoration_phase: String,
    pub import: RestoreImport,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub k8s_namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub k8s_secret_name: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub concurrent_connections: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entities: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_delete_truncates: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_delete_downloads: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_download_data: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timeout: i64,
    #[serde(default)]
    pub resolve_host_id_from_topology: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_bucket_verification: bool,
    pub retry: Retry,
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    #[serde(default)]
    pub single_phase: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dc: String,
    #[serde(default)]
    pub schema_version: String,
    #[serde(default)]
    pub exact_schema_version: bool,
}

impl RestoreRequest {
    /// Configuration fields that differ between two requests, snapshot tag excluded.
    pub fn config_differences(&self, other: &Self) -> Vec<&'static str> {
        differing_fields!(self, other;
            kind,
            storage_location,
            data_dirs,
            global_request,
            restoration_strategy_type,
            restoration_phase,
            import,
            k8s_namespace,
            k8s_secret_name,
            concurrent_connections,
            entities,
            no_delete_truncates,
            no_delete_downloads,
            no_download_data,
            timeout,
            resolve_host_id_from_topology,
            insecure,
            skip_bucket_verification,
            retry,
            rename,
            single_phase,
            dc,
            schema_version,
            exact_schema_version,
        )
    }
}

/// Restore operation as recorded by the operation service
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Restore {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub creation_time: String,
    pub state: OperationState,
    #[serde(default, deserialize_with = "nullable")]
    pub errors: Vec<OperationError>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub start_time: String,
    #[serde(default, deserialize_with = "nullable")]
    pub storage_location: String,
    #[serde(default)]
    pub concurrent_connections: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub cassandra_config_directory: String,
    #[serde(default)]
    pub restore_system_keyspace: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub snapshot_tag: String,
    #[serde(default, deserialize_with = "nullable")]
    pub entities: String,
    #[serde(default, deserialize_with = "nullable")]
    pub restoration_strategy_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub restoration_phase: String,
    #[serde(default, deserialize_with = "nullable")]
    pub import: RestoreImport,
    #[serde(default)]
    pub no_delete_truncates: bool,
    #[serde(default)]
    pub no_delete_downloads: bool,
    #[serde(default)]
    pub no_download_data: bool,
    #[serde(default)]
    pub exact_schema_version: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub schema_version: String,
    #[serde(default)]
    pub global_request: bool,
    #[serde(default)]
    pub timeout: i64,
    #[serde(default)]
    pub resolve_host_id_from_topology: bool,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub skip_bucket_verification: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub retry: Retry,
    #[serde(default)]
    pub single_phase: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub data_dirs: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub dc: String,
    #[serde(default, deserialize_with = "nullable")]
    pub k8s_namespace: String,
    #[serde(default, deserialize_with = "nullable")]
    pub k8s_secret_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub rename: BTreeMap<String, String>,
}

/// Read access shared by backup and restore operations
pub trait RemoteOperation {
    fn id(&self) -> &str;
    fn creation_time(&self) -> &str;
    fn state(&self) -> OperationState;
    fn progress(&self) -> f64;
    fn errors(&self) -> &[OperationError];
    fn snapshot_tag(&self) -> &str;
    fn schema_version(&self) -> &str;
    /// Coordinator record of the whole-cluster operation
    fn is_global(&self) -> bool;
}

macro_rules! impl_remote_operation {
    ($ty:ty) => {
        impl RemoteOperation for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn creation_time(&self) -> &str {
                &self.creation_time
            }
            fn state(&self) -> OperationState {
                self.state
            }
            fn progress(&self) -> f64 {
                self.progress
            }
            fn errors(&self) -> &[OperationError] {
                &self.errors
            }
            fn snapshot_tag(&self) -> &str {
                &self.snapshot_tag
            }
            fn schema_version(&self) -> &str {
                &self.schema_version
            }
            fn is_global(&self) -> bool {
                self.global_request
            }
        }
    };
}

impl_remote_operation!(Backup);
impl_remote_operation!(Restore);

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Treats an explicit JSON `null` like an absent field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
