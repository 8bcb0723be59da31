//! CassandraRestore Custom Resource Definition

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{CassandraBackup, OperationStatus, RetrySpec, StorageProvider};

/// CassandraRestore resource specification
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "db.ibm.com",
    version = "v1alpha1",
    kind = "CassandraRestore",
    plural = "cassandrarestores",
    singular = "cassandrarestore",
    shortname = "cr",
    namespaced,
    status = "OperationStatus",
    printcolumn = r#"{"name": "State", "type": "string", "jsonPath": ".status.state"}"#,
    printcolumn = r#"{"name": "Progress", "type": "integer", "jsonPath": ".status.progress"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CassandraRestoreSpec {
    /// Name of the CassandraCluster to restore into
    pub cassandra_cluster: String,

    /// CassandraBackup to restore from. Supplies storage location, tag and secret when those are unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cassandra_backup: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    #[serde(default)]
    pub concurrent_connections: i64,

    #[serde(default)]
    pub dc: String,

    #[serde(default)]
    pub entities: String,

    #[serde(default)]
    pub no_delete_truncates: bool,

    #[serde(default)]
    pub no_delete_downloads: bool,

    #[serde(default)]
    pub no_download_data: bool,

    /// sstable import options
    #[serde(default)]
    pub import: RestoreImportSpec,

    /// Per-node timeout in hours
    #[serde(default)]
    pub timeout: i64,

    #[serde(default)]
    pub resolve_host_id_from_topology: bool,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default)]
    pub skip_bucket_verification: bool,

    #[serde(default)]
    pub retry: RetrySpec,

    /// Table renames applied on import (`ks.old` -> `ks.new`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub schema_version: String,

    #[serde(default)]
    pub exact_schema_version: bool,
}

/// Options forwarded to nodetool import
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestoreImportSpec {
    #[serde(default)]
    pub keep_level: bool,
    #[serde(default)]
    pub no_verify: bool,
    #[serde(default)]
    pub no_verify_tokens: bool,
    #[serde(default)]
    pub no_invalidate_caches: bool,
    #[serde(default)]
    pub quick: bool,
    #[serde(default)]
    pub extended_verify: bool,
    #[serde(default)]
    pub keep_repaired: bool,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl CassandraRestore {
    /// Linked backup name, if any
    pub fn backup_ref(&self) -> Option<&str> {
        non_empty(self.spec.cassandra_backup.as_deref())
    }

    /// Tag to restore: explicit tag, else the linked backup's tag
    pub fn snapshot_tag(&self, backup: Option<&CassandraBackup>) -> Option<String> {
        non_empty(self.spec.snapshot_tag.as_deref())
            .map(str::to_string)
            .or_else(|| backup.map(CassandraBackup::snapshot_tag))
    }

    /// Storage location: explicit, else the linked backup's
    pub fn storage_location<'a>(&'a self, backup: Option<&'a CassandraBackup>) -> Option<&'a str> {
        non_empty(self.spec.storage_location.as_deref())
            .or_else(|| backup.and_then(|b| non_empty(Some(b.spec.storage_location.as_str()))))
    }

    /// Credentials secret: explicit, else the linked backup's
    pub fn secret_name<'a>(&'a self, backup: Option<&'a CassandraBackup>) -> Option<&'a str> {
        non_empty(self.spec.secret_name.as_deref())
            .or_else(|| backup.and_then(|b| non_empty(Some(b.spec.secret_name.as_str()))))
    }

    pub fn storage_provider(&self, backup: Option<&CassandraBackup>) -> Option<StorageProvider> {
        self.storage_location(backup)
            .and_then(StorageProvider::from_location)
    }

    /// Current local status, empty when never projected
    pub fn current_status(&self) -> OperationStatus {
        self.status.clone().unwrap_or_default()
    }
}
