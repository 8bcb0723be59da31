//! CassandraBackup Custom Resource Definition

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::operations::OperationState;

/// CassandraBackup resource specification
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "db.ibm.com",
    version = "v1alpha1",
    kind = "CassandraBackup",
    plural = "cassandrabackups",
    singular = "cassandrabackup",
    shortname = "cb",
    namespaced,
    status = "OperationStatus",
    printcolumn = r#"{"name": "State", "type": "string", "jsonPath": ".status.state"}"#,
    printcolumn = r#"{"name": "Progress", "type": "integer", "jsonPath": ".status.progress"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CassandraBackupSpec {
    /// Name of the CassandraCluster to back up
    pub cassandra_cluster: String,

    /// Location of the backup, e.g. `s3://bucket-name`
    pub storage_location: String,

    /// Secret holding the storage provider credentials
    pub secret_name: String,

    /// Snapshot name; defaults to the resource name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_tag: Option<String>,

    /// Snapshot TTL, e.g. `"12 hours"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// Upload bandwidth cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<DataRate>,

    /// Parallel uploads per node
    #[serde(default)]
    pub concurrent_connections: i64,

    /// Restrict the backup to one DC
    #[serde(default)]
    pub dc: String,

    /// Keyspaces/tables to back up, e.g. `ks1,ks2.tb1`
    #[serde(default)]
    pub entities: String,

    /// Per-node timeout in hours
    #[serde(default)]
    pub timeout: i64,

    /// S3 metadata directive, COPY or REPLACE
    #[serde(default)]
    pub metadata_directive: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default)]
    pub create_missing_bucket: bool,

    #[serde(default)]
    pub skip_bucket_verification: bool,

    #[serde(default)]
    pub skip_refreshing: bool,

    /// Upload retry policy
    #[serde(default)]
    pub retry: RetrySpec,
}

/// Retry policy applied by the operation service
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrySpec {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between attempts
    #[serde(default)]
    pub interval: i64,

    /// LINEAR or EXPONENTIAL
    #[serde(default)]
    pub strategy: String,

    #[serde(default)]
    pub max_attempts: i64,
}

/// Bandwidth value with unit (e.g. 10 MBPS)
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataRate {
    pub value: i64,
    pub unit: String,
}

/// Local projection of a remote operation, shared by backups and restores
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    /// Remote lifecycle state; absent until the first projection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<OperationState>,

    /// Progress percentage (0-100)
    #[serde(default)]
    pub progress: i32,

    /// Errors reported by the nodes, set when the operation fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StatusError>,
}

/// One node-level error
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusError {
    pub source: String,
    pub message: String,
}

/// Storage provider derived from the storage location scheme
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageProvider {
    S3,
    Gcp,
    Azure,
    Minio,
    Ceph,
    Oracle,
}

impl StorageProvider {
    pub const ALL: [StorageProvider; 6] = [
        StorageProvider::S3,
        StorageProvider::Minio,
        StorageProvider::Oracle,
        StorageProvider::Ceph,
        StorageProvider::Gcp,
        StorageProvider::Azure,
    ];

    /// URL scheme used in storage locations
    pub fn scheme(self) -> &'static str {
        match self {
            StorageProvider::S3 => "s3",
            StorageProvider::Gcp => "gcp",
            StorageProvider::Azure => "azure",
            StorageProvider::Minio => "minio",
            StorageProvider::Ceph => "ceph",
            StorageProvider::Oracle => "oracle",
        }
    }

    /// Detect the provider of a `scheme://…` location
    pub fn from_location(location: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| location.starts_with(&format!("{}://", p.scheme())))
    }

    /// Providers speaking the S3 protocol
    pub fn is_s3_compatible(self) -> bool {
        matches!(
            self,
            StorageProvider::S3 | StorageProvider::Minio | StorageProvider::Oracle | StorageProvider::Ceph
        )
    }
}

impl CassandraBackup {
    /// Tag under which the snapshot is taken: the explicit tag, else the resource name
    pub fn snapshot_tag(&self) -> String {
        match self.spec.snapshot_tag.as_deref() {
            Some(tag) if !tag.is_empty() => tag.to_string(),
            _ => self.name_any(),
        }
    }

    pub fn storage_provider(&self) -> Option<StorageProvider> {
        StorageProvider::from_location(&self.spec.storage_location)
    }

    /// Current local status, empty when never projected
    pub fn current_status(&self) -> OperationStatus {
        self.status.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    fn backup(name: &str, tag: Option<&str>) -> CassandraBackup {
        CassandraBackup {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: CassandraBackupSpec {
                snapshot_tag: tag.map(str::to_string),
                ..Default::default()
            },
            status: None,
        }
    }

    #[test]
    fn snapshot_tag_falls_back_to_name() {
        assert_eq!(backup("nightly", None).snapshot_tag(), "nightly");
        assert_eq!(backup("nightly", Some("")).snapshot_tag(), "nightly");
        assert_eq!(backup("nightly", Some("weekly")).snapshot_tag(), "weekly");
    }

    #[test]
    fn provider_from_scheme() {
        assert_eq!(StorageProvider::from_location("s3://bucket"), Some(StorageProvider::S3));
        assert_eq!(StorageProvider::from_location("gcp://bucket"), Some(StorageProvider::Gcp));
        assert_eq!(StorageProvider::from_location("azure://c"), Some(StorageProvider::Azure));
        assert_eq!(StorageProvider::from_location("ceph://b"), Some(StorageProvider::Ceph));
        assert_eq!(StorageProvider::from_location("ftp://b"), None);
        assert_eq!(StorageProvider::from_location("s3:/bucket"), None);
    }

    #[test]
    fn status_serializes_screaming_state() {
        let status = OperationStatus {
            state: Some(OperationState::Running),
            progress: 43,
            errors: vec![],
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, serde_json::json!({"state": "RUNNING", "progress": 43}));
    }
}
