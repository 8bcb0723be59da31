//! Backup request adapter
//!
//! Converts a CassandraBackup spec into the operation service request, and
//! rebuilds the request an observed backup operation was created from.

use kube::ResourceExt;

use crate::crd::{CassandraBackup, CassandraCluster};
use crate::error::Result;
use crate::operations::{Backup, BackupRequest, DataRate, Retry};

use super::storage_config::cluster_storage_path;

/// Cassandra data directory on every node
pub const DATA_DIR: &str = "/var/lib/cassandra/data";

pub(crate) const DEFAULT_CONCURRENT_CONNECTIONS: i64 = 10;
pub(crate) const DEFAULT_TIMEOUT: i64 = 5;
pub(crate) const DEFAULT_METADATA_DIRECTIVE: &str = "COPY";
pub(crate) const DEFAULT_RETRY_INTERVAL: i64 = 10;
pub(crate) const DEFAULT_RETRY_STRATEGY: &str = "LINEAR";
pub(crate) const DEFAULT_RETRY_MAX_ATTEMPTS: i64 = 3;

/// Build the backup request for the current spec. Defaults fill zero values only.
pub fn build_backup_request(
    cluster: &CassandraCluster,
    backup: &CassandraBackup,
) -> Result<BackupRequest> {
    let spec = &backup.spec;
    let storage_location = cluster_storage_path(&spec.storage_location, cluster)?;

    let mut request = BackupRequest {
        kind: "backup".to_string(),
        storage_location,
        data_dirs: vec![DATA_DIR.to_string()],
        global_request: true,
        snapshot_tag: backup.snapshot_tag(),
        k8s_namespace: backup.namespace().unwrap_or_default(),
        k8s_secret_name: spec.secret_name.clone(),
        duration: spec.duration.clone().unwrap_or_default(),
        bandwidth: spec
            .bandwidth
            .as_ref()
            .filter(|rate| rate.value > 0)
            .map(|rate| DataRate {
                value: rate.value,
                unit: rate.unit.clone(),
            }),
        concurrent_connections: spec.concurrent_connections,
        dc: spec.dc.clone(),
        entities: spec.entities.clone(),
        timeout: spec.timeout,
        metadata_directive: spec.metadata_directive.clone(),
        insecure: spec.insecure,
        create_missing_bucket: spec.create_missing_bucket,
        skip_refreshing: spec.skip_refreshing,
        skip_bucket_verification: spec.skip_bucket_verification,
        retry: Retry {
            interval: spec.retry.interval,
            strategy: spec.retry.strategy.clone(),
            max_attempts: spec.retry.max_attempts,
            enabled: spec.retry.enabled,
        },
    };

    if request.concurrent_connections == 0 {
        request.concurrent_connections = DEFAULT_CONCURRENT_CONNECTIONS;
    }
    if request.timeout == 0 {
        request.timeout = DEFAULT_TIMEOUT;
    }
    if request.metadata_directive.is_empty() {
        request.metadata_directive = DEFAULT_METADATA_DIRECTIVE.to_string();
    }
    apply_retry_defaults(&mut request.retry);

    Ok(request)
}

pub(crate) fn apply_retry_defaults(retry: &mut Retry) {
    if retry.interval == 0 {
        retry.interval = DEFAULT_RETRY_INTERVAL;
    }
    if retry.strategy.is_empty() {
        retry.strategy = DEFAULT_RETRY_STRATEGY.to_string();
    }
    if retry.max_attempts == 0 {
        retry.max_attempts = DEFAULT_RETRY_MAX_ATTEMPTS;
    }
}

/// Request equivalent to the one that created `backup`
pub fn backup_request_from_operation(backup: &Backup) -> BackupRequest {
    BackupRequest {
        kind: "backup".to_string(),
        storage_location: backup.storage_location.clone(),
        data_dirs: backup.data_dirs.clone(),
        global_request: true,
        snapshot_tag: backup.snapshot_tag.clone(),
        k8s_namespace: backup.k8s_namespace.clone(),
        k8s_secret_name: backup.k8s_secret_name.clone(),
        duration: backup.duration.clone(),
        bandwidth: backup.bandwidth.clone(),
        concurrent_connections: backup.concurrent_connections,
        dc: backup.dc.clone(),
        entities: backup.entities.clone(),
        timeout: backup.timeout,
        metadata_directive: backup.metadata_directive.clone(),
        insecure: backup.insecure,
        create_missing_bucket: backup.create_missing_bucket,
        skip_refreshing: backup.skip_refreshing,
        skip_bucket_verification: backup.skip_bucket_verification,
        retry: backup.retry.clone(),
    }
}
