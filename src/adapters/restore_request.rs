//! Restore request adapter

use kube::ResourceExt;

use crate::crd::{CassandraBackup, CassandraCluster, CassandraRestore};
use crate::error::{Error, Result};
use crate::operations::{Restore, RestoreImport, RestoreRequest, Retry};

use super::backup_request::{
    apply_retry_defaults, DATA_DIR, DEFAULT_CONCURRENT_CONNECTIONS, DEFAULT_TIMEOUT,
};
use super::storage_config::cluster_storage_path;

/// Where the nodes stage downloaded sstables before importing them
pub const DOWNLOAD_DIR: &str = "file:///var/lib/cassandra/downloadedsstables";

const RESTORATION_STRATEGY: &str = "HARDLINKS";
const RESTORATION_PHASE: &str = "INIT";
const IMPORT_TYPE: &str = "import";

/// Build the restore request for the current spec.
///
/// Storage location, snapshot tag and secret fall back to the linked backup when
/// the restore leaves them unset.
pub fn build_restore_request(
    cluster: &CassandraCluster,
    restore: &CassandraRestore,
    backup: Option<&CassandraBackup>,
) -> Result<RestoreRequest> {
    let spec = &restore.spec;

    let location = restore.storage_location(backup).ok_or_else(|| {
        Error::storage(format!(
            "CassandraRestore {} has no storage location and no CassandraBackup to take it from",
            restore.name_any()
        ))
    })?;
    let snapshot_tag = restore.snapshot_tag(backup).ok_or_else(|| {
        Error::validation(
            "No snapshotTag specified. It should be in the CassandraRestore spec (.spec.snapshotTag) \
             or a CassandraBackup should be specified (.spec.cassandraBackup)",
        )
    })?;

    let mut request = RestoreRequest {
        kind: "restore".to_string(),
        storage_location: cluster_storage_path(location, cluster)?,
        snapshot_tag,
        data_dirs: vec![DATA_DIR.to_string()],
        global_request: true,
        restoration_strategy_type: RESTORATION_STRATEGY.to_string(),
        restoration_phase: RESTORATION_PHASE.to_string(),
        import: RestoreImport {
            kind: IMPORT_TYPE.to_string(),
            source_dir: DOWNLOAD_DIR.to_string(),
            keep_level: spec.import.keep_level,
            no_verify: spec.import.no_verify,
            no_verify_tokens: spec.import.no_verify_tokens,
            no_invalidate_caches: spec.import.no_invalidate_caches,
            quick: spec.import.quick,
            extended_verify: spec.import.extended_verify,
            keep_repaired: spec.import.keep_repaired,
        },
        k8s_namespace: restore.namespace().unwrap_or_default(),
        k8s_secret_name: restore.secret_name(backup).unwrap_or_default().to_string(),
        concurrent_connections: spec.concurrent_connections,
        entities: spec.entities.clone(),
        no_delete_truncates: spec.no_delete_truncates,
        no_delete_downloads: spec.no_delete_downloads,
        no_download_data: spec.no_download_data,
        timeout: spec.timeout,
        resolve_host_id_from_topology: spec.resolve_host_id_from_topology,
        insecure: spec.insecure,
        skip_bucket_verification: spec.skip_bucket_verification,
        retry: Retry {
            interval: spec.retry.interval,
            strategy: spec.retry.strategy.clone(),
            max_attempts: spec.retry.max_attempts,
            enabled: spec.retry.enabled,
        },
        rename: spec.rename.clone().unwrap_or_default(),
        single_phase: false,
        dc: spec.dc.clone(),
        schema_version: spec.schema_version.clone(),
        exact_schema_version: spec.exact_schema_version,
    };

    if request.concurrent_connections == 0 {
        request.concurrent_connections = DEFAULT_CONCURRENT_CONNECTIONS;
    }
    if request.timeout == 0 {
        request.timeout = DEFAULT_TIMEOUT;
    }
    apply_retry_defaults(&mut request.retry);

    Ok(request)
}

/// Request equivalent to the one that created `restore`
pub fn restore_request_from_operation(restore: &Restore) -> RestoreRequest {
    RestoreRequest {
        kind: "restore".to_string(),
        storage_location: restore.storage_location.clone(),
        snapshot_tag: restore.snapshot_tag.clone(),
        data_dirs: restore.data_dirs.clone(),
        global_request: true,
        restoration_strategy_type: restore.restoration_strategy_type.clone(),
        restoration_phase: restore.restoration_phase.clone(),
        import: restore.import.clone(),
        k8s_namespace: restore.k8s_namespace.clone(),
        k8s_secret_name: restore.k8s_secret_name.clone(),
        concurrent_connections: restore.concurrent_connections,
        entities: restore.entities.clone(),
        no_delete_truncates: restore.no_delete_truncates,
        no_delete_downloads: restore.no_delete_downloads,
        no_download_data: restore.no_download_data,
        timeout: restore.timeout,
        resolve_host_id_from_topology: restore.resolve_host_id_from_topology,
        insecure: restore.insecure,
        skip_bucket_verification: restore.skip_bucket_verification,
        retry: restore.retry.clone(),
        rename: restore.rename.clone(),
        single_phase: restore.single_phase,
        dc: restore.dc.clone(),
        schema_version: restore.schema_version.clone(),
        exact_schema_version: restore.exact_schema_version,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::crd::{
        CassandraBackupSpec, CassandraClusterSpec, CassandraRestoreSpec, DcSpec, RestoreImportSpec,
    };
    use crate::operations::OperationState;
    use kube::api::ObjectMeta;

    fn cluster() -> CassandraCluster {
        CassandraCluster {
            metadata: ObjectMeta {
                name: Some("test-cluster".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: CassandraClusterSpec {
                dcs: vec![DcSpec {
                    name: "dc1".to_string(),
                }],
            },
            status: None,
        }
    }

    fn linked_backup() -> CassandraBackup {
        CassandraBackup {
            metadata: ObjectMeta {
                name: Some("nightly".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: CassandraBackupSpec {
                cassandra_cluster: "test-cluster".to_string(),
                storage_location: "s3://bucket/".to_string(),
                secret_name: "backup-creds".to_string(),
                ..Default::default()
            },
            status: None,
        }
    }

    fn restore(spec: CassandraRestoreSpec) -> CassandraRestore {
        CassandraRestore {
            metadata: ObjectMeta {
                name: Some("restore-nightly".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec,
            status: None,
        }
    }

    fn linked_spec() -> CassandraRestoreSpec {
        CassandraRestoreSpec {
            cassandra_cluster: "test-cluster".to_string(),
            cassandra_backup: Some("nightly".to_string()),
            ..Default::default()
        }
    }

    fn echoed(request: &RestoreRequest) -> Restore {
        Restore {
            id: "r-1".to_string(),
            creation_time: "2024-01-01T00:00:00Z".to_string(),
            state: OperationState::Failed,
            errors: vec![],
            progress: 0.0,
            start_time: String::new(),
            storage_location: request.storage_location.clone(),
            concurrent_connections: request.concurrent_connections,
            cassandra_config_directory: "/etc/cassandra".to_string(),
            restore_system_keyspace: false,
            snapshot_tag: request.snapshot_tag.clone(),
            entities: request.entities.clone(),
            restoration_strategy_type: request.restoration_strategy_type.clone(),
            restoration_phase: request.restoration_phase.clone(),
            import: request.import.clone(),
            no_delete_truncates: request.no_delete_truncates,
            no_delete_downloads: request.no_delete_downloads,
            no_download_data: request.no_download_data,
            exact_schema_version: request.exact_schema_version,
            schema_version: request.schema_version.clone(),
            global_request: true,
            timeout: request.timeout,
            resolve_host_id_from_topology: request.resolve_host_id_from_topology,
            insecure: request.insecure,
            skip_bucket_verification: request.skip_bucket_verification,
            retry: request.retry.clone(),
            single_phase: request.single_phase,
            data_dirs: request.data_dirs.clone(),
            dc: request.dc.clone(),
            k8s_namespace: request.k8s_namespace.clone(),
            k8s_secret_name: request.k8s_secret_name.clone(),
            rename: request.rename.clone(),
        }
    }

    #[test]
    fn fields_come_from_linked_backup() {
        let backup = linked_backup();
        let request =
            build_restore_request(&cluster(), &restore(linked_spec()), Some(&backup)).unwrap();

        assert_eq!(request.kind, "restore");
        assert_eq!(request.storage_location, "s3://bucket/test-cluster/dc1/1");
        assert_eq!(request.snapshot_tag, "nightly");
        assert_eq!(request.k8s_secret_name, "backup-creds");
        assert_eq!(request.k8s_namespace, "default");
        assert_eq!(request.restoration_strategy_type, "HARDLINKS");
        assert_eq!(request.restoration_phase, "INIT");
        assert_eq!(request.import.kind, "import");
        assert_eq!(request.import.source_dir, DOWNLOAD_DIR);
        assert_eq!(request.concurrent_connections, 10);
        assert_eq!(request.timeout, 5);
        assert_eq!(request.retry.strategy, "LINEAR");
        assert!(request.rename.is_empty());
        assert!(!request.single_phase);
    }

    #[test]
    fn standalone_restore_uses_its_own_fields() {
        let spec = CassandraRestoreSpec {
            cassandra_cluster: "test-cluster".to_string(),
            storage_location: Some("gcp://other".to_string()),
            snapshot_tag: Some("weekly".to_string()),
            secret_name: Some("restore-creds".to_string()),
            import: RestoreImportSpec {
                quick: true,
                ..Default::default()
            },
            rename: Some(BTreeMap::from([(
                "ks.old".to_string(),
                "ks.new".to_string(),
            )])),
            ..Default::default()
        };
        let request = build_restore_request(&cluster(), &restore(spec), None).unwrap();

        assert_eq!(request.storage_location, "gcp://other/test-cluster/dc1/1");
        assert_eq!(request.snapshot_tag, "weekly");
        assert_eq!(request.k8s_secret_name, "restore-creds");
        assert!(request.import.quick);
        assert_eq!(request.rename.get("ks.old").map(String::as_str), Some("ks.new"));
    }

    #[test]
    fn missing_tag_is_a_validation_error() {
        let spec = CassandraRestoreSpec {
            storage_location: Some("s3://bucket".to_string()),
            ..Default::default()
        };
        let err = build_restore_request(&cluster(), &restore(spec), None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn reconstruction_is_reflexive() {
        let backup = linked_backup();
        let request =
            build_restore_request(&cluster(), &restore(linked_spec()), Some(&backup)).unwrap();

        let rebuilt = restore_request_from_operation(&echoed(&request));
        assert!(rebuilt.config_differences(&request).is_empty());
    }

    #[test]
    fn import_option_change_is_detected() {
        let backup = linked_backup();
        let request =
            build_restore_request(&cluster(), &restore(linked_spec()), Some(&backup)).unwrap();
        let operation = echoed(&request);

        let changed = CassandraRestoreSpec {
            import: RestoreImportSpec {
                no_verify: true,
                ..Default::default()
            },
            ..linked_spec()
        };
        let new_request =
            build_restore_request(&cluster(), &restore(changed), Some(&backup)).unwrap();
        assert_eq!(
            restore_request_from_operation(&operation).config_differences(&new_request),
            vec!["import"]
        );
    }
}
