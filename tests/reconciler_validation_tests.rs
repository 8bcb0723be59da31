//! Integration tests for reconciler validation logic
//!
//! These tests verify that the validation functions for each CRD type
//! correctly accept valid specs and reject invalid ones.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use cassandra_backup_operator::crd::{
    CassandraBackup, CassandraBackupSpec, CassandraRestore, CassandraRestoreSpec,
};
use cassandra_backup_operator::reconcilers::{backup, restore};
use cassandra_backup_operator::Error;

// ============================================================================
// Test Helpers
// ============================================================================

fn default_metadata(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some("default".to_string()),
        ..Default::default()
    }
}

fn assert_validation_error(result: cassandra_backup_operator::Result<()>, needle: &str) {
    match result {
        Err(Error::Validation(msg)) => assert!(
            msg.contains(needle),
            "expected '{}' in validation error, got '{}'",
            needle,
            msg
        ),
        other => panic!("expected validation error, got {:?}", other),
    }
}

// ============================================================================
// Backup Validation Tests
// ============================================================================

fn valid_backup_spec() -> CassandraBackupSpec {
    CassandraBackupSpec {
        cassandra_cluster: "test-cluster".to_string(),
        storage_location: "s3://cassandra-backups".to_string(),
        secret_name: "storage-credentials".to_string(),
        ..Default::default()
    }
}

fn make_backup(spec: CassandraBackupSpec) -> CassandraBackup {
    CassandraBackup {
        metadata: default_metadata("nightly"),
        spec,
        status: None,
    }
}

#[test]
fn backup_valid_spec_passes_validation() {
    assert!(backup::validate(&make_backup(valid_backup_spec())).is_ok());
}

#[test]
fn backup_all_supported_protocols_pass_validation() {
    for location in [
        "s3://bucket",
        "gcp://bucket",
        "azure://container",
        "minio://bucket",
        "ceph://bucket",
        "oracle://bucket",
    ] {
        let spec = CassandraBackupSpec {
            storage_location: location.to_string(),
            ..valid_backup_spec()
        };
        assert!(
            backup::validate(&make_backup(spec)).is_ok(),
            "{} should be accepted",
            location
        );
    }
}

#[test]
fn backup_location_without_protocol_fails_validation() {
    let spec = CassandraBackupSpec {
        storage_location: "cassandra-backups".to_string(),
        ..valid_backup_spec()
    };
    assert_validation_error(
        backup::validate(&make_backup(spec)),
        "protocol://backup/location",
    );
}

#[test]
fn backup_unsupported_protocol_fails_validation() {
    let spec = CassandraBackupSpec {
        storage_location: "hdfs://cassandra-backups".to_string(),
        ..valid_backup_spec()
    };
    assert_validation_error(backup::validate(&make_backup(spec)), "protocol hdfs is not supported");
}

#[test]
fn backup_missing_cluster_fails_validation() {
    let spec = CassandraBackupSpec {
        cassandra_cluster: String::new(),
        ..valid_backup_spec()
    };
    assert_validation_error(backup::validate(&make_backup(spec)), "cassandraCluster");
}

#[test]
fn backup_valid_duration_passes_validation() {
    let spec = CassandraBackupSpec {
        duration: Some("7 days".to_string()),
        ..valid_backup_spec()
    };
    assert!(backup::validate(&make_backup(spec)).is_ok());
}

#[test]
fn backup_invalid_duration_fails_validation() {
    let spec = CassandraBackupSpec {
        duration: Some("7d".to_string()),
        ..valid_backup_spec()
    };
    assert_validation_error(backup::validate(&make_backup(spec)), "amount unit");
}

// ============================================================================
// Restore Validation Tests
// ============================================================================

fn make_restore(spec: CassandraRestoreSpec) -> CassandraRestore {
    CassandraRestore {
        metadata: default_metadata("restore-nightly"),
        spec,
        status: None,
    }
}

#[test]
fn restore_linked_to_backup_passes_validation() {
    let spec = CassandraRestoreSpec {
        cassandra_cluster: "test-cluster".to_string(),
        cassandra_backup: Some("nightly".to_string()),
        ..Default::default()
    };
    assert!(restore::validate(&make_restore(spec)).is_ok());
}

#[test]
fn restore_standalone_with_all_fields_passes_validation() {
    let spec = CassandraRestoreSpec {
        cassandra_cluster: "test-cluster".to_string(),
        storage_location: Some("gcp://cassandra-backups".to_string()),
        snapshot_tag: Some("weekly".to_string()),
        secret_name: Some("storage-credentials".to_string()),
        ..Default::default()
    };
    assert!(restore::validate(&make_restore(spec)).is_ok());
}

#[test]
fn restore_standalone_missing_tag_fails_validation() {
    let spec = CassandraRestoreSpec {
        cassandra_cluster: "test-cluster".to_string(),
        storage_location: Some("gcp://cassandra-backups".to_string()),
        secret_name: Some("storage-credentials".to_string()),
        ..Default::default()
    };
    assert_validation_error(
        restore::validate(&make_restore(spec)),
        "should be set if .spec.cassandraBackup is not set",
    );
}

#[test]
fn restore_empty_backup_reference_counts_as_unset() {
    let spec = CassandraRestoreSpec {
        cassandra_cluster: "test-cluster".to_string(),
        cassandra_backup: Some(String::new()),
        ..Default::default()
    };
    assert!(restore::validate(&make_restore(spec)).is_err());
}

#[test]
fn restore_invalid_location_fails_validation() {
    let spec = CassandraRestoreSpec {
        cassandra_cluster: "test-cluster".to_string(),
        cassandra_backup: Some("nightly".to_string()),
        storage_location: Some("ftp://elsewhere".to_string()),
        ..Default::default()
    };
    assert_validation_error(restore::validate(&make_restore(spec)), "protocol ftp");
}
