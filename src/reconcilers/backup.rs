//! CassandraBackup reconciler
//!
//! Handles the business logic for backups:
//! - Spec validation
//! - Matching the backup against the operations known to the operation service
//! - Submitting new backups and resubmitting failed ones whose spec changed
//! - Status projection

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

use crate::adapters::{backup_request_from_operation, build_backup_request, validate_storage_location};
use crate::controllers::StatusStore;
use crate::crd::{CassandraBackup, CassandraCluster};
use crate::error::{Error, Result};
use crate::operations::{Backup, BackupRequest, OperationClient, OperationState};

use super::drift::{self, FailureResolution, OperationKind};
use super::matcher::find_related_backup;
use super::status::write_projection;
use super::Outcome;

const DURATION_UNITS: [&str; 7] = [
    "days",
    "hours",
    "microseconds",
    "milliseconds",
    "minutes",
    "nanoseconds",
    "seconds",
];

/// Validate the CassandraBackup spec
pub fn validate(backup: &CassandraBackup) -> Result<()> {
    if backup.spec.cassandra_cluster.is_empty() {
        return Err(Error::validation(".spec.cassandraCluster must be set"));
    }

    validate_storage_location(&backup.spec.storage_location)?;

    if let Some(duration) = backup.spec.duration.as_deref() {
        validate_duration(duration)?;
    }

    Ok(())
}

/// `"<integer> <unit>"`, e.g. `"12 hours"`; empty means no expiry
pub fn validate_duration(duration: &str) -> Result<()> {
    if duration.is_empty() {
        return Ok(());
    }

    let invalid = || {
        Error::validation(format!(
            "duration should be in format \"amount unit\", where amount is an integer value and unit is one of the following values: {:?}",
            DURATION_UNITS
        ))
    };

    let parts: Vec<&str> = duration.split(' ').collect();
    let [amount, unit] = parts.as_slice() else {
        return Err(invalid());
    };
    amount.parse::<i64>().map_err(|_| invalid())?;
    if !DURATION_UNITS.contains(&unit.trim().to_lowercase().as_str()) {
        return Err(invalid());
    }

    Ok(())
}

/// Backups of one CassandraBackup on one cluster
pub struct BackupFlow<'a> {
    client: &'a dyn OperationClient,
    cluster: &'a CassandraCluster,
    backup: &'a CassandraBackup,
}

impl<'a> BackupFlow<'a> {
    pub fn new(
        client: &'a dyn OperationClient,
        cluster: &'a CassandraCluster,
        backup: &'a CassandraBackup,
    ) -> Self {
        Self {
            client,
            cluster,
            backup,
        }
    }
}

#[async_trait]
impl<'a> OperationKind for BackupFlow<'a> {
    type Request = BackupRequest;
    type Operation = Backup;

    fn name(&self) -> &'static str {
        "backup"
    }

    fn desired_request(&self) -> Result<BackupRequest> {
        build_backup_request(self.cluster, self.backup)
    }

    fn reconstruct(&self, operation: &Backup) -> BackupRequest {
        backup_request_from_operation(operation)
    }

    fn differences(&self, observed: &BackupRequest, desired: &BackupRequest) -> Vec<&'static str> {
        observed.config_differences(desired)
    }

    async fn list(&self) -> Result<Vec<Backup>> {
        self.client.list_backups().await
    }

    async fn submit(&self, request: &BackupRequest) -> Result<Option<Backup>> {
        self.client.submit_backup(request).await.map(Some)
    }
}

/// Drive one CassandraBackup towards its remote operation.
///
/// A backup whose status is unset is (re)submitted even when an operation with
/// its tag exists, which is how incremental backups reuse a tag.
pub async fn reconcile(
    client: &dyn OperationClient,
    store: &dyn StatusStore,
    cluster: &CassandraCluster,
    backup: &CassandraBackup,
) -> Result<Outcome> {
    let flow = BackupFlow::new(client, cluster, backup);
    let tag = backup.snapshot_tag();
    let status = backup.current_status();

    let operations = flow.list().await?;
    let related = find_related_backup(&operations, &tag);

    if status.state == Some(OperationState::Failed) {
        let Some(failed) = related else {
            info!(
                name = %backup.name_any(),
                snapshot_tag = %tag,
                "Backup has failed and no matching record was found in the operation service. \
                 Recreate the CassandraBackup resource to start a new backup attempt"
            );
            return Ok(Outcome::Done);
        };

        return Ok(match drift::resolve_failure(&flow, failed, &status, store).await? {
            FailureResolution::Resubmitted => Outcome::Requeue,
            FailureResolution::Unchanged => Outcome::Done,
        });
    }

    let operation = match related {
        Some(existing) if status.state.is_some() => existing.clone(),
        _ => {
            let request = flow.desired_request()?;
            let Some(created) = drift::submit(&flow, &request).await? else {
                return Ok(Outcome::Requeue);
            };
            debug!(operation_id = %created.id, snapshot_tag = %tag, "Backup request sent");
            created
        }
    };

    write_projection(store, &status, &operation).await?;

    Ok(Outcome::Requeue)
}
