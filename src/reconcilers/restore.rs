//! CassandraRestore reconciler
//!
//! A restore is submitted once per tag. Unlike backups it is finished for good
//! once it completes.

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::info;

use crate::adapters::{build_restore_request, restore_request_from_operation, validate_storage_location};
use crate::controllers::StatusStore;
use crate::crd::{CassandraBackup, CassandraCluster, CassandraRestore};
use crate::error::{Error, Result};
use crate::operations::{OperationClient, OperationState, Restore, RestoreRequest};

use super::drift::{self, FailureResolution, OperationKind};
use super::matcher::find_related_restore;
use super::status::write_projection;
use super::Outcome;

/// Validate the CassandraRestore spec
pub fn validate(restore: &CassandraRestore) -> Result<()> {
    let spec = &restore.spec;

    if spec.cassandra_cluster.is_empty() {
        return Err(Error::validation(".spec.cassandraCluster must be set"));
    }

    if restore.backup_ref().is_none() {
        let unset = |field: &Option<String>| field.as_deref().map_or(true, str::is_empty);
        if unset(&spec.storage_location) || unset(&spec.snapshot_tag) || unset(&spec.secret_name) {
            return Err(Error::validation(
                ".spec.storageLocation, .spec.snapshotTag and .spec.secretName should be set if .spec.cassandraBackup is not set",
            ));
        }
    }

    if let Some(location) = spec.storage_location.as_deref().filter(|l| !l.is_empty()) {
        validate_storage_location(location)?;
    }

    Ok(())
}

/// Restores of one CassandraRestore on one cluster
pub struct RestoreFlow<'a> {
    client: &'a dyn OperationClient,
    cluster: &'a CassandraCluster,
    restore: &'a CassandraRestore,
    backup: Option<&'a CassandraBackup>,
}

impl<'a> RestoreFlow<'a> {
    pub fn new(
        client: &'a dyn OperationClient,
        cluster: &'a CassandraCluster,
        restore: &'a CassandraRestore,
        backup: Option<&'a CassandraBackup>,
    ) -> Self {
        Self {
            client,
            cluster,
            restore,
            backup,
        }
    }
}

#[async_trait]
impl<'a> OperationKind for RestoreFlow<'a> {
    type Request = RestoreRequest;
    type Operation = Restore;

    fn name(&self) -> &'static str {
        "restore"
    }

    fn desired_request(&self) -> Result<RestoreRequest> {
        build_restore_request(self.cluster, self.restore, self.backup)
    }

    fn reconstruct(&self, operation: &Restore) -> RestoreRequest {
        restore_request_from_operation(operation)
    }

    fn differences(&self, observed: &RestoreRequest, desired: &RestoreRequest) -> Vec<&'static str> {
        observed.config_differences(desired)
    }

    async fn list(&self) -> Result<Vec<Restore>> {
        self.client.list_restores().await
    }

    async fn submit(&self, request: &RestoreRequest) -> Result<Option<Restore>> {
        self.client.submit_restore(request).await.map(|()| None)
    }
}

/// Drive one CassandraRestore towards its remote operation.
///
/// `backup` is the linked CassandraBackup, already fetched by the caller.
pub async fn reconcile(
    client: &dyn OperationClient,
    store: &dyn StatusStore,
    cluster: &CassandraCluster,
    restore: &CassandraRestore,
    backup: Option<&CassandraBackup>,
) -> Result<Outcome> {
    let status = restore.current_status();
    if status.state == Some(OperationState::Completed) {
        return Ok(Outcome::Done);
    }

    let tag = restore.snapshot_tag(backup).ok_or_else(|| {
        Error::validation(
            "No snapshotTag specified. It should be in the CassandraRestore spec (.spec.snapshotTag) \
             or a CassandraBackup should be specified (.spec.cassandraBackup)",
        )
    })?;

    let flow = RestoreFlow::new(client, cluster, restore, backup);
    let operations = flow.list().await?;
    let related = find_related_restore(&operations, &tag);

    if status.state == Some(OperationState::Failed) {
        let Some(failed) = related else {
            info!(
                name = %restore.name_any(),
                snapshot_tag = %tag,
                "Restore has failed and no matching record was found in the operation service. \
                 Recreate the CassandraRestore resource to start a new restore attempt"
            );
            return Ok(Outcome::Done);
        };

        return Ok(match drift::resolve_failure(&flow, failed, &status, store).await? {
            FailureResolution::Resubmitted => Outcome::Requeue,
            FailureResolution::Unchanged => Outcome::Done,
        });
    }

    match related {
        Some(operation) => {
            write_projection(store, &status, operation).await?;
        }
        None => {
            let request = flow.desired_request()?;
            drift::submit(&flow, &request).await?;
            info!(name = %restore.name_any(), snapshot_tag = %tag, "Restore request sent");
        }
    }

    Ok(Outcome::Requeue)
}
