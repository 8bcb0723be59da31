//! Failed-operation handling shared by backups and restores
//!
//! A failed operation is only retried when the spec changed since it was
//! submitted. Resubmitting an unchanged request would fail the same way forever.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::controllers::StatusStore;
use crate::crd::OperationStatus;
use crate::error::Result;
use crate::metrics;
use crate::operations::RemoteOperation;

use super::status::project;

/// What the operation service offers for one kind of operation
#[async_trait]
pub trait OperationKind: Send + Sync {
    type Request: Send + Sync;
    type Operation: RemoteOperation + Send + Sync;

    /// `backup` or `restore`
    fn name(&self) -> &'static str;

    /// Request the current spec asks for
    fn desired_request(&self) -> Result<Self::Request>;

    /// Request `operation` was created from
    fn reconstruct(&self, operation: &Self::Operation) -> Self::Request;

    /// Configuration fields that differ, snapshot tag excluded
    fn differences(&self, observed: &Self::Request, desired: &Self::Request) -> Vec<&'static str>;

    async fn list(&self) -> Result<Vec<Self::Operation>>;

    /// Submit `request`; `None` when the service does not echo the new operation
    async fn submit(&self, request: &Self::Request) -> Result<Option<Self::Operation>>;
}

/// How a failed operation was dealt with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureResolution {
    /// The spec changed and a new operation was submitted
    Resubmitted,
    /// Nothing changed; the failure is left for the user to fix
    Unchanged,
}

/// Submit `kind` and record the outcome in the submissions metric
pub async fn submit<K: OperationKind>(
    kind: &K,
    request: &K::Request,
) -> Result<Option<K::Operation>> {
    let result = kind.submit(request).await;
    metrics::record_submission(kind.name(), result.is_ok());
    result
}

/// Resubmit a failed operation when the spec drifted from the request it was built from.
///
/// On resubmission the status is reset to empty, then projected from the new
/// operation when the service returned one.
pub async fn resolve_failure<K: OperationKind>(
    kind: &K,
    failed: &K::Operation,
    current: &OperationStatus,
    store: &dyn StatusStore,
) -> Result<FailureResolution> {
    let desired = kind.desired_request()?;
    let observed = kind.reconstruct(failed);
    let differences = kind.differences(&observed, &desired);

    if differences.is_empty() {
        info!(
            operation_id = %failed.id(),
            "{} has failed. Assuming configuration error. Apply a fixed spec to trigger a new attempt",
            kind.name()
        );
        return Ok(FailureResolution::Unchanged);
    }

    info!(
        operation_id = %failed.id(),
        changed = ?differences,
        "Detected a configuration change, sending a new {} request",
        kind.name()
    );
    let submitted = submit(kind, &desired).await?;

    // the old lineage's status is discarded before tracking the new operation
    let reset = OperationStatus::default();
    let next = match &submitted {
        Some(operation) => {
            debug!(operation_id = %operation.id(), "Tracking resubmitted operation");
            project(&reset, operation).0
        }
        None => reset,
    };
    if next != *current {
        store.write(&next).await?;
    }

    Ok(FailureResolution::Resubmitted)
}
