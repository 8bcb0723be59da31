//! Projection of a remote operation onto the local status

use tracing::{debug, info};

use crate::controllers::StatusStore;
use crate::crd::{OperationStatus, StatusError};
use crate::error::Result;
use crate::operations::{OperationState, RemoteOperation};

/// Status `current` should have given the observed `operation`, and whether it changed.
///
/// Progress is always recomputed. State and errors move together, only on a state
/// change, and errors are copied only when the operation failed; other transitions
/// leave the existing errors in place.
pub fn project<O: RemoteOperation + ?Sized>(
    current: &OperationStatus,
    operation: &O,
) -> (OperationStatus, bool) {
    let mut next = current.clone();
    next.progress = (operation.progress() * 100.0).floor() as i32;

    if current.state != Some(operation.state()) {
        next.state = Some(operation.state());
        if operation.state() == OperationState::Failed {
            next.errors = operation
                .errors()
                .iter()
                .map(|e| StatusError {
                    source: e.source.clone(),
                    message: e.message.clone(),
                })
                .collect();
        }
    }

    let changed = next != *current;
    (next, changed)
}

/// Project `operation` and write the result when it differs from `current`
pub async fn write_projection<O: RemoteOperation + Sync + ?Sized>(
    store: &dyn StatusStore,
    current: &OperationStatus,
    operation: &O,
) -> Result<OperationStatus> {
    let (next, changed) = project(current, operation);
    if changed {
        info!(
            operation_id = %operation.id(),
            state = ?next.state,
            progress = next.progress,
            "Updating status"
        );
        debug!(old = ?current, new = ?next, "Status diff");
        store.write(&next).await?;
    }
    Ok(next)
}
