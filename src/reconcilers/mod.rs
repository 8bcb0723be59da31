//! Reconcilers for the Cassandra backup CRDs
//!
//! This module contains the business logic for reconciling each CRD type.
//! Reconcilers are responsible for:
//! - Validating CRD specs
//! - Finding the remote operation an intent refers to
//! - Submitting operations and resubmitting failed ones after a spec change
//! - Updating resource status

pub mod backup;
pub mod drift;
pub mod matcher;
pub mod restore;
pub mod status;

/// What the controller should do after a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Check again after the retry delay
    Requeue,
    /// Nothing left to do until the resource changes
    Done,
}
