//! Error types for the Cassandra Backup Operator

use thiserror::Error;

/// Result type alias using the operator's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Operator error types
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Status write lost an optimistic concurrency race
    #[error("Conflict writing status of {0}")]
    Conflict(String),

    /// Operation service answered with an unexpected status code
    #[error("{kind} request failed: code: {status}, body: {body}")]
    UnexpectedStatus {
        kind: &'static str,
        status: u16,
        body: String,
    },

    /// Transport failure talking to the operation service
    #[error("Operation service transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The call was aborted by the reconciliation context
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage location error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Secret not found
    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    /// Secret present but unusable for the storage provider
    #[error("Storage credentials secret {secret} is invalid: {reason}")]
    InvalidSecret { secret: String, reason: String },

    /// Linked cluster not found
    #[error("CassandraCluster not found: {0}")]
    ClusterNotFound(String),

    /// Linked backup not found
    #[error("CassandraBackup not found: {0}")]
    BackupNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Whether re-triggering after the retry delay is the whole remedy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Cancelled
                | Error::Conflict(_)
                | Error::SecretNotFound(_)
                | Error::InvalidSecret { .. }
                | Error::ClusterNotFound(_)
                | Error::BackupNotFound(_)
        )
    }
}
