//! Kubernetes events attached to backup and restore resources

use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};
use tracing::warn;

use crate::error::Error;

const REPORTER: &str = "cassandra-backup-operator";

pub const CLUSTER_NOT_FOUND: &str = "CassandraClusterNotFound";
pub const BACKUP_NOT_FOUND: &str = "CassandraBackupNotFound";
pub const SECRET_NOT_FOUND: &str = "StorageCredentialsSecretNotFound";
pub const SECRET_INVALID: &str = "StorageCredentialsSecretInvalid";
pub const VALIDATION_FAILED: &str = "ValidationFailed";

/// Event reason for errors the user should see on the resource
pub fn reason_for(error: &Error) -> Option<&'static str> {
    match error {
        Error::ClusterNotFound(_) => Some(CLUSTER_NOT_FOUND),
        Error::BackupNotFound(_) => Some(BACKUP_NOT_FOUND),
        Error::SecretNotFound(_) => Some(SECRET_NOT_FOUND),
        Error::InvalidSecret { .. } => Some(SECRET_INVALID),
        Error::Validation(_) => Some(VALIDATION_FAILED),
        _ => None,
    }
}

/// Publish a warning event on `obj`. Failures are logged, never returned.
pub async fn publish_warning<K>(client: &Client, obj: &K, reason: &str, note: String)
where
    K: Resource<DynamicType = ()>,
{
    let reporter = Reporter {
        controller: REPORTER.to_string(),
        instance: None,
    };
    let recorder = Recorder::new(client.clone(), reporter, obj.object_ref(&()));

    let event = Event {
        type_: EventType::Warning,
        reason: reason.to_string(),
        note: Some(note),
        action: "Reconciling".to_string(),
        secondary: None,
    };

    if let Err(e) = recorder.publish(event).await {
        warn!(name = %obj.name_any(), reason, error = %e, "Failed to publish event");
    }
}
