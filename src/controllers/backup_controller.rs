//! CassandraBackup controller
//!
//! Watches CassandraBackup resources and triggers reconciliation.

use std::sync::Arc;

use futures::StreamExt;
use kube::{
    api::ListParams,
    runtime::{
        controller::{Action, Controller},
        watcher::Config as WatcherConfig,
    },
    Api, Client, ResourceExt,
};
use tracing::{error, info, instrument, warn};

use crate::controllers::{
    check_credentials, coordinator_url, events, get_cluster, settle, Context, KubeStatusStore,
    VALIDATION_REQUEUE,
};
use crate::crd::CassandraBackup;
use crate::error::{Error, Result};
use crate::metrics;
use crate::reconcilers::backup as backup_reconciler;

const KIND: &str = "CassandraBackup";

/// Run the CassandraBackup controller
pub async fn run(client: Client, context: Arc<Context>) {
    let api: Api<CassandraBackup> = Api::all(client.clone());

    // Verify CRD is installed
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("CassandraBackup CRD not installed: {}", e);
        return;
    }

    info!("Starting CassandraBackup controller");

    Controller::new(api, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    info!(
                        name = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or("default"),
                        "Reconciled CassandraBackup"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Reconciliation error");
                    metrics::RECONCILIATION_ERRORS.with_label_values(&[KIND]).inc();
                }
            }
        })
        .await;
}

/// Main reconciliation function
#[instrument(skip(ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<CassandraBackup>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = metrics::RECONCILE_DURATION
        .with_label_values(&[KIND])
        .start_timer();
    metrics::RECONCILIATIONS.with_label_values(&[KIND]).inc();

    let result = apply(&obj, &ctx).await;
    settle(&ctx, obj.as_ref(), result).await
}

async fn apply(backup: &CassandraBackup, ctx: &Context) -> Result<Action> {
    let name = backup.name_any();
    let namespace = backup.namespace().unwrap_or_else(|| "default".to_string());

    info!(
        name = %name,
        namespace = %namespace,
        snapshot_tag = %backup.snapshot_tag(),
        "Reconciling CassandraBackup"
    );

    if let Err(e) = backup_reconciler::validate(backup) {
        warn!(error = %e, "Validation failed");
        events::publish_warning(&ctx.client, backup, events::VALIDATION_FAILED, e.to_string())
            .await;
        return Ok(Action::requeue(VALIDATION_REQUEUE));
    }

    let cluster = get_cluster(&ctx.client, &namespace, &backup.spec.cassandra_cluster).await?;
    if !cluster.is_ready() {
        warn!(
            cluster = %cluster.name_any(),
            retry_in = ?ctx.config.retry_delay,
            "CassandraCluster is not ready. Not starting backup"
        );
        return Ok(Action::requeue(ctx.config.retry_delay));
    }

    let provider = backup
        .storage_provider()
        .ok_or_else(|| Error::validation("unsupported storage location"))?;
    check_credentials(&ctx.client, &namespace, &backup.spec.secret_name, provider).await?;

    let operations = ctx
        .operations
        .for_coordinator(&coordinator_url(&cluster, ctx.config.operation_service_port)?);
    let store = KubeStatusStore::new(Api::namespaced(ctx.client.clone(), &namespace), backup);

    let outcome =
        backup_reconciler::reconcile(operations.as_ref(), &store, &cluster, backup).await?;
    Ok(ctx.action(outcome))
}

/// Error policy for the controller
fn error_policy(obj: Arc<CassandraBackup>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = obj.name_any();
    error!(
        name = %name,
        error = %error,
        "Reconciliation failed, scheduling retry"
    );

    Action::requeue(ctx.backoff(error))
}
