//! CassandraRestore controller
//!
//! Watches CassandraRestore resources and triggers reconciliation.

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
use tracing::{debug, error, info, instrument, warn};

use crate::controllers::{
    check_credentials, coordinator_url, events, get_backup, get_cluster, settle, Context,
    KubeStatusStore, VALIDATION_REQUEUE,
};
use crate::crd::CassandraRestore;
use crate::error::{Error, Result};
use crate::metrics;
use crate::operations::OperationState;
use crate::reconcilers::restore as restore_reconciler;

const KIND: &str = "CassandraRestore";

/// Run the CassandraRestore controller
pub async fn run(client: Client, context: Arc<Context>) {
    let api: Api<CassandraRestore> = Api::all(client.clone());

    // Verify CRD is installed
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("CassandraRestore CRD not installed: {}", e);
        return;
    }

    info!("Starting CassandraRestore controller");

    Controller::new(api, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    info!(
                        name = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or("default"),
                        "Reconciled CassandraRestore"
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
async fn reconcile(obj: Arc<CassandraRestore>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = metrics::RECONCILE_DURATION
        .with_label_values(&[KIND])
        .start_timer();
    metrics::RECONCILIATIONS.with_label_values(&[KIND]).inc();

    let result = apply(&obj, &ctx).await;
    settle(&ctx, obj.as_ref(), result).await
}

async fn apply(restore: &CassandraRestore, ctx: &Context) -> Result<Action> {
    let name = restore.name_any();
    let namespace = restore.namespace().unwrap_or_else(|| "default".to_string());

    if restore.current_status().state == Some(OperationState::Completed) {
        debug!(name = %name, "Restore completed, nothing to do");
        metrics::forget_progress(KIND, &namespace, &name);
        return Ok(Action::await_change());
    }

    info!(name = %name, namespace = %namespace, "Reconciling CassandraRestore");

    if let Err(e) = restore_reconciler::validate(restore) {
        warn!(error = %e, "Validation failed");
        events::publish_warning(&ctx.client, restore, events::VALIDATION_FAILED, e.to_string())
            .await;
        return Ok(Action::requeue(VALIDATION_REQUEUE));
    }

    let cluster = get_cluster(&ctx.client, &namespace, &restore.spec.cassandra_cluster).await?;
    if !cluster.is_ready() {
        warn!(
            cluster = %cluster.name_any(),
            retry_in = ?ctx.config.retry_delay,
            "CassandraCluster is not ready. Not starting restore"
        );
        return Ok(Action::requeue(ctx.config.retry_delay));
    }

    let backup = match restore.backup_ref() {
        Some(backup_name) => Some(get_backup(&ctx.client, &namespace, backup_name).await?),
        None => None,
    };

    let secret_name = restore
        .secret_name(backup.as_ref())
        .ok_or_else(|| Error::validation("no storage credentials secret to restore with"))?;
    let provider = restore
        .storage_provider(backup.as_ref())
        .ok_or_else(|| Error::validation("unsupported storage location"))?;
    check_credentials(&ctx.client, &namespace, secret_name, provider).await?;

    let operations = ctx
        .operations
        .for_coordinator(&coordinator_url(&cluster, ctx.config.operation_service_port)?);
    let store = KubeStatusStore::new(Api::namespaced(ctx.client.clone(), &namespace), restore);

    let outcome = restore_reconciler::reconcile(
        operations.as_ref(),
        &store,
        &cluster,
        restore,
        backup.as_ref(),
    )
    .await?;
    Ok(ctx.action(outcome))
}

/// Error policy for the controller
fn error_policy(obj: Arc<CassandraRestore>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = obj.name_any();
    error!(
        name = %name,
        error = %error,
        "Reconciliation failed, scheduling retry"
    );

    Action::requeue(ctx.backoff(error))
}
