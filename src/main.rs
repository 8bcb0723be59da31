//! Cassandra Backup Kubernetes Operator
//!
//! Main entry point for the operator. Sets up the Kubernetes client and the
//! operation service client factory, registers the CRD controllers, and runs
//! the reconciliation loops.

use std::sync::Arc;

use kube::Client;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cassandra_backup_operator::{
    config::{LogFormat, OperatorConfig},
    controllers::{self, Context},
    metrics,
    operations::HttpOperationClientFactory,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OperatorConfig::from_env();
    init_tracing(config.log_format);

    info!(?config, "Starting Cassandra Backup Operator");

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let cancel = CancellationToken::new();
    let operations = HttpOperationClientFactory::new(config.operation_timeout, cancel.clone())?;

    let metrics_port = config.metrics_port;
    let context = Arc::new(Context::new(
        client.clone(),
        config,
        Arc::new(operations),
        cancel.clone(),
    ));

    let metrics_handle = tokio::spawn(metrics::serve(metrics_port));
    info!("Metrics server starting on port {}", metrics_port);

    let backup_controller = controllers::run_backup_controller(client.clone(), context.clone());
    let restore_controller = controllers::run_restore_controller(client.clone(), context.clone());

    tokio::select! {
        _ = backup_controller => {
            error!("Backup controller exited unexpectedly");
        }
        _ = restore_controller => {
            error!("Restore controller exited unexpectedly");
        }
        _ = metrics_handle => {
            error!("Metrics server exited unexpectedly");
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, stopping operator");
        }
    }

    cancel.cancel();
    info!("Cassandra Backup Operator stopped");
    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kube=warn,hyper=warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Plain => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
