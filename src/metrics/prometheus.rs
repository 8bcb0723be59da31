//! Prometheus metrics definitions and HTTP server

use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec, CounterVec,
    Encoder, Gauge, GaugeVec, HistogramVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::operations::OperationState;

lazy_static::lazy_static! {
    /// Total number of reconciliations
    pub static ref RECONCILIATIONS: CounterVec = register_counter_vec!(
        "cassandra_backup_operator_reconciliations_total",
        "Total number of reconciliations",
        &["kind"]
    ).expect("reconciliations metric registers");

    /// Total number of reconciliation errors
    pub static ref RECONCILIATION_ERRORS: CounterVec = register_counter_vec!(
        "cassandra_backup_operator_reconciliation_errors_total",
        "Total number of reconciliation errors",
        &["kind"]
    ).expect("reconciliation errors metric registers");

    /// Reconciliation duration histogram
    pub static ref RECONCILE_DURATION: HistogramVec = register_histogram_vec!(
        "cassandra_backup_operator_reconcile_duration_seconds",
        "Duration of reconciliations in seconds",
        &["kind"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).expect("reconcile duration metric registers");

    /// Requests sent to the operation service
    pub static ref OPERATION_SUBMISSIONS: CounterVec = register_counter_vec!(
        "cassandra_backup_operator_operation_submissions_total",
        "Backup and restore requests sent to the operation service by outcome",
        &["kind", "outcome"]
    ).expect("operation submissions metric registers");

    /// Status subresource writes
    pub static ref STATUS_UPDATES: CounterVec = register_counter_vec!(
        "cassandra_backup_operator_status_updates_total",
        "Status updates written to backup and restore resources",
        &["kind"]
    ).expect("status updates metric registers");

    /// Status writes rejected because the resource changed underneath
    pub static ref STATUS_CONFLICTS: CounterVec = register_counter_vec!(
        "cassandra_backup_operator_status_conflicts_total",
        "Status writes that lost an optimistic concurrency race",
        &["kind"]
    ).expect("status conflicts metric registers");

    /// Last projected progress per resource
    pub static ref OPERATION_PROGRESS: GaugeVec = register_gauge_vec!(
        "cassandra_backup_operator_operation_progress_percent",
        "Progress of the tracked operation in percent",
        &["kind", "namespace", "name"]
    ).expect("operation progress metric registers");

    /// Operator health (1 = healthy, 0 = unhealthy)
    pub static ref OPERATOR_HEALTH: Gauge = register_gauge!(
        "cassandra_backup_operator_health",
        "Operator health status (1 = healthy, 0 = unhealthy)"
    ).expect("health metric registers");
}

/// Count one request sent to the operation service
pub fn record_submission(kind: &str, accepted: bool) {
    let outcome = if accepted { "accepted" } else { "failed" };
    OPERATION_SUBMISSIONS
        .with_label_values(&[kind, outcome])
        .inc();
}

/// Track the progress of one resource; finished operations drop their series
pub fn record_progress(
    kind: &str,
    namespace: &str,
    name: &str,
    state: Option<OperationState>,
    progress: i32,
) {
    match state {
        Some(OperationState::Completed | OperationState::Cancelled) => {
            forget_progress(kind, namespace, name)
        }
        _ => OPERATION_PROGRESS
            .with_label_values(&[kind, namespace, name])
            .set(f64::from(progress)),
    }
}

/// Drop the progress series of one resource
pub fn forget_progress(kind: &str, namespace: &str, name: &str) {
    // absent series are not an error
    let _ = OPERATION_PROGRESS.remove_label_values(&[kind, namespace, name]);
}

/// Start the metrics HTTP server
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    OPERATOR_HEALTH.set(1.0);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(handle_request))
                .await
            {
                error!("Error serving connection: {}", e);
            }
        });
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let response = match req.uri().path() {
        "/metrics" => metrics_response(),
        "/healthz" | "/readyz" => text_response(StatusCode::OK, "ok"),
        _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
    };

    Ok(response)
}

fn metrics_response() -> Response<Full<Bytes>> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return text_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics");
    }

    let mut response = Response::new(Full::new(Bytes::from(buffer)));
    if let Ok(content_type) = HeaderValue::from_str(encoder.format_type()) {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}
