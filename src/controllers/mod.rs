//! Kubernetes controllers for the Cassandra backup CRDs
//!
//! This module contains the controller implementations that watch for CRD changes
//! and trigger reconciliation.

mod backup_controller;
pub mod events;
mod restore_controller;
mod status_store;

pub use backup_controller::run as run_backup_controller;
pub use restore_controller::run as run_restore_controller;
pub use status_store::*;

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::{Api, Client, Resource, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::{get_secret, validate_storage_secret};
use crate::config::OperatorConfig;
use crate::crd::{CassandraBackup, CassandraCluster, StorageProvider};
use crate::error::{Error, Result};
use crate::operations::OperationClientFactory;
use crate::reconcilers::Outcome;

/// Requeue delay for specs that need a user edit
pub(crate) const VALIDATION_REQUEUE: Duration = Duration::from_secs(300);

/// Requeue delay for unexpected failures
pub(crate) const ERROR_REQUEUE: Duration = Duration::from_secs(30);

/// Shared context for all controllers
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    pub config: OperatorConfig,
    /// Hands out operation service clients per coordinator
    pub operations: Arc<dyn OperationClientFactory>,
    /// Cancelled on shutdown; aborts in-flight operation service calls
    pub cancel: CancellationToken,
}

impl Context {
    /// Create a new context
    pub fn new(
        client: Client,
        config: OperatorConfig,
        operations: Arc<dyn OperationClientFactory>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            config,
            operations,
            cancel,
        }
    }

    pub(crate) fn action(&self, outcome: Outcome) -> Action {
        match outcome {
            Outcome::Requeue => Action::requeue(self.config.retry_delay),
            Outcome::Done => Action::await_change(),
        }
    }

    /// Requeue delay after a failed pass
    pub(crate) fn backoff(&self, error: &Error) -> Duration {
        match error {
            e if e.is_transient() => self.config.retry_delay,
            Error::Config(_) | Error::Validation(_) => VALIDATION_REQUEUE,
            _ => ERROR_REQUEUE,
        }
    }
}

/// Address of the operation service on the first pod of the first DC
pub fn coordinator_url(cluster: &CassandraCluster, port: u16) -> Result<String> {
    let dc = cluster.first_dc().ok_or_else(|| {
        Error::storage(format!("CassandraCluster {} has no DCs defined", cluster.name_any()))
    })?;
    let svc = format!("{}-cassandra-{}", cluster.name_any(), dc);
    let namespace = cluster.namespace().unwrap_or_else(|| "default".to_string());
    Ok(format!(
        "http://{svc}-0.{svc}.{namespace}.svc.cluster.local:{port}"
    ))
}

fn not_found(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(api_err) if api_err.code == 404)
}

pub(crate) async fn get_cluster(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<CassandraCluster> {
    let api: Api<CassandraCluster> = Api::namespaced(client.clone(), namespace);
    api.get(name).await.map_err(|e| {
        if not_found(&e) {
            Error::ClusterNotFound(format!("{}/{}", namespace, name))
        } else {
            Error::Kube(e)
        }
    })
}

pub(crate) async fn get_backup(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<CassandraBackup> {
    let api: Api<CassandraBackup> = Api::namespaced(client.clone(), namespace);
    api.get(name).await.map_err(|e| {
        if not_found(&e) {
            Error::BackupNotFound(format!("{}/{}", namespace, name))
        } else {
            Error::Kube(e)
        }
    })
}

/// Fetch the credentials secret and check it fits the storage provider
pub(crate) async fn check_credentials(
    client: &Client,
    namespace: &str,
    secret_name: &str,
    provider: StorageProvider,
) -> Result<()> {
    let secret = get_secret(client, secret_name, namespace).await?;
    validate_storage_secret(&secret, provider)
}

/// Turn the result of a pass into the next action.
///
/// Conflicts requeue immediately. Other transient failures are retried after the
/// retry delay; the rest is returned to the error policy. Either way a warning
/// event is published when the user can act on the error.
pub(crate) async fn settle<K>(ctx: &Context, obj: &K, result: Result<Action>) -> Result<Action>
where
    K: Resource<DynamicType = ()>,
{
    match result {
        Ok(action) => Ok(action),
        Err(Error::Conflict(what)) => {
            info!(resource = %what, "Conflict occurred. Retrying...");
            Ok(Action::requeue(Duration::ZERO))
        }
        Err(e) if e.is_transient() => {
            warn!(
                name = %obj.name_any(),
                error = %e,
                retry_in = ?ctx.config.retry_delay,
                "Reconciliation postponed"
            );
            if let Some(reason) = events::reason_for(&e) {
                events::publish_warning(&ctx.client, obj, reason, e.to_string()).await;
            }
            Ok(Action::requeue(ctx.config.retry_delay))
        }
        Err(e) => {
            if let Some(reason) = events::reason_for(&e) {
                events::publish_warning(&ctx.client, obj, reason, e.to_string()).await;
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CassandraBackupSpec, CassandraClusterSpec, DcSpec};
    use crate::operations::HttpOperationClientFactory;
    use kube::api::ObjectMeta;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Context whose Kubernetes API is the given mock server
    fn context(api_url: &str) -> Context {
        let client = Client::try_from(kube::Config::new(api_url.parse().unwrap())).unwrap();
        let cancel = CancellationToken::new();
        let operations =
            HttpOperationClientFactory::new(Duration::from_secs(1), cancel.clone()).unwrap();
        Context::new(client, OperatorConfig::default(), Arc::new(operations), cancel)
    }

    fn backup() -> CassandraBackup {
        CassandraBackup {
            metadata: ObjectMeta {
                name: Some("nightly".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: CassandraBackupSpec::default(),
            status: None,
        }
    }

    async fn expect_events(server: &MockServer, reason: &str) {
        Mock::given(path_regex("/namespaces/default/events"))
            .and(body_partial_json(json!({ "reason": reason })))
            .respond_with(ResponseTemplate::new(500))
            .expect(1..)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn conflict_requeues_immediately_without_event() {
        let server = MockServer::start().await;
        Mock::given(path_regex("/events"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        let ctx = context(&server.uri());

        let action = settle(&ctx, &backup(), Err(Error::Conflict("default/nightly".into())))
            .await
            .unwrap();
        assert_eq!(action, Action::requeue(Duration::ZERO));
    }

    #[tokio::test]
    async fn cancelled_call_requeues_after_retry_delay() {
        let server = MockServer::start().await;
        let ctx = context(&server.uri());

        let action = settle(&ctx, &backup(), Err(Error::Cancelled)).await.unwrap();
        assert_eq!(action, Action::requeue(ctx.config.retry_delay));
    }

    #[tokio::test]
    async fn missing_secret_requeues_with_event() {
        let server = MockServer::start().await;
        expect_events(&server, events::SECRET_NOT_FOUND).await;
        let ctx = context(&server.uri());

        let action = settle(
            &ctx,
            &backup(),
            Err(Error::SecretNotFound("default/creds".into())),
        )
        .await
        .unwrap();
        assert_eq!(action, Action::requeue(ctx.config.retry_delay));
    }

    #[tokio::test]
    async fn validation_error_reaches_error_policy_with_event() {
        let server = MockServer::start().await;
        expect_events(&server, events::VALIDATION_FAILED).await;
        let ctx = context(&server.uri());

        let result = settle(
            &ctx,
            &backup(),
            Err(Error::validation("no snapshotTag specified")),
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(ctx.backoff(&err), VALIDATION_REQUEUE);
    }

    #[tokio::test]
    async fn hard_error_reaches_error_policy() {
        let server = MockServer::start().await;
        Mock::given(path_regex("/events"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        let ctx = context(&server.uri());

        let err = settle(&ctx, &backup(), Err(Error::storage("no DCs defined")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(ctx.backoff(&err), ERROR_REQUEUE);
    }

    #[tokio::test]
    async fn backoff_follows_error_class() {
        let server = MockServer::start().await;
        let ctx = context(&server.uri());

        assert_eq!(ctx.backoff(&Error::Cancelled), ctx.config.retry_delay);
        assert_eq!(ctx.backoff(&Error::config("bad")), VALIDATION_REQUEUE);
        assert_eq!(ctx.backoff(&Error::validation("bad")), VALIDATION_REQUEUE);
        assert_eq!(
            ctx.backoff(&Error::UnexpectedStatus {
                kind: "backup",
                status: 500,
                body: String::new(),
            }),
            ERROR_REQUEUE
        );
    }

    #[tokio::test]
    async fn outcome_maps_to_action() {
        let server = MockServer::start().await;
        let ctx = context(&server.uri());

        assert_eq!(
            ctx.action(Outcome::Requeue),
            Action::requeue(ctx.config.retry_delay)
        );
        assert_eq!(ctx.action(Outcome::Done), Action::await_change());
    }

    #[test]
    fn coordinator_is_first_pod_of_first_dc() {
        let cluster = CassandraCluster {
            metadata: ObjectMeta {
                name: Some("prod".to_string()),
                namespace: Some("db".to_string()),
                ..Default::default()
            },
            spec: CassandraClusterSpec {
                dcs: vec![
                    DcSpec {
                        name: "dc1".to_string(),
                    },
                    DcSpec {
                        name: "dc2".to_string(),
                    },
                ],
            },
            status: None,
        };
        assert_eq!(
            coordinator_url(&cluster, 4567).unwrap(),
            "http://prod-cassandra-dc1-0.prod-cassandra-dc1.db.svc.cluster.local:4567"
        );
    }
}
