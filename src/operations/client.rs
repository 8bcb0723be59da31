//! HTTP client for the operation service running next to the coordinator node

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};

use super::types::{Backup, BackupRequest, Restore, RestoreRequest};

/// Request/response contract of the operation service.
///
/// Every call is a single round-trip; retries are left to the next reconciliation.
#[async_trait]
pub trait OperationClient: Send + Sync {
    /// Submit a backup; the service answers with the created coordinator record
    async fn submit_backup(&self, request: &BackupRequest) -> Result<Backup>;

    async fn list_backups(&self) -> Result<Vec<Backup>>;

    /// Submit a restore; the service only acknowledges it
    async fn submit_restore(&self, request: &RestoreRequest) -> Result<()>;

    async fn list_restores(&self) -> Result<Vec<Restore>>;
}

/// Hands out clients bound to a coordinator address
pub trait OperationClientFactory: Send + Sync {
    fn for_coordinator(&self, base_url: &str) -> Arc<dyn OperationClient>;
}

/// reqwest-backed [`OperationClient`]
#[derive(Clone)]
pub struct HttpOperationClient {
    base_url: String,
    http: reqwest::Client,
    cancel: CancellationToken,
}

impl HttpOperationClient {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client, cancel: CancellationToken) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            cancel,
        }
    }

    fn operations_url(&self) -> String {
        format!("{}/operations", self.base_url)
    }

    /// Run a call unless the reconciliation context is cancelled first
    async fn cancellable<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = call => result,
        }
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        Ok(request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?)
    }

    /// Return the body when the status matches, otherwise an [`Error::UnexpectedStatus`]
    async fn expect_status(
        kind: &'static str,
        response: Response,
        expected: StatusCode,
    ) -> Result<Vec<u8>> {
        let status = response.status();
        let body = response.bytes().await?;
        if status != expected {
            return Err(Error::UnexpectedStatus {
                kind,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body.to_vec())
    }

    async fn list<T: DeserializeOwned>(&self, kind: &'static str) -> Result<Vec<T>> {
        self.cancellable(async {
            let response =
                Self::send(self.http.get(self.operations_url()).query(&[("type", kind)])).await?;
            let body = Self::expect_status(kind, response, StatusCode::OK).await?;
            Ok(serde_json::from_slice(&body)?)
        })
        .await
    }
}

#[async_trait]
impl OperationClient for HttpOperationClient {
    async fn submit_backup(&self, request: &BackupRequest) -> Result<Backup> {
        self.cancellable(async {
            let response = Self::send(self.http.post(self.operations_url()).json(request)).await?;
            let body = Self::expect_status("backup", response, StatusCode::CREATED).await?;
            let backup: Backup = serde_json::from_slice(&body)?;
            debug!(operation_id = %backup.id, snapshot_tag = %backup.snapshot_tag, "Backup request accepted");
            Ok(backup)
        })
        .await
    }

    async fn list_backups(&self) -> Result<Vec<Backup>> {
        self.list("backup").await
    }

    async fn submit_restore(&self, request: &RestoreRequest) -> Result<()> {
        self.cancellable(async {
            let response = Self::send(self.http.post(self.operations_url()).json(request)).await?;
            Self::expect_status("restore", response, StatusCode::CREATED).await?;
            debug!(snapshot_tag = %request.snapshot_tag, "Restore request accepted");
            Ok(())
        })
        .await
    }

    async fn list_restores(&self) -> Result<Vec<Restore>> {
        self.list("restore").await
    }
}

/// Builds [`HttpOperationClient`]s sharing one connection pool and cancellation token
#[derive(Clone)]
pub struct HttpOperationClientFactory {
    http: reqwest::Client,
    cancel: CancellationToken,
}

impl HttpOperationClientFactory {
    pub fn new(request_timeout: Duration, cancel: CancellationToken) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http, cancel })
    }
}

impl OperationClientFactory for HttpOperationClientFactory {
    fn for_coordinator(&self, base_url: &str) -> Arc<dyn OperationClient> {
        Arc::new(HttpOperationClient::new(
            base_url,
            self.http.clone(),
            self.cancel.clone(),
        ))
    }
}
