//! Client for the remote identity/data store.
//!
//! The store is an external managed service reached over HTTP; this module
//! defines the narrow record shapes the gateway relies on and a typed client
//! that funnels every call through the retrying policy. A 404 from the store
//! surfaces as [`UpstreamError::NotFound`] so callers can translate it
//! without inspecting status codes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use gateway_common::{HttpConfig, RetryPolicy, UpstreamError};

use crate::auth::Role;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::lifecycle::ProjectStatus;

/// User record as exposed by the identity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Store id
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Account status string as the store reports it
    pub status: String,
    /// Role attached to the account
    pub role: Role,
}

/// Project record as exposed by the data store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Store id
    pub id: String,
    /// Owning user id
    pub owner_id: String,
    /// Project name
    pub name: String,
    /// Current lifecycle state
    pub status: ProjectStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Records on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub page: i64,
    /// Page size
    pub limit: i64,
    /// Total matching records
    pub total: i64,
}

/// Operations the gateway needs from the remote store.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetch a user by id.
    async fn get_user(&self, id: &str) -> Result<UserRecord, UpstreamError>;

    /// Fetch a project by id.
    async fn get_project(&self, id: &str) -> Result<ProjectRecord, UpstreamError>;

    /// List a user's projects, paginated.
    async fn list_projects(
        &self,
        owner_id: &str,
        page: i64,
        limit: i64,
    ) -> Result<Page<ProjectRecord>, UpstreamError>;

    /// Persist a new status for a project, returning the updated record.
    async fn update_project_status(
        &self,
        id: &str,
        status: ProjectStatus,
    ) -> Result<ProjectRecord, UpstreamError>;
}

/// HTTP-backed store client with retrying semantics.
pub struct RemoteStore {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl RemoteStore {
    /// Build a client over the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an internal error when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(base_url: Url, http: &HttpConfig, retry: RetryPolicy) -> Result<Self, GatewayError> {
        let client = http
            .build_client()
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self {
            client,
            base_url,
            retry,
        })
    }

    /// Build a client from gateway configuration.
    ///
    /// # Errors
    ///
    /// See [`RemoteStore::new`].
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Self::new(
            config.upstream_base_url.clone(),
            &config.http_config(),
            RetryPolicy::new(config.retry_config()),
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path)
            .map_err(|e| UpstreamError::Decode(format!("invalid endpoint path {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, UpstreamError> {
        let url = self.endpoint(path)?;
        self.retry
            .execute("GET", url.as_str(), || {
                let client = self.client.clone();
                let url = url.clone();
                async move { read_response(client.get(url).send().await).await }
            })
            .await
    }

    async fn put_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, UpstreamError> {
        let url = self.endpoint(path)?;
        self.retry
            .execute("PUT", url.as_str(), || {
                let client = self.client.clone();
                let url = url.clone();
                async move { read_response(client.put(url).json(body).send().await).await }
            })
            .await
    }
}

async fn read_response<T: DeserializeOwned>(
    outcome: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, UpstreamError> {
    let response = outcome.map_err(UpstreamError::from)?;
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(UpstreamError::from_status(status.as_u16(), detail));
    }
    response
        .json()
        .await
        .map_err(|e| UpstreamError::Decode(e.to_string()))
}

#[derive(Serialize)]
struct StatusPatch {
    status: ProjectStatus,
}

#[async_trait]
impl DataStore for RemoteStore {
    async fn get_user(&self, id: &str) -> Result<UserRecord, UpstreamError> {
        self.get_json(&format!("users/{id}")).await
    }

    async fn get_project(&self, id: &str) -> Result<ProjectRecord, UpstreamError> {
        self.get_json(&format!("projects/{id}")).await
    }

    async fn list_projects(
        &self,
        owner_id: &str,
        page: i64,
        limit: i64,
    ) -> Result<Page<ProjectRecord>, UpstreamError> {
        self.get_json(&format!(
            "users/{owner_id}/projects?page={page}&limit={limit}"
        ))
        .await
    }

    async fn update_project_status(
        &self,
        id: &str,
        status: ProjectStatus,
    ) -> Result<ProjectRecord, UpstreamError> {
        self.put_json(&format!("projects/{id}/status"), &StatusPatch { status })
            .await
    }
}
