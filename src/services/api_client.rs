//! Dashboard backend client.
//!
//! Provides type-safe methods for:
//! - Report task submission, status polling and cancellation
//! - Task run history
//! - Semesters, units and week calendars
//! - Forum thread sync
//! - The signed-in user's profile

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;
use uuid::Uuid;

use crate::domain::{
    CreateUnitRequest, RunTaskRequest, Semester, TaskKind, TaskRun, TaskRunStatusResponse,
    ThreadSyncResponse, Unit, UpdateProfileRequest, UpdateUnitRequest, UserProfile,
    WeekDescriptor,
};
use crate::error::{ApiError, ApiResult};

/// Report task operations the poller and stores depend on.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Submit a report job; the backend answers with its transaction id.
    async fn run_task(
        &self,
        kind: TaskKind,
        request: &RunTaskRequest,
    ) -> ApiResult<TaskRunStatusResponse>;

    async fn task_status(&self, transaction_id: &str) -> ApiResult<TaskRunStatusResponse>;

    /// Best-effort cancellation request.
    async fn cancel_task(&self, transaction_id: &str) -> ApiResult<()>;

    async fn task_runs(&self, unit_id: &str, user_id: &str) -> ApiResult<Vec<TaskRun>>;
}

/// Client for the dashboard backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: String,
}

/// Error response from the backend.
#[derive(Debug, Deserialize)]
struct BackendErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

impl BackendErrorResponse {
    fn into_message(self) -> Option<String> {
        self.message.or(match self.detail {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
            None => None,
        })
    }
}

impl ApiClient {
    /// Create a new dashboard backend client.
    pub fn new(base_url: &str, token: &str, timeout_seconds: u64) -> Result<Self> {
        let base_url = Url::parse(base_url).context("Invalid backend base URL")?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Backend base URL cannot have path segments: {}", base_url);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::debug!(base_url = %base_url, "Dashboard client initialized");

        Ok(Self {
            client,
            base_url,
            token: token.to_string(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        debug!(method = %method, url = %url, request_id = %request_id, "Backend request");

        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("x-request-id", request_id)
    }

    /// Send a request and decode a JSON body.
    async fn send<R: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<R> {
        let response = self.dispatch(req).await?;

        response.json::<R>().await.map_err(|e| {
            error!(error = %e, "Failed to parse backend response");
            ApiError::InvalidResponse(e.to_string())
        })
    }

    /// Send a request whose body is irrelevant.
    async fn send_empty(&self, req: RequestBuilder) -> ApiResult<()> {
        self.dispatch(req).await.map(|_| ())
    }

    async fn dispatch(&self, req: RequestBuilder) -> ApiResult<reqwest::Response> {
        let response = req.send().await.map_err(|e| {
            error!(error = %e, "Backend request failed");
            ApiError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<BackendErrorResponse>()
            .await
            .ok()
            .and_then(BackendErrorResponse::into_message)
            .unwrap_or_else(|| format!("Backend error: {}", status));

        Err(match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::BadRequest(message)
            }
            StatusCode::UNAUTHORIZED => {
                error!("Backend authentication failed");
                ApiError::Unauthorized(message)
            }
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::CONFLICT => ApiError::Conflict(message),
            _ => {
                error!(status = %status, message = %message, "Backend error");
                ApiError::Remote {
                    status: status.as_u16(),
                    message,
                }
            }
        })
    }

    async fn get<R: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<R> {
        self.send(self.request(Method::GET, self.endpoint(segments)))
            .await
    }

    async fn with_body<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &T,
    ) -> ApiResult<R> {
        self.send(self.request(method, self.endpoint(segments)).json(body))
            .await
    }

    /// Check backend health.
    pub async fn health_check(&self) -> Result<()> {
        self.client
            .get(self.endpoint(&["health"]))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Backend health check failed")?
            .error_for_status()
            .context("Backend unhealthy")?;

        Ok(())
    }

    // =========================================================================
    // User Endpoints
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn current_user(&self) -> ApiResult<UserProfile> {
        self.get(&["api", "users", "me"]).await
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &UpdateProfileRequest) -> ApiResult<UserProfile> {
        self.with_body(Method::PATCH, &["api", "users", "me"], update)
            .await
    }

    // =========================================================================
    // Semester Endpoints
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn semesters(&self) -> ApiResult<Vec<Semester>> {
        self.get(&["api", "semesters"]).await
    }

    // =========================================================================
    // Unit Endpoints
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn units(&self, user_id: &str) -> ApiResult<Vec<Unit>> {
        let req = self
            .request(Method::GET, self.endpoint(&["api", "units"]))
            .query(&[("user_id", user_id)]);
        self.send(req).await
    }

    #[instrument(skip(self))]
    pub async fn unit(&self, unit_id: &str) -> ApiResult<Unit> {
        self.get(&["api", "units", unit_id]).await
    }

    #[instrument(skip(self, request))]
    pub async fn create_unit(&self, request: &CreateUnitRequest) -> ApiResult<Unit> {
        self.with_body(Method::POST, &["api", "units"], request)
            .await
    }

    #[instrument(skip(self, update))]
    pub async fn update_unit(&self, unit_id: &str, update: &UpdateUnitRequest) -> ApiResult<Unit> {
        self.with_body(Method::PATCH, &["api", "units", unit_id], update)
            .await
    }

    /// Replace the unit's week calendar.
    #[instrument(skip(self, weeks), fields(weeks = weeks.len()))]
    pub async fn save_weeks(&self, unit_id: &str, weeks: &[WeekDescriptor]) -> ApiResult<Unit> {
        self.with_body(Method::PUT, &["api", "units", unit_id, "weeks"], weeks)
            .await
    }

    /// Pull the latest discussion threads from the forum into the backend.
    #[instrument(skip(self))]
    pub async fn sync_threads(&self, unit_id: &str) -> ApiResult<ThreadSyncResponse> {
        let req = self.request(
            Method::POST,
            self.endpoint(&["api", "units", unit_id, "threads", "sync"]),
        );
        self.send(req).await
    }
}

#[async_trait]
impl TaskApi for ApiClient {
    #[instrument(skip(self, request), fields(unit_id = %request.unit_id))]
    async fn run_task(
        &self,
        kind: TaskKind,
        request: &RunTaskRequest,
    ) -> ApiResult<TaskRunStatusResponse> {
        self.with_body(
            Method::POST,
            &["api", "tasks", kind.path_segment(), "run"],
            request,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn task_status(&self, transaction_id: &str) -> ApiResult<TaskRunStatusResponse> {
        self.get(&["api", "tasks", transaction_id, "status"]).await
    }

    #[instrument(skip(self))]
    async fn cancel_task(&self, transaction_id: &str) -> ApiResult<()> {
        let req = self.request(
            Method::POST,
            self.endpoint(&["api", "tasks", transaction_id, "cancel"]),
        );
        self.send_empty(req).await
    }

    #[instrument(skip(self))]
    async fn task_runs(&self, unit_id: &str, user_id: &str) -> ApiResult<Vec<TaskRun>> {
        let req = self
            .request(
                Method::GET,
                self.endpoint(&["api", "units", unit_id, "task-runs"]),
            )
            .query(&[("user_id", user_id)]);
        self.send(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_segments_onto_base_path() {
        let client = ApiClient::new("http://localhost:8000/backend/", "t", 5).unwrap();
        let url = client.endpoint(&["api", "tasks", "tx 1", "status"]);

        assert_eq!(
            url.as_str(),
            "http://localhost:8000/backend/api/tasks/tx%201/status"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(ApiClient::new("not a url", "t", 5).is_err());
        assert!(ApiClient::new("mailto:someone@example.com", "t", 5).is_err());
    }

    #[test]
    fn backend_error_message_prefers_message_then_detail() {
        let with_message: BackendErrorResponse =
            serde_json::from_str(r#"{"message":"nope","detail":"ignored"}"#).unwrap();
        assert_eq!(with_message.into_message().as_deref(), Some("nope"));

        let with_detail: BackendErrorResponse =
            serde_json::from_str(r#"{"detail":"Unit not found"}"#).unwrap();
        assert_eq!(with_detail.into_message().as_deref(), Some("Unit not found"));

        let empty: BackendErrorResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.into_message(), None);
    }
}
