use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::TaskRun;
use crate::error::ApiResult;
use crate::services::api_client::TaskApi;
use crate::services::poller::HistoryRefresh;

/// Report run history for one unit and user, newest first.
pub struct TaskRunStore {
    api: Arc<dyn TaskApi>,
    unit_id: String,
    user_id: String,
    runs: RwLock<Vec<TaskRun>>,
}

impl TaskRunStore {
    pub fn new(api: Arc<dyn TaskApi>, unit_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            api,
            unit_id: unit_id.into(),
            user_id: user_id.into(),
            runs: RwLock::new(Vec::new()),
        }
    }

    pub async fn refresh(&self) -> ApiResult<Vec<TaskRun>> {
        let mut runs = self.api.task_runs(&self.unit_id, &self.user_id).await?;
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(unit_id = %self.unit_id, count = runs.len(), "Task run history refreshed");
        *self.runs.write() = runs.clone();
        Ok(runs)
    }

    pub fn runs(&self) -> Vec<TaskRun> {
        self.runs.read().clone()
    }

    pub fn latest(&self) -> Option<TaskRun> {
        self.runs.read().first().cloned()
    }

    pub fn find(&self, transaction_id: &str) -> Option<TaskRun> {
        self.runs
            .read()
            .iter()
            .find(|r| r.transaction_id == transaction_id)
            .cloned()
    }
}

#[async_trait]
impl HistoryRefresh for TaskRunStore {
    async fn refresh_history(&self) {
        if let Err(e) = self.refresh().await {
            warn!(unit_id = %self.unit_id, error = %e, "Failed to refresh task run history");
        }
    }
}
