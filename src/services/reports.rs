//! Report generation workflow for one unit.
//!
//! Submits a report job, checkpoints the returned transaction, polls it to
//! completion and refreshes the run history when it succeeds.

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::{RunTaskRequest, TaskKind, TaskRunStatusResponse, WeekDescriptor};
use crate::error::{ApiError, ApiResult};
use crate::services::api_client::TaskApi;
use crate::services::checkpoint::Checkpoint;
use crate::services::poller::{PollConfig, PollState, TaskPoller};
use crate::stores::TaskRunStore;

pub struct ReportRunner {
    api: Arc<dyn TaskApi>,
    checkpoint: Arc<dyn Checkpoint>,
    history: Arc<TaskRunStore>,
    poller: TaskPoller,
    unit_id: String,
    user_id: String,
}

impl ReportRunner {
    pub fn new(
        api: Arc<dyn TaskApi>,
        checkpoint: Arc<dyn Checkpoint>,
        unit_id: &str,
        user_id: &str,
        config: PollConfig,
    ) -> Self {
        let history = Arc::new(TaskRunStore::new(Arc::clone(&api), unit_id, user_id));
        let poller = TaskPoller::new(unit_id, Arc::clone(&api), Arc::clone(&checkpoint), config)
            .with_refresher(history.clone());

        Self {
            api,
            checkpoint,
            history,
            poller,
            unit_id: unit_id.to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub fn history(&self) -> &TaskRunStore {
        &self.history
    }

    pub fn poller(&self) -> &TaskPoller {
        &self.poller
    }

    pub fn state(&self) -> PollState {
        self.poller.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.poller.subscribe()
    }

    /// Pick up a job left in flight by a previous session.
    pub fn resume(&self) -> bool {
        self.poller.resume()
    }

    /// Wait for the current job to settle; timeouts and failures become errors.
    pub async fn wait(&self) -> ApiResult<PollState> {
        let state = self.poller.wait().await;
        match state.error(self.poller.config().timeout) {
            Some(e) => Err(e),
            None => Ok(state),
        }
    }

    /// Generate a report for the selected week.
    pub async fn submit(
        &self,
        kind: TaskKind,
        week: Option<&WeekDescriptor>,
    ) -> ApiResult<TaskRunStatusResponse> {
        let week = week.ok_or_else(|| {
            ApiError::Validation("Please select a week before generating a report".to_string())
        })?;

        self.submit_request(
            kind,
            RunTaskRequest {
                unit_id: self.unit_id.clone(),
                user_id: self.user_id.clone(),
                start_date: week.start_date,
                end_date: week.end_date,
                week_id: Some(week.week_id),
            },
        )
        .await
    }

    /// Generate a report over an arbitrary date range.
    pub async fn submit_range(
        &self,
        kind: TaskKind,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<TaskRunStatusResponse> {
        if end_date < start_date {
            return Err(ApiError::Validation(format!(
                "End date {} is before start date {}",
                end_date, start_date
            )));
        }

        self.submit_request(
            kind,
            RunTaskRequest {
                unit_id: self.unit_id.clone(),
                user_id: self.user_id.clone(),
                start_date,
                end_date,
                week_id: None,
            },
        )
        .await
    }

    async fn submit_request(
        &self,
        kind: TaskKind,
        request: RunTaskRequest,
    ) -> ApiResult<TaskRunStatusResponse> {
        if self.poller.is_polling() {
            return Err(ApiError::Conflict(
                "A report is already being generated for this unit".to_string(),
            ));
        }

        let response = self.api.run_task(kind, &request).await?;
        info!(
            unit_id = %self.unit_id,
            kind = %kind,
            transaction_id = %response.transaction_id,
            "Report task submitted"
        );

        if let Err(e) = self.checkpoint.save(&self.unit_id, &response) {
            warn!(unit_id = %self.unit_id, error = %e, "Failed to checkpoint submitted task");
        }
        self.poller.start(response.transaction_id.clone());

        Ok(response)
    }

    /// Cancel the in-flight job. Local polling always stops; the remote
    /// cancel is best-effort and its error is returned for display.
    pub async fn cancel(&self) -> ApiResult<()> {
        let transaction_id = match self.poller.state() {
            PollState::Polling { transaction_id, .. } => Some(transaction_id),
            _ => self
                .checkpoint
                .load(&self.unit_id)
                .ok()
                .flatten()
                .filter(|s| !s.is_terminal())
                .map(|s| s.transaction_id),
        };

        self.poller.reset();

        let Some(transaction_id) = transaction_id else {
            return Ok(());
        };

        info!(unit_id = %self.unit_id, transaction_id = %transaction_id, "Cancelling report task");
        self.api.cancel_task(&transaction_id).await.map_err(|e| {
            warn!(transaction_id = %transaction_id, error = %e, "Remote cancel failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskRun, TaskStatus, WeekType};
    use crate::services::checkpoint::MemoryCheckpoint;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeBackend {
        submitted: Mutex<Vec<(TaskKind, RunTaskRequest)>>,
        statuses: Mutex<VecDeque<TaskStatus>>,
        cancelled: Mutex<Vec<String>>,
        history_calls: Mutex<usize>,
        fail_cancel: bool,
    }

    fn status(tx: &str, status: TaskStatus) -> TaskRunStatusResponse {
        TaskRunStatusResponse {
            transaction_id: tx.to_string(),
            status,
            progress: 0.0,
            name: "faq".to_string(),
            week_id: None,
        }
    }

    #[async_trait]
    impl TaskApi for FakeBackend {
        async fn run_task(
            &self,
            kind: TaskKind,
            request: &RunTaskRequest,
        ) -> ApiResult<TaskRunStatusResponse> {
            self.submitted.lock().push((kind, request.clone()));
            Ok(status("tx-42", TaskStatus::Received))
        }

        async fn task_status(&self, transaction_id: &str) -> ApiResult<TaskRunStatusResponse> {
            let next = self
                .statuses
                .lock()
                .pop_front()
                .unwrap_or(TaskStatus::Pending);
            Ok(status(transaction_id, next))
        }

        async fn cancel_task(&self, transaction_id: &str) -> ApiResult<()> {
            self.cancelled.lock().push(transaction_id.to_string());
            if self.fail_cancel {
                Err(ApiError::Unavailable("down".to_string()))
            } else {
                Ok(())
            }
        }

        async fn task_runs(&self, _unit_id: &str, _user_id: &str) -> ApiResult<Vec<TaskRun>> {
            *self.history_calls.lock() += 1;
            Ok(vec![TaskRun {
                transaction_id: "tx-42".to_string(),
                status: TaskStatus::Completed,
                progress: 100.0,
                name: "faq".to_string(),
                week_id: Some(3),
                created_at: Utc::now(),
                completed_at: Some(Utc::now()),
                input: None,
                result: None,
                error_message: None,
            }])
        }
    }

    fn week() -> WeekDescriptor {
        WeekDescriptor {
            week_id: 3,
            teaching_week_number: 3,
            week_type: WeekType::Teaching,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 24).unwrap(),
            content: String::new(),
        }
    }

    fn runner(backend: Arc<FakeBackend>, checkpoint: Arc<MemoryCheckpoint>) -> ReportRunner {
        ReportRunner::new(backend, checkpoint, "unit-1", "user-1", PollConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn missing_week_is_rejected_before_any_call() {
        let backend = Arc::new(FakeBackend::default());
        let runner = runner(backend.clone(), Arc::new(MemoryCheckpoint::new()));

        let err = runner.submit(TaskKind::Faq, None).await.unwrap_err();

        assert!(err.is_input_error());
        assert!(backend.submitted.lock().is_empty());
        assert_eq!(runner.state(), PollState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn inverted_range_is_rejected() {
        let backend = Arc::new(FakeBackend::default());
        let runner = runner(backend.clone(), Arc::new(MemoryCheckpoint::new()));

        let err = runner
            .submit_range(
                TaskKind::QuestionClustering,
                NaiveDate::from_ymd_opt(2024, 3, 24).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
            )
            .await
            .unwrap_err();

        assert!(err.is_input_error());
        assert!(backend.submitted.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_polls_to_completion_and_refreshes_history() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .statuses
            .lock()
            .extend([TaskStatus::Pending, TaskStatus::Completed]);
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let runner = runner(backend.clone(), checkpoint.clone());

        let submitted = runner
            .submit(TaskKind::AssessmentAnalysis, Some(&week()))
            .await
            .unwrap();
        assert_eq!(submitted.transaction_id, "tx-42");
        assert!(checkpoint.load("unit-1").unwrap().is_some());

        let state = runner.wait().await.unwrap();
        assert!(matches!(state, PollState::Terminal(_)));

        let (kind, request) = backend.submitted.lock()[0].clone();
        assert_eq!(kind, TaskKind::AssessmentAnalysis);
        assert_eq!(request.week_id, Some(3));
        assert_eq!(request.start_date, week().start_date);
        assert_eq!(request.end_date, week().end_date);
        assert_eq!(*backend.history_calls.lock(), 1);
        assert_eq!(runner.history().runs().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_submit_while_polling_conflicts() {
        let backend = Arc::new(FakeBackend::default());
        let runner = runner(backend.clone(), Arc::new(MemoryCheckpoint::new()));

        runner.submit(TaskKind::Faq, Some(&week())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = runner.submit(TaskKind::Faq, Some(&week())).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(backend.submitted.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_polling_and_requests_remote_cancel() {
        let backend = Arc::new(FakeBackend::default());
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let runner = runner(backend.clone(), checkpoint.clone());

        runner.submit(TaskKind::Faq, Some(&week())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        runner.cancel().await.unwrap();

        assert_eq!(backend.cancelled.lock().as_slice(), &["tx-42".to_string()]);
        assert_eq!(runner.state(), PollState::Idle);
        assert!(checkpoint.load("unit-1").unwrap().is_none());
        assert!(!runner.poller().is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_remote_cancel_still_stops_locally() {
        let backend = Arc::new(FakeBackend {
            fail_cancel: true,
            ..FakeBackend::default()
        });
        let checkpoint = Arc::new(MemoryCheckpoint::new());
        let runner = runner(backend.clone(), checkpoint.clone());

        runner.submit(TaskKind::Faq, Some(&week())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(runner.cancel().await.is_err());
        assert_eq!(runner.state(), PollState::Idle);
        assert!(checkpoint.load("unit-1").unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_with_nothing_in_flight_is_a_no_op() {
        let backend = Arc::new(FakeBackend::default());
        let runner = runner(backend.clone(), Arc::new(MemoryCheckpoint::new()));

        runner.cancel().await.unwrap();
        assert!(backend.cancelled.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_surfaces_as_error() {
        let backend = Arc::new(FakeBackend::default());
        let runner = ReportRunner::new(
            backend.clone(),
            Arc::new(MemoryCheckpoint::new()),
            "unit-1",
            "user-1",
            PollConfig {
                interval: Duration::from_millis(500),
                timeout: Duration::from_secs(3),
            },
        );

        runner.submit(TaskKind::Faq, Some(&week())).await.unwrap();
        let err = runner.wait().await.unwrap_err();

        assert!(matches!(err, ApiError::Timeout { seconds: 3 }));
        assert_eq!(*backend.history_calls.lock(), 0);
    }
}
