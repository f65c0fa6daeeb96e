//! Report task poll controller.
//!
//! Drives one bounded polling loop per unit against the task status endpoint:
//!
//! ```text
//! Idle --start--> Polling --terminal--> Terminal
//!                    |----budget----> TimedOut
//!                    |----fetch err--> Failed
//!                    '----stop/drop--> Cancelled
//! any --reset--> Idle (checkpoint cleared)
//! ```
//!
//! Ticks are strictly sequential: the next fetch is scheduled only after the
//! previous one resolves. Each session owns a cancellation token that is
//! checked before every fetch and again after it resolves, and state or
//! checkpoint writes are only committed while the token is live.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::TaskRunStatusResponse;
use crate::error::ApiError;
use crate::services::api_client::TaskApi;
use crate::services::checkpoint::Checkpoint;

/// Hook run once when a polled task finishes successfully.
#[async_trait]
pub trait HistoryRefresh: Send + Sync {
    async fn refresh_history(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Wall-clock budget measured from `start`
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Observable poller state
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Idle,
    /// `status` is the last fetched status, if any yet
    Polling {
        transaction_id: String,
        status: Option<TaskRunStatusResponse>,
    },
    Terminal(TaskRunStatusResponse),
    TimedOut,
    Failed(String),
    Cancelled,
}

impl PollState {
    /// No session is running and none will start on its own.
    pub fn is_settled(&self) -> bool {
        !matches!(self, PollState::Polling { .. })
    }

    /// The error a caller should surface for this state, if any.
    pub fn error(&self, timeout: Duration) -> Option<ApiError> {
        match self {
            PollState::TimedOut => Some(ApiError::Timeout {
                seconds: timeout.as_secs(),
            }),
            PollState::Failed(message) => Some(ApiError::TaskFailed(message.clone())),
            PollState::Terminal(status) if status.status.is_failure() => Some(
                ApiError::TaskFailed(format!("Report generation ended with status {}", status.status)),
            ),
            _ => None,
        }
    }
}

struct Session {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Poll controller for the in-flight report task of one unit.
pub struct TaskPoller {
    unit_id: String,
    api: Arc<dyn TaskApi>,
    checkpoint: Arc<dyn Checkpoint>,
    refresher: Option<Arc<dyn HistoryRefresh>>,
    config: PollConfig,
    state: Arc<watch::Sender<PollState>>,
    session: Mutex<Option<Session>>,
}

impl TaskPoller {
    pub fn new(
        unit_id: impl Into<String>,
        api: Arc<dyn TaskApi>,
        checkpoint: Arc<dyn Checkpoint>,
        config: PollConfig,
    ) -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            unit_id: unit_id.into(),
            api,
            checkpoint,
            refresher: None,
            config,
            state: Arc::new(state),
            session: Mutex::new(None),
        }
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn HistoryRefresh>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Start polling `transaction_id`, replacing any running session.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, transaction_id: impl Into<String>) {
        self.start_from(transaction_id.into(), None);
    }

    fn start_from(&self, transaction_id: String, last: Option<TaskRunStatusResponse>) {
        let mut session = self.session.lock();
        if let Some(previous) = session.take() {
            previous.token.cancel();
        }

        let token = CancellationToken::new();
        let run = PollRun {
            unit_id: self.unit_id.clone(),
            transaction_id,
            api: Arc::clone(&self.api),
            checkpoint: Arc::clone(&self.checkpoint),
            refresher: self.refresher.clone(),
            config: self.config,
            state: Arc::clone(&self.state),
            token: token.clone(),
        };

        info!(
            unit_id = %self.unit_id,
            transaction_id = %run.transaction_id,
            interval_ms = self.config.interval.as_millis() as u64,
            "Polling task status"
        );

        // Previous session is cancelled, so it can no longer commit over this
        self.state.send_replace(PollState::Polling {
            transaction_id: run.transaction_id.clone(),
            status: last,
        });
        let handle = tokio::spawn(run.run());
        *session = Some(Session { token, handle });
    }

    /// Stop polling. A fetch already in flight is allowed to finish but its
    /// result is discarded.
    pub fn stop(&self) {
        let session = self.session.lock().take();
        if let Some(session) = session {
            session.token.cancel();
            // Cancel and publish are ordered by the watch lock, see PollRun::commit
            self.state.send_if_modified(|state| {
                if matches!(state, PollState::Polling { .. }) {
                    *state = PollState::Cancelled;
                    true
                } else {
                    false
                }
            });
            debug!(unit_id = %self.unit_id, "Polling stopped");
        }
    }

    /// Stop polling, forget the in-flight task and return to idle.
    pub fn reset(&self) {
        self.stop();
        if let Err(e) = self.checkpoint.clear(&self.unit_id) {
            warn!(unit_id = %self.unit_id, error = %e, "Failed to clear task checkpoint");
        }
        self.state.send_replace(PollState::Idle);
    }

    /// Resume from the checkpoint after a restart.
    ///
    /// Returns true if polling was restarted. A terminal record is published
    /// as-is without polling or refreshing history again.
    pub fn resume(&self) -> bool {
        let record = match self.checkpoint.load(&self.unit_id) {
            Ok(record) => record,
            Err(e) => {
                warn!(unit_id = %self.unit_id, error = %e, "Failed to read task checkpoint");
                return false;
            }
        };

        match record {
            Some(status) if !status.is_terminal() => {
                info!(
                    unit_id = %self.unit_id,
                    transaction_id = %status.transaction_id,
                    status = %status.status,
                    "Resuming in-flight task"
                );
                self.start_from(status.transaction_id.clone(), Some(status));
                true
            }
            Some(status) => {
                self.state.send_replace(PollState::Terminal(status));
                false
            }
            None => false,
        }
    }

    /// Wait until the current session settles and return the final state.
    pub async fn wait(&self) -> PollState {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|state| state.is_settled())
            .await
            .map(|state| state.clone());
        // Sender lives as long as self
        settled.unwrap_or_else(|_| self.state())
    }
}

impl Drop for TaskPoller {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.token.cancel();
        }
    }
}

/// One polling session, owned by its spawned task.
struct PollRun {
    unit_id: String,
    transaction_id: String,
    api: Arc<dyn TaskApi>,
    checkpoint: Arc<dyn Checkpoint>,
    refresher: Option<Arc<dyn HistoryRefresh>>,
    config: PollConfig,
    state: Arc<watch::Sender<PollState>>,
    token: CancellationToken,
}

impl PollRun {
    async fn run(self) {
        let started = Instant::now();
        let mut fetches: u32 = 0;

        loop {
            if self.token.is_cancelled() {
                return;
            }
            if started.elapsed() > self.config.timeout {
                warn!(
                    unit_id = %self.unit_id,
                    transaction_id = %self.transaction_id,
                    fetches,
                    "Task polling timed out"
                );
                self.commit(PollState::TimedOut, None);
                return;
            }

            let result = self.api.task_status(&self.transaction_id).await;
            fetches += 1;

            if self.token.is_cancelled() {
                debug!(transaction_id = %self.transaction_id, "Discarding status fetched after cancel");
                return;
            }

            match result {
                Err(e) => {
                    warn!(
                        unit_id = %self.unit_id,
                        transaction_id = %self.transaction_id,
                        error = %e,
                        "Task status fetch failed, polling stopped"
                    );
                    self.commit(PollState::Failed(e.user_message()), None);
                    return;
                }
                Ok(status) if status.is_terminal() => {
                    info!(
                        unit_id = %self.unit_id,
                        transaction_id = %self.transaction_id,
                        status = %status.status,
                        fetches,
                        "Task finished"
                    );
                    // Terminal record is durable before the refresh, so a stop
                    // during the refresh still resumes as terminal
                    if !self.persist(&status) {
                        return;
                    }
                    // History is fresh by the time Terminal becomes visible
                    if status.status.is_success() {
                        if let Some(refresher) = &self.refresher {
                            refresher.refresh_history().await;
                        }
                    }
                    self.commit(PollState::Terminal(status), None);
                    return;
                }
                Ok(status) => {
                    debug!(
                        transaction_id = %self.transaction_id,
                        status = %status.status,
                        progress = status.progress,
                        "Task in progress"
                    );
                    let next = PollState::Polling {
                        transaction_id: self.transaction_id.clone(),
                        status: Some(status.clone()),
                    };
                    if !self.commit(next, Some(&status)) {
                        return;
                    }
                }
            }

            tokio::select! {
                _ = self.token.cancelled() => return,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    /// Checkpoint a status without publishing it, unless cancelled.
    fn persist(&self, record: &TaskRunStatusResponse) -> bool {
        let mut saved = false;
        self.state.send_if_modified(|_| {
            if !self.token.is_cancelled() {
                self.save(record);
                saved = true;
            }
            false
        });
        saved
    }

    /// Publish a state (and optionally checkpoint a status) unless cancelled.
    ///
    /// The token check runs under the watch lock, which `stop` also takes
    /// after cancelling, so a cancelled session can never overwrite state.
    /// The checkpoint write happens while that lock is held; with
    /// `FileCheckpoint` readers of the state wait on one small file write.
    fn commit(&self, next: PollState, record: Option<&TaskRunStatusResponse>) -> bool {
        let mut committed = false;
        self.state.send_if_modified(|state| {
            if self.token.is_cancelled() {
                return false;
            }
            if let Some(record) = record {
                self.save(record);
            }
            *state = next;
            committed = true;
            true
        });
        committed
    }

    fn save(&self, record: &TaskRunStatusResponse) {
        if let Err(e) = self.checkpoint.save(&self.unit_id, record) {
            warn!(unit_id = %self.unit_id, error = %e, "Failed to checkpoint task status");
        }
    }
}
