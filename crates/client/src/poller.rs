//! Status polling for one job.
//!
//! [`StatusPoller::start_monitoring`] spawns a task that queries the job's
//! status on a fixed interval until the backend reports a terminal status,
//! synthesizes a progress percentage from `running` reports and fetches
//! the results once on completion. The returned [`CancelHandle`] stops it.
//!
//! The task publishes a [`MonitorSnapshot`] through a `watch` channel.
//! Every write checks the cancellation token while holding the channel
//! lock, and [`CancelHandle::cancel`] flips the token under the same lock,
//! so nothing a poller does after cancellation is ever observable. A
//! request already in flight is not aborted; its response is discarded.

use std::sync::Arc;
use std::time::Duration;

use surety_core::error::CoreError;
use surety_core::lifecycle::{state_machine, MonitorState, ProgressConfig, ProgressState};
use surety_core::results::ResultSet;
use surety_core::types::{JobId, Timestamp};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::JobBackend;
use crate::error::ClientError;
use crate::hydrator::ResultHydrator;
use crate::wire::StatusReport;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Delay between status queries while the job is pending or running.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Delay before retrying after a transient failure.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for [`StatusPoller`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    /// Give up after this many consecutive transient failures.
    /// `None` keeps retrying until cancelled.
    pub max_consecutive_failures: Option<u32>,
    pub progress: ProgressConfig,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_consecutive_failures: None,
            progress: ProgressConfig::default(),
        }
    }
}

impl PollerConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.progress.validate()?;
        if self.poll_interval.is_zero() || self.retry_delay.is_zero() {
            return Err(CoreError::Config(
                "Poll interval and retry delay must be greater than zero".to_string(),
            ));
        }
        if self.max_consecutive_failures == Some(0) {
            return Err(CoreError::Config(
                "max_consecutive_failures must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Where the result payload of the monitored job stands.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsState {
    NotRequested,
    Loading,
    Ready(Arc<ResultSet>),
    /// Completed, but the fetch failed. Retryable without resubmitting.
    Unavailable(String),
}

/// Everything a consumer needs to render the monitored job.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSnapshot {
    /// `None` only for an idle slot.
    pub job_id: Option<JobId>,
    pub state: MonitorState,
    pub percent: u8,
    pub results: ResultsState,
    pub consecutive_failures: u32,
    /// Set when polling stopped without reaching a terminal state.
    pub halted: Option<String>,
    pub completed_at: Option<Timestamp>,
}

impl MonitorSnapshot {
    pub fn idle() -> Self {
        Self {
            job_id: None,
            state: MonitorState::Idle,
            percent: 0,
            results: ResultsState::NotRequested,
            consecutive_failures: 0,
            halted: None,
            completed_at: None,
        }
    }

    fn pending(job_id: JobId) -> Self {
        Self {
            job_id: Some(job_id),
            state: MonitorState::Pending,
            ..Self::idle()
        }
    }

    /// No further change will come from the poller: a terminal state
    /// with the results question answered, or a halt.
    pub fn is_settled(&self) -> bool {
        if self.halted.is_some() {
            return true;
        }
        match self.state {
            MonitorState::Failed => true,
            MonitorState::Completed => !matches!(
                self.results,
                ResultsState::NotRequested | ResultsState::Loading
            ),
            _ => false,
        }
    }

    pub fn results(&self) -> Option<&Arc<ResultSet>> {
        match &self.results {
            ResultsState::Ready(results) => Some(results),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CancelHandle
// ---------------------------------------------------------------------------

/// Single-shot switch that stops one poller. Dropping it cancels too.
pub struct CancelHandle {
    job_id: JobId,
    cancel: CancellationToken,
    snapshot: Arc<watch::Sender<MonitorSnapshot>>,
    task: Option<JoinHandle<()>>,
}

impl CancelHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Stop the poller. Idempotent.
    ///
    /// Once this returns, the snapshot no longer changes.
    pub fn cancel(&self) {
        let cancel = &self.cancel;
        self.snapshot.send_if_modified(|_| {
            cancel.cancel();
            false
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.snapshot.subscribe()
    }

    /// Wait for the polling task to stop and return the last snapshot.
    ///
    /// The task stops on settlement or cancellation. Calling this again
    /// returns immediately.
    pub async fn finished(&mut self) -> MonitorSnapshot {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(job_id = %self.job_id, error = %e, "Poller task aborted");
            }
        }
        self.snapshot()
    }

    /// Replace the results state, unless cancelled. Used for manual
    /// result retries after the poller itself has stopped.
    pub(crate) fn publish_results(&self, results: ResultsState) -> bool {
        publish_with(&self.snapshot, &self.cancel, |snapshot| {
            snapshot.results = results;
        })
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("job_id", &self.job_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Apply `update` to the snapshot unless `cancel` has fired.
fn publish_with(
    snapshot: &watch::Sender<MonitorSnapshot>,
    cancel: &CancellationToken,
    update: impl FnOnce(&mut MonitorSnapshot),
) -> bool {
    snapshot.send_if_modified(|current| {
        if cancel.is_cancelled() {
            return false;
        }
        update(current);
        true
    })
}

// ---------------------------------------------------------------------------
// StatusPoller
// ---------------------------------------------------------------------------

/// Starts status monitors against one backend.
#[derive(Clone)]
pub struct StatusPoller {
    backend: Arc<dyn JobBackend>,
    hydrator: ResultHydrator,
    config: PollerConfig,
}

impl StatusPoller {
    /// Rejects a config that [`PollerConfig::validate`] refuses, so a
    /// running job can never be shown at or above 100%.
    pub fn new(backend: Arc<dyn JobBackend>, config: PollerConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            hydrator: ResultHydrator::new(Arc::clone(&backend)),
            backend,
            config,
        })
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Begin monitoring `job_id`, starting in `Pending`.
    ///
    /// The first status query is issued immediately. Must be called from
    /// within a Tokio runtime.
    pub fn start_monitoring(&self, job_id: impl Into<JobId>) -> CancelHandle {
        let job_id = job_id.into();
        let cancel = CancellationToken::new();
        let (tx, _) = watch::channel(MonitorSnapshot::pending(job_id.clone()));
        let snapshot = Arc::new(tx);

        let task = PollTask {
            backend: Arc::clone(&self.backend),
            hydrator: self.hydrator.clone(),
            config: self.config,
            job_id: job_id.clone(),
            cancel: cancel.clone(),
            snapshot: Arc::clone(&snapshot),
            state: MonitorState::Pending,
            progress: ProgressState::new(self.config.progress),
            failures: 0,
        };

        tracing::info!(job_id = %job_id, "Monitoring started");
        let task = tokio::spawn(task.run());

        CancelHandle {
            job_id,
            cancel,
            snapshot,
            task: Some(task),
        }
    }
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

/// What the loop does after handling one response.
enum Step {
    Poll(Duration),
    Stop,
}

struct PollTask {
    backend: Arc<dyn JobBackend>,
    hydrator: ResultHydrator,
    config: PollerConfig,
    job_id: JobId,
    cancel: CancellationToken,
    snapshot: Arc<watch::Sender<MonitorSnapshot>>,
    state: MonitorState,
    progress: ProgressState,
    failures: u32,
}

impl PollTask {
    async fn run(mut self) {
        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!(job_id = %self.job_id, "Monitoring cancelled");
                return;
            }

            let outcome = self.backend.job_status(&self.job_id).await;
            if self.cancel.is_cancelled() {
                tracing::debug!(job_id = %self.job_id, "Discarding status response after cancellation");
                return;
            }

            let step = match outcome {
                Ok(report) => self.observe(report).await,
                Err(e) => self.on_error(e),
            };

            let delay = match step {
                Step::Poll(delay) => delay,
                Step::Stop => return,
            };

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!(job_id = %self.job_id, "Monitoring cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn observe(&mut self, report: StatusReport) -> Step {
        self.failures = 0;
        let target = MonitorState::from(report.status);

        if let Err(reason) = state_machine::validate_transition(self.state, target) {
            tracing::debug!(job_id = %self.job_id, %reason, "Ignoring status report");
            self.publish(|_| {});
            return Step::Poll(self.config.poll_interval);
        }
        self.state = target;

        match target {
            MonitorState::Pending => {
                self.publish(|_| {});
                Step::Poll(self.config.poll_interval)
            }
            MonitorState::Running => {
                let percent = self.progress.advance();
                tracing::debug!(job_id = %self.job_id, percent, "Job running");
                self.publish(|_| {});
                Step::Poll(self.config.poll_interval)
            }
            MonitorState::Failed => {
                self.progress.reset();
                tracing::warn!(job_id = %self.job_id, "Simulation failed on the backend");
                self.publish(|_| {});
                Step::Stop
            }
            MonitorState::Completed => {
                self.progress.complete();
                tracing::info!(job_id = %self.job_id, "Simulation completed");
                let completed_at = report.completed_at;
                self.publish(|snapshot| {
                    snapshot.completed_at = completed_at;
                    snapshot.results = ResultsState::Loading;
                });
                self.hydrate().await;
                Step::Stop
            }
            // Not reachable from a backend report.
            MonitorState::Idle => Step::Stop,
        }
    }

    async fn hydrate(&self) {
        let outcome = self.hydrator.fetch_results(&self.job_id).await;
        if self.cancel.is_cancelled() {
            tracing::debug!(job_id = %self.job_id, "Discarding results after cancellation");
            return;
        }

        let results = match outcome {
            Ok(results) => ResultsState::Ready(Arc::new(results)),
            Err(e) => ResultsState::Unavailable(e.to_string()),
        };
        self.publish(|snapshot| snapshot.results = results);
    }

    fn on_error(&mut self, error: ClientError) -> Step {
        if !error.is_transient() {
            tracing::error!(job_id = %self.job_id, error = %error, "Status polling halted");
            let reason = error.to_string();
            self.publish(|snapshot| snapshot.halted = Some(reason));
            return Step::Stop;
        }

        self.failures = self.failures.saturating_add(1);
        let attempt = self.failures;

        if let Some(max) = self.config.max_consecutive_failures {
            if attempt >= max {
                tracing::error!(
                    job_id = %self.job_id,
                    attempt,
                    error = %error,
                    "Status polling gave up",
                );
                let reason = format!("Gave up after {attempt} consecutive failures: {error}");
                self.publish(|snapshot| snapshot.halted = Some(reason));
                return Step::Stop;
            }
        }

        tracing::warn!(
            job_id = %self.job_id,
            attempt,
            error = %error,
            "Status query failed, retrying",
        );
        self.publish(|_| {});
        Step::Poll(self.config.retry_delay)
    }

    /// Publish the loop's current state plus `extra` changes.
    fn publish(&self, extra: impl FnOnce(&mut MonitorSnapshot)) -> bool {
        let state = self.state;
        let percent = self.progress.percent();
        let failures = self.failures;
        publish_with(&self.snapshot, &self.cancel, |snapshot| {
            snapshot.state = state;
            snapshot.percent = percent;
            snapshot.consecutive_failures = failures;
            extra(snapshot);
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
