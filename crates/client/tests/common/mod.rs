#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use surety_client::backend::JobBackend;
use surety_client::error::ClientError;
use surety_client::input::InputFile;
use surety_client::poller::{CancelHandle, MonitorSnapshot, PollerConfig};
use surety_client::wire::{JobRecord, RiskAnswer, RiskQuery, StatusReport};
use surety_core::job::{JobConfig, JobStatus};
use surety_core::lifecycle::ProgressConfig;
use surety_core::results::{ConfidenceInterval, ResultSet};
use surety_core::schema::{LENDING_COLUMNS, RECOVERY_COLUMNS};
use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Poller settings fast enough for tests.
pub fn fast_config() -> PollerConfig {
    PollerConfig {
        poll_interval: Duration::from_millis(5),
        retry_delay: Duration::from_millis(5),
        max_consecutive_failures: None,
        progress: ProgressConfig::default(),
    }
}

pub fn status(status: JobStatus) -> Result<StatusReport, ClientError> {
    Ok(StatusReport::new(status))
}

pub fn pending() -> Result<StatusReport, ClientError> {
    status(JobStatus::Pending)
}

pub fn running() -> Result<StatusReport, ClientError> {
    status(JobStatus::Running)
}

pub fn completed() -> Result<StatusReport, ClientError> {
    status(JobStatus::Completed)
}

pub fn failed() -> Result<StatusReport, ClientError> {
    status(JobStatus::Failed)
}

pub fn network_error() -> ClientError {
    ClientError::Network("connection reset".to_string())
}

/// A valid lending file with two data rows.
pub fn lending_file() -> InputFile {
    let header = LENDING_COLUMNS.join(";");
    InputFile::new(
        "lending.csv",
        format!("{header}\n2024-01-01;1;1;2;0;0;0;3;0;0;0;1\n2024-01-02;2;0;0;1;0;0;1;0;0;0;0\n"),
    )
}

/// A valid recovery file matching [`lending_file`] row for row.
pub fn recovery_file() -> InputFile {
    let header = RECOVERY_COLUMNS.join(";");
    let zeros = vec!["0"; RECOVERY_COLUMNS.len() - 3].join(";");
    InputFile::new(
        "recovery.csv",
        format!("{header}\n2024-01-01;1;10;{zeros}\n2024-01-02;2;0;{zeros}\n"),
    )
}

/// The result payload of end-to-end scenario 1.
pub fn sample_results() -> ResultSet {
    ResultSet {
        real_provision: Some(8500.5),
        simulated_provisions: vec![8100.0, 9050.0, 7800.0, 9900.0],
        percentiles: BTreeMap::from([
            ("95%".to_string(), 9600.0),
            ("97.5%".to_string(), 9800.0),
            ("99%".to_string(), 9900.0),
        ]),
        confidence_interval: Some(ConfidenceInterval {
            lower: 7800.0,
            upper: 9900.0,
            alpha: Some(0.95),
        }),
        real_cumulative: vec![1200.0, 5400.0, 8500.5, 7300.0],
        simulated_cumulative: None,
        x_axis_values: None,
    }
}

/// Wait for a poller to stop, failing the test instead of hanging.
pub async fn settle(handle: &mut CancelHandle) -> MonitorSnapshot {
    tokio::time::timeout(Duration::from_secs(5), handle.finished())
        .await
        .expect("poller did not stop in time")
}

// ---------------------------------------------------------------------------
// ScriptedBackend
// ---------------------------------------------------------------------------

/// Pauses one status call until the test releases it.
#[derive(Clone)]
pub struct Gate {
    pub at_call: usize,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// In-memory [`JobBackend`] answering status queries from a script.
///
/// When the status script runs out, the last entry repeats (or `running`
/// if the script was empty). Results default to [`sample_results`].
#[derive(Default)]
pub struct ScriptedBackend {
    statuses: Mutex<VecDeque<Result<StatusReport, ClientError>>>,
    last_status: Mutex<Option<Result<StatusReport, ClientError>>>,
    results: Mutex<VecDeque<Result<ResultSet, ClientError>>>,
    submit_failures: Mutex<VecDeque<ClientError>>,
    gate: Option<Gate>,
    queried: Mutex<Vec<String>>,
    status_calls: AtomicUsize,
    results_calls: AtomicUsize,
    submit_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(self, script: impl IntoIterator<Item = Result<StatusReport, ClientError>>) -> Self {
        self.statuses.lock().unwrap().extend(script);
        self
    }

    pub fn results(self, script: impl IntoIterator<Item = Result<ResultSet, ClientError>>) -> Self {
        self.results.lock().unwrap().extend(script);
        self
    }

    pub fn submit_failures(self, errors: impl IntoIterator<Item = ClientError>) -> Self {
        self.submit_failures.lock().unwrap().extend(errors);
        self
    }

    pub fn gate_at(mut self, at_call: usize) -> Self {
        self.gate = Some(Gate {
            at_call,
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        });
        self
    }

    pub fn gate(&self) -> Gate {
        self.gate.clone().expect("backend has no gate")
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn results_calls(&self) -> usize {
        self.results_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Number of status queries issued for `job_id`.
    pub fn calls_for(&self, job_id: &str) -> usize {
        self.queried
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == job_id)
            .count()
    }

    fn next_status(&self) -> Result<StatusReport, ClientError> {
        let mut last = self.last_status.lock().unwrap();
        match self.statuses.lock().unwrap().pop_front() {
            Some(next) => {
                *last = Some(next.clone());
                next
            }
            None => last.clone().unwrap_or_else(running),
        }
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn submit_job(
        &self,
        _config: &JobConfig,
        _lending: &InputFile,
        _recovery: &InputFile,
    ) -> Result<JobRecord, ClientError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(error) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(JobRecord {
            id: Some(format!("job-{n}")),
            status: Some(JobStatus::Pending),
            ..Default::default()
        })
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusReport, ClientError> {
        let call = self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.queried.lock().unwrap().push(job_id.to_string());
        let next = self.next_status();

        if let Some(gate) = &self.gate {
            if gate.at_call == call {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }
        next
    }

    async fn job_results(&self, _job_id: &str) -> Result<ResultSet, ClientError> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(sample_results()))
    }

    async fn list_jobs(&self) -> Result<Vec<JobRecord>, ClientError> {
        Ok(Vec::new())
    }

    async fn delete_job(&self, _job_id: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn calculate_risk(
        &self,
        _job_id: &str,
        query: &RiskQuery,
    ) -> Result<RiskAnswer, ClientError> {
        query.validate()?;
        Err(ClientError::NotCompleted)
    }
}
