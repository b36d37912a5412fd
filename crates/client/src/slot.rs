//! The "current job" slot.
//!
//! A [`JobSlot`] owns at most one [`CancelHandle`]. Every operation that
//! starts a monitor cancels the previous one first, and all of them take
//! `&mut self`, so two pollers can never write to the same slot.

use std::sync::Arc;

use surety_core::error::CoreError;
use surety_core::job::{Job, JobConfig};
use surety_core::lifecycle::MonitorState;
use surety_core::results::ResultSet;
use surety_core::synth::{self, ChartSeries, SynthesisConfig};
use surety_core::types::JobId;
use tokio::sync::watch;

use crate::backend::JobBackend;
use crate::error::ClientError;
use crate::hydrator::ResultHydrator;
use crate::input::InputFile;
use crate::poller::{CancelHandle, MonitorSnapshot, PollerConfig, ResultsState, StatusPoller};
use crate::submitter::JobSubmitter;

pub struct JobSlot {
    submitter: JobSubmitter,
    poller: StatusPoller,
    hydrator: ResultHydrator,
    synthesis: SynthesisConfig,
    current: Option<CancelHandle>,
}

impl JobSlot {
    pub fn new(backend: Arc<dyn JobBackend>, config: PollerConfig) -> Result<Self, CoreError> {
        Ok(Self {
            submitter: JobSubmitter::new(Arc::clone(&backend)),
            poller: StatusPoller::new(Arc::clone(&backend), config)?,
            hydrator: ResultHydrator::new(backend),
            synthesis: SynthesisConfig::default(),
            current: None,
        })
    }

    pub fn with_synthesis(mut self, synthesis: SynthesisConfig) -> Self {
        self.synthesis = synthesis;
        self
    }

    /// Submit a new job and monitor it in place of the current one.
    ///
    /// The previous monitor is only replaced once the backend accepted the
    /// new job; a rejected submission leaves it running.
    pub async fn submit(
        &mut self,
        config: JobConfig,
        lending: &InputFile,
        recovery: &InputFile,
    ) -> Result<Job, ClientError> {
        let job = self.submitter.submit(config, lending, recovery).await?;
        self.monitor(job.id.clone());
        Ok(job)
    }

    /// Attach to an existing job, cancelling whatever was monitored.
    pub fn monitor(&mut self, job_id: impl Into<JobId>) -> &CancelHandle {
        self.clear();
        self.current.insert(self.poller.start_monitoring(job_id))
    }

    /// Cancel the current monitor and return to idle.
    pub fn clear(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.cancel();
            tracing::debug!(job_id = previous.job_id(), "Monitor cancelled");
        }
    }

    pub fn current_job(&self) -> Option<&str> {
        self.current.as_ref().map(CancelHandle::job_id)
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.current
            .as_ref()
            .map(CancelHandle::snapshot)
            .unwrap_or_else(MonitorSnapshot::idle)
    }

    pub fn subscribe(&self) -> Option<watch::Receiver<MonitorSnapshot>> {
        self.current.as_ref().map(CancelHandle::subscribe)
    }

    /// Wait until the current monitor stops and return its last snapshot.
    pub async fn finished(&mut self) -> Result<MonitorSnapshot, ClientError> {
        match self.current.as_mut() {
            Some(handle) => Ok(handle.finished().await),
            None => Err(ClientError::NoActiveJob),
        }
    }

    /// Results of the current job, or why there are none.
    pub fn results(&self) -> Result<Arc<ResultSet>, ClientError> {
        let handle = self.current.as_ref().ok_or(ClientError::NoActiveJob)?;
        let snapshot = handle.snapshot();
        match (snapshot.state, snapshot.results) {
            (_, ResultsState::Ready(results)) => Ok(results),
            (MonitorState::Failed, _) => Err(ClientError::SimulationFailed {
                job_id: handle.job_id().to_string(),
            }),
            (MonitorState::Completed, ResultsState::Unavailable(reason)) => {
                Err(ClientError::ResultsUnavailable {
                    job_id: handle.job_id().to_string(),
                    reason,
                })
            }
            _ => Err(ClientError::NotCompleted),
        }
    }

    /// Chart series for the current job's results.
    pub fn chart_series(&self) -> Result<Vec<ChartSeries>, ClientError> {
        let results = self.results()?;
        Ok(synth::synthesize_with(&results, &self.synthesis))
    }

    /// Fetch the results again for a completed job whose first fetch
    /// failed. Does not resubmit.
    pub async fn retry_results(&mut self) -> Result<Arc<ResultSet>, ClientError> {
        let handle = self.current.as_ref().ok_or(ClientError::NoActiveJob)?;
        let snapshot = handle.snapshot();
        match (snapshot.state, snapshot.results) {
            (MonitorState::Completed, ResultsState::Ready(results)) => return Ok(results),
            (MonitorState::Completed, ResultsState::Unavailable(_)) => {}
            (MonitorState::Failed, _) => {
                return Err(ClientError::SimulationFailed {
                    job_id: handle.job_id().to_string(),
                })
            }
            _ => return Err(ClientError::NotCompleted),
        }

        tracing::info!(job_id = handle.job_id(), "Retrying results fetch");
        handle.publish_results(ResultsState::Loading);

        match self.hydrator.fetch_results(handle.job_id()).await {
            Ok(results) => {
                let results = Arc::new(results);
                handle.publish_results(ResultsState::Ready(Arc::clone(&results)));
                Ok(results)
            }
            Err(e) => {
                handle.publish_results(ResultsState::Unavailable(e.to_string()));
                Err(e)
            }
        }
    }
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        self.clear();
    }
}
