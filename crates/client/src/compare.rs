//! Runs both simulation methods on one file pair and compares them.

use std::sync::Arc;

use surety_core::comparison::{self, MethodComparison, MethodOutcome};
use surety_core::error::CoreError;
use surety_core::job::{JobConfig, Method};
use tokio::time::Instant;

use crate::backend::JobBackend;
use crate::error::ClientError;
use crate::input::InputFile;
use crate::poller::PollerConfig;
use crate::slot::JobSlot;

/// Drives a Monte Carlo job and a bootstrap job side by side.
///
/// Each job gets its own [`JobSlot`], so the two monitors never share
/// state.
#[derive(Clone)]
pub struct MethodComparer {
    backend: Arc<dyn JobBackend>,
    config: PollerConfig,
}

impl MethodComparer {
    pub fn new(backend: Arc<dyn JobBackend>, config: PollerConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self { backend, config })
    }

    /// Submit both methods with the same `num_samples` and `alpha`, follow
    /// them to completion and compare the outcomes.
    ///
    /// The first failure wins. The other job's monitor is cancelled when
    /// its slot is dropped.
    pub async fn compare(
        &self,
        num_samples: u32,
        alpha: f64,
        lending: &InputFile,
        recovery: &InputFile,
    ) -> Result<MethodComparison, ClientError> {
        let job_config = |method| JobConfig {
            method,
            num_samples,
            alpha,
        };
        let mut monte_carlo = JobSlot::new(Arc::clone(&self.backend), self.config)?;
        let mut bootstrap = JobSlot::new(Arc::clone(&self.backend), self.config)?;

        let (monte_carlo, bootstrap) = tokio::try_join!(
            run_method(&mut monte_carlo, job_config(Method::MonteCarlo), lending, recovery),
            run_method(&mut bootstrap, job_config(Method::Bootstrap), lending, recovery),
        )?;

        let comparison = comparison::compare(monte_carlo, bootstrap);
        tracing::info!(
            provision_diff = ?comparison.differences.provision_diff,
            time_diff = comparison.differences.time_diff,
            more_precise = ?comparison.differences.more_precise,
            "Methods compared",
        );
        Ok(comparison)
    }
}

async fn run_method(
    slot: &mut JobSlot,
    config: JobConfig,
    lending: &InputFile,
    recovery: &InputFile,
) -> Result<MethodOutcome, ClientError> {
    let started = Instant::now();
    let job = slot.submit(config, lending, recovery).await?;

    let snapshot = slot.finished().await?;
    if let Some(reason) = snapshot.halted {
        return Err(ClientError::MonitoringHalted {
            job_id: job.id,
            reason,
        });
    }
    let results = slot.results()?;

    let outcome = MethodOutcome::new(
        config.method,
        job.id,
        &results,
        started.elapsed().as_secs_f64(),
    );
    tracing::info!(
        job_id = %outcome.job_id,
        method = %config.method,
        execution_secs = outcome.execution_secs,
        "Method finished",
    );
    Ok(outcome)
}
