//! Job submission behind the validation gate.

use std::sync::Arc;

use surety_core::job::{Job, JobConfig};
use surety_core::schema::FileRole;

use crate::backend::JobBackend;
use crate::error::ClientError;
use crate::input::InputFile;

/// Validates a job locally and sends it to the backend.
///
/// Never retries: network, auth and server failures go straight back to
/// the caller.
#[derive(Clone)]
pub struct JobSubmitter {
    backend: Arc<dyn JobBackend>,
}

impl JobSubmitter {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self { backend }
    }

    /// Submit one job. The configuration and both headers are checked
    /// before any request is made.
    pub async fn submit(
        &self,
        config: JobConfig,
        lending: &InputFile,
        recovery: &InputFile,
    ) -> Result<Job, ClientError> {
        config.validate()?;
        lending.validate(FileRole::Lending)?;
        recovery.validate(FileRole::Recovery)?;

        let record = self.backend.submit_job(&config, lending, recovery).await?;
        let job = record.into_job(config)?;

        tracing::info!(
            job_id = %job.id,
            method = %job.method,
            num_samples = job.num_samples,
            alpha = job.alpha,
            status = %job.status,
            "Simulation job submitted",
        );
        Ok(job)
    }
}
