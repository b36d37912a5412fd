//! Fetches the result payload of a completed job.

use std::sync::Arc;

use surety_core::results::ResultSet;

use crate::backend::JobBackend;
use crate::error::ClientError;

#[derive(Clone)]
pub struct ResultHydrator {
    backend: Arc<dyn JobBackend>,
}

impl ResultHydrator {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self { backend }
    }

    /// Fetch the results of `job_id`.
    ///
    /// Any failure is reported as [`ClientError::ResultsUnavailable`] so it
    /// is never mistaken for a failed simulation; the caller may retry
    /// without resubmitting. Validation errors pass through unchanged.
    pub async fn fetch_results(&self, job_id: &str) -> Result<ResultSet, ClientError> {
        match self.backend.job_results(job_id).await {
            Ok(results) => {
                tracing::info!(
                    job_id,
                    real_provision = ?results.real_provision,
                    samples = results.simulated_provisions.len(),
                    "Results fetched",
                );
                Ok(results)
            }
            Err(e @ ClientError::Validation(_)) => Err(e),
            Err(e) => {
                tracing::warn!(job_id, error = %e, "Results unavailable");
                Err(ClientError::ResultsUnavailable {
                    job_id: job_id.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
