//! Error taxonomy for everything that talks to the simulation backend.

use surety_core::error::CoreError;
use surety_core::types::JobId;

/// Errors from submitting, monitoring or reading a simulation job.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Rejected locally before any request was sent. Never retried.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// No usable response (connect failure, timeout, truncated body).
    #[error("Network error: {0}")]
    Network(String),

    /// The backend refused the credentials.
    #[error("Authentication rejected by backend (HTTP {status})")]
    Auth { status: u16 },

    /// Any other non-2xx response.
    #[error("Backend error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// The backend answered with a body we cannot interpret.
    #[error("Unexpected backend response: {0}")]
    Protocol(String),

    #[error("Simulation {job_id} failed on the backend")]
    SimulationFailed { job_id: JobId },

    /// The job completed but its results could not be fetched.
    #[error("Results for job {job_id} are unavailable: {reason}")]
    ResultsUnavailable { job_id: JobId, reason: String },

    /// Polling stopped before the job reached a terminal status.
    #[error("Monitoring of job {job_id} stopped: {reason}")]
    MonitoringHalted { job_id: JobId, reason: String },

    #[error("No job is being monitored")]
    NoActiveJob,

    #[error("Job has not completed yet")]
    NotCompleted,
}

impl ClientError {
    /// Whether the status poller should keep trying after this error.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Protocol(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}
