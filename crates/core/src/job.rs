//! Simulation job types shared by the submitter, poller and CLI.
//!
//! The bounds on `num_samples` and `alpha` are enforced here so that an
//! out-of-range configuration is rejected before any request is built.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Smallest number of simulated samples the backend accepts.
pub const MIN_NUM_SAMPLES: u32 = 10;

/// Largest number of simulated samples the backend accepts.
pub const MAX_NUM_SAMPLES: u32 = 15_000;

/// Lowest confidence level accepted for `alpha`.
pub const MIN_ALPHA: f64 = 0.5;

/// Highest confidence level accepted for `alpha`.
pub const MAX_ALPHA: f64 = 0.999;

/// Default sample count offered to users.
pub const DEFAULT_NUM_SAMPLES: u32 = 1000;

/// Default confidence level offered to users.
pub const DEFAULT_ALPHA: f64 = 0.95;

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

/// Resampling method run by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "montecarlo")]
    MonteCarlo,
    #[serde(rename = "bootstrap")]
    Bootstrap,
}

impl Method {
    /// Wire name used in request bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::MonteCarlo => "montecarlo",
            Method::Bootstrap => "bootstrap",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "montecarlo" | "monte_carlo" | "monte-carlo" => Ok(Method::MonteCarlo),
            "bootstrap" => Ok(Method::Bootstrap),
            other => Err(CoreError::Config(format!(
                "Unknown method '{other}', expected 'montecarlo' or 'bootstrap'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Status string reported by the backend for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and Failed end the lifecycle; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// JobConfig
// ---------------------------------------------------------------------------

/// Parameters chosen by the analyst for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub method: Method,
    pub num_samples: u32,
    pub alpha: f64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            method: Method::MonteCarlo,
            num_samples: DEFAULT_NUM_SAMPLES,
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl JobConfig {
    /// Check `num_samples` and `alpha` against their allowed ranges.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(MIN_NUM_SAMPLES..=MAX_NUM_SAMPLES).contains(&self.num_samples) {
            return Err(CoreError::Config(format!(
                "num_samples must be between {MIN_NUM_SAMPLES} and {MAX_NUM_SAMPLES}, got {}",
                self.num_samples
            )));
        }
        // NaN fails the range check as well.
        if !(MIN_ALPHA..=MAX_ALPHA).contains(&self.alpha) {
            return Err(CoreError::Config(format!(
                "alpha must be between {MIN_ALPHA} and {MAX_ALPHA}, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One submitted simulation, as known to the client.
///
/// The identifier never changes; `status` and `completed_at` only follow
/// what the backend reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub method: Method,
    pub num_samples: u32,
    pub alpha: f64,
    pub status: JobStatus,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    pub fn config(&self) -> JobConfig {
        JobConfig {
            method: self.method,
            num_samples: self.num_samples,
            alpha: self.alpha,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
