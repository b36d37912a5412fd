//! Request and response bodies exchanged with the backend.

use serde::{Deserialize, Deserializer, Serialize};
use surety_core::error::CoreError;
use surety_core::job::{Job, JobConfig, JobStatus, Method};
use surety_core::types::{JobId, Timestamp};

use crate::error::ClientError;

/// Smallest risk level (percent) accepted by `calculate_risk`.
pub const MIN_RISK_LEVEL: f64 = 0.1;

/// Largest risk level (percent) accepted by `calculate_risk`.
pub const MAX_RISK_LEVEL: f64 = 99.9;

// ---------------------------------------------------------------------------
// Job records
// ---------------------------------------------------------------------------

/// A job as serialized by the backend (`POST /jobs`, `GET /jobs`).
///
/// Every field is optional on the wire; [`JobRecord::into_job`] decides
/// which ones are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default, deserialize_with = "opt_job_id")]
    pub id: Option<JobId>,
    #[serde(default)]
    pub method: Option<Method>,
    #[serde(default)]
    pub num_samples: Option<u32>,
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

impl JobRecord {
    /// Build a [`Job`], filling fields the backend omitted from `submitted`.
    ///
    /// A missing id is a protocol error; a missing status means `pending`.
    pub fn into_job(self, submitted: JobConfig) -> Result<Job, ClientError> {
        let id = self.id.ok_or_else(|| {
            ClientError::Protocol("job response does not contain an id".to_string())
        })?;

        Ok(Job {
            id,
            method: self.method.unwrap_or(submitted.method),
            num_samples: self.num_samples.unwrap_or(submitted.num_samples),
            alpha: self.alpha.unwrap_or(submitted.alpha),
            status: self.status.unwrap_or(JobStatus::Pending),
            created_at: self.created_at.unwrap_or_else(chrono::Utc::now),
            completed_at: self.completed_at,
        })
    }
}

/// `GET /jobs` answers either a bare array or a paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum JobList {
    Plain(Vec<JobRecord>),
    Page { results: Vec<JobRecord> },
}

impl JobList {
    pub(crate) fn into_records(self) -> Vec<JobRecord> {
        match self {
            JobList::Plain(records) | JobList::Page { results: records } => records,
        }
    }
}

/// Body of `GET /jobs/{id}/status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusReport {
    #[serde(default, deserialize_with = "opt_job_id")]
    pub id: Option<JobId>,
    pub status: JobStatus,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

impl StatusReport {
    pub fn new(status: JobStatus) -> Self {
        Self {
            id: None,
            status,
            created_at: None,
            completed_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Risk calculation
// ---------------------------------------------------------------------------

/// Body of `POST /jobs/{id}/calculate_risk`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "calculation_type", rename_all = "snake_case")]
pub enum RiskQuery {
    /// Provision needed to cover `risk_level` percent of simulated outcomes.
    RiskToProvision { risk_level: f64 },
    /// Share of simulated outcomes exceeding `target_provision`.
    ProvisionToRisk { target_provision: f64 },
}

impl RiskQuery {
    pub fn validate(&self) -> Result<(), CoreError> {
        match *self {
            RiskQuery::RiskToProvision { risk_level } => {
                if !(MIN_RISK_LEVEL..=MAX_RISK_LEVEL).contains(&risk_level) {
                    return Err(CoreError::Config(format!(
                        "risk_level must be between {MIN_RISK_LEVEL} and {MAX_RISK_LEVEL}, got {risk_level}"
                    )));
                }
            }
            RiskQuery::ProvisionToRisk { target_provision } => {
                if !target_provision.is_finite() || target_provision < 0.0 {
                    return Err(CoreError::Config(format!(
                        "target_provision must be a non-negative number, got {target_provision}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Answer of the risk calculation; which fields are set depends on the
/// query direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnswer {
    pub risk_level: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provision_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_provision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

/// Accept an id as either a JSON string or integer; blank means absent.
fn opt_job_id<'de, D>(deserializer: D) -> Result<Option<JobId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawId>::deserialize(deserializer)?;
    Ok(raw
        .map(|raw| match raw {
            RawId::Text(text) => text.trim().to_string(),
            RawId::Number(number) => number.to_string(),
        })
        .filter(|id| !id.is_empty()))
}

/// Pull a human-readable message out of an error body.
///
/// Looks at the `error` and `detail` fields first and falls back to the
/// raw text.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail", "message"] {
            if let Some(serde_json::Value::String(message)) = map.get(key) {
                return message.clone();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "<empty body>".to_string()
    } else {
        trimmed.to_string()
    }
}
