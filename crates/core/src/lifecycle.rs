//! Job monitor state machine and synthetic progress.
//!
//! The backend only reports a coarse status, so the percentage shown to
//! users is synthesized: a fixed step per `running` observation, capped
//! below 100 until completion is confirmed.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::job::JobStatus;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Percentage added for every `running` observation.
pub const DEFAULT_PROGRESS_INCREMENT: u8 = 5;

/// Highest synthetic percentage before the backend confirms completion.
pub const DEFAULT_PROGRESS_CEILING: u8 = 85;

/// Percentage reported once the job has completed.
pub const PROGRESS_COMPLETE: u8 = 100;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Lifecycle of the job tracked by one monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    /// Nothing submitted yet.
    Idle,
    Pending,
    Running,
    Completed,
    Failed,
}

impl MonitorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MonitorState::Completed | MonitorState::Failed)
    }
}

impl From<JobStatus> for MonitorState {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => MonitorState::Pending,
            JobStatus::Running => MonitorState::Running,
            JobStatus::Completed => MonitorState::Completed,
            JobStatus::Failed => MonitorState::Failed,
        }
    }
}

pub mod state_machine {
    use super::MonitorState::{self, *};

    /// Returns the states reachable from `from`.
    ///
    /// Repeated `pending`/`running` reports are self-transitions; terminal
    /// states return an empty slice.
    pub fn valid_transitions(from: MonitorState) -> &'static [MonitorState] {
        match from {
            Idle => &[Pending],
            Pending => &[Pending, Running, Completed, Failed],
            Running => &[Running, Completed, Failed],
            Completed | Failed => &[],
        }
    }

    pub fn can_transition(from: MonitorState, to: MonitorState) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a transition, returning an error message for invalid ones.
    pub fn validate_transition(from: MonitorState, to: MonitorState) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!("Invalid monitor transition: {from:?} -> {to:?}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Tuning for the synthetic progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressConfig {
    pub increment: u8,
    pub ceiling: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            increment: DEFAULT_PROGRESS_INCREMENT,
            ceiling: DEFAULT_PROGRESS_CEILING,
        }
    }
}

impl ProgressConfig {
    /// The ceiling must stay strictly below 100 so that only a confirmed
    /// completion ever reports 100%.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.increment == 0 {
            return Err(CoreError::Config(
                "Progress increment must be greater than zero".to_string(),
            ));
        }
        if self.ceiling >= PROGRESS_COMPLETE {
            return Err(CoreError::Config(format!(
                "Progress ceiling must be below {PROGRESS_COMPLETE}, got {}",
                self.ceiling
            )));
        }
        Ok(())
    }
}

/// Synthetic completion percentage for a single job.
///
/// Non-decreasing except for [`reset`](Self::reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    percent: u8,
    config: ProgressConfig,
}

impl ProgressState {
    /// A ceiling of 100 or more is capped at 99; only
    /// [`complete`](Self::complete) reaches 100.
    pub fn new(config: ProgressConfig) -> Self {
        let config = ProgressConfig {
            ceiling: config.ceiling.min(PROGRESS_COMPLETE - 1),
            ..config
        };
        Self { percent: 0, config }
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Apply one `running` observation.
    ///
    /// Never lowers the value: a percentage already above the ceiling
    /// (only possible after completion) is left untouched.
    pub fn advance(&mut self) -> u8 {
        if self.percent < self.config.ceiling {
            self.percent = self
                .percent
                .saturating_add(self.config.increment)
                .min(self.config.ceiling);
        }
        self.percent
    }

    pub fn complete(&mut self) -> u8 {
        self.percent = PROGRESS_COMPLETE;
        self.percent
    }

    pub fn reset(&mut self) -> u8 {
        self.percent = 0;
        self.percent
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
