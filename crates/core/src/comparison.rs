//! Side-by-side comparison of the two simulation methods on one file pair.

use serde::{Deserialize, Serialize};

use crate::job::Method;
use crate::results::{ConfidenceInterval, ResultSet};
use crate::types::JobId;

/// What one method produced, as needed for the comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodOutcome {
    pub method: Method,
    pub job_id: JobId,
    pub provision: Option<f64>,
    pub confidence_interval: Option<ConfidenceInterval>,
    /// Seconds from submission until the results were fetched.
    pub execution_secs: f64,
}

impl MethodOutcome {
    pub fn new(method: Method, job_id: JobId, results: &ResultSet, execution_secs: f64) -> Self {
        Self {
            method,
            job_id,
            provision: results.reference_provision(),
            confidence_interval: results.confidence_interval,
            execution_secs,
        }
    }

    /// Width of the confidence interval, `None` when it was not computed.
    pub fn interval_width(&self) -> Option<f64> {
        self.confidence_interval.map(|ci| ci.upper - ci.lower)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDifferences {
    /// `|provision_mc - provision_bootstrap|`, when both are known.
    pub provision_diff: Option<f64>,
    pub time_diff: f64,
    /// Method with the narrower interval. Ties go to bootstrap.
    pub more_precise: Option<Method>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodComparison {
    pub monte_carlo: MethodOutcome,
    pub bootstrap: MethodOutcome,
    pub differences: MethodDifferences,
}

/// Compare a Monte Carlo outcome with a bootstrap outcome.
pub fn compare(monte_carlo: MethodOutcome, bootstrap: MethodOutcome) -> MethodComparison {
    let provision_diff = monte_carlo
        .provision
        .zip(bootstrap.provision)
        .map(|(mc, bs)| (mc - bs).abs());

    let more_precise = monte_carlo
        .interval_width()
        .zip(bootstrap.interval_width())
        .map(|(mc, bs)| {
            if mc < bs {
                Method::MonteCarlo
            } else {
                Method::Bootstrap
            }
        });

    let differences = MethodDifferences {
        provision_diff,
        time_diff: (monte_carlo.execution_secs - bootstrap.execution_secs).abs(),
        more_precise,
    };

    MethodComparison {
        monte_carlo,
        bootstrap,
        differences,
    }
}
