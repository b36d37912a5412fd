//! Result payload of a completed simulation and derived risk zones.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::provision;

/// Lower/upper bounds of the provision estimate at the job's `alpha`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
}

/// Statistics returned by the backend for a completed job.
///
/// Immutable once fetched. Every field may be missing: with fewer than two
/// usable samples the backend stores an empty interval and percentile map,
/// and `real_provision` is nullable. `simulated_cumulative` and
/// `x_axis_values` are only present when the backend computed full
/// trajectories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub real_provision: Option<f64>,
    #[serde(default)]
    pub simulated_provisions: Vec<f64>,
    #[serde(default)]
    pub percentiles: BTreeMap<String, f64>,
    #[serde(
        default,
        deserialize_with = "interval_or_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence_interval: Option<ConfidenceInterval>,
    #[serde(default)]
    pub real_cumulative: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated_cumulative: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis_values: Option<Vec<f64>>,
}

impl ResultSet {
    /// Look up a percentile by label, accepting both `"95%"` and `"p95"`
    /// spellings (`"97.5%"` / `"p97_5"`).
    pub fn percentile(&self, label: &str) -> Option<f64> {
        if let Some(value) = self.percentiles.get(label) {
            return Some(*value);
        }
        let alternate = match label.strip_suffix('%') {
            Some(number) => format!("p{}", number.replace('.', "_")),
            None => format!(
                "{}%",
                label.strip_prefix('p').unwrap_or(label).replace('_', ".")
            ),
        };
        self.percentiles.get(&alternate).copied()
    }

    /// The backend's real provision, or the peak of the real trajectory
    /// when it was left null.
    pub fn reference_provision(&self) -> Option<f64> {
        self.real_provision
            .or_else(|| provision::provision(&self.real_cumulative))
    }

    /// Whether the backend supplied at least one full simulated trajectory.
    pub fn has_simulated_trajectories(&self) -> bool {
        self.simulated_cumulative
            .as_ref()
            .is_some_and(|trajectories| !trajectories.is_empty())
    }

    pub fn risk_zone(&self, provision: f64) -> RiskZone {
        RiskZone::classify(self, provision)
    }
}

/// An interval object without bounds (`{}`) counts as absent.
fn interval_or_empty<'de, D>(deserializer: D) -> Result<Option<ConfidenceInterval>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawInterval {
        Bounds(ConfidenceInterval),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<RawInterval>::deserialize(deserializer)? {
        Some(RawInterval::Bounds(interval)) => Some(interval),
        Some(RawInterval::Other(_)) | None => None,
    })
}

// ---------------------------------------------------------------------------
// Risk zones
// ---------------------------------------------------------------------------

/// Severity band of a provision relative to the simulated distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskZone {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskZone {
    /// Classify `provision` against the 95%, 97.5% and 99% percentiles.
    ///
    /// A missing percentile never places the provision in its band.
    pub fn classify(result: &ResultSet, provision: f64) -> RiskZone {
        let at_least = |label: &str| {
            result
                .percentile(label)
                .is_some_and(|threshold| provision >= threshold)
        };

        if at_least("99%") {
            RiskZone::Critical
        } else if at_least("97.5%") {
            RiskZone::High
        } else if at_least("95%") {
            RiskZone::Medium
        } else {
            RiskZone::Low
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
