//! Chart series synthesis from a [`ResultSet`].
//!
//! Pure and deterministic: the same result always yields the same series,
//! bit for bit, so re-rendering never moves previously drawn points. When
//! the backend did not send full simulated trajectories, stand-ins are
//! derived from the provision ratios and a fixed sine pattern of the
//! sample and step indices. No random source is involved.

use serde::{Deserialize, Serialize};

use crate::results::ResultSet;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Most simulated series emitted for one result.
pub const DEFAULT_MAX_SIMULATED_SERIES: usize = 20;

/// Period range spread over a trajectory when no x-axis is supplied.
pub const DEFAULT_PERIOD_SPAN: f64 = 2000.0;

/// Label of the series built from the real data.
pub const REAL_SERIES_LABEL: &str = "Real";

/// Distance between the phases of consecutive fallback samples.
const FALLBACK_SEED_STRIDE: f64 = 1000.0;

/// Centre of the fallback scale factor.
const FALLBACK_FACTOR_BASE: f64 = 0.5;

/// Amplitude of the fallback scale factor (keeps it within 0.2..=0.8).
const FALLBACK_FACTOR_AMPLITUDE: f64 = 0.3;

/// Fallback additive wobble as a fraction of the real provision.
const FALLBACK_VARIATION_SHARE: f64 = 0.1;

/// Step multiplier of the slow fallback wobble.
const FALLBACK_VARIATION_RATE: f64 = 0.1;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Real,
    Simulated,
}

/// One plotted point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub period: f64,
    pub value: f64,
    pub label: String,
}

/// An ordered run of points sharing one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub kind: SeriesKind,
    pub label: String,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    fn from_values(kind: SeriesKind, label: String, values: &[f64], periods: &[f64]) -> Self {
        let points = values
            .iter()
            .enumerate()
            .map(|(index, value)| ChartPoint {
                period: period_at(periods, index),
                value: *value,
                label: label.clone(),
            })
            .collect();
        Self {
            kind,
            label,
            points,
        }
    }

    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|point| point.value)
    }
}

/// Tuning for [`synthesize_with`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    pub max_series: usize,
    pub period_span: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_series: DEFAULT_MAX_SIMULATED_SERIES,
            period_span: DEFAULT_PERIOD_SPAN,
        }
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Build the real series followed by up to 20 simulated series.
pub fn synthesize(result: &ResultSet) -> Vec<ChartSeries> {
    synthesize_with(result, &SynthesisConfig::default())
}

/// Build chart series with explicit limits.
///
/// Returns an empty vector when the result has no real trajectory, since
/// there is nothing to anchor the simulated series to.
pub fn synthesize_with(result: &ResultSet, config: &SynthesisConfig) -> Vec<ChartSeries> {
    if result.real_cumulative.is_empty() {
        return Vec::new();
    }

    let mut series = Vec::with_capacity(config.max_series + 1);
    series.push(ChartSeries::from_values(
        SeriesKind::Real,
        REAL_SERIES_LABEL.to_string(),
        &result.real_cumulative,
        &periods_for(result, result.real_cumulative.len(), config),
    ));

    match result.simulated_cumulative.as_deref() {
        Some(trajectories) if result.has_simulated_trajectories() => {
            series.extend(
                trajectories
                    .iter()
                    .take(config.max_series)
                    .enumerate()
                    .map(|(i, trajectory)| {
                        ChartSeries::from_values(
                            SeriesKind::Simulated,
                            simulated_label(i),
                            trajectory,
                            &periods_for(result, trajectory.len(), config),
                        )
                    }),
            );
        }
        _ => series.extend(fallback_series(result, config)),
    }

    series
}

/// Derive stand-in trajectories from `simulated_provisions`.
///
/// `real_provision` below is [`ResultSet::reference_provision`].
/// Value at step `j` of sample `i` with `seed = i * 1000`:
/// `real[j] * (provision_i / real_provision) * (0.5 + 0.3 sin(seed + j))
///  + sin(seed + 0.1 j) * 0.1 real_provision`.
fn fallback_series(result: &ResultSet, config: &SynthesisConfig) -> Vec<ChartSeries> {
    let periods = periods_for(result, result.real_cumulative.len(), config);
    let steps = result.real_cumulative.len().min(periods.len());
    let real = &result.real_cumulative[..steps];
    let real_provision = result.reference_provision().unwrap_or(0.0);

    result
        .simulated_provisions
        .iter()
        .take(config.max_series)
        .enumerate()
        .map(|(i, provision)| {
            let seed = i as f64 * FALLBACK_SEED_STRIDE;
            let ratio = provision_ratio(*provision, real_provision);
            let values: Vec<f64> = real
                .iter()
                .enumerate()
                .map(|(j, real_value)| {
                    let step = j as f64;
                    let factor =
                        FALLBACK_FACTOR_BASE + (seed + step).sin() * FALLBACK_FACTOR_AMPLITUDE;
                    let variation = (seed + step * FALLBACK_VARIATION_RATE).sin()
                        * (real_provision * FALLBACK_VARIATION_SHARE);
                    real_value * ratio * factor + variation
                })
                .collect();
            ChartSeries::from_values(SeriesKind::Simulated, simulated_label(i), &values, &periods)
        })
        .collect()
}

/// `provision / real_provision`, or 0 when the ratio is undefined.
fn provision_ratio(provision: f64, real_provision: f64) -> f64 {
    if real_provision == 0.0 {
        return 0.0;
    }
    let ratio = provision / real_provision;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Period labels for a trajectory of `len` points.
///
/// Uses the backend's x-axis when present; otherwise spreads `0..=span`
/// evenly (rounded to whole periods) across the trajectory.
fn periods_for(result: &ResultSet, len: usize, config: &SynthesisConfig) -> Vec<f64> {
    if let Some(axis) = result.x_axis_values.as_ref().filter(|axis| !axis.is_empty()) {
        return axis.clone();
    }
    interpolated_periods(len, config.period_span)
}

fn interpolated_periods(len: usize, span: f64) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let last = (len - 1) as f64;
            (0..len)
                .map(|i| ((i as f64 / last) * span).round())
                .collect()
        }
    }
}

/// Period for `index`, falling back to the 1-based index past the axis end.
fn period_at(periods: &[f64], index: usize) -> f64 {
    periods
        .get(index)
        .copied()
        .unwrap_or((index + 1) as f64)
}

fn simulated_label(index: usize) -> String {
    format!("Simulation {}", index + 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::results::ConfidenceInterval;

    fn base_result() -> ResultSet {
        ResultSet {
            real_provision: Some(8500.5),
            simulated_provisions: vec![8000.0, 9000.0, 7000.0],
            percentiles: BTreeMap::new(),
            confidence_interval: Some(ConfidenceInterval {
                lower: 7000.0,
                upper: 9500.0,
                alpha: Some(0.95),
            }),
            real_cumulative: vec![1200.0, 5400.0, 8500.5, 7300.0, 6100.0],
            simulated_cumulative: None,
            x_axis_values: None,
        }
    }

    #[test]
    fn empty_real_trajectory_yields_nothing() {
        let mut result = base_result();
        result.real_cumulative.clear();
        assert!(synthesize(&result).is_empty());
    }

    #[test]
    fn real_series_comes_first_and_matches_input() {
        let result = base_result();
        let series = synthesize(&result);
        let real = &series[0];
        assert_eq!(real.kind, SeriesKind::Real);
        assert_eq!(real.label, REAL_SERIES_LABEL);
        let values: Vec<f64> = real.points.iter().map(|p| p.value).collect();
        assert_eq!(values, result.real_cumulative);
    }

    #[test]
    fn interpolates_periods_over_span() {
        let result = base_result();
        let series = synthesize(&result);
        let periods: Vec<f64> = series[0].points.iter().map(|p| p.period).collect();
        assert_eq!(periods, vec![0.0, 500.0, 1000.0, 1500.0, 2000.0]);
    }

    #[test]
    fn single_point_trajectory_sits_at_period_zero() {
        assert_eq!(interpolated_periods(1, 2000.0), vec![0.0]);
        assert!(interpolated_periods(0, 2000.0).is_empty());
    }

    #[test]
    fn uses_backend_x_axis_and_indexes_past_its_end() {
        let mut result = base_result();
        result.x_axis_values = Some(vec![10.0, 20.0, 30.0]);
        let series = synthesize(&result);
        let periods: Vec<f64> = series[0].points.iter().map(|p| p.period).collect();
        assert_eq!(periods, vec![10.0, 20.0, 30.0, 4.0, 5.0]);
    }

    #[test]
    fn full_trajectories_are_used_verbatim() {
        let mut result = base_result();
        result.simulated_cumulative = Some(vec![vec![1.0, 2.0], vec![3.0, 4.0, 5.0]]);
        let series = synthesize(&result);

        assert_eq!(series.len(), 3);
        assert_eq!(series[1].label, "Simulation 1");
        assert_eq!(series[1].kind, SeriesKind::Simulated);
        let values: Vec<f64> = series[2].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![3.0, 4.0, 5.0]);
        let periods: Vec<f64> = series[2].points.iter().map(|p| p.period).collect();
        assert_eq!(periods, vec![0.0, 1000.0, 2000.0]);
    }

    #[test]
    fn simulated_series_are_capped() {
        let mut result = base_result();
        result.simulated_cumulative = Some(vec![vec![1.0, 2.0]; 35]);
        assert_eq!(synthesize(&result).len(), 1 + DEFAULT_MAX_SIMULATED_SERIES);

        let mut fallback = base_result();
        fallback.simulated_provisions = vec![8000.0; 50];
        assert_eq!(synthesize(&fallback).len(), 1 + DEFAULT_MAX_SIMULATED_SERIES);
    }

    #[test]
    fn fallback_used_when_trajectories_empty() {
        let mut result = base_result();
        result.simulated_cumulative = Some(Vec::new());
        let series = synthesize(&result);
        assert_eq!(series.len(), 1 + result.simulated_provisions.len());
        assert!(series[1..]
            .iter()
            .all(|s| s.points.len() == result.real_cumulative.len()));
    }

    #[test]
    fn fallback_follows_the_sine_formula() {
        let result = base_result();
        let series = synthesize(&result);

        // Sample 1 (index 1): seed = 1000, ratio = 9000 / 8500.5.
        let ratio = 9000.0 / 8500.5;
        let j = 2.0_f64;
        let factor = 0.5 + (1000.0 + j).sin() * 0.3;
        let variation = (1000.0 + j * 0.1).sin() * (8500.5 * 0.1);
        let expected = 8500.5 * ratio * factor + variation;

        assert_eq!(series[2].points[2].value, expected);
    }

    #[test]
    fn fallback_with_zero_real_provision_stays_finite() {
        let mut result = base_result();
        result.real_provision = Some(0.0);
        let series = synthesize(&result);
        assert!(series
            .iter()
            .flat_map(|s| s.points.iter())
            .all(|p| p.value.is_finite()));
    }

    #[test]
    fn sparse_result_still_charts_against_trajectory_peak() {
        let result: ResultSet = serde_json::from_value(serde_json::json!({
            "real_provision": null,
            "simulated_provisions": [9000.0],
            "percentiles": {},
            "confidence_interval": {},
            "real_cumulative": [1200.0, 8500.5]
        }))
        .unwrap();

        let series = synthesize(&result);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].last_value(), Some(8500.5));

        // Same numbers as a payload that reported the peak explicitly.
        let mut explicit = result.clone();
        explicit.real_provision = Some(8500.5);
        assert_eq!(series, synthesize(&explicit));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let result = base_result();
        assert_eq!(synthesize(&result), synthesize(&result));

        let mut with_trajectories = base_result();
        with_trajectories.simulated_cumulative = Some(vec![vec![4.0, 5.0, 6.0]]);
        assert_eq!(
            synthesize(&with_trajectories),
            synthesize(&with_trajectories)
        );
    }

    #[test]
    fn does_not_mutate_input() {
        let result = base_result();
        let before = result.clone();
        let _ = synthesize(&result);
        assert_eq!(result, before);
    }

    #[test]
    fn custom_config_limits_series_and_span() {
        let result = base_result();
        let config = SynthesisConfig {
            max_series: 1,
            period_span: 100.0,
        };
        let series = synthesize_with(&result, &config);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].points.last().unwrap().period, 100.0);
    }
}
