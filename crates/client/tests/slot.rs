//! Job slot lifecycle: one live monitor, submission gating, results access.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::*;
use surety_client::error::ClientError;
use surety_client::input::InputFile;
use surety_client::poller::ResultsState;
use surety_client::slot::JobSlot;
use surety_core::error::CoreError;
use surety_core::job::{JobConfig, JobStatus, Method};
use surety_core::lifecycle::{MonitorState, ProgressConfig};
use surety_core::synth::SeriesKind;

fn scenario_config() -> JobConfig {
    JobConfig {
        method: Method::MonteCarlo,
        num_samples: 1000,
        alpha: 0.95,
    }
}

async fn finish(slot: &mut JobSlot) -> surety_client::poller::MonitorSnapshot {
    tokio::time::timeout(Duration::from_secs(5), slot.finished())
        .await
        .expect("slot did not settle in time")
        .expect("slot has no active job")
}

// ---- Test: end-to-end scenario 1 ----

#[tokio::test]
async fn submit_monitor_hydrate_and_synthesize() {
    let backend = Arc::new(ScriptedBackend::new().statuses([
        pending(),
        running(),
        running(),
        running(),
        completed(),
    ]));
    let mut slot = JobSlot::new(backend.clone(), fast_config()).unwrap();

    let job = slot
        .submit(scenario_config(), &lending_file(), &recovery_file())
        .await
        .unwrap();
    assert_eq!(job.id, "job-1");
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(slot.current_job(), Some("job-1"));

    let snapshot = finish(&mut slot).await;
    assert_eq!(snapshot.state, MonitorState::Completed);
    assert_eq!(snapshot.percent, 100);

    let results = slot.results().unwrap();
    assert_eq!(results.real_provision, Some(8500.5));

    let series = slot.chart_series().unwrap();
    assert_eq!(series[0].kind, SeriesKind::Real);
    assert_eq!(series[0].last_value(), results.real_cumulative.last().copied());
    assert_eq!(series.len(), 1 + results.simulated_provisions.len());
    assert_eq!(slot.chart_series().unwrap(), series);
}

// ---- Test: single live monitor ----

#[tokio::test]
async fn new_submission_cancels_previous_monitor() {
    let backend = Arc::new(ScriptedBackend::new().statuses([running()]));
    let mut slot = JobSlot::new(backend.clone(), fast_config()).unwrap();

    slot.submit(scenario_config(), &lending_file(), &recovery_file())
        .await
        .unwrap();
    let mut first = slot.subscribe().unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    slot.submit(scenario_config(), &lending_file(), &recovery_file())
        .await
        .unwrap();
    assert_eq!(slot.current_job(), Some("job-2"));

    let first_calls = backend.calls_for("job-1");
    assert!(first_calls > 0);
    tokio::time::sleep(Duration::from_millis(40)).await;

    assert_eq!(backend.calls_for("job-1"), first_calls);
    assert!(backend.calls_for("job-2") > 0);

    // The first poller's task is gone, closing its channel.
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while first.changed().await.is_ok() {}
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn rejected_submission_keeps_current_monitor() {
    let backend = Arc::new(ScriptedBackend::new().submit_failures([network_error()]));
    let mut slot = JobSlot::new(backend.clone(), fast_config()).unwrap();
    slot.monitor("job-0");

    let err = slot
        .submit(scenario_config(), &lending_file(), &recovery_file())
        .await
        .unwrap_err();

    assert_matches!(err, ClientError::Network(_));
    assert_eq!(slot.current_job(), Some("job-0"));
    assert_eq!(backend.submit_calls(), 1, "submission is not retried");
}

#[tokio::test]
async fn clear_returns_to_idle() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut slot = JobSlot::new(backend.clone(), fast_config()).unwrap();
    slot.monitor("job-0");
    tokio::time::sleep(Duration::from_millis(10)).await;

    slot.clear();

    assert_eq!(slot.current_job(), None);
    assert_eq!(slot.snapshot().state, MonitorState::Idle);
    assert_eq!(slot.snapshot().percent, 0);
    assert_matches!(slot.results(), Err(ClientError::NoActiveJob));

    let calls = backend.status_calls();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(backend.status_calls(), calls);
}

#[tokio::test]
async fn dropping_the_slot_stops_polling() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut slot = JobSlot::new(backend.clone(), fast_config()).unwrap();
    slot.monitor("job-0");
    tokio::time::sleep(Duration::from_millis(10)).await;

    drop(slot);

    let calls = backend.status_calls();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(backend.status_calls(), calls);
}

// ---- Test: validation gate ----

#[tokio::test]
async fn out_of_range_config_is_rejected_before_network() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut slot = JobSlot::new(backend.clone(), fast_config()).unwrap();

    let config = JobConfig {
        num_samples: 5,
        ..scenario_config()
    };
    let err = slot
        .submit(config, &lending_file(), &recovery_file())
        .await
        .unwrap_err();

    assert_matches!(err, ClientError::Validation(CoreError::Config(_)));
    assert_eq!(backend.submit_calls(), 0);
    assert_eq!(slot.current_job(), None);
}

#[tokio::test]
async fn slot_refuses_progress_ceiling_of_100_or_more() {
    let config = surety_client::poller::PollerConfig {
        progress: ProgressConfig {
            increment: 50,
            ceiling: 200,
        },
        ..fast_config()
    };
    assert_matches!(
        JobSlot::new(Arc::new(ScriptedBackend::new()), config).err(),
        Some(CoreError::Config(_))
    );
}

#[tokio::test]
async fn bad_header_is_rejected_before_network() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut slot = JobSlot::new(backend.clone(), fast_config()).unwrap();

    let lending = InputFile::new(
        "lending.csv",
        "ref_date;INTERVAL;50;100;200;250;500;1000;1500;2000;2500\n",
    );
    let err = slot
        .submit(scenario_config(), &lending, &recovery_file())
        .await
        .unwrap_err();

    assert_matches!(err, ClientError::Validation(CoreError::Validation(ref msg)) if msg.contains("5000"));
    assert_eq!(backend.submit_calls(), 0);
}

#[tokio::test]
async fn swapped_files_are_rejected() {
    let backend = Arc::new(ScriptedBackend::new());
    let mut slot = JobSlot::new(backend.clone(), fast_config()).unwrap();

    let err = slot
        .submit(scenario_config(), &recovery_file(), &lending_file())
        .await
        .unwrap_err();

    assert_matches!(err, ClientError::Validation(_));
    assert_eq!(backend.submit_calls(), 0);
}

// ---- Test: results access ----

#[tokio::test]
async fn results_before_completion_are_not_available() {
    let backend = Arc::new(ScriptedBackend::new().statuses([running()]));
    let mut slot = JobSlot::new(backend, fast_config()).unwrap();
    slot.monitor("job-0");

    assert_matches!(slot.results(), Err(ClientError::NotCompleted));
    assert_matches!(slot.chart_series(), Err(ClientError::NotCompleted));
    assert_matches!(slot.retry_results().await, Err(ClientError::NotCompleted));
}

#[tokio::test]
async fn failed_job_reports_simulation_failure() {
    let backend = Arc::new(ScriptedBackend::new().statuses([running(), failed()]));
    let mut slot = JobSlot::new(backend, fast_config()).unwrap();
    slot.monitor("job-7");

    let snapshot = finish(&mut slot).await;
    assert_eq!(snapshot.state, MonitorState::Failed);
    assert_matches!(
        slot.results(),
        Err(ClientError::SimulationFailed { job_id }) if job_id == "job-7"
    );
}

#[tokio::test]
async fn unavailable_results_can_be_retried_without_resubmitting() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .statuses([completed()])
            .results([Err(ClientError::Server {
                status: 500,
                message: "boom".into(),
            })]),
    );
    let mut slot = JobSlot::new(backend.clone(), fast_config()).unwrap();
    slot.monitor("job-4");

    let snapshot = finish(&mut slot).await;
    assert_matches!(snapshot.results, ResultsState::Unavailable(_));
    assert_matches!(slot.results(), Err(ClientError::ResultsUnavailable { .. }));

    let results = slot.retry_results().await.unwrap();
    assert_eq!(results.real_provision, Some(8500.5));
    assert!(slot.snapshot().results().is_some());
    assert_eq!(slot.snapshot().state, MonitorState::Completed);
    assert_eq!(backend.results_calls(), 2);
    assert_eq!(backend.submit_calls(), 0);
    assert_eq!(backend.status_calls(), 1);
}

#[tokio::test]
async fn finished_without_job_is_an_error() {
    let mut slot = JobSlot::new(Arc::new(ScriptedBackend::new()), fast_config()).unwrap();
    assert_matches!(slot.finished().await, Err(ClientError::NoActiveJob));
}
