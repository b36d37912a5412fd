//! Subcommand implementations. Each returns the JSON document printed on
//! stdout; progress and diagnostics go to the tracing log.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use surety_client::backend::JobBackend;
use surety_client::compare::MethodComparer;
use surety_client::error::ClientError;
use surety_client::hydrator::ResultHydrator;
use surety_client::input::InputFile;
use surety_client::poller::{MonitorSnapshot, ResultsState};
use surety_client::slot::JobSlot;
use surety_core::lifecycle::MonitorState;
use surety_core::provision;
use surety_core::results::{ConfidenceInterval, ResultSet, RiskZone};
use surety_core::schema::FileRole;
use surety_core::synth::{self, ChartSeries};
use surety_core::types::{JobId, Timestamp};
use tokio::sync::watch;

use crate::cli::{Command, CompareArgs, SubmitArgs};
use crate::config::ClientConfig;

/// Run one subcommand. Backend settings are only loaded by the commands
/// that talk to the backend.
pub async fn run(command: Command) -> Result<Value> {
    match command {
        Command::Validate { file, role } => validate_file(&file, role).await,
        Command::Preview { lending, recovery } => preview_files(&lending, &recovery).await,
        Command::Submit(args) => {
            let remote = Remote::connect()?;
            submit(&remote, &args).await
        }
        Command::Watch { job_id, no_chart } => {
            let remote = Remote::connect()?;
            let mut slot = remote.slot()?;
            slot.monitor(job_id);
            let snapshot = follow(&mut slot).await?;
            report(&slot, &snapshot, !no_chart)
        }
        Command::Results { job_id, no_chart } => {
            let remote = Remote::connect()?;
            let results = ResultHydrator::new(remote.backend)
                .fetch_results(&job_id)
                .await?;
            to_json(&ResultsReport::new(&results, !no_chart))
        }
        Command::Compare(args) => {
            let remote = Remote::connect()?;
            compare(&remote, &args).await
        }
        Command::History => {
            let remote = Remote::connect()?;
            to_json(&remote.backend.list_jobs().await?)
        }
        Command::Delete { job_id } => {
            let remote = Remote::connect()?;
            remote.backend.delete_job(&job_id).await?;
            tracing::info!(job_id = %job_id, "Job deleted");
            Ok(serde_json::json!({ "deleted": job_id }))
        }
        Command::Risk(args) => {
            let query = args
                .query()
                .ok_or_else(|| anyhow!("either --risk-level or --target-provision is required"))?;
            let remote = Remote::connect()?;
            to_json(&remote.backend.calculate_risk(&args.job_id, &query).await?)
        }
    }
}

/// Environment settings plus the backend they describe.
struct Remote {
    config: ClientConfig,
    backend: Arc<dyn JobBackend>,
}

impl Remote {
    fn connect() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        let backend: Arc<dyn JobBackend> = Arc::new(config.backend()?);
        tracing::debug!(api_url = %config.api_url, "Using backend");
        Ok(Self { config, backend })
    }

    fn slot(&self) -> Result<JobSlot> {
        Ok(JobSlot::new(Arc::clone(&self.backend), self.config.poller)?)
    }
}

// ---------------------------------------------------------------------------
// Local commands
// ---------------------------------------------------------------------------

/// Check one file's header against `role`.
pub async fn validate_file(path: &Path, role: FileRole) -> Result<Value> {
    let file = InputFile::load(path).await?;
    file.validate(role)?;
    Ok(serde_json::json!({
        "file": file.file_name,
        "role": role,
        "valid": true,
    }))
}

/// Derive the real trajectory and provision from both files.
pub async fn preview_files(lending: &Path, recovery: &Path) -> Result<Value> {
    let lending = InputFile::load(lending).await?;
    let recovery = InputFile::load(recovery).await?;
    lending.validate(FileRole::Lending)?;
    recovery.validate(FileRole::Recovery)?;

    let preview = provision::preview(lending.text()?, recovery.text()?)?;
    to_json(&preview)
}

// ---------------------------------------------------------------------------
// Remote commands
// ---------------------------------------------------------------------------

async fn submit(remote: &Remote, args: &SubmitArgs) -> Result<Value> {
    let lending = InputFile::load(&args.lending).await?;
    let recovery = InputFile::load(&args.recovery).await?;

    let mut slot = remote.slot()?;
    let job = slot.submit(args.job_config(), &lending, &recovery).await?;
    tracing::info!(job_id = %job.id, "Following job");

    let snapshot = follow(&mut slot).await?;
    report(&slot, &snapshot, !args.no_chart)
}

/// Run both methods on the same files. Ctrl-C cancels both monitors.
async fn compare(remote: &Remote, args: &CompareArgs) -> Result<Value> {
    let lending = InputFile::load(&args.lending).await?;
    let recovery = InputFile::load(&args.recovery).await?;
    let comparer = MethodComparer::new(Arc::clone(&remote.backend), remote.config.poller)?;

    tokio::select! {
        comparison = comparer.compare(args.num_samples, args.alpha, &lending, &recovery) => {
            to_json(&comparison?)
        }
        _ = tokio::signal::ctrl_c() => bail!("interrupted, stopped the comparison"),
    }
}

/// Wait for the slot's monitor to settle, logging progress. Ctrl-C
/// cancels the monitor.
async fn follow(slot: &mut JobSlot) -> Result<MonitorSnapshot> {
    let job_id = slot
        .current_job()
        .map(str::to_string)
        .ok_or(ClientError::NoActiveJob)?;
    let updates = slot.subscribe().ok_or(ClientError::NoActiveJob)?;
    let progress = tokio::spawn(log_progress(updates));

    let outcome = tokio::select! {
        snapshot = slot.finished() => Some(snapshot),
        _ = tokio::signal::ctrl_c() => None,
    };
    progress.abort();

    match outcome {
        Some(snapshot) => Ok(snapshot?),
        None => {
            slot.clear();
            bail!("interrupted, stopped monitoring job {job_id}")
        }
    }
}

async fn log_progress(mut updates: watch::Receiver<MonitorSnapshot>) {
    let mut last = (MonitorState::Idle, u8::MAX);
    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        if (snapshot.state, snapshot.percent) == last {
            continue;
        }
        last = (snapshot.state, snapshot.percent);
        tracing::info!(
            job_id = snapshot.job_id.as_deref().unwrap_or_default(),
            state = ?snapshot.state,
            percent = snapshot.percent,
            "Progress",
        );
    }
}

/// Turn a settled snapshot into output, or an error for failures.
fn report(slot: &JobSlot, snapshot: &MonitorSnapshot, with_chart: bool) -> Result<Value> {
    if let Some(reason) = &snapshot.halted {
        bail!("monitoring stopped before the job finished: {reason}");
    }
    let results = slot.results()?;
    let mut output = to_json(&ResultsReport::new(&results, false))?;
    output["job"] = to_json(&JobState::from(snapshot))?;
    if with_chart {
        let series = slot.chart_series()?;
        output["series"] = to_json(&series)?;
    }
    Ok(output)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("failed to serialize output")
}

// ---------------------------------------------------------------------------
// Output views
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JobState {
    id: Option<JobId>,
    state: MonitorState,
    percent: u8,
    completed_at: Option<Timestamp>,
    results_available: bool,
}

impl From<&MonitorSnapshot> for JobState {
    fn from(snapshot: &MonitorSnapshot) -> Self {
        Self {
            id: snapshot.job_id.clone(),
            state: snapshot.state,
            percent: snapshot.percent,
            completed_at: snapshot.completed_at,
            results_available: matches!(snapshot.results, ResultsState::Ready(_)),
        }
    }
}

#[derive(Serialize)]
struct ResultsReport {
    real_provision: Option<f64>,
    risk_zone: Option<RiskZone>,
    samples: usize,
    percentiles: std::collections::BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence_interval: Option<ConfidenceInterval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    series: Option<Vec<ChartSeries>>,
}

impl ResultsReport {
    fn new(results: &ResultSet, with_chart: bool) -> Self {
        Self {
            real_provision: results.reference_provision(),
            risk_zone: results
                .reference_provision()
                .map(|provision| results.risk_zone(provision)),
            samples: results.simulated_provisions.len(),
            percentiles: results.percentiles.clone(),
            confidence_interval: results.confidence_interval,
            series: with_chart.then(|| synth::synthesize(results)),
        }
    }
}
