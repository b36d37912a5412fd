//! Command-line arguments of the `surety` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use surety_client::wire::RiskQuery;
use surety_core::job::{JobConfig, Method, DEFAULT_ALPHA, DEFAULT_NUM_SAMPLES};
use surety_core::schema::FileRole;

#[derive(Parser, Debug)]
#[command(name = "surety", about = "Submit and monitor provisioning simulations", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a CSV header against the lending or recovery schema.
    Validate {
        file: PathBuf,
        #[arg(long)]
        role: FileRole,
    },
    /// Compute the real provision locally from both input files.
    Preview { lending: PathBuf, recovery: PathBuf },
    /// Submit a job, follow it to completion and print its results.
    Submit(SubmitArgs),
    /// Follow an existing job to completion.
    Watch {
        job_id: String,
        #[arg(long, default_value_t = false)]
        no_chart: bool,
    },
    /// Run Monte Carlo and bootstrap on the same files and compare them.
    Compare(CompareArgs),
    /// Fetch the results of a completed job.
    Results {
        job_id: String,
        #[arg(long, default_value_t = false)]
        no_chart: bool,
    },
    /// List previously submitted jobs.
    History,
    /// Delete a job on the backend.
    Delete { job_id: String },
    /// Convert between a risk level and a provision for a completed job.
    Risk(RiskArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    pub lending: PathBuf,
    pub recovery: PathBuf,
    #[arg(long, default_value = "montecarlo")]
    pub method: Method,
    #[arg(long, default_value_t = DEFAULT_NUM_SAMPLES)]
    pub num_samples: u32,
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    pub alpha: f64,
    /// Skip chart series in the output.
    #[arg(long, default_value_t = false)]
    pub no_chart: bool,
}

impl SubmitArgs {
    pub fn job_config(&self) -> JobConfig {
        JobConfig {
            method: self.method,
            num_samples: self.num_samples,
            alpha: self.alpha,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    pub lending: PathBuf,
    pub recovery: PathBuf,
    #[arg(long, default_value_t = DEFAULT_NUM_SAMPLES)]
    pub num_samples: u32,
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    pub alpha: f64,
}

#[derive(Args, Debug, Clone)]
pub struct RiskArgs {
    pub job_id: String,
    /// Risk level in percent; answers with the provision that covers it.
    #[arg(long, conflicts_with = "target_provision", required_unless_present = "target_provision")]
    pub risk_level: Option<f64>,
    /// Provision amount; answers with the risk level it leaves.
    #[arg(long)]
    pub target_provision: Option<f64>,
}

impl RiskArgs {
    pub fn query(&self) -> Option<RiskQuery> {
        match (self.risk_level, self.target_provision) {
            (Some(risk_level), _) => Some(RiskQuery::RiskToProvision { risk_level }),
            (None, Some(target_provision)) => Some(RiskQuery::ProvisionToRisk { target_provision }),
            (None, None) => None,
        }
    }
}
