//! Command-line interface for redactor.
//!
//! Provides commands for running the pipeline once, driving it on a schedule,
//! serving inference, and inspecting recorded runs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use crate::adapters::{CommandDetector, DvcStore, RoboflowRegistry, SubprocessTrainer};
use crate::config::PipelineConfig;
use crate::core::{Orchestrator, RetryPolicy, RunLog, Scheduler, TaskGraph};
use crate::domain::RunState;
use crate::serve::{self, ServeContext};

/// redactor - scheduled detector training pipeline + image redaction service
#[derive(Parser, Debug)]
#[command(name = "redactor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute one pipeline run (acquire -> train -> publish)
    Run {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Drive the pipeline on a recurring schedule (no catch-up of missed slots)
    Schedule {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Hours between runs
        #[arg(long, default_value = "24")]
        interval_hours: u64,
    },

    /// Serve the inference endpoint
    Serve {
        /// Configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Address to bind to
        #[arg(short, long, default_value = "0.0.0.0:8000")]
        addr: String,

        /// Detector binary invoked per request
        #[arg(long, default_value = "yolo-detect")]
        detector: String,
    },

    /// List recent pipeline runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Run log file (defaults to ~/.redactor/runs.jsonl)
        #[arg(long)]
        run_log: Option<PathBuf>,
    },

    /// Show the recorded outcome of a run
    Status {
        /// Run ID (UUID)
        run_id: String,

        /// Run log file (defaults to ~/.redactor/runs.jsonl)
        #[arg(long)]
        run_log: Option<PathBuf>,
    },

    /// Show the resolved configuration and derived paths
    Config {
        /// Configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },
}

/// Shared arguments for pipeline execution
#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Retries per stage after the first failure
    #[arg(long, default_value = "1")]
    pub max_retries: u32,

    /// Fixed delay between attempts in seconds
    #[arg(long, default_value = "300")]
    pub retry_delay_secs: u64,

    /// Run log file (defaults to ~/.redactor/runs.jsonl)
    #[arg(long)]
    pub run_log: Option<PathBuf>,
}

impl PipelineArgs {
    fn load_config(&self) -> Result<PipelineConfig> {
        PipelineConfig::from_file(&self.config)
    }

    fn build_orchestrator(&self) -> Result<Orchestrator> {
        let registry = Arc::new(RoboflowRegistry::new());
        let trainer = Arc::new(SubprocessTrainer::new());
        let store = Arc::new(DvcStore::new());

        let retry = RetryPolicy {
            max_retries: self.max_retries,
            delay_secs: self.retry_delay_secs,
        };

        let log_path = match &self.run_log {
            Some(path) => path.clone(),
            None => RunLog::default_path()?,
        };

        Ok(Orchestrator::new(registry, trainer, store)
            .with_graph(TaskGraph::standard_with_retry(retry))
            .with_run_log(RunLog::new(log_path)))
    }
}

impl Cli {
    /// Execute the parsed command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run { pipeline } => {
                let config = pipeline.load_config()?;
                let orchestrator = pipeline.build_orchestrator()?;

                let run = orchestrator.run_once(&config).await?;
                print_run(&run);

                match &run.state {
                    RunState::Completed => Ok(()),
                    RunState::Failed { stage, error } => {
                        anyhow::bail!("Run {} failed at stage '{}': {}", run.id, stage, error)
                    }
                    RunState::Running => {
                        anyhow::bail!("Run {} did not reach a terminal state", run.id)
                    }
                }
            }

            Commands::Schedule {
                pipeline,
                interval_hours,
            } => {
                let config = pipeline.load_config()?;
                let orchestrator = pipeline.build_orchestrator()?;
                let scheduler = Scheduler::new(Duration::from_secs(interval_hours * 3600));

                scheduler.run(&orchestrator, &config).await
            }

            Commands::Serve {
                config,
                addr,
                detector,
            } => {
                let config = PipelineConfig::from_file(&config)?;

                // The detector is built once and shared read-only across requests
                let detector = CommandDetector::new(detector, config.paths.output_model.clone());
                let ctx = Arc::new(ServeContext::new(Arc::new(detector)));

                serve::serve(&addr, ctx).await
            }

            Commands::Runs { limit, run_log } => {
                let log = open_run_log(run_log)?;
                let runs = log.recent(limit).await?;

                if runs.is_empty() {
                    println!("No recorded runs");
                    return Ok(());
                }
                for run in runs {
                    print_run(&run);
                }
                Ok(())
            }

            Commands::Status { run_id, run_log } => {
                let run_id = Uuid::parse_str(&run_id).context("Invalid run ID")?;
                let log = open_run_log(run_log)?;

                match log.find(run_id).await? {
                    Some(run) => {
                        print_run(&run);
                        Ok(())
                    }
                    None => anyhow::bail!("Run {} not found", run_id),
                }
            }

            Commands::Config { config } => {
                let config = PipelineConfig::from_file(&config)?;

                println!("{}", serde_yaml::to_string(&config)?);
                println!("dataset_dir: {}", config.dataset_dir().display());
                println!("dataset_manifest: {}", config.dataset_manifest().display());
                Ok(())
            }
        }
    }
}

fn open_run_log(path: Option<PathBuf>) -> Result<RunLog> {
    let path = match path {
        Some(path) => path,
        None => RunLog::default_path()?,
    };
    Ok(RunLog::new(path))
}

fn print_run(run: &crate::domain::PipelineRun) {
    let state = match &run.state {
        RunState::Running => "running".to_string(),
        RunState::Completed => "completed".to_string(),
        RunState::Failed { stage, error } => format!("failed at {}: {}", stage, error),
    };
    println!("{}  {}  {}", run.id, run.started_at.to_rfc3339(), state);
}
