//! Recurring pipeline driver.
//!
//! One job on a fixed interval (daily by default). Missed slots are skipped,
//! never backfilled: runs execute sequentially in the scheduler task, and
//! `MissedTickBehavior::Skip` drops any ticks that elapsed while a run was
//! still in flight.

use std::time::Duration;

use anyhow::Result;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::PipelineConfig;

use super::orchestrator::Orchestrator;

/// Stable identifier for the recurring training job
pub const JOB_NAME: &str = "detector-train-pipeline";

/// Fixed-interval scheduler
pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    /// Create a scheduler with the given period (clamped to at least 1s)
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_secs(1)),
        }
    }

    /// The default daily schedule
    pub fn daily() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }

    /// The configured period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Drive the pipeline forever. The first run fires immediately; a failed
    /// run is logged and the schedule keeps going.
    pub async fn run(&self, orchestrator: &Orchestrator, config: &PipelineConfig) -> Result<()> {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            job = JOB_NAME,
            period_secs = self.period.as_secs(),
            "Scheduler started"
        );

        loop {
            ticker.tick().await;
            info!(job = JOB_NAME, "Scheduled run starting");

            match orchestrator.run_once(config).await {
                Ok(run) if run.is_completed() => {
                    info!(job = JOB_NAME, run_id = %run.id, "Scheduled run completed");
                }
                Ok(run) => {
                    warn!(
                        job = JOB_NAME,
                        run_id = %run.id,
                        state = ?run.state,
                        "Scheduled run failed"
                    );
                }
                Err(e) => {
                    // Pre-stage error (bad graph/config); the schedule persists
                    error!(job = JOB_NAME, error = %e, "Scheduled run aborted");
                }
            }
        }
    }
}
