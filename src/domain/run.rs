//! Pipeline run state.
//!
//! A run is one end-to-end execution of the stage chain. Its task graph is
//! strictly linear, so the terminal states are exactly: all stages succeeded,
//! or failed at stage N with every downstream stage never started.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::pipeline::StageKind;

/// One execution of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Unique identifier for this run
    pub id: Uuid,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,

    /// Current state of the run
    pub state: RunState,

    /// Status of each stage (stage name -> status)
    pub stage_statuses: HashMap<String, StageStatus>,
}

impl PipelineRun {
    /// Create a new running pipeline run
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            completed_at: None,
            state: RunState::Running,
            stage_statuses: HashMap::new(),
        }
    }

    /// Record the status of a stage
    pub fn set_stage_status(&mut self, stage: StageKind, status: StageStatus) {
        self.stage_statuses.insert(stage.name().to_string(), status);
    }

    /// Mark the run as completed successfully
    pub fn complete(&mut self) {
        self.state = RunState::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark the run as failed at a stage
    pub fn fail(&mut self, stage: StageKind, error: String) {
        self.set_stage_status(stage, StageStatus::Failed);
        self.state = RunState::Failed {
            stage: stage.name().to_string(),
            error,
        };
        self.completed_at = Some(Utc::now());
    }

    /// Check if the run is still in progress
    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running)
    }

    /// Check if the run completed successfully
    pub fn is_completed(&self) -> bool {
        matches!(self.state, RunState::Completed)
    }

    /// Check if a specific stage completed
    pub fn is_stage_completed(&self, stage: StageKind) -> bool {
        self.stage_statuses
            .get(stage.name())
            .map(|s| *s == StageStatus::Completed)
            .unwrap_or(false)
    }

    /// Check if a specific stage ever started
    pub fn stage_started(&self, stage: StageKind) -> bool {
        self.stage_statuses.contains_key(stage.name())
    }
}

/// State of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    /// Currently executing
    Running,

    /// All stages succeeded
    Completed,

    /// A stage failed after exhausting its retries; downstream stages never ran
    Failed { stage: String, error: String },
}

/// Status of one stage within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not yet started
    Pending,

    /// Currently executing
    Running,

    /// Completed successfully
    Completed,

    /// Failed (after exhausting retries)
    Failed,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::Pending
    }
}
