//! Task graph and retry policy.
//!
//! The pipeline is a fixed linear chain: acquire -> train -> publish. There is
//! no fan-out and no conditional edges; the only per-stage knob is the retry
//! policy. The graph is still validated so a hand-built one cannot reorder or
//! duplicate stages.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The three pipeline stages, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Download a versioned dataset snapshot from the registry
    Acquire,

    /// Drive the external training procedure against the snapshot
    Train,

    /// Push produced artifacts to the remote artifact store
    Publish,
}

impl StageKind {
    /// Stable stage name (used in logs, run records, and status output)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Acquire => "acquire",
            Self::Train => "train",
            Self::Publish => "publish",
        }
    }

    /// Position in the canonical chain
    fn order(&self) -> usize {
        match self {
            Self::Acquire => 0,
            Self::Train => 1,
            Self::Publish => 2,
        }
    }
}

/// One stage plus its retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    /// Which stage this is
    pub kind: StageKind,

    /// Retry policy for this stage
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl StageSpec {
    /// Create a stage spec with the default retry policy
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            retry: RetryPolicy::default(),
        }
    }
}

/// The declarative pipeline: an ordered chain of stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGraph {
    /// Stages in execution order
    pub stages: Vec<StageSpec>,
}

impl TaskGraph {
    /// The standard acquire -> train -> publish chain with default retries
    pub fn standard() -> Self {
        Self {
            stages: vec![
                StageSpec::new(StageKind::Acquire),
                StageSpec::new(StageKind::Train),
                StageSpec::new(StageKind::Publish),
            ],
        }
    }

    /// The standard chain with one retry policy applied to every stage
    pub fn standard_with_retry(retry: RetryPolicy) -> Self {
        let mut graph = Self::standard();
        for stage in &mut graph.stages {
            stage.retry = retry.clone();
        }
        graph
    }

    /// Validate the chain: no duplicates, dependency order preserved
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            anyhow::bail!("Task graph must have at least one stage");
        }

        for window in self.stages.windows(2) {
            if window[1].kind.order() <= window[0].kind.order() {
                anyhow::bail!(
                    "Stage '{}' cannot follow '{}' (dependency order is acquire -> train -> publish)",
                    window[1].kind.name(),
                    window[0].kind.name()
                );
            }
        }

        // Training consumes the snapshot acquisition materializes
        let has_train = self.stages.iter().any(|s| s.kind == StageKind::Train);
        let has_acquire = self.stages.iter().any(|s| s.kind == StageKind::Acquire);
        if has_train && !has_acquire {
            anyhow::bail!("Stage 'train' requires a preceding 'acquire' stage");
        }

        Ok(())
    }
}

/// Retry policy for a failed stage: fixed delay, bounded attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first failure (default: 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts in seconds (default: 300 = 5 min)
    #[serde(default = "default_retry_delay")]
    pub delay_secs: u64,
}

fn default_max_retries() -> u32 {
    1
}
fn default_retry_delay() -> u64 {
    300
} // 5 min

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_secs: default_retry_delay(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay_secs: 0,
        }
    }

    /// Check whether another attempt is allowed after `attempt` failures
    /// (attempt is 1-indexed: 1 = the initial try just failed)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    /// Delay before the next attempt
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}
