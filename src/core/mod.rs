//! Core orchestration logic.
//!
//! - `pipeline`: the declarative task graph and per-stage retry policy
//! - `orchestrator`: stage execution with retry and explicit artifact handoff
//! - `scheduler`: recurring interval driver (no catch-up of missed slots)
//! - `run_log`: JSONL run history for status monitoring

pub mod orchestrator;
pub mod pipeline;
pub mod run_log;
pub mod scheduler;

pub use orchestrator::Orchestrator;
pub use pipeline::{RetryPolicy, StageKind, StageSpec, TaskGraph};
pub use run_log::RunLog;
pub use scheduler::Scheduler;
