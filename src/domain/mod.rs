//! Domain data structures.
//!
//! - `run`: pipeline run state (one execution of the stage chain)
//! - `artifact`: durable stage outputs (dataset snapshots, model weights)

pub mod artifact;
pub mod run;

pub use artifact::{DatasetSnapshot, ModelArtifact};
pub use run::{PipelineRun, RunState, StageStatus};
