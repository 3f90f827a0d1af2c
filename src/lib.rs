//! redactor - Scheduled detector training pipeline with an image redaction service
//!
//! Two halves share one config document:
//! - A recurring pipeline that acquires a versioned dataset, trains an object
//!   detector against it, and pushes the resulting artifacts to a remote store.
//! - A stateless HTTP service that runs a trained detector over uploaded images
//!   and blurs every detected region before returning the image.
//!
//! # Architecture
//!
//! The pipeline is a fixed linear task graph (acquire -> train -> publish) with
//! an independent retry policy per stage. Stages talk to their external
//! collaborators (dataset registry, trainer, artifact store, detector) only
//! through capability traits, so the orchestration logic runs unchanged against
//! fakes in tests.
//!
//! Artifacts are handed between stages explicitly: acquisition returns the
//! materialized [`DatasetSnapshot`], training receives it and returns a
//! [`ModelArtifact`], publication receives the concrete artifact paths. No
//! stage re-derives another stage's output location.
//!
//! # Modules
//!
//! - `adapters`: capability traits + real registry/trainer/store/detector impls
//! - `core`: orchestration (TaskGraph, Orchestrator, Scheduler, RunLog)
//! - `domain`: data structures (PipelineRun, DatasetSnapshot, ModelArtifact)
//! - `serve`: axum inference service and region redaction
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # One pipeline run now
//! redactor run --config config.yaml
//!
//! # Recurring daily runs
//! redactor schedule --config config.yaml
//!
//! # Inference service
//! redactor serve --config config.yaml --addr 0.0.0.0:8000
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod serve;

// Re-export main types at crate root for convenience
pub use crate::config::{DataConfig, PathsConfig, PipelineConfig, TrainingConfig};
pub use crate::core::{Orchestrator, RetryPolicy, RunLog, Scheduler, StageKind, TaskGraph};
pub use crate::domain::{DatasetSnapshot, ModelArtifact, PipelineRun, RunState, StageStatus};

// Capability interfaces for the external collaborators
pub use crate::adapters::{ArtifactStore, BoundingBox, DatasetRegistry, Detector, Trainer};
