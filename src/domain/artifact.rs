//! Artifacts produced by pipeline stages.
//!
//! Both artifact types are immutable after creation: a snapshot is read-only
//! once acquisition materializes it, and model weights are never touched
//! in-process after the trainer writes them.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A versioned dataset materialized to the local filesystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    /// Registry workspace the dataset came from
    pub workspace: String,

    /// Project identifier within the workspace
    pub project: String,

    /// Dataset version number
    pub version: u32,

    /// Directory the dataset was extracted into
    pub root: PathBuf,

    /// Manifest file the trainer consumes (data.yaml)
    pub manifest: PathBuf,

    /// When the snapshot was materialized
    pub fetched_at: DateTime<Utc>,
}

impl DatasetSnapshot {
    /// Create a snapshot rooted at `root`, with the manifest at the
    /// conventional `root/data.yaml` location
    pub fn new(workspace: &str, project: &str, version: u32, root: PathBuf) -> Self {
        let manifest = root.join("data.yaml");
        Self {
            workspace: workspace.to_string(),
            project: project.to_string(),
            version,
            root,
            manifest,
            fetched_at: Utc::now(),
        }
    }
}

/// Trained detector weights written by the training stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Location of the weight file
    pub path: PathBuf,

    /// Training run name that produced it
    pub run_name: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// When the artifact was written
    pub created_at: DateTime<Utc>,
}

impl ModelArtifact {
    /// Describe an existing weight file on disk
    pub fn from_path(path: &Path, run_name: &str) -> std::io::Result<Self> {
        let size_bytes = std::fs::metadata(path)?.len();
        Ok(Self {
            path: path.to_path_buf(),
            run_name: run_name.to_string(),
            size_bytes,
            created_at: Utc::now(),
        })
    }
}
