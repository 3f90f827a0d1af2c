//! Pipeline configuration.
//!
//! One YAML document with three required sections (`data`, `training`,
//! `paths`) read by every stage. Loaded once at startup and passed down
//! explicitly; there is no process-global config state.
//!
//! Path derivation lives here and nowhere else: acquisition materializes the
//! dataset into [`PipelineConfig::dataset_dir`] and later stages consume the
//! snapshot it returns instead of recomputing the location.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Dataset registry identity and export settings
    pub data: DataConfig,

    /// Hyperparameters handed to the external trainer
    pub training: TrainingConfig,

    /// Local filesystem layout
    pub paths: PathsConfig,
}

/// `data` section: which dataset version to pull, and how
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// API key for the dataset registry
    pub roboflow_api_key: String,

    /// Registry workspace identifier
    pub workspace: String,

    /// Project identifier within the workspace
    pub project: String,

    /// Dataset version number
    pub version: u32,

    /// Export format (e.g. "yolov8")
    pub format: String,
}

/// `training` section: hyperparameters for the external training procedure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Base model identifier (e.g. "yolov8n.pt")
    pub model: String,

    /// Number of epochs
    pub epochs: u32,

    /// Training image size in pixels
    pub imgsz: u32,

    /// Batch size
    pub batch: u32,

    /// Run name (also names the trainer's output directory)
    pub name: String,
}

/// `paths` section: where artifacts live on the local filesystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory datasets are materialized under
    pub data_dir: PathBuf,

    /// Destination for the trained model weights
    pub output_model: PathBuf,
}

impl PipelineConfig {
    /// Load a configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&content)
    }

    /// Parse a configuration from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).context("Failed to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate semantic constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.data.workspace.is_empty() {
            anyhow::bail!("data.workspace cannot be empty");
        }
        if self.data.project.is_empty() {
            anyhow::bail!("data.project cannot be empty");
        }
        if self.data.format.is_empty() {
            anyhow::bail!("data.format cannot be empty");
        }
        if self.training.model.is_empty() {
            anyhow::bail!("training.model cannot be empty");
        }
        if self.training.name.is_empty() {
            anyhow::bail!("training.name cannot be empty");
        }
        if self.training.epochs == 0 {
            anyhow::bail!("training.epochs must be at least 1");
        }
        if self.training.imgsz == 0 {
            anyhow::bail!("training.imgsz must be at least 1");
        }
        if self.training.batch == 0 {
            anyhow::bail!("training.batch must be at least 1");
        }
        if self.paths.data_dir.as_os_str().is_empty() {
            anyhow::bail!("paths.data_dir cannot be empty");
        }
        if self.paths.output_model.as_os_str().is_empty() {
            anyhow::bail!("paths.output_model cannot be empty");
        }

        Ok(())
    }

    /// Directory the dataset snapshot is materialized into:
    /// `{paths.data_dir}/{data.project}-{data.version}`
    pub fn dataset_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .join(format!("{}-{}", self.data.project, self.data.version))
    }

    /// Path to the dataset manifest the trainer reads
    pub fn dataset_manifest(&self) -> PathBuf {
        self.dataset_dir().join("data.yaml")
    }
}
