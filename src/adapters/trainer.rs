//! Subprocess trainer.
//!
//! The training procedure itself is a black box: we spawn the external
//! training CLI with the configured hyperparameters, observe its exit status,
//! and copy the weights it produced to the configured output path. Loss,
//! convergence, and checkpointing are all owned by the external tool.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::config::TrainingConfig;
use crate::domain::{DatasetSnapshot, ModelArtifact};

use super::Trainer;

/// Trainer invoking an external training CLI (ultralytics-style)
pub struct SubprocessTrainer {
    /// Training binary (default: "yolo")
    binary_path: String,

    /// Directory the trainer writes run outputs under (default: "runs/detect")
    runs_dir: PathBuf,
}

impl Default for SubprocessTrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl SubprocessTrainer {
    /// Create a trainer with the default binary and run directory
    pub fn new() -> Self {
        Self {
            binary_path: "yolo".to_string(),
            runs_dir: PathBuf::from("runs/detect"),
        }
    }

    /// Override the training binary
    pub fn with_binary_path(mut self, binary_path: impl Into<String>) -> Self {
        self.binary_path = binary_path.into();
        self
    }

    /// Override the trainer's run output directory
    pub fn with_runs_dir(mut self, runs_dir: impl Into<PathBuf>) -> Self {
        self.runs_dir = runs_dir.into();
        self
    }

    /// Where the external trainer leaves the best weights for a run name
    fn weights_path(&self, run_name: &str) -> PathBuf {
        self.runs_dir.join(run_name).join("weights").join("best.pt")
    }
}

#[async_trait]
impl Trainer for SubprocessTrainer {
    async fn train(
        &self,
        snapshot: &DatasetSnapshot,
        training: &TrainingConfig,
        output: &Path,
    ) -> Result<ModelArtifact> {
        if !snapshot.manifest.exists() {
            anyhow::bail!(
                "Dataset manifest not found: {}",
                snapshot.manifest.display()
            );
        }

        info!(
            manifest = %snapshot.manifest.display(),
            model = %training.model,
            epochs = training.epochs,
            name = %training.name,
            "Starting training"
        );

        let cmd_output = Command::new(&self.binary_path)
            .args([
                "detect".to_string(),
                "train".to_string(),
                format!("data={}", snapshot.manifest.display()),
                format!("model={}", training.model),
                format!("epochs={}", training.epochs),
                format!("imgsz={}", training.imgsz),
                format!("batch={}", training.batch),
                format!("name={}", training.name),
            ])
            .output()
            .await
            .with_context(|| format!("Failed to spawn trainer '{}'", self.binary_path))?;

        if !cmd_output.status.success() {
            let stderr = String::from_utf8_lossy(&cmd_output.stderr);
            let exit_code = cmd_output.status.code().unwrap_or(-1);
            anyhow::bail!(
                "Trainer exited with code {}: {}",
                exit_code,
                stderr.trim()
            );
        }

        let weights = self.weights_path(&training.name);
        if !weights.exists() {
            anyhow::bail!(
                "Trainer finished but produced no weights at {}",
                weights.display()
            );
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
        tokio::fs::copy(&weights, output)
            .await
            .with_context(|| format!("Failed to copy weights to {}", output.display()))?;

        let artifact = ModelArtifact::from_path(output, &training.name)
            .with_context(|| format!("Failed to stat model artifact: {}", output.display()))?;

        info!(path = %artifact.path.display(), size_bytes = artifact.size_bytes, "Model saved");
        Ok(artifact)
    }
}
