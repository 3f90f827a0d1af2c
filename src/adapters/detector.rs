//! Subprocess detector.
//!
//! The detection algorithm is an external collaborator: the adapter writes the
//! pixel array to a temp PNG, invokes the detector CLI against it with the
//! trained model, and parses a JSON array of bounding boxes from stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::RgbImage;
use tokio::process::Command;
use tracing::debug;

use super::{BoundingBox, Detector};

/// Detector invoking an external CLI with a trained model
pub struct CommandDetector {
    /// Detector binary (e.g. "yolo-detect")
    binary_path: String,

    /// Path to the trained weight file, loaded by the external tool
    model_path: PathBuf,
}

impl CommandDetector {
    /// Create a detector bound to a model file
    pub fn new(binary_path: impl Into<String>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            model_path: model_path.into(),
        }
    }

    /// The model this detector serves
    pub fn model_path(&self) -> &PathBuf {
        &self.model_path
    }
}

#[async_trait]
impl Detector for CommandDetector {
    async fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>> {
        // PNG encoding is synchronous; hand it to the blocking pool
        let image = image.clone();
        let tmp = tokio::task::spawn_blocking(move || -> Result<tempfile::NamedTempFile> {
            let tmp = tempfile::Builder::new()
                .suffix(".png")
                .tempfile()
                .context("Failed to create temp image file")?;
            image
                .save(tmp.path())
                .context("Failed to write temp image")?;
            Ok(tmp)
        })
        .await
        .context("Image encoding task panicked")??;

        let output = Command::new(&self.binary_path)
            .arg("--model")
            .arg(&self.model_path)
            .arg("--image")
            .arg(tmp.path())
            .arg("--json")
            .output()
            .await
            .with_context(|| format!("Failed to spawn detector '{}'", self.binary_path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            anyhow::bail!(
                "Detector exited with code {}: {}",
                exit_code,
                stderr.trim()
            );
        }

        let boxes: Vec<BoundingBox> =
            serde_json::from_slice(&output.stdout).context("Detector output is not valid JSON")?;

        debug!(boxes = boxes.len(), "Detection complete");
        Ok(boxes)
    }
}
