//! Capability interfaces for the external collaborators.
//!
//! The dataset registry, trainer, artifact store, and detector are all black
//! boxes. Each is modeled as a narrow trait so the orchestrator and the
//! inference service can be exercised against fakes, while the production
//! implementations shell out or speak HTTP.

pub mod detector;
pub mod dvc;
pub mod roboflow;
pub mod trainer;

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::config::{DataConfig, TrainingConfig};
use crate::domain::{DatasetSnapshot, ModelArtifact};

pub use detector::CommandDetector;
pub use dvc::DvcStore;
pub use roboflow::{RegistryError, RoboflowRegistry};
pub use trainer::SubprocessTrainer;

/// Resolves a (workspace, project, version) triple to a local dataset snapshot
#[async_trait]
pub trait DatasetRegistry: Send + Sync {
    /// Download the configured dataset version in the requested export format
    /// and materialize it under `dest`. A failed fetch must not leave a
    /// partial dataset behind that could be silently reused.
    async fn fetch(&self, data: &DataConfig, dest: &Path) -> Result<DatasetSnapshot>;
}

/// Drives an external training procedure to completion
#[async_trait]
pub trait Trainer: Send + Sync {
    /// Train against the snapshot and write the resulting weights to `output`.
    /// On failure no file may be written to `output`.
    async fn train(
        &self,
        snapshot: &DatasetSnapshot,
        training: &TrainingConfig,
        output: &Path,
    ) -> Result<ModelArtifact>;
}

/// Pushes local artifacts to a remote version-controlled store
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Push the given local artifact paths. Failure leaves the local files
    /// intact for manual retry.
    async fn push(&self, paths: &[PathBuf]) -> Result<()>;
}

/// Runs a pre-trained detector over an RGB pixel array
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detect regions of interest. Zero boxes is a valid result, not an error.
    async fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>>;
}

/// Axis-aligned detection rectangle in pixel coordinates.
///
/// Corners come straight from the detector and may lie outside the image;
/// consumers clamp before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,

    /// Detector confidence, if reported
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl BoundingBox {
    /// Create a box from corner coordinates
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_json_schema() {
        let json = r#"{"x1": 10.0, "y1": 20.0, "x2": 110.5, "y2": 220.0, "confidence": 0.9}"#;
        let parsed: BoundingBox = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.x1, 10.0);
        assert_eq!(parsed.confidence, Some(0.9));

        // Confidence is optional on the wire
        let bare = r#"{"x1": 0, "y1": 0, "x2": 1, "y2": 1}"#;
        let parsed: BoundingBox = serde_json::from_str(bare).unwrap();
        assert_eq!(parsed.confidence, None);
    }
}
