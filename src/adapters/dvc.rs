//! DVC artifact store.
//!
//! Publication is a fire-and-forget `dvc push` of the locally produced
//! artifacts. A failed push fails the run but leaves the local files intact
//! for manual retry.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use super::ArtifactStore;

/// Version-controlled artifact store backed by the `dvc` CLI
pub struct DvcStore {
    /// Path to the dvc binary (default: "dvc")
    binary_path: String,
}

impl Default for DvcStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DvcStore {
    /// Create a store using the default binary path
    pub fn new() -> Self {
        Self {
            binary_path: "dvc".to_string(),
        }
    }

    /// Override the dvc binary
    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

#[async_trait]
impl ArtifactStore for DvcStore {
    async fn push(&self, paths: &[PathBuf]) -> Result<()> {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("push");
        for path in paths {
            cmd.arg(path);
        }

        info!(targets = paths.len(), "Pushing artifacts");

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to spawn '{}'", self.binary_path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            anyhow::bail!("dvc push exited with code {}: {}", exit_code, stderr.trim());
        }

        Ok(())
    }
}
