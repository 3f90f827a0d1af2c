//! Roboflow-style dataset registry client.
//!
//! Resolving a (workspace, project, version) triple is a two-step HTTP flow:
//! the version endpoint returns an export link for the requested format, and
//! the link serves a zip of the dataset. The archive is streamed to a temp
//! file and extracted into the destination directory.
//!
//! A failed fetch removes whatever was partially extracted so a corrupt
//! dataset can never be silently reused by the training stage.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::DataConfig;
use crate::domain::DatasetSnapshot;

use super::DatasetRegistry;

const DEFAULT_BASE_URL: &str = "https://api.roboflow.com";

/// Dataset registry failures
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry authentication failed (check data.roboflow_api_key)")]
    Auth,

    #[error("Unknown project/version: {workspace}/{project}/{version}")]
    UnknownVersion {
        workspace: String,
        project: String,
        version: u32,
    },

    #[error("Registry request failed: {0}")]
    Http(String),

    #[error("Failed to extract dataset archive: {0}")]
    Archive(String),

    #[error("Dataset download incomplete: {0}")]
    Incomplete(String),
}

/// Export link response from the version endpoint
#[derive(Debug, Deserialize)]
struct ExportResponse {
    export: ExportLink,
}

#[derive(Debug, Deserialize)]
struct ExportLink {
    link: String,
}

/// HTTP client for the dataset registry
pub struct RoboflowRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl Default for RoboflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoboflowRegistry {
    /// Create a client against the public registry endpoint
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create a client against a custom endpoint (tests, self-hosted mirrors)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Resolve the export link for the configured dataset version
    async fn resolve_export(&self, data: &DataConfig) -> Result<String, RegistryError> {
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.base_url, data.workspace, data.project, data.version, data.format
        );

        debug!(workspace = %data.workspace, project = %data.project, version = data.version,
               "Resolving dataset export");

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", data.roboflow_api_key.as_str())])
            .send()
            .await
            .map_err(|e| RegistryError::Http(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(RegistryError::Auth);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::UnknownVersion {
                workspace: data.workspace.clone(),
                project: data.project.clone(),
                version: data.version,
            });
        }
        if !status.is_success() {
            return Err(RegistryError::Http(format!("status {}", status)));
        }

        let export: ExportResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::Http(e.to_string()))?;

        Ok(export.export.link)
    }

    /// Stream the export archive to a temp file and extract it into `dest`
    async fn download_and_extract(&self, link: &str, dest: &Path) -> Result<(), RegistryError> {
        let scratch = tempfile::tempdir()
            .map_err(|e| RegistryError::Archive(format!("temp dir: {}", e)))?;
        let archive_path = scratch.path().join("export.zip");

        let response = self
            .client
            .get(link)
            .send()
            .await
            .map_err(|e| RegistryError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RegistryError::Http(format!(
                "export download returned status {}",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(&archive_path)
            .await
            .map_err(|e| RegistryError::Archive(e.to_string()))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| RegistryError::Http(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| RegistryError::Archive(e.to_string()))?;
        }
        file.flush()
            .await
            .map_err(|e| RegistryError::Archive(e.to_string()))?;

        tokio::fs::create_dir_all(dest)
            .await
            .map_err(|e| RegistryError::Archive(e.to_string()))?;

        // zip extraction is synchronous
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<(), RegistryError> {
            let file = std::fs::File::open(&archive_path)
                .map_err(|e| RegistryError::Archive(e.to_string()))?;
            let mut archive =
                zip::ZipArchive::new(file).map_err(|e| RegistryError::Archive(e.to_string()))?;
            archive
                .extract(&dest)
                .map_err(|e| RegistryError::Archive(e.to_string()))
        })
        .await
        .map_err(|e| RegistryError::Archive(e.to_string()))??;

        Ok(())
    }

    async fn fetch_inner(
        &self,
        data: &DataConfig,
        dest: &Path,
    ) -> Result<DatasetSnapshot, RegistryError> {
        let link = self.resolve_export(data).await?;
        self.download_and_extract(&link, dest).await?;

        let snapshot =
            DatasetSnapshot::new(&data.workspace, &data.project, data.version, dest.to_path_buf());

        if !snapshot.manifest.exists() {
            return Err(RegistryError::Incomplete(format!(
                "no data.yaml at {}",
                snapshot.manifest.display()
            )));
        }

        info!(root = %snapshot.root.display(), "Dataset snapshot materialized");
        Ok(snapshot)
    }
}

#[async_trait]
impl DatasetRegistry for RoboflowRegistry {
    async fn fetch(&self, data: &DataConfig, dest: &Path) -> Result<DatasetSnapshot> {
        match self.fetch_inner(data, dest).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                // Never leave a partial dataset where training could find it
                let _ = tokio::fs::remove_dir_all(dest).await;
                Err(e.into())
            }
        }
    }
}
