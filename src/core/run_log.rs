//! Run history with file-based persistence.
//!
//! Finished runs are appended as newline-delimited JSON (JSONL) so external
//! monitoring and the `runs`/`status` commands can inspect pipeline outcomes
//! without any extra infrastructure.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::domain::PipelineRun;

/// JSONL-backed run history
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Open a run log at the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `~/.redactor/runs.jsonl`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home.join(".redactor").join("runs.jsonl"))
    }

    /// Path to the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a finished run
    pub async fn append(&self, run: &PipelineRun) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create run log directory: {}", parent.display())
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open run log: {}", self.path.display()))?;

        let json = serde_json::to_string(run).context("Failed to serialize run")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write run record")?;
        file.flush().await.context("Failed to flush run record")?;

        Ok(())
    }

    /// Read all recorded runs in append order
    pub async fn replay(&self) -> Result<Vec<PipelineRun>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open run log: {}", self.path.display()))?;

        let mut runs = Vec::new();
        let mut lines = BufReader::new(file).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let run: PipelineRun =
                serde_json::from_str(&line).context("Failed to parse run record")?;
            runs.push(run);
        }

        Ok(runs)
    }

    /// The most recent `limit` runs, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<PipelineRun>> {
        let mut runs = self.replay().await?;
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit);
        Ok(runs)
    }

    /// Find a run by id
    pub async fn find(&self, run_id: Uuid) -> Result<Option<PipelineRun>> {
        let runs = self.replay().await?;
        Ok(runs.into_iter().find(|r| r.id == run_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::StageKind;
    use crate::domain::StageStatus;

    #[tokio::test]
    async fn test_append_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("runs.jsonl"));

        let mut first = PipelineRun::new(Uuid::new_v4());
        first.complete();
        let mut second = PipelineRun::new(Uuid::new_v4());
        second.set_stage_status(StageKind::Acquire, StageStatus::Completed);
        second.fail(StageKind::Train, "boom".to_string());

        log.append(&first).await.unwrap();
        log.append(&second).await.unwrap();

        let runs = log.replay().await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, first.id);
        assert!(runs[0].is_completed());
        assert!(!runs[1].is_completed());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("runs.jsonl"));

        let mut run = PipelineRun::new(Uuid::new_v4());
        run.complete();
        log.append(&run).await.unwrap();

        let found = log.find(run.id).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().id, run.id);

        let missing = log.find(Uuid::new_v4()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_empty_log_replays_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("runs.jsonl"));

        assert!(log.replay().await.unwrap().is_empty());
        assert!(log.recent(10).await.unwrap().is_empty());
    }
}
