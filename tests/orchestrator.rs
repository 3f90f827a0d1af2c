//! Orchestrator Integration Tests
//!
//! Exercises stage ordering, explicit artifact handoff, per-stage retry, and
//! failure short-circuiting against fake collaborators.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use redactor::config::{DataConfig, PathsConfig, PipelineConfig, TrainingConfig};
use redactor::core::{Orchestrator, RetryPolicy, RunLog, TaskGraph};
use redactor::domain::{DatasetSnapshot, ModelArtifact, RunState, StageStatus};
use redactor::{ArtifactStore, DatasetRegistry, Trainer};

type CallLog = Arc<Mutex<Vec<&'static str>>>;

struct FakeRegistry {
    calls: CallLog,
    /// Number of leading attempts that fail
    failures: AtomicU32,
}

#[async_trait]
impl DatasetRegistry for FakeRegistry {
    async fn fetch(&self, data: &DataConfig, dest: &Path) -> Result<DatasetSnapshot> {
        self.calls.lock().unwrap().push("acquire");

        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("registry unavailable");
        }

        Ok(DatasetSnapshot::new(
            &data.workspace,
            &data.project,
            data.version,
            dest.to_path_buf(),
        ))
    }
}

struct FakeTrainer {
    calls: CallLog,
    fail: bool,
    seen_manifest: Mutex<Option<PathBuf>>,
}

#[async_trait]
impl Trainer for FakeTrainer {
    async fn train(
        &self,
        snapshot: &DatasetSnapshot,
        training: &TrainingConfig,
        output: &Path,
    ) -> Result<ModelArtifact> {
        self.calls.lock().unwrap().push("train");
        *self.seen_manifest.lock().unwrap() = Some(snapshot.manifest.clone());

        if self.fail {
            anyhow::bail!("trainer exited with code 1");
        }

        Ok(ModelArtifact {
            path: output.to_path_buf(),
            run_name: training.name.clone(),
            size_bytes: 1024,
            created_at: Utc::now(),
        })
    }
}

struct FakeStore {
    calls: CallLog,
    pushed: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn push(&self, paths: &[PathBuf]) -> Result<()> {
        self.calls.lock().unwrap().push("publish");
        self.pushed.lock().unwrap().extend_from_slice(paths);
        Ok(())
    }
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        data: DataConfig {
            roboflow_api_key: "k".to_string(),
            workspace: "w".to_string(),
            project: "p".to_string(),
            version: 1,
            format: "yolov8".to_string(),
        },
        training: TrainingConfig {
            model: "yolov8n.pt".to_string(),
            epochs: 1,
            imgsz: 640,
            batch: 8,
            name: "run1".to_string(),
        },
        paths: PathsConfig {
            data_dir: PathBuf::from("/data"),
            output_model: PathBuf::from("/out/model.pt"),
        },
    }
}

struct Fixture {
    calls: CallLog,
    registry: Arc<FakeRegistry>,
    trainer: Arc<FakeTrainer>,
    store: Arc<FakeStore>,
}

fn fixture(registry_failures: u32, trainer_fails: bool) -> Fixture {
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
    Fixture {
        registry: Arc::new(FakeRegistry {
            calls: calls.clone(),
            failures: AtomicU32::new(registry_failures),
        }),
        trainer: Arc::new(FakeTrainer {
            calls: calls.clone(),
            fail: trainer_fails,
            seen_manifest: Mutex::new(None),
        }),
        store: Arc::new(FakeStore {
            calls: calls.clone(),
            pushed: Mutex::new(Vec::new()),
        }),
        calls,
    }
}

fn orchestrator(f: &Fixture, retry: RetryPolicy) -> Orchestrator {
    Orchestrator::new(f.registry.clone(), f.trainer.clone(), f.store.clone())
        .with_graph(TaskGraph::standard_with_retry(retry))
}

#[tokio::test]
async fn test_stages_run_in_order() {
    let f = fixture(0, false);
    let run = orchestrator(&f, RetryPolicy::none())
        .run_once(&test_config())
        .await
        .unwrap();

    assert!(run.is_completed());
    assert_eq!(*f.calls.lock().unwrap(), vec!["acquire", "train", "publish"]);
}

#[tokio::test]
async fn test_snapshot_is_handed_to_trainer_explicitly() {
    let f = fixture(0, false);
    let config = test_config();
    orchestrator(&f, RetryPolicy::none())
        .run_once(&config)
        .await
        .unwrap();

    // The trainer reads the manifest from the snapshot, not a re-derived path,
    // and both agree with the config's single derivation
    let seen = f.trainer.seen_manifest.lock().unwrap().clone().unwrap();
    assert_eq!(seen, config.dataset_manifest());
    assert_eq!(seen, PathBuf::from("/data/p-1/data.yaml"));
}

#[tokio::test]
async fn test_publication_receives_produced_artifacts() {
    let f = fixture(0, false);
    let config = test_config();
    orchestrator(&f, RetryPolicy::none())
        .run_once(&config)
        .await
        .unwrap();

    let pushed = f.store.pushed.lock().unwrap().clone();
    assert!(pushed.contains(&config.paths.output_model));
    assert!(pushed.contains(&config.dataset_dir()));
}

#[tokio::test]
async fn test_training_failure_skips_publication() {
    let f = fixture(0, true);
    let run = orchestrator(&f, RetryPolicy::none())
        .run_once(&test_config())
        .await
        .unwrap();

    match &run.state {
        RunState::Failed { stage, .. } => assert_eq!(stage, "train"),
        other => panic!("expected failed run, got {:?}", other),
    }
    assert!(!f.calls.lock().unwrap().contains(&"publish"));
    assert_eq!(
        run.stage_statuses.get("acquire"),
        Some(&StageStatus::Completed)
    );
    assert_eq!(run.stage_statuses.get("publish"), None);
}

#[tokio::test]
async fn test_stage_retries_then_succeeds() {
    let f = fixture(1, false);
    let retry = RetryPolicy {
        max_retries: 1,
        delay_secs: 0,
    };
    let run = orchestrator(&f, retry)
        .run_once(&test_config())
        .await
        .unwrap();

    assert!(run.is_completed());
    // First acquire attempt failed, second succeeded
    let calls = f.calls.lock().unwrap().clone();
    assert_eq!(calls, vec!["acquire", "acquire", "train", "publish"]);
}

#[tokio::test]
async fn test_exhausted_retries_fail_the_run() {
    let f = fixture(10, false);
    let retry = RetryPolicy {
        max_retries: 1,
        delay_secs: 0,
    };
    let run = orchestrator(&f, retry)
        .run_once(&test_config())
        .await
        .unwrap();

    match &run.state {
        RunState::Failed { stage, .. } => assert_eq!(stage, "acquire"),
        other => panic!("expected failed run, got {:?}", other),
    }
    // Initial attempt + one retry, then nothing downstream
    assert_eq!(*f.calls.lock().unwrap(), vec!["acquire", "acquire"]);
}

#[tokio::test]
async fn test_finished_runs_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("runs.jsonl");

    let f = fixture(0, false);
    let orchestrator = Orchestrator::new(f.registry.clone(), f.trainer.clone(), f.store.clone())
        .with_graph(TaskGraph::standard_with_retry(RetryPolicy::none()))
        .with_run_log(RunLog::new(&log_path));

    let run = orchestrator.run_once(&test_config()).await.unwrap();

    let recorded = RunLog::new(&log_path).find(run.id).await.unwrap();
    assert!(recorded.is_some());
    assert!(recorded.unwrap().is_completed());
}
