//! Pipeline orchestrator.
//!
//! Walks the task graph in order, retries each stage per its policy, and hands
//! artifacts between stages explicitly: acquisition returns the snapshot,
//! training receives it and returns the model artifact, publication receives
//! the concrete paths. If a stage exhausts its retries the run fails there and
//! downstream stages never start.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{ArtifactStore, DatasetRegistry, Trainer};
use crate::config::PipelineConfig;
use crate::domain::{DatasetSnapshot, ModelArtifact, PipelineRun, StageStatus};

use super::pipeline::{StageKind, StageSpec, TaskGraph};
use super::run_log::RunLog;

/// Output of one stage, fed forward to later stages
enum StageOutput {
    Snapshot(DatasetSnapshot),
    Model(ModelArtifact),
    Published,
}

/// Pipeline orchestrator
pub struct Orchestrator {
    registry: Arc<dyn DatasetRegistry>,
    trainer: Arc<dyn Trainer>,
    store: Arc<dyn ArtifactStore>,
    graph: TaskGraph,
    run_log: Option<RunLog>,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators with the standard
    /// acquire -> train -> publish graph
    pub fn new(
        registry: Arc<dyn DatasetRegistry>,
        trainer: Arc<dyn Trainer>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            registry,
            trainer,
            store,
            graph: TaskGraph::standard(),
            run_log: None,
        }
    }

    /// Replace the task graph (validated at run time)
    pub fn with_graph(mut self, graph: TaskGraph) -> Self {
        self.graph = graph;
        self
    }

    /// Record finished runs to a run log
    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    /// Execute one pipeline run to a terminal state.
    ///
    /// Returns `Ok` with the finished run for both success and stage failure;
    /// `Err` is reserved for errors that abort before any stage runs
    /// (invalid graph, inconsistent config).
    #[instrument(skip(self, config))]
    pub async fn run_once(&self, config: &PipelineConfig) -> Result<PipelineRun> {
        self.graph.validate()?;
        config.validate()?;

        let run_id = Uuid::new_v4();
        let mut run = PipelineRun::new(run_id);
        info!(%run_id, "Starting pipeline run");

        let mut snapshot: Option<DatasetSnapshot> = None;
        let mut model: Option<ModelArtifact> = None;

        for stage in &self.graph.stages {
            match self.execute_stage_with_retry(&mut run, stage, config, &snapshot, &model).await {
                Ok(StageOutput::Snapshot(s)) => snapshot = Some(s),
                Ok(StageOutput::Model(m)) => model = Some(m),
                Ok(StageOutput::Published) => {}
                Err(e) => {
                    error!(%run_id, stage = stage.kind.name(), error = %e, "Run failed");
                    run.fail(stage.kind, e.to_string());
                    self.record(&run).await;
                    return Ok(run);
                }
            }
        }

        run.complete();
        info!(%run_id, "Pipeline run completed");
        self.record(&run).await;
        Ok(run)
    }

    /// Execute one stage, retrying per its policy with a fixed delay
    async fn execute_stage_with_retry(
        &self,
        run: &mut PipelineRun,
        stage: &StageSpec,
        config: &PipelineConfig,
        snapshot: &Option<DatasetSnapshot>,
        model: &Option<ModelArtifact>,
    ) -> Result<StageOutput> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            run.set_stage_status(stage.kind, StageStatus::Running);
            let started = Instant::now();
            info!(stage = stage.kind.name(), attempt, "Stage starting");

            let result = self.execute_stage(stage.kind, config, snapshot, model).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(output) => {
                    run.set_stage_status(stage.kind, StageStatus::Completed);
                    info!(stage = stage.kind.name(), duration_ms, "Stage completed");
                    return Ok(output);
                }
                Err(e) => {
                    if stage.retry.should_retry(attempt) {
                        let delay = stage.retry.delay();
                        warn!(
                            stage = stage.kind.name(),
                            attempt,
                            delay_secs = delay.as_secs(),
                            error = %e,
                            "Stage failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    error!(
                        stage = stage.kind.name(),
                        attempt,
                        error = %e,
                        "Stage failed permanently"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Dispatch one stage attempt to its collaborator
    async fn execute_stage(
        &self,
        kind: StageKind,
        config: &PipelineConfig,
        snapshot: &Option<DatasetSnapshot>,
        model: &Option<ModelArtifact>,
    ) -> Result<StageOutput> {
        match kind {
            StageKind::Acquire => {
                let snapshot = self
                    .registry
                    .fetch(&config.data, &config.dataset_dir())
                    .await?;
                Ok(StageOutput::Snapshot(snapshot))
            }

            StageKind::Train => {
                // Graph validation guarantees acquire ran first
                let snapshot = snapshot
                    .as_ref()
                    .context("No dataset snapshot available for training")?;
                let artifact = self
                    .trainer
                    .train(snapshot, &config.training, &config.paths.output_model)
                    .await?;
                Ok(StageOutput::Model(artifact))
            }

            StageKind::Publish => {
                let mut targets: Vec<PathBuf> = Vec::new();
                if let Some(model) = model {
                    targets.push(model.path.clone());
                }
                if let Some(snapshot) = snapshot {
                    targets.push(snapshot.root.clone());
                }
                self.store.push(&targets).await?;
                Ok(StageOutput::Published)
            }
        }
    }

    /// Append a finished run to the run log, if one is configured.
    /// Log failures must not change the run outcome.
    async fn record(&self, run: &PipelineRun) {
        if let Some(log) = &self.run_log {
            if let Err(e) = log.append(run).await {
                warn!(run_id = %run.id, error = %e, "Failed to record run");
            }
        }
    }
}
