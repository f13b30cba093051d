// src/jobs/worker.rs
//! Worker pool: claims analysis jobs, runs the provider and fills the records.

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

use super::AnalysisTask;
use crate::analysis::Analyzer;
use crate::app_log;
use crate::core::config_manager::WorkerConfig;
use crate::core::job_queue::ClaimedJob;
use crate::core::{AnalysisUpdate, JobQueue, RecordStore};

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub struct Worker {
    queue: Arc<dyn JobQueue>,
    records: Option<Arc<dyn RecordStore>>,
    analyzer: Analyzer,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        records: Option<Arc<dyn RecordStore>>,
        analyzer: Analyzer,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            records,
            analyzer,
            config,
        }
    }

    /// Claim and process one job. Returns `false` when the queue was empty.
    pub async fn process_next(&self) -> Result<bool> {
        let Some(job) = self.queue.claim_next().await? else {
            return Ok(false);
        };

        app_log!(info, job_id = %job.job_id, task = %job.task_name, attempt = job.attempt, "Processing job");

        match self.execute(&job).await {
            Ok(analysis) => {
                self.queue
                    .complete(&job.job_id, Value::String(analysis))
                    .await?;
                app_log!(info, job_id = %job.job_id, "Job completed");
            }
            Err(e) => {
                let error = format!("{:#}", e);
                app_log!(error, job_id = %job.job_id, task = %job.task_name, "Job failed: {}", error);
                self.queue.fail(&job.job_id, &error).await?;
            }
        }

        Ok(true)
    }

    /// Process jobs until the queue has nothing runnable left
    pub async fn drain(&self) -> Result<usize> {
        let mut processed = 0;
        while self.process_next().await? {
            processed += 1;
        }
        Ok(processed)
    }

    async fn execute(&self, job: &ClaimedJob) -> Result<String> {
        let task = AnalysisTask::from_job(&job.task_name, job.args.clone())?;

        let outcome = self.analyzer.analyze(&task.request).await;
        if outcome.placeholder {
            app_log!(warn, job_id = %job.job_id, record_id = %task.record_id, "Using placeholder analysis");
        }

        self.persist(&task, outcome.text).await
    }

    /// Write the analysis into the record and return the text the job should report
    async fn persist(&self, task: &AnalysisTask, analysis: String) -> Result<String> {
        let Some(records) = &self.records else {
            app_log!(warn, record_id = %task.record_id, "Record store not configured, analysis not persisted");
            return Ok(analysis);
        };

        let update = records
            .set_analysis(task.kind(), &task.record_id, &analysis)
            .await
            .with_context(|| format!("Failed to store analysis for {}", task.record_id))?;

        match update {
            AnalysisUpdate::Updated => Ok(analysis),
            AnalysisUpdate::AlreadySet(existing) => {
                app_log!(info, record_id = %task.record_id, "Analysis already stored, keeping existing text");
                Ok(existing)
            }
            AnalysisUpdate::Missing => {
                app_log!(warn, record_id = %task.record_id, "{} record not found, analysis kept on the job only", task.kind());
                Ok(analysis)
            }
        }
    }

    /// Run the pool until `shutdown` flips to true. In-flight jobs finish first.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Result<()> {
        app_log!(
            info,
            concurrency = self.config.concurrency,
            "Worker pool starting"
        );

        let mut tasks = JoinSet::new();
        for slot in 0..self.config.concurrency {
            let worker = Arc::clone(&self);
            let shutdown = shutdown.clone();
            tasks.spawn(async move { worker.slot_loop(slot, shutdown).await });
        }

        let worker = Arc::clone(&self);
        tasks.spawn(async move { worker.sweep_loop(shutdown).await });

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                app_log!(error, "Worker task panicked: {}", e);
            }
        }

        app_log!(info, "Worker pool stopped");
        Ok(())
    }

    async fn slot_loop(&self, slot: usize, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.process_next().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => app_log!(error, slot, "Worker loop error: {:#}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    }

    async fn sweep_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.sweep_interval.max(MIN_SWEEP_INTERVAL));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.queue.sweep().await {
                        app_log!(error, "Job queue sweep failed: {:#}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}
