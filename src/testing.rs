// src/testing.rs
//! Substitutable collaborators for unit tests

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::analysis::AnalysisProvider;
use crate::core::job_queue::{ClaimedJob, SweepReport};
use crate::core::{
    AnalysisUpdate, JobQueue, JobSnapshot, QueueSettings, RecordStore, SqliteJobQueue,
    SqliteRecordStore,
};
use crate::types::{AnalysisKind, AnalysisRecord};

/// Returns the same text for every prompt and remembers the prompts
pub struct ScriptedProvider {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisProvider for ScriptedProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

pub struct FailingProvider;

#[async_trait]
impl AnalysisProvider for FailingProvider {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("connection refused")
    }
}

/// Record store whose backend is down
pub struct UnreachableRecordStore;

#[async_trait]
impl RecordStore for UnreachableRecordStore {
    async fn insert(&self, _record: &AnalysisRecord) -> Result<()> {
        anyhow::bail!("record store unreachable")
    }

    async fn set_analysis(
        &self,
        _kind: AnalysisKind,
        _id: &str,
        _analysis: &str,
    ) -> Result<AnalysisUpdate> {
        anyhow::bail!("record store unreachable")
    }

    async fn get(&self, _kind: AnalysisKind, _id: &str) -> Result<Option<AnalysisRecord>> {
        anyhow::bail!("record store unreachable")
    }

    async fn list(&self, _kind: AnalysisKind) -> Result<Vec<AnalysisRecord>> {
        anyhow::bail!("record store unreachable")
    }

    async fn list_unanalysed(&self, _kind: AnalysisKind) -> Result<Vec<AnalysisRecord>> {
        anyhow::bail!("record store unreachable")
    }

    async fn health_check(&self) -> Result<()> {
        anyhow::bail!("record store unreachable")
    }
}

/// Queue whose broker is down
pub struct UnreachableQueue;

#[async_trait]
impl JobQueue for UnreachableQueue {
    async fn enqueue_as(&self, _job_id: &str, _task_name: &str, _args: Value) -> Result<()> {
        anyhow::bail!("broker unreachable")
    }

    async fn get_status(&self, _job_id: &str) -> Result<Option<JobSnapshot>> {
        anyhow::bail!("broker unreachable")
    }

    async fn claim_next(&self) -> Result<Option<ClaimedJob>> {
        anyhow::bail!("broker unreachable")
    }

    async fn complete(&self, _job_id: &str, _result: Value) -> Result<()> {
        anyhow::bail!("broker unreachable")
    }

    async fn fail(&self, _job_id: &str, _error: &str) -> Result<()> {
        anyhow::bail!("broker unreachable")
    }

    async fn sweep(&self) -> Result<SweepReport> {
        anyhow::bail!("broker unreachable")
    }

    async fn health_check(&self) -> Result<()> {
        anyhow::bail!("broker unreachable")
    }
}

/// Fresh record store and queue backed by files in a temporary directory
pub struct TempStores {
    pub records: Arc<dyn RecordStore>,
    pub queue: Arc<dyn JobQueue>,
    _dir: tempfile::TempDir,
}

impl TempStores {
    pub async fn new() -> Self {
        Self::with_settings(QueueSettings::default()).await
    }

    pub async fn with_settings(settings: QueueSettings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let records_url = format!("sqlite:{}", dir.path().join("records.db").display());
        let queue_url = format!("sqlite:{}", dir.path().join("jobs.db").display());

        Self {
            records: Arc::new(SqliteRecordStore::connect(&records_url).await.unwrap()),
            queue: Arc::new(SqliteJobQueue::connect(&queue_url, settings).await.unwrap()),
            _dir: dir,
        }
    }
}
