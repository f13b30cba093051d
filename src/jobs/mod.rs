// src/jobs/mod.rs
//! Queue-facing side of the API: submitting analyses, reading job status,
//! the worker pool and the reconciliation sweep.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{AnalysisKind, AnalysisRequest};

pub mod reconcile;
pub mod status;
pub mod submission;
pub mod worker;

pub use reconcile::{reconcile, ReconcileReport};
pub use status::{lookup_status, JobStatus};
pub use submission::{submit, Submission};
pub use worker::Worker;

#[derive(Debug, Serialize, Deserialize)]
struct TaskArgs {
    record_id: String,
    payload: Value,
}

/// Unit of work carried by the queue: which record to fill and what to analyse
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisTask {
    pub record_id: String,
    pub request: AnalysisRequest,
}

impl AnalysisTask {
    pub fn new(record_id: String, request: AnalysisRequest) -> Self {
        Self { record_id, request }
    }

    pub fn kind(&self) -> AnalysisKind {
        self.request.kind()
    }

    pub fn task_name(&self) -> &'static str {
        self.kind().task_name()
    }

    /// Queue args: `{record_id, payload}`
    pub fn to_args(&self) -> Result<Value> {
        let args = TaskArgs {
            record_id: self.record_id.clone(),
            payload: self.request.to_payload()?,
        };
        serde_json::to_value(args).context("Failed to serialize task args")
    }

    pub fn from_job(task_name: &str, args: Value) -> Result<Self> {
        let kind = AnalysisKind::from_task_name(task_name)
            .with_context(|| format!("Unknown task: {}", task_name))?;
        let args: TaskArgs = serde_json::from_value(args)
            .with_context(|| format!("Invalid arguments for {}", task_name))?;

        Ok(Self {
            record_id: args.record_id,
            request: AnalysisRequest::from_payload(kind, args.payload)?,
        })
    }
}
