// src/web/types.rs
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;

use crate::core::{JobQueue, RecordStore};
use crate::jobs::{JobStatus, Submission};
use crate::types::AnalysisKind;

/// Handles shared by every request, managed by Rocket
pub struct AppState {
    /// `None` when no record store is configured
    pub records: Option<Arc<dyn RecordStore>>,
    pub queue: Arc<dyn JobQueue>,
    pub version: String,
}

impl AppState {
    pub fn new(records: Option<Arc<dyn RecordStore>>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            records,
            queue,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn records(&self) -> Option<&dyn RecordStore> {
        self.records.as_deref()
    }
}

// ===== Responses =====

/// `{job_id, transcript_id}` or `{job_id, icebreaker_id}`
pub struct SubmissionResponse {
    pub kind: AnalysisKind,
    pub job_id: String,
    pub record_id: String,
}

impl SubmissionResponse {
    pub fn new(kind: AnalysisKind, submission: Submission) -> Self {
        Self {
            kind,
            job_id: submission.job_id,
            record_id: submission.record_id,
        }
    }
}

impl Serialize for SubmissionResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("job_id", &self.job_id)?;
        map.serialize_entry(self.kind.id_field(), &self.record_id)?;
        map.end()
    }
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present only for `unknown`; `null` when the queue has no such job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Option<String>>,
}

impl JobStatusResponse {
    pub fn new(job_id: String, status: JobStatus) -> Self {
        let name = status.name();
        let mut response = Self {
            job_id,
            status: name,
            result: None,
            error: None,
            state: None,
        };
        match status {
            JobStatus::Pending | JobStatus::Started => {}
            JobStatus::Success { result } => response.result = Some(result),
            JobStatus::Failure { error } => response.error = Some(error),
            JobStatus::Unknown { state } => response.state = Some(state),
        }
        response
    }
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub services: HealthServices,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthServices {
    pub api: String,
    pub database: String,
    pub queue: String,
}

// ===== Errors =====

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Error,
}

impl StandardErrorResponse {
    pub fn new(error: String, error_code: String, suggestions: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
        }
    }
}
