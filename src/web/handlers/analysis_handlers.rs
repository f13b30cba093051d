// src/web/handlers/analysis_handlers.rs
//! Handlers shared by the transcript and LinkedIn icebreaker routes

use rocket::serde::json::Json;
use rocket::State;

use crate::app_log;
use crate::jobs::{lookup_status, submit};
use crate::types::{AnalysisKind, AnalysisRecord, AnalysisRequest};
use crate::web::error::ApiError;
use crate::web::types::{AppState, JobStatusResponse, SubmissionResponse};

pub async fn submit_handler(
    state: &State<AppState>,
    request: AnalysisRequest,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let kind = request.kind();

    if let Some(field) = request.blank_field() {
        app_log!(info, "Rejected {} submission: {} is empty", kind, field);
        return Err(ApiError::Validation(format!("{} must not be empty", field)));
    }

    match submit(state.records(), state.queue.as_ref(), request).await {
        Ok(submission) => Ok(Json(SubmissionResponse::new(kind, submission))),
        Err(e) => {
            app_log!(error, "Failed to submit {}: {:#}", kind, e);
            Err(ApiError::QueueUnavailable)
        }
    }
}

pub async fn job_status_handler(
    state: &State<AppState>,
    kind: AnalysisKind,
    job_id: &str,
) -> Result<Json<JobStatusResponse>, ApiError> {
    match lookup_status(state.queue.as_ref(), kind, job_id).await {
        Ok(status) => Ok(Json(JobStatusResponse::new(job_id.to_string(), status))),
        Err(e) => {
            app_log!(error, job_id = %job_id, "Failed to read job status: {:#}", e);
            Err(ApiError::Internal)
        }
    }
}

pub async fn list_handler(state: &State<AppState>, kind: AnalysisKind) -> Json<Vec<AnalysisRecord>> {
    let Some(records) = state.records() else {
        return Json(Vec::new());
    };

    match records.list(kind).await {
        Ok(list) => Json(list),
        Err(e) => {
            app_log!(error, "Failed to list {} records: {:#}", kind, e);
            Json(Vec::new())
        }
    }
}

pub async fn get_handler(
    state: &State<AppState>,
    kind: AnalysisKind,
    id: &str,
) -> Result<Json<AnalysisRecord>, ApiError> {
    let records = state.records().ok_or(ApiError::DatabaseNotConfigured)?;

    match records.get(kind, id).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(ApiError::NotFound(kind.label().to_string())),
        Err(e) => {
            app_log!(error, record_id = %id, "Failed to fetch {}: {:#}", kind, e);
            Err(ApiError::Internal)
        }
    }
}
