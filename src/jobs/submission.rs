// src/jobs/submission.rs
use anyhow::{Context, Result};
use uuid::Uuid;

use super::AnalysisTask;
use crate::app_log;
use crate::core::{JobQueue, RecordStore};
use crate::types::{AnalysisRecord, AnalysisRequest};

/// Ids handed back to the client right after submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub job_id: String,
    pub record_id: String,
    /// Whether the pending record reached the record store
    pub persisted: bool,
}

/// Insert the pending record and enqueue its analysis task.
///
/// Both writes run concurrently. Only the enqueue can fail the submission: a
/// lost record write is logged and left for reconciliation.
pub async fn submit(
    records: Option<&dyn RecordStore>,
    queue: &dyn JobQueue,
    request: AnalysisRequest,
) -> Result<Submission> {
    let kind = request.kind();
    let record_id = Uuid::new_v4().to_string();
    let job_id = Uuid::new_v4().to_string();

    let task = AnalysisTask::new(record_id.clone(), request.clone());
    let args = task.to_args()?;
    let record = AnalysisRecord::pending(record_id.clone(), job_id.clone(), request);

    let store_write = async {
        match records {
            Some(store) => store.insert(&record).await.map(|_| true),
            None => Ok(false),
        }
    };
    let enqueue = queue.enqueue_as(&job_id, kind.task_name(), args);

    let (stored, enqueued) = tokio::join!(store_write, enqueue);

    let persisted = match stored {
        Ok(true) => true,
        Ok(false) => {
            app_log!(warn, record_id = %record_id, "Record store not configured, {} not persisted", kind);
            false
        }
        Err(e) => {
            app_log!(error, record_id = %record_id, job_id = %job_id, "Failed to store {}: {:#}", kind, e);
            false
        }
    };

    enqueued.with_context(|| format!("Failed to enqueue {} analysis", kind))?;

    app_log!(info, job_id = %job_id, record_id = %record_id, "{} submitted for analysis", kind);
    Ok(Submission {
        job_id,
        record_id,
        persisted,
    })
}
