// src/jobs/reconcile.rs
//! Repair records left without an analysis after a lost write.

use anyhow::Result;
use serde::Serialize;

use super::status::{lookup_status, JobStatus};
use super::AnalysisTask;
use crate::app_log;
use crate::core::{AnalysisUpdate, JobQueue, RecordStore};
use crate::types::{AnalysisKind, AnalysisRecord};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Records found with an empty analysis
    pub examined: usize,
    pub repaired: usize,
    pub already_set: usize,
    /// Record vanished between listing and update
    pub missing: usize,
    /// Job still pending or running
    pub in_flight: usize,
    pub failed: usize,
    /// Job unknown to the queue (never enqueued or expired)
    pub lost: usize,
    pub requeued: usize,
    /// Records skipped because the queue or store returned an error
    pub errors: usize,
}

/// Walk every unanalysed record and apply its job's result when the job has
/// succeeded. With `requeue`, records whose job is gone are enqueued again
/// under their original job id.
pub async fn reconcile(
    queue: &dyn JobQueue,
    records: &dyn RecordStore,
    requeue: bool,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for kind in AnalysisKind::ALL {
        for record in records.list_unanalysed(kind).await? {
            report.examined += 1;
            let outcome = match lookup_status(queue, kind, &record.job_id).await {
                Ok(status) => {
                    reconcile_record(queue, records, &record, status, requeue, &mut report).await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                app_log!(error, record_id = %record.id, job_id = %record.job_id, "Reconciliation failed: {:#}", e);
                report.errors += 1;
            }
        }
    }

    app_log!(
        info,
        examined = report.examined,
        repaired = report.repaired,
        lost = report.lost,
        requeued = report.requeued,
        errors = report.errors,
        "Reconciliation finished"
    );
    Ok(report)
}

async fn reconcile_record(
    queue: &dyn JobQueue,
    records: &dyn RecordStore,
    record: &AnalysisRecord,
    status: JobStatus,
    requeue: bool,
    report: &mut ReconcileReport,
) -> Result<()> {
    match status {
        JobStatus::Success { result } => {
            let Some(analysis) = result.as_str().filter(|text| !text.is_empty()) else {
                app_log!(warn, job_id = %record.job_id, "Job succeeded without a text result");
                report.failed += 1;
                return Ok(());
            };

            match records
                .set_analysis(record.kind(), &record.id, analysis)
                .await?
            {
                AnalysisUpdate::Updated => {
                    app_log!(info, record_id = %record.id, job_id = %record.job_id, "Record repaired from job result");
                    report.repaired += 1;
                }
                AnalysisUpdate::AlreadySet(_) => report.already_set += 1,
                AnalysisUpdate::Missing => report.missing += 1,
            }
        }
        JobStatus::Pending | JobStatus::Started => report.in_flight += 1,
        JobStatus::Unknown { state: Some(_) } => report.in_flight += 1,
        JobStatus::Failure { error } => {
            app_log!(warn, record_id = %record.id, job_id = %record.job_id, "Job failed: {}", error);
            report.failed += 1;
        }
        JobStatus::Unknown { state: None } => {
            report.lost += 1;
            if requeue {
                let task = AnalysisTask::new(record.id.clone(), record.request.clone());
                queue
                    .enqueue_as(&record.job_id, task.task_name(), task.to_args()?)
                    .await?;
                app_log!(info, record_id = %record.id, job_id = %record.job_id, "Lost job requeued");
                report.requeued += 1;
            }
        }
    }
    Ok(())
}
