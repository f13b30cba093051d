// src/jobs/status.rs
use anyhow::Result;
use serde_json::Value;

use crate::core::job_queue::{
    JobSnapshot, STATE_FAILURE, STATE_PENDING, STATE_RETRY, STATE_STARTED, STATE_SUCCESS,
};
use crate::core::JobQueue;
use crate::types::AnalysisKind;

/// Normalized job state as clients see it
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Started,
    Success { result: Value },
    Failure { error: String },
    /// Any other native state, or `None` when the queue has no record of the job
    Unknown { state: Option<String> },
}

impl JobStatus {
    pub fn from_snapshot(snapshot: JobSnapshot) -> Self {
        match snapshot.state.as_str() {
            // A retry is waiting to be claimed again
            STATE_PENDING | STATE_RETRY => JobStatus::Pending,
            STATE_STARTED => JobStatus::Started,
            STATE_SUCCESS => JobStatus::Success {
                result: snapshot.result.unwrap_or(Value::Null),
            },
            STATE_FAILURE => JobStatus::Failure {
                error: snapshot.error.unwrap_or_default(),
            },
            _ => JobStatus::Unknown {
                state: Some(snapshot.state),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Started => "started",
            JobStatus::Success { .. } => "success",
            JobStatus::Failure { .. } => "failure",
            JobStatus::Unknown { .. } => "unknown",
        }
    }
}

/// Read the status of a job submitted for `kind`. Jobs of another task are
/// reported as unknown.
pub async fn lookup_status(
    queue: &dyn JobQueue,
    kind: AnalysisKind,
    job_id: &str,
) -> Result<JobStatus> {
    let status = match queue.get_status(job_id).await? {
        Some(snapshot) if snapshot.task_name == kind.task_name() => {
            JobStatus::from_snapshot(snapshot)
        }
        _ => JobStatus::Unknown { state: None },
    };
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::QueueSettings;
    use crate::testing::TempStores;
    use serde_json::json;

    fn snapshot(state: &str) -> JobSnapshot {
        JobSnapshot {
            job_id: "job-1".to_string(),
            task_name: "analyze_transcript_task".to_string(),
            state: state.to_string(),
            result: None,
            error: None,
            attempts: 1,
        }
    }

    #[test]
    fn test_native_states_map_exhaustively() {
        assert_eq!(JobStatus::from_snapshot(snapshot(STATE_PENDING)), JobStatus::Pending);
        assert_eq!(JobStatus::from_snapshot(snapshot(STATE_STARTED)), JobStatus::Started);

        let mut done = snapshot(STATE_SUCCESS);
        done.result = Some(json!("analysis"));
        assert_eq!(
            JobStatus::from_snapshot(done),
            JobStatus::Success {
                result: json!("analysis")
            }
        );

        let mut failed = snapshot(STATE_FAILURE);
        failed.error = Some("boom".to_string());
        assert_eq!(
            JobStatus::from_snapshot(failed),
            JobStatus::Failure {
                error: "boom".to_string()
            }
        );

        let mut retry = snapshot(STATE_RETRY);
        retry.error = Some("flaky".to_string());
        assert_eq!(JobStatus::from_snapshot(retry), JobStatus::Pending);

        let odd = JobStatus::from_snapshot(snapshot("REVOKED"));
        assert_eq!(
            odd,
            JobStatus::Unknown {
                state: Some("REVOKED".to_string())
            }
        );
        assert_eq!(odd.name(), "unknown");
    }

    #[tokio::test]
    async fn test_job_awaiting_retry_reads_as_pending() {
        let stores = TempStores::with_settings(QueueSettings {
            max_retries: 1,
            ..QueueSettings::default()
        })
        .await;
        let job_id = stores
            .queue
            .enqueue(AnalysisKind::Transcript.task_name(), json!({}))
            .await
            .unwrap();
        stores.queue.claim_next().await.unwrap();
        stores.queue.fail(&job_id, "flaky").await.unwrap();

        let status = lookup_status(stores.queue.as_ref(), AnalysisKind::Transcript, &job_id)
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Pending);
        assert_eq!(status.name(), "pending");
    }

    #[tokio::test]
    async fn test_lookup_checks_task_kind() {
        let stores = TempStores::new().await;
        let job_id = stores
            .queue
            .enqueue(AnalysisKind::Transcript.task_name(), json!({}))
            .await
            .unwrap();

        let status = lookup_status(stores.queue.as_ref(), AnalysisKind::Transcript, &job_id)
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Pending);

        let other = lookup_status(stores.queue.as_ref(), AnalysisKind::Icebreaker, &job_id)
            .await
            .unwrap();
        assert_eq!(other, JobStatus::Unknown { state: None });

        let missing = lookup_status(stores.queue.as_ref(), AnalysisKind::Transcript, "nope")
            .await
            .unwrap();
        assert_eq!(missing, JobStatus::Unknown { state: None });
    }
}
