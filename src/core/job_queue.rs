// src/core/job_queue.rs
//! Job Queue: at-least-once task dispatch with id-keyed state and results
//!
//! Jobs live in a single SQLite table. A job moves
//! `PENDING -> STARTED -> SUCCESS | FAILURE`, or back to `RETRY` when a failed
//! attempt still has retries left. Finished jobs keep their result or error
//! until `result_ttl` elapses, after which they are invisible and later purged.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use uuid::Uuid;

use crate::app_log;
use crate::core::Database;

pub const STATE_PENDING: &str = "PENDING";
pub const STATE_STARTED: &str = "STARTED";
pub const STATE_SUCCESS: &str = "SUCCESS";
pub const STATE_FAILURE: &str = "FAILURE";
pub const STATE_RETRY: &str = "RETRY";

/// Point-in-time view of a job as the queue stores it
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub job_id: String,
    pub task_name: String,
    /// Native queue state, e.g. `PENDING` or `SUCCESS`
    pub state: String,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub attempts: u32,
}

/// A job handed to a worker. The queue already marked it `STARTED`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedJob {
    pub job_id: String,
    pub task_name: String,
    pub args: Value,
    pub attempt: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// Ceiling for a started job before the sweep fails it
    pub job_timeout: Duration,
    /// How long results and errors stay readable
    pub result_ttl: Duration,
    /// Automatic re-deliveries after a failed attempt
    pub max_retries: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(300),
            result_ttl: Duration::from_secs(3600),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub timed_out: u64,
    pub purged: u64,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue under a caller-chosen id
    async fn enqueue_as(&self, job_id: &str, task_name: &str, args: Value) -> Result<()>;

    async fn enqueue(&self, task_name: &str, args: Value) -> Result<String> {
        let job_id = Uuid::new_v4().to_string();
        self.enqueue_as(&job_id, task_name, args).await?;
        Ok(job_id)
    }

    /// `None` when the id is unknown or its result retention has elapsed
    async fn get_status(&self, job_id: &str) -> Result<Option<JobSnapshot>>;

    /// Atomically take the oldest runnable job and mark it started
    async fn claim_next(&self) -> Result<Option<ClaimedJob>>;

    async fn complete(&self, job_id: &str, result: Value) -> Result<()>;

    async fn fail(&self, job_id: &str, error: &str) -> Result<()>;

    /// Fail started jobs past the timeout and purge expired results
    async fn sweep(&self) -> Result<SweepReport>;

    async fn health_check(&self) -> Result<()>;
}

// ===== SQLite Implementation =====

pub struct SqliteJobQueue {
    pool: SqlitePool,
    settings: QueueSettings,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

impl SqliteJobQueue {
    pub async fn connect(url: &str, settings: QueueSettings) -> Result<Self> {
        let db = Database::connect(url).await?;
        let queue = Self {
            pool: db.into_pool(),
            settings,
        };
        queue.migrate().await?;
        Ok(queue)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                job_id TEXT PRIMARY KEY,
                task_name TEXT NOT NULL,
                args TEXT NOT NULL,
                state TEXT NOT NULL,
                result TEXT,
                error TEXT,
                attempts INTEGER NOT NULL DEFAULT 0,
                enqueued_at INTEGER NOT NULL,
                started_at INTEGER,
                finished_at INTEGER,
                expires_at INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state, enqueued_at);")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_expires_at ON jobs(expires_at);")
            .execute(&self.pool)
            .await?;

        app_log!(info, "Job queue migrations completed");
        Ok(())
    }

    /// Shared by `fail` and the timeout sweep: retry while attempts remain,
    /// otherwise settle as `FAILURE` with a retention deadline.
    async fn settle_failure(&self, scope: FailureScope<'_>, error: &str) -> Result<u64> {
        let now = now_millis();
        let expires_at = now.saturating_add(millis(self.settings.result_ttl));
        let condition = match scope {
            FailureScope::Job(_) => "job_id = ?5",
            FailureScope::StartedBefore(_) => "started_at <= ?5",
        };
        let sql = format!(
            r#"
            UPDATE jobs SET
                state = CASE WHEN attempts <= ?1 THEN '{retry}' ELSE '{failure}' END,
                error = ?2,
                started_at = CASE WHEN attempts <= ?1 THEN NULL ELSE started_at END,
                finished_at = CASE WHEN attempts <= ?1 THEN NULL ELSE ?3 END,
                expires_at = CASE WHEN attempts <= ?1 THEN NULL ELSE ?4 END
            WHERE state = '{started}' AND {condition}
            "#,
            retry = STATE_RETRY,
            failure = STATE_FAILURE,
            started = STATE_STARTED,
            condition = condition,
        );

        let query = sqlx::query(&sql)
            .bind(i64::from(self.settings.max_retries))
            .bind(error)
            .bind(now)
            .bind(expires_at);
        let query = match scope {
            FailureScope::Job(job_id) => query.bind(job_id),
            FailureScope::StartedBefore(cutoff) => query.bind(cutoff),
        };

        let result = query
            .execute(&self.pool)
            .await
            .context("Failed to record job failure")?;
        Ok(result.rows_affected())
    }
}

#[derive(Clone, Copy)]
enum FailureScope<'a> {
    Job(&'a str),
    StartedBefore(i64),
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue_as(&self, job_id: &str, task_name: &str, args: Value) -> Result<()> {
        let args = serde_json::to_string(&args).context("Failed to serialize job args")?;

        // An id whose retention has elapsed but is not purged yet can be reused
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (job_id, task_name, args, state, attempts, enqueued_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            ON CONFLICT(job_id) DO UPDATE SET
                task_name = excluded.task_name,
                args = excluded.args,
                state = excluded.state,
                result = NULL,
                error = NULL,
                attempts = 0,
                enqueued_at = excluded.enqueued_at,
                started_at = NULL,
                finished_at = NULL,
                expires_at = NULL
            WHERE jobs.expires_at IS NOT NULL AND jobs.expires_at <= excluded.enqueued_at
            "#,
        )
        .bind(job_id)
        .bind(task_name)
        .bind(args)
        .bind(STATE_PENDING)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to enqueue {} job {}", task_name, job_id))?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Job id already exists: {}", job_id);
        }

        app_log!(debug, job_id = %job_id, task = %task_name, "Job enqueued");
        Ok(())
    }

    async fn get_status(&self, job_id: &str) -> Result<Option<JobSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT job_id, task_name, state, result, error, attempts
            FROM jobs
            WHERE job_id = ? AND (expires_at IS NULL OR expires_at > ?)
            "#,
        )
        .bind(job_id)
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to read job {}", job_id))?;

        row.map(|row| snapshot_from_row(&row)).transpose()
    }

    async fn claim_next(&self) -> Result<Option<ClaimedJob>> {
        let sql = format!(
            r#"
            UPDATE jobs SET state = '{started}', started_at = ?, attempts = attempts + 1
            WHERE job_id = (
                SELECT job_id FROM jobs
                WHERE state IN ('{pending}', '{retry}')
                ORDER BY enqueued_at ASC, rowid ASC
                LIMIT 1
            )
            RETURNING job_id, task_name, args, attempts
            "#,
            started = STATE_STARTED,
            pending = STATE_PENDING,
            retry = STATE_RETRY,
        );

        let row = sqlx::query(&sql)
            .bind(now_millis())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to claim next job")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let args: String = row.try_get("args")?;
        let attempts: i64 = row.try_get("attempts")?;
        Ok(Some(ClaimedJob {
            job_id: row.try_get("job_id")?,
            task_name: row.try_get("task_name")?,
            args: serde_json::from_str(&args).context("Stored job args are not valid JSON")?,
            attempt: u32::try_from(attempts).unwrap_or(u32::MAX),
        }))
    }

    async fn complete(&self, job_id: &str, result: Value) -> Result<()> {
        let now = now_millis();
        let result = serde_json::to_string(&result).context("Failed to serialize job result")?;

        // A late completion still wins over a timeout failure
        let updated = sqlx::query(
            r#"
            UPDATE jobs SET state = ?, result = ?, error = NULL, finished_at = ?, expires_at = ?
            WHERE job_id = ? AND state <> ?
            "#,
        )
        .bind(STATE_SUCCESS)
        .bind(result)
        .bind(now)
        .bind(now.saturating_add(millis(self.settings.result_ttl)))
        .bind(job_id)
        .bind(STATE_SUCCESS)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to complete job {}", job_id))?;

        if updated.rows_affected() == 0 {
            app_log!(warn, job_id = %job_id, "Completion ignored, job unknown or already succeeded");
        }
        Ok(())
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<()> {
        let updated = self
            .settle_failure(FailureScope::Job(job_id), error)
            .await?;
        if updated == 0 {
            app_log!(warn, job_id = %job_id, "Failure ignored, job is not running");
        }
        Ok(())
    }

    async fn sweep(&self) -> Result<SweepReport> {
        let now = now_millis();
        let cutoff = now.saturating_sub(millis(self.settings.job_timeout));
        let error = format!(
            "Job exceeded timeout of {}s",
            self.settings.job_timeout.as_secs()
        );

        let timed_out = self
            .settle_failure(FailureScope::StartedBefore(cutoff), &error)
            .await?;

        let purged = sqlx::query("DELETE FROM jobs WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to purge expired jobs")?
            .rows_affected();

        if timed_out > 0 || purged > 0 {
            app_log!(info, timed_out, purged, "Job queue sweep finished");
        }
        Ok(SweepReport { timed_out, purged })
    }

    async fn health_check(&self) -> Result<()> {
        Database::health_check(&self.pool).await
    }
}

fn snapshot_from_row(row: &SqliteRow) -> Result<JobSnapshot> {
    let result: Option<String> = row.try_get("result")?;
    let attempts: i64 = row.try_get("attempts")?;

    Ok(JobSnapshot {
        job_id: row.try_get("job_id")?,
        task_name: row.try_get("task_name")?,
        state: row.try_get("state")?,
        result: result
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .context("Stored job result is not valid JSON")?,
        error: row.try_get("error")?,
        attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
    })
}
