// src/core/record_store.rs
//! Record Store: persisted submissions and their analyses

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::app_log;
use crate::core::Database;
use crate::types::{
    AnalysisKind, AnalysisRecord, AnalysisRequest, IcebreakerRequest, TranscriptRequest,
};

/// Fixed-width timestamps keep `ORDER BY created_at` chronological
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Outcome of writing an analysis into an existing record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisUpdate {
    /// The record was empty and now holds the new analysis
    Updated,
    /// The record already held an analysis, returned unchanged
    AlreadySet(String),
    /// No record with that id exists
    Missing,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: &AnalysisRecord) -> Result<()>;

    /// Fill `analysis` for `id`, only if it is still empty
    async fn set_analysis(
        &self,
        kind: AnalysisKind,
        id: &str,
        analysis: &str,
    ) -> Result<AnalysisUpdate>;

    async fn get(&self, kind: AnalysisKind, id: &str) -> Result<Option<AnalysisRecord>>;

    /// All records of `kind`, newest first
    async fn list(&self, kind: AnalysisKind) -> Result<Vec<AnalysisRecord>>;

    /// Records of `kind` still waiting for an analysis, oldest first
    async fn list_unanalysed(&self, kind: AnalysisKind) -> Result<Vec<AnalysisRecord>>;

    async fn health_check(&self) -> Result<()>;
}

// ===== SQLite Implementation =====

pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let db = Database::connect(url).await?;
        let store = Self {
            pool: db.into_pool(),
        };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transcripts (
                id TEXT PRIMARY KEY,
                company_name TEXT NOT NULL,
                attendees TEXT NOT NULL,
                date TEXT NOT NULL,
                transcript_text TEXT NOT NULL,
                analysis TEXT NOT NULL DEFAULT '',
                job_id TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS linkedin_icebreakers (
                id TEXT PRIMARY KEY,
                linkedin_bio TEXT NOT NULL,
                pitch_deck TEXT NOT NULL,
                icebreaker_analysis TEXT NOT NULL DEFAULT '',
                job_id TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_transcripts_created_at ON transcripts(created_at);",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_icebreakers_created_at ON linkedin_icebreakers(created_at);",
        )
        .execute(&self.pool)
        .await?;

        app_log!(info, "Record store migrations completed");
        Ok(())
    }

    async fn select_where(
        &self,
        kind: AnalysisKind,
        condition: &str,
        order: &str,
    ) -> Result<Vec<AnalysisRecord>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} ORDER BY {}",
            kind.table(),
            condition,
            order
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to read {}", kind.table()))?;

        rows.iter().map(|row| record_from_row(kind, row)).collect()
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, record: &AnalysisRecord) -> Result<()> {
        let created_at = record.created_at.format(TIMESTAMP_FORMAT).to_string();

        let query = match &record.request {
            AnalysisRequest::Transcript(t) => sqlx::query(
                r#"
                INSERT INTO transcripts
                    (id, company_name, attendees, date, transcript_text, analysis, job_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&t.company_name)
            .bind(&t.attendees)
            .bind(&t.date)
            .bind(&t.transcript_text),
            AnalysisRequest::Icebreaker(i) => sqlx::query(
                r#"
                INSERT INTO linkedin_icebreakers
                    (id, linkedin_bio, pitch_deck, icebreaker_analysis, job_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&i.linkedin_bio)
            .bind(&i.pitch_deck),
        };

        query
            .bind(&record.analysis)
            .bind(&record.job_id)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert {} record {}", record.kind(), record.id))?;

        Ok(())
    }

    async fn set_analysis(
        &self,
        kind: AnalysisKind,
        id: &str,
        analysis: &str,
    ) -> Result<AnalysisUpdate> {
        if analysis.is_empty() {
            anyhow::bail!("Refusing to store an empty analysis for {}", id);
        }

        let column = kind.analysis_field();
        let update = format!(
            "UPDATE {} SET {} = ? WHERE id = ? AND {} = ''",
            kind.table(),
            column,
            column
        );
        let result = sqlx::query(&update)
            .bind(analysis)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update {} record {}", kind, id))?;

        if result.rows_affected() > 0 {
            return Ok(AnalysisUpdate::Updated);
        }

        let select = format!("SELECT {} FROM {} WHERE id = ?", column, kind.table());
        let existing: Option<String> = sqlx::query_scalar(&select)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read {} record {}", kind, id))?;

        Ok(match existing {
            Some(existing) => AnalysisUpdate::AlreadySet(existing),
            None => AnalysisUpdate::Missing,
        })
    }

    async fn get(&self, kind: AnalysisKind, id: &str) -> Result<Option<AnalysisRecord>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", kind.table());
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read {} record {}", kind, id))?;

        row.map(|row| record_from_row(kind, &row)).transpose()
    }

    async fn list(&self, kind: AnalysisKind) -> Result<Vec<AnalysisRecord>> {
        self.select_where(kind, "1 = 1", "created_at DESC, rowid DESC")
            .await
    }

    async fn list_unanalysed(&self, kind: AnalysisKind) -> Result<Vec<AnalysisRecord>> {
        let condition = format!("{} = ''", kind.analysis_field());
        self.select_where(kind, &condition, "created_at ASC, rowid ASC")
            .await
    }

    async fn health_check(&self) -> Result<()> {
        Database::health_check(&self.pool).await
    }
}

fn record_from_row(kind: AnalysisKind, row: &SqliteRow) -> Result<AnalysisRecord> {
    let request = match kind {
        AnalysisKind::Transcript => AnalysisRequest::Transcript(TranscriptRequest {
            company_name: row.try_get("company_name")?,
            attendees: row.try_get("attendees")?,
            date: row.try_get("date")?,
            transcript_text: row.try_get("transcript_text")?,
        }),
        AnalysisKind::Icebreaker => AnalysisRequest::Icebreaker(IcebreakerRequest {
            linkedin_bio: row.try_get("linkedin_bio")?,
            pitch_deck: row.try_get("pitch_deck")?,
        }),
    };

    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .with_context(|| format!("Invalid created_at timestamp: {}", created_at))?
        .with_timezone(&Utc);

    Ok(AnalysisRecord {
        id: row.try_get("id")?,
        request,
        analysis: row.try_get(kind.analysis_field())?,
        job_id: row.try_get("job_id")?,
        created_at,
    })
}
