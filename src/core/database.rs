// src/core/database.rs
//! SQLite connection management shared by the record store and the job queue

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::app_log;

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT_SECS: u64 = 5;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (and create if missing) the database behind `url`
    pub async fn connect(url: &str) -> Result<Self> {
        if !url.starts_with("sqlite:") {
            anyhow::bail!("Unsupported database URL, expected sqlite: {}", url);
        }

        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {}", url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));

        // SQLite creates the file but not its directory
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", url))?;

        app_log!(info, "Database connection established: {}", url);
        Ok(Self { pool })
    }

    pub fn into_pool(self) -> SqlitePool {
        self.pool
    }

    /// Check database health
    pub async fn health_check(pool: &SqlitePool) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}
