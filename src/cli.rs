// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::watch;

use crate::analysis::{Analyzer, GeminiClient};
use crate::app_log;
use crate::core::{ConfigManager, JobQueue, RecordStore, SqliteJobQueue, SqliteRecordStore};
use crate::jobs::{reconcile, JobStatus, Worker};
use crate::web::{start_web_server, AppState, JobStatusResponse};

#[derive(Parser)]
#[command(name = "transcript-insight")]
#[command(about = "Meeting transcript and LinkedIn icebreaker analysis API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Also run the worker pool in this process
        #[arg(long)]
        with_worker: bool,
    },
    /// Run the worker pool only
    Worker,
    /// Fill records whose job succeeded but whose analysis was never stored
    Reconcile {
        /// Enqueue again records whose job is unknown to the queue
        #[arg(long)]
        requeue: bool,
    },
    /// Print the status of a job
    Status { job_id: String },
}

struct Services {
    queue: Arc<dyn JobQueue>,
    records: Option<Arc<dyn RecordStore>>,
}

async fn connect_services(config: &ConfigManager) -> Result<Services> {
    let queue = SqliteJobQueue::connect(&config.queue.url, config.queue.settings)
        .await
        .with_context(|| format!("Failed to open job queue at {}", config.queue.url))?;
    app_log!(info, "Job queue: {}", config.queue.url);

    let records: Option<Arc<dyn RecordStore>> = match &config.database_url {
        Some(url) => match SqliteRecordStore::connect(url).await {
            Ok(store) => {
                app_log!(info, "Record store: {}", url);
                Some(Arc::new(store))
            }
            Err(e) => {
                app_log!(error, "Failed to open record store, running without persistence: {:#}", e);
                None
            }
        },
        None => {
            app_log!(warn, "DATABASE_URL not set, running without persistence");
            None
        }
    };

    Ok(Services {
        queue: Arc::new(queue),
        records,
    })
}

fn build_worker(config: &ConfigManager, services: &Services) -> Result<Worker> {
    let provider = GeminiClient::new(&config.provider)?;
    if !provider.is_configured() {
        app_log!(warn, "GEMINI_API_KEY not set, analyses will use placeholder text");
    }

    Ok(Worker::new(
        Arc::clone(&services.queue),
        services.records.clone(),
        Analyzer::new(Arc::new(provider)),
        config.worker.clone(),
    ))
}

pub async fn handle_command(cli: Cli, config: ConfigManager) -> Result<()> {
    let services = connect_services(&config).await?;

    match cli.command {
        Command::Serve { with_worker } => {
            let state = AppState::new(services.records.clone(), Arc::clone(&services.queue));

            if !with_worker {
                return start_web_server(state, &config.server).await;
            }

            let worker = Arc::new(build_worker(&config, &services)?);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let pool = tokio::spawn(worker.run(shutdown_rx));

            let served = start_web_server(state, &config.server).await;

            let _ = shutdown_tx.send(true);
            pool.await.context("Worker pool task failed")??;
            served
        }

        Command::Worker => {
            let worker = Arc::new(build_worker(&config, &services)?);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let pool = tokio::spawn(worker.run(shutdown_rx));

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            app_log!(info, "Shutdown requested, finishing in-flight jobs");

            let _ = shutdown_tx.send(true);
            pool.await.context("Worker pool task failed")?
        }

        Command::Reconcile { requeue } => {
            let records = services
                .records
                .as_deref()
                .context("DATABASE_URL is not configured, nothing to reconcile")?;

            let report = reconcile(services.queue.as_ref(), records, requeue).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Command::Status { job_id } => {
            let snapshot = services.queue.get_status(&job_id).await?;
            let task = snapshot.as_ref().map(|s| s.task_name.clone());
            let status = match snapshot {
                Some(snapshot) => JobStatus::from_snapshot(snapshot),
                None => JobStatus::Unknown { state: None },
            };

            let mut output = serde_json::to_value(JobStatusResponse::new(job_id, status))?;
            if let (Some(task), Some(fields)) = (task, output.as_object_mut()) {
                fields.insert("task".to_string(), serde_json::Value::String(task));
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}
