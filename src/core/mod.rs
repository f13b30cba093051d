// src/core/mod.rs
//! Collaborator handles shared by the API and the worker

pub mod config_manager;
pub mod database;
pub mod job_queue;
pub mod record_store;

pub use config_manager::ConfigManager;
pub use database::Database;
pub use job_queue::{JobQueue, JobSnapshot, QueueSettings, SqliteJobQueue};
pub use record_store::{AnalysisUpdate, RecordStore, SqliteRecordStore};
