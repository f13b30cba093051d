// src/core/config_manager.rs
//! Unified configuration: optional `config.yaml` section plus environment overrides

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::core::job_queue::QueueSettings;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ADDRESS: &str = "0.0.0.0";
const DEFAULT_QUEUE_URL: &str = "sqlite:data/jobs.db?mode=rwc";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 120;
const DEFAULT_WORKER_CONCURRENCY: usize = 2;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
const DEFAULT_CORS_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "https://*.netlify.app",
    "https://*.onrender.com",
];

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: String,
    pub server: ServerConfig,
    /// Record Store URL; `None` runs the API without persistence
    pub database_url: Option<String>,
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub url: String,
    pub settings: QueueSettings,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// One environment section of `config.yaml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub queue_url: Option<String>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub gemini_model: Option<String>,
    pub gemini_api_url: Option<String>,
    pub analysis_timeout_secs: Option<u64>,
    pub job_timeout_secs: Option<u64>,
    pub job_result_ttl_secs: Option<u64>,
    pub job_max_retries: Option<u32>,
    pub worker_concurrency: Option<usize>,
    pub worker_poll_interval_ms: Option<u64>,
    pub worker_sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    local: FileConfig,
    #[serde(default)]
    production: FileConfig,
}

impl ConfigManager {
    /// Load configuration from `config.yaml` (if present) and the process environment
    pub fn load() -> Result<Self> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string());
        info!("Loading configuration for environment: {}", environment);

        let path = std::env::var("INSIGHT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let file = Self::load_file(&path, &environment)?;

        Self::from_sources(environment, file, |key| std::env::var(key).ok())
    }

    fn load_file(path: &Path, environment: &str) -> Result<FileConfig> {
        if !path.exists() {
            return Ok(FileConfig::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        info!("Using configuration file: {}", path.display());
        Ok(match environment {
            "production" => file.production,
            _ => file.local,
        })
    }

    /// Build the configuration from a file section and an environment lookup.
    /// Environment values win over file values; empty values count as unset.
    pub fn from_sources<F>(environment: String, file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = parse_var(&env, "PORT")?.or(file.port).unwrap_or(DEFAULT_PORT);
        let address = env("BIND_ADDRESS")
            .or(file.bind_address)
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        let cors_allowed_origins = env("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .or(file.cors_allowed_origins)
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect());

        let defaults = QueueSettings::default();
        let settings = QueueSettings {
            job_timeout: parse_var(&env, "JOB_TIMEOUT_SECS")?
                .or(file.job_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_timeout),
            result_ttl: parse_var(&env, "JOB_RESULT_TTL_SECS")?
                .or(file.job_result_ttl_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.result_ttl),
            max_retries: parse_var(&env, "JOB_MAX_RETRIES")?
                .or(file.job_max_retries)
                .unwrap_or(defaults.max_retries),
        };

        let concurrency = parse_var(&env, "WORKER_CONCURRENCY")?
            .or(file.worker_concurrency)
            .unwrap_or(DEFAULT_WORKER_CONCURRENCY);
        if concurrency == 0 {
            anyhow::bail!("WORKER_CONCURRENCY must be at least 1");
        }

        let worker = WorkerConfig {
            concurrency,
            poll_interval: Duration::from_millis(
                parse_var(&env, "WORKER_POLL_INTERVAL_MS")?
                    .or(file.worker_poll_interval_ms)
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            sweep_interval: Duration::from_secs(
                parse_var(&env, "WORKER_SWEEP_INTERVAL_SECS")?
                    .or(file.worker_sweep_interval_secs)
                    .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
            ),
        };

        let provider = ProviderConfig {
            api_key: env("GEMINI_API_KEY"),
            model: env("GEMINI_MODEL")
                .or(file.gemini_model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: env("GEMINI_API_URL")
                .or(file.gemini_api_url)
                .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string()),
            timeout: Duration::from_secs(
                parse_var(&env, "ANALYSIS_TIMEOUT_SECS")?
                    .or(file.analysis_timeout_secs)
                    .unwrap_or(DEFAULT_ANALYSIS_TIMEOUT_SECS),
            ),
        };

        Ok(Self {
            environment,
            server: ServerConfig {
                address,
                port,
                cors_allowed_origins,
            },
            database_url: env("DATABASE_URL").or(file.database_url),
            queue: QueueConfig {
                url: env("QUEUE_URL")
                    .or(file.queue_url)
                    .unwrap_or_else(|| DEFAULT_QUEUE_URL.to_string()),
                settings,
            },
            worker,
            provider,
        })
    }
}

fn parse_var<T, F>(env: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, raw))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn build(file: FileConfig, vars: &[(&str, &str)]) -> Result<ConfigManager> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigManager::from_sources("local".to_string(), file, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = build(FileConfig::default(), &[]).unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.address, "0.0.0.0");
        assert_eq!(config.server.cors_allowed_origins.len(), 3);
        assert!(config.database_url.is_none());
        assert_eq!(config.queue.url, "sqlite:data/jobs.db?mode=rwc");
        assert_eq!(config.queue.settings, QueueSettings::default());
        assert_eq!(config.worker.concurrency, 2);
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.provider.model, "gemini-1.5-pro");
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = FileConfig {
            port: Some(9000),
            database_url: Some("sqlite:file.db".to_string()),
            job_timeout_secs: Some(60),
            ..FileConfig::default()
        };
        let config = build(
            file,
            &[
                ("PORT", "9100"),
                ("CORS_ALLOWED_ORIGINS", "https://app.example.com, https://*.example.org"),
                ("GEMINI_API_KEY", "secret"),
                ("JOB_MAX_RETRIES", "2"),
            ],
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.database_url.as_deref(), Some("sqlite:file.db"));
        assert_eq!(config.queue.settings.job_timeout, Duration::from_secs(60));
        assert_eq!(config.queue.settings.max_retries, 2);
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["https://app.example.com", "https://*.example.org"]
        );
        assert_eq!(config.provider.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = build(
            FileConfig::default(),
            &[("DATABASE_URL", ""), ("GEMINI_API_KEY", "  ")],
        )
        .unwrap();
        assert!(config.database_url.is_none());
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = build(FileConfig::default(), &[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        assert!(build(FileConfig::default(), &[("WORKER_CONCURRENCY", "0")]).is_err());
    }

    #[test]
    fn test_yaml_sections_parse() {
        let yaml = r#"
local:
  port: 8001
  database_url: "sqlite:data/records.db?mode=rwc"
production:
  port: 80
  worker_concurrency: 8
"#;
        let file: ConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.local.port, Some(8001));
        assert_eq!(file.production.worker_concurrency, Some(8));
        assert!(file.production.database_url.is_none());
    }
}
