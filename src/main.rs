use anyhow::Result;
use clap::Parser;
use transcript_insight::app_log;
use transcript_insight::cli::{handle_command, Cli};
use transcript_insight::core::ConfigManager;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "transcript_insight=info,rocket=warn";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging first
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .init();
    } else {
        registry.with(fmt::layer()).init();
    }

    // Load configuration using unified ConfigManager
    let config = ConfigManager::load()?;

    app_log!(info, "Starting Transcript Insight v{}", env!("CARGO_PKG_VERSION"));
    app_log!(info, "Environment: {}", config.environment);

    handle_command(cli, config).await
}
