//! TabPilot - remotely controllable browser shell
//!
//! Main entry point: loads configuration, starts the browser engine and keeps
//! the controller connection alive until interrupted.

mod cli;
mod overlay;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tabpilot_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use tabpilot_core::{ShellContext, ShellOptions};
use tabpilot_engine_cdp::CdpEngine;
use tabpilot_protocols::{BrowserEngine, StatusObserver};
use tabpilot_remote::RemoteConnection;

use cli::{Cli, Commands};
use overlay::LoggingOverlay;

/// Initialize tracing with console and file output.
///
/// Log files are written to `logging.log_dir` with daily rotation.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = logging.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("tabpilot")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes on drop; keep it for the whole process.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::CheckConfig) => check_config(&cli.config),
        Some(Commands::Run { endpoint, headless }) => {
            let mut config = ConfigLoader::load_or_default(&cli.config)?;
            if let Some(endpoint) = endpoint {
                config.connection.endpoint = endpoint;
            }
            config.engine.headless |= headless;
            run(config, cli.token).await
        }
        None => {
            let config = ConfigLoader::load_or_default(&cli.config)?;
            run(config, cli.token).await
        }
    }
}

/// Print validation findings; fail on errors.
fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load(path)?;
    let result = ConfigValidator::validate(&config);

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if !result.is_valid() {
        return Err(format!(
            "{} has {} error(s)",
            path.display(),
            result.errors.len()
        )
        .into());
    }
    println!("{} is valid", path.display());
    Ok(())
}

/// Run the shell until Ctrl-C.
async fn run(config: Config, cli_token: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&config.logging)?;
    info!("Starting TabPilot v{}", env!("CARGO_PKG_VERSION"));

    let warnings = ConfigValidator::validate(&config).into_result()?;
    for warning in warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    let engine = Arc::new(CdpEngine::new(config.engine.clone()));
    let observer: Arc<dyn StatusObserver> = Arc::new(LoggingOverlay);
    let options = ShellOptions {
        default_focus: config.tabs.default_focus,
    };
    let ctx = Arc::new(ShellContext::new(engine.clone(), Some(observer), options)?);

    if config.tabs.open_home_on_start {
        match ctx.tabs().create_tab(&config.tabs.home_url, true).await {
            Ok(id) => info!("Opened home tab {}: {}", id, config.tabs.home_url),
            Err(e) => error!("Failed to open home tab: {}", e),
        }
    }

    let token = cli_token.or_else(|| config.connection.token.clone());
    let connection = RemoteConnection::new(config.connection.clone(), ctx.clone());
    connection.connect(token).await;

    info!("TabPilot running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    connection.disconnect().await;
    ctx.shutdown().await;
    if let Err(e) = engine.shutdown().await {
        warn!("Engine shutdown failed: {}", e);
    }

    info!("TabPilot stopped");
    Ok(())
}
