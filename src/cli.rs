//! CLI definitions for TabPilot.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// TabPilot CLI.
#[derive(Parser)]
#[command(name = "tabpilot")]
#[command(about = "Remotely controllable browser shell")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    /// Controller credential; overrides `connection.token`
    #[arg(long, env = "TABPILOT_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the shell in foreground (default)
    Run {
        /// Controller endpoint; overrides `connection.endpoint`
        #[arg(long)]
        endpoint: Option<String>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,
    },

    /// Validate the configuration file and exit
    CheckConfig,
}
