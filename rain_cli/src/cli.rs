//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "rain", version, about = "Radar rain-cell tracking and arrival prediction")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/rain_config.toml")]
    pub config: PathBuf,

    /// Log and print cycle results as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides RUST_LOG
    /// and logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict periodically until Ctrl-C
    Run {
        /// Stop after this many cycles
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
    },
    /// Run a single prediction cycle and exit
    Once,
    /// Validate config and reach the frame source
    SelfCheck,
}

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}
