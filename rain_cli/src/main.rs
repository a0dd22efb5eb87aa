mod cli;
mod error_fmt;
mod logging;
mod predict;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use cli::{Cli, Commands, JSON_MODE};
use error_fmt::{CliError, exit_code_for_error, format_error_json, humanize};

/// Read, parse and validate the config; every failure is a config error.
fn load_config(path: &std::path::Path) -> eyre::Result<rain_config::Config> {
    let cfg = rain_config::load_file(path).map_err(|e| CliError::Config(e.to_string()))?;
    cfg.validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(cfg)
}

fn run(cli: &Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    logging::init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging);
    tracing::debug!(config = %cli.config.display(), source = ?cfg.source.kind, "config loaded");

    match &cli.cmd {
        Commands::Run { cycles } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .map_err(|e| eyre::eyre!("install Ctrl-C handler: {e}"))?;
            predict::run_loop(&cfg, &shutdown, *cycles)
        }
        Commands::Once => predict::run_once(&cfg),
        Commands::SelfCheck => predict::self_check(&cfg),
    }
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(&cli) {
        if cli.json {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}
