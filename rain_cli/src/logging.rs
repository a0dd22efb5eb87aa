//! Tracing subscriber setup: console (pretty or JSON lines) plus an optional
//! rolling JSON file sink.

use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::FILE_GUARD;

/// Console filter precedence: `--log-level`, then `RUST_LOG`, then
/// `logging.level`, then `info`.
fn console_filter(cli_level: Option<&str>, cfg_level: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level
        && let Ok(f) = EnvFilter::try_new(level)
    {
        return f;
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cfg_level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_writer(
    file: &str,
    rotation: Option<&str>,
) -> Option<tracing_appender::non_blocking::NonBlocking> {
    let path = Path::new(file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path.file_name()?;
    let appender = match rotation.unwrap_or("never") {
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // A second init keeps the first guard; its writer stays valid.
    let _ = FILE_GUARD.set(guard);
    Some(writer)
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing(json: bool, cli_level: Option<&str>, logging: &rain_config::Logging) {
    let filter = console_filter(cli_level, logging.level.as_deref());

    let console_json = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
    });
    let console_pretty = (!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));

    let file_layer = logging
        .file
        .as_deref()
        .and_then(|f| file_writer(f, logging.rotation.as_deref()))
        .map(|w| fmt::layer().json().with_ansi(false).with_writer(w));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_pretty)
        .with(file_layer)
        .try_init();
}
