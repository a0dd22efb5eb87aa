//! Human-readable error descriptions, structured JSON errors and exit codes.

use rain_core::error::{BuildError, PredictError};
use serde_json::json;

/// Errors raised by the CLI itself before a runner exists.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("frame source unavailable: {0}")]
    SourceInit(String),
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing file, a typo in a key, or an out-of-range value in the TOML.\nHow to fix: Edit the config file (see etc/rain_config.toml for a sample), then rerun."
            ),
            CliError::SourceInit(msg) => format!(
                "What happened: The frame source could not be set up ({msg}).\nLikely causes: Replay directory missing or the binary was built without the `http` feature.\nHow to fix: Check [source] in the config, or rebuild with default features."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSource => {
                "What happened: No frame source was provided to the predictor.\nLikely causes: The source failed to initialize or was not wired into the builder.\nHow to fix: Check [source] in the config.".to_string()
            }
            BuildError::MissingObserver => {
                "What happened: No observer location was provided.\nLikely causes: [observer] is missing from the config.\nHow to fix: Add observer.latitude and observer.longitude.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PredictError>() {
        return match pe {
            PredictError::Upstream(detail) => format!(
                "What happened: The radar service returned a malformed frame index ({detail}).\nLikely causes: API change or a truncated response.\nHow to fix: Check source.api_url; the next cycle retries automatically."
            ),
            PredictError::Source(detail) => format!(
                "What happened: The frame index could not be fetched ({detail}).\nLikely causes: No network, DNS failure, or the service is down.\nHow to fix: Check connectivity; the next cycle retries automatically."
            ),
            PredictError::Timeout => {
                "What happened: The frame index request timed out.\nLikely causes: Slow network or timeouts.index_ms set too low.\nHow to fix: Raise timeouts.index_ms in the config.".to_string()
            }
            PredictError::Config(detail) => format!(
                "What happened: Invalid configuration ({detail}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            PredictError::Busy => {
                "What happened: A prediction cycle is already running.\nLikely causes: The previous cycle overran the schedule.\nHow to fix: Wait for it to finish or raise schedule.run_interval_minutes.".to_string()
            }
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 malformed upstream, 3 invalid config, 4 cycle busy,
/// 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(pe) = err.downcast_ref::<PredictError>() {
        return match pe {
            PredictError::Upstream(_) => 2,
            PredictError::Config(_) => 3,
            PredictError::Busy => 4,
            PredictError::Source(_) | PredictError::Timeout => 1,
        };
    }
    if err.downcast_ref::<BuildError>().is_some()
        || matches!(err.downcast_ref::<CliError>(), Some(CliError::Config(_)))
    {
        return 3;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(pe) = err.downcast_ref::<PredictError>() {
        return match pe {
            PredictError::Upstream(_) => "Upstream",
            PredictError::Source(_) => "Source",
            PredictError::Timeout => "Timeout",
            PredictError::Config(_) => "Config",
            PredictError::Busy => "Busy",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    match err.downcast_ref::<CliError>() {
        Some(CliError::Config(_)) => "Config",
        Some(CliError::SourceInit(_)) => "Source",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
