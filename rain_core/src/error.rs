use thiserror::Error;

/// Reasons a prediction cycle can fail as a whole.
///
/// Per-frame trouble never shows up here: a frame that cannot be fetched or
/// decoded is folded into the cycle as an empty frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PredictError {
    #[error("malformed upstream response: {0}")]
    Upstream(String),
    #[error("frame index unavailable: {0}")]
    Source(String),
    #[error("timeout waiting for frame index")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("a prediction cycle is already in flight")]
    Busy,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing frame source")]
    MissingSource,
    #[error("missing observer location")]
    MissingObserver,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
