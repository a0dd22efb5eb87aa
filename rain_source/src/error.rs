use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(String),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("malformed frame index: {0}")]
    Malformed(String),
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("request timed out")]
    Timeout,
    #[error("frame not found: {0}")]
    NotFound(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;
