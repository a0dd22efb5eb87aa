//! Maps `Box<dyn Error>` from the `FrameSource` boundary to `PredictError`.
//!
//! With the `source-errors` feature, `rain_source::SourceError` is downcast
//! for precise mapping; otherwise io timeouts and message text decide.

use crate::error::PredictError;

/// Map a frame-index error to a typed `PredictError`.
pub fn map_source_error(e: &(dyn std::error::Error + 'static)) -> PredictError {
    #[cfg(feature = "source-errors")]
    {
        use rain_source::SourceError;
        if let Some(se) = e.downcast_ref::<SourceError>() {
            return match se {
                SourceError::Timeout => PredictError::Timeout,
                SourceError::Malformed(_) => PredictError::Upstream(se.to_string()),
                other => PredictError::Source(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>()
        && io.kind() == std::io::ErrorKind::TimedOut
    {
        return PredictError::Timeout;
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        PredictError::Timeout
    } else if lower.contains("malformed") {
        PredictError::Upstream(s)
    } else {
        PredictError::Source(s)
    }
}
