//! Replay of recorded frames stored as `<unix-seconds>.png`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rain_traits::{FrameRef, FrameSource, GeoPoint, RasterImage};

use crate::decode::decode_png;
use crate::error::{Result, SourceError};

/// Frames are already rendered for a fixed center; the requested center and
/// timeout are ignored.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scan(&self) -> Result<Vec<FrameRef>> {
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            let Some(ts) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i64>().ok())
            else {
                tracing::debug!(path = %path.display(), "skipping non-timestamp file");
                continue;
            };
            frames.push(FrameRef {
                timestamp: ts,
                path: path.to_string_lossy().into_owned(),
            });
        }
        frames.sort_by_key(|f| f.timestamp);
        Ok(frames)
    }
}

impl FrameSource for DirectorySource {
    fn list_frames(
        &mut self,
    ) -> std::result::Result<Vec<FrameRef>, Box<dyn std::error::Error + Send + Sync>> {
        let frames = self.scan()?;
        if frames.is_empty() {
            return Err(SourceError::NotFound(format!(
                "no <timestamp>.png frames in {}",
                self.dir.display()
            ))
            .into());
        }
        Ok(frames)
    }

    fn fetch_raster(
        &mut self,
        frame: &FrameRef,
        _center: GeoPoint,
        _timeout: Duration,
    ) -> std::result::Result<RasterImage, Box<dyn std::error::Error + Send + Sync>> {
        let bytes = std::fs::read(&frame.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound(frame.path.clone())
            } else {
                SourceError::Io(e)
            }
        })?;
        Ok(decode_png(&bytes)?)
    }
}
