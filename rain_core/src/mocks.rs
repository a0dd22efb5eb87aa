//! Test and helper mocks for rain_core

use std::collections::HashMap;
use std::time::Duration;

use rain_traits::{FrameRef, FrameSource, GeoPoint, GeoSpan, RasterImage};

/// In-memory `FrameSource` with scripted index and per-frame outcomes.
#[derive(Debug, Default, Clone)]
pub struct ScriptedSource {
    frames: Vec<FrameRef>,
    rasters: HashMap<i64, RasterImage>,
    index_error: Option<String>,
    coverage: Option<GeoSpan>,
    /// Spans passed to `coverage`, in call order.
    pub coverage_requests: Vec<Option<GeoSpan>>,
    /// Centers requested by `fetch_raster`, in call order.
    pub requested_centers: Vec<GeoPoint>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame that decodes to `raster`.
    pub fn with_frame(mut self, timestamp: i64, raster: RasterImage) -> Self {
        self.frames.push(FrameRef {
            timestamp,
            path: format!("/scripted/{timestamp}"),
        });
        self.rasters.insert(timestamp, raster);
        self
    }

    /// Add a frame that is listed but fails to fetch.
    pub fn with_broken_frame(mut self, timestamp: i64) -> Self {
        self.frames.push(FrameRef {
            timestamp,
            path: format!("/scripted/{timestamp}"),
        });
        self
    }

    /// Report `span` as the extent of every raster.
    pub fn with_coverage(mut self, span: GeoSpan) -> Self {
        self.coverage = Some(span);
        self
    }

    /// Make `list_frames` fail with `message`.
    pub fn with_index_error(mut self, message: &str) -> Self {
        self.index_error = Some(message.to_string());
        self
    }
}

impl FrameSource for ScriptedSource {
    fn list_frames(&mut self) -> Result<Vec<FrameRef>, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(msg) = &self.index_error {
            return Err(Box::new(std::io::Error::other(msg.clone())));
        }
        Ok(self.frames.clone())
    }

    fn coverage(&mut self, _center: GeoPoint, want: Option<GeoSpan>) -> Option<GeoSpan> {
        self.coverage_requests.push(want);
        self.coverage
    }

    fn fetch_raster(
        &mut self,
        frame: &FrameRef,
        center: GeoPoint,
        _timeout: Duration,
    ) -> Result<RasterImage, Box<dyn std::error::Error + Send + Sync>> {
        self.requested_centers.push(center);
        self.rasters
            .get(&frame.timestamp)
            .cloned()
            .ok_or_else(|| format!("no raster scripted for {}", frame.path).into())
    }
}
