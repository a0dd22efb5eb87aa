//! Synthetic storm for offline runs and demos.
//!
//! A round cell drifts across the raster along `heading_deg`, starting upwind
//! of the requested center. Every `list_frames` call advances the scene by
//! one frame, so a periodic loop sees the storm approach, pass overhead and
//! recede. Once it has crossed the raster it re-enters upwind.

use std::time::Duration;

use rain_traits::{FrameRef, FrameSource, GeoPoint, RasterImage};

use crate::error::SourceError;

const START_OFFSET_PX: f64 = 60.0;
const STEP_PX: f64 = 4.0;
const RADIUS_PX: f64 = 6.0;
const CORE_VALUE: u8 = 200;
const EDGE_VALUE: u8 = 90;

#[derive(Debug, Clone)]
pub struct SimulatedStorm {
    size: usize,
    interval_s: i64,
    heading_deg: f64,
    start_ts: i64,
    frames_per_index: usize,
    cycle: i64,
}

impl SimulatedStorm {
    pub fn new(size: usize, interval_s: i64, heading_deg: f64, start_ts: i64) -> Self {
        Self {
            size,
            interval_s: interval_s.max(1),
            heading_deg,
            start_ts,
            frames_per_index: 6,
            cycle: 0,
        }
    }

    pub fn with_frames_per_index(mut self, n: usize) -> Self {
        self.frames_per_index = n.max(1);
        self
    }

    fn period(&self) -> i64 {
        // frames needed to travel from START_OFFSET upwind to the same
        // distance downwind
        (2.0 * START_OFFSET_PX / STEP_PX).round() as i64 + 1
    }

    /// Storm center in pixel coordinates (col, row) for frame `k`.
    pub fn storm_center_px(&self, k: i64) -> (f64, f64) {
        let mid = (self.size.saturating_sub(1)) as f64 / 2.0;
        let h = self.heading_deg.to_radians();
        // rows grow southward
        let (dx, dy) = (h.sin(), -h.cos());
        let along = -START_OFFSET_PX + STEP_PX * k.rem_euclid(self.period()) as f64;
        (mid + dx * along, mid + dy * along)
    }

    /// Render frame `k`.
    pub fn render(&self, k: i64) -> RasterImage {
        let mut r = RasterImage::blank(self.size, self.size);
        let (cx, cy) = self.storm_center_px(k);
        for row in 0..self.size {
            for col in 0..self.size {
                let d = (col as f64 - cx).hypot(row as f64 - cy);
                if d <= RADIUS_PX / 2.0 {
                    r.set(col, row, CORE_VALUE);
                } else if d <= RADIUS_PX {
                    r.set(col, row, EDGE_VALUE);
                }
            }
        }
        r
    }

    fn frame_index(&self, frame: &FrameRef) -> Option<i64> {
        let offset = frame.timestamp.checked_sub(self.start_ts)?;
        (offset % self.interval_s == 0).then_some(offset / self.interval_s)
    }
}

impl FrameSource for SimulatedStorm {
    fn list_frames(
        &mut self,
    ) -> std::result::Result<Vec<FrameRef>, Box<dyn std::error::Error + Send + Sync>> {
        let n = i64::try_from(self.frames_per_index).unwrap_or(i64::MAX);
        let frames = (self.cycle..self.cycle.saturating_add(n))
            .map(|k| {
                let timestamp = self.start_ts + k * self.interval_s;
                FrameRef {
                    timestamp,
                    path: format!("simulated/{timestamp}"),
                }
            })
            .collect();
        self.cycle += 1;
        Ok(frames)
    }

    fn fetch_raster(
        &mut self,
        frame: &FrameRef,
        _center: GeoPoint,
        _timeout: Duration,
    ) -> std::result::Result<RasterImage, Box<dyn std::error::Error + Send + Sync>> {
        let k = self
            .frame_index(frame)
            .ok_or_else(|| SourceError::NotFound(frame.path.clone()))?;
        Ok(self.render(k))
    }
}
