pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::time::Duration;

/// Geographic coordinate in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// North-south and east-west extent of an area, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoSpan {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl GeoSpan {
    #[inline]
    pub const fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }
}

/// One entry of the upstream frame index: when the frame was taken and how to
/// fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRef {
    /// Unix seconds.
    pub timestamp: i64,
    /// Source-specific locator (URL path, file name, ...).
    pub path: String,
}

/// Row-major 8-bit intensity raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl RasterImage {
    /// Build a raster, rejecting buffers whose length is not `width * height`.
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Option<Self> {
        if width.checked_mul(height)? != pixels.len() {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// All-zero raster.
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> Option<u8> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.pixels.get(row * self.width + col).copied()
    }

    #[inline]
    pub fn set(&mut self, col: usize, row: usize, value: u8) {
        if col < self.width && row < self.height {
            self.pixels[row * self.width + col] = value;
        }
    }
}

/// Upstream radar imagery provider.
///
/// `list_frames` must return frames oldest to newest. `fetch_raster` renders
/// the frame centered on `center`; implementations honour `timeout` for any
/// blocking I/O.
///
/// `coverage` reports the geographic extent of the rasters the next
/// `fetch_raster` calls around `center` will return. Sources that render at a
/// zoom level pick the level that best covers `want` (their configured level
/// when `want` is `None`). `None` means the extent is unknown and the caller's
/// own window applies.
pub trait FrameSource {
    fn list_frames(&mut self) -> Result<Vec<FrameRef>, Box<dyn std::error::Error + Send + Sync>>;

    fn coverage(&mut self, _center: GeoPoint, _want: Option<GeoSpan>) -> Option<GeoSpan> {
        None
    }

    fn fetch_raster(
        &mut self,
        frame: &FrameRef,
        center: GeoPoint,
        timeout: Duration,
    ) -> Result<RasterImage, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn list_frames(&mut self) -> Result<Vec<FrameRef>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).list_frames()
    }

    fn coverage(&mut self, center: GeoPoint, want: Option<GeoSpan>) -> Option<GeoSpan> {
        (**self).coverage(center, want)
    }

    fn fetch_raster(
        &mut self,
        frame: &FrameRef,
        center: GeoPoint,
        timeout: Duration,
    ) -> Result<RasterImage, Box<dyn std::error::Error + Send + Sync>> {
        (**self).fetch_raster(frame, center, timeout)
    }
}
