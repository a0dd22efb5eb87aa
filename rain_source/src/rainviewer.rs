//! RainViewer public radar API: `weather-maps.json` index plus lat/lon
//! centered PNG tiles.

use std::f64::consts::PI;

use rain_traits::{FrameRef, GeoPoint, GeoSpan};
use serde::Deserialize;

use crate::error::{Result, SourceError};

#[derive(Debug, Deserialize)]
struct Maps {
    host: String,
    radar: Option<Radar>,
}

#[derive(Debug, Deserialize)]
struct Radar {
    past: Option<Vec<RawFrame>>,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    time: i64,
    path: Option<String>,
}

/// Parse a `weather-maps.json` document into frame refs, oldest first.
///
/// Each ref's `path` is the absolute tile prefix (`{host}{path}`).
pub fn parse_index(json: &str) -> Result<Vec<FrameRef>> {
    let maps: Maps =
        serde_json::from_str(json).map_err(|e| SourceError::Malformed(e.to_string()))?;
    let radar = maps
        .radar
        .ok_or_else(|| SourceError::Malformed("missing radar".into()))?;
    let past = radar
        .past
        .filter(|p| !p.is_empty())
        .ok_or_else(|| SourceError::Malformed("missing or empty radar.past".into()))?;

    let host = maps.host.trim_end_matches('/');
    let mut frames = past
        .into_iter()
        .map(|f| {
            let path = f
                .path
                .ok_or_else(|| SourceError::Malformed(format!("frame {} has no path", f.time)))?;
            Ok(FrameRef {
                timestamp: f.time,
                path: format!("{host}{path}"),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    frames.sort_by_key(|f| f.timestamp);
    Ok(frames)
}

/// Tile rendering options appended to every tile URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileOptions {
    pub size: u32,
    pub zoom: u8,
    pub color_scheme: u8,
    /// `<smooth>_<snow>` pair, e.g. `0_0`
    pub options: String,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            size: 256,
            zoom: 8,
            color_scheme: 2,
            options: "0_0".to_string(),
        }
    }
}

/// `{prefix}/{size}/{zoom}/{lat}/{lon}/{color}/{options}.png`
pub fn tile_url(prefix: &str, opts: &TileOptions, center: GeoPoint) -> String {
    format!(
        "{}/{}/{}/{:.4}/{:.4}/{}/{}.png",
        prefix, opts.size, opts.zoom, center.lat, center.lon, opts.color_scheme, opts.options
    )
}

/// Zoom levels accepted by the tile endpoint.
pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 20;

/// Web Mercator latitude limit.
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Latitude -> normalized Web Mercator y (0 at the north edge, 1 at the south).
fn mercator_y(lat: f64) -> f64 {
    let phi = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    (1.0 - (phi.tan() + 1.0 / phi.cos()).ln() / PI) / 2.0
}

fn mercator_lat(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y.clamp(0.0, 1.0))).sinh().atan().to_degrees()
}

/// Extent of a `size` px tile rendered at `zoom` and centered on `center`.
pub fn tile_extent(center: GeoPoint, size: u32, zoom: u8) -> GeoSpan {
    let world_px = 256.0 * f64::from(1u32 << zoom.min(MAX_ZOOM));
    let half = f64::from(size) / 2.0 / world_px;
    let y = mercator_y(center.lat);
    let north = mercator_lat(y - half);
    let south = mercator_lat(y + half);
    GeoSpan::new(north - south, f64::from(size) * 360.0 / world_px)
}

/// Highest zoom whose tile around `center` still covers `want`; the lowest
/// zoom when nothing does.
pub fn zoom_to_cover(center: GeoPoint, size: u32, want: GeoSpan) -> u8 {
    (MIN_ZOOM..=MAX_ZOOM)
        .rev()
        .find(|&z| {
            let e = tile_extent(center, size, z);
            e.lat_deg >= want.lat_deg && e.lon_deg >= want.lon_deg
        })
        .unwrap_or(MIN_ZOOM)
}

#[cfg(feature = "http")]
pub use client::RainViewerSource;

#[cfg(feature = "http")]
mod client {
    use std::time::Duration;

    use rain_traits::{FrameRef, FrameSource, GeoPoint, GeoSpan, RasterImage};

    use super::{TileOptions, parse_index, tile_extent, tile_url, zoom_to_cover};
    use crate::decode::decode_png;
    use crate::error::{Result, SourceError};

    /// Blocking HTTP client for the RainViewer API.
    ///
    /// `tiles.zoom` is the zoom of the next tile requests; `coverage` moves it
    /// to match a view window and back to `base_zoom` without one.
    pub struct RainViewerSource {
        http: reqwest::blocking::Client,
        index_url: String,
        tiles: TileOptions,
        base_zoom: u8,
        index_timeout: Duration,
    }

    impl RainViewerSource {
        pub fn new(index_url: impl Into<String>, tiles: TileOptions) -> Result<Self> {
            let http = reqwest::blocking::Client::builder()
                .user_agent(concat!("rain_predictor/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(map_reqwest)?;
            Ok(Self {
                http,
                index_url: index_url.into(),
                base_zoom: tiles.zoom,
                tiles,
                index_timeout: Duration::from_secs(10),
            })
        }

        /// Timeout applied to index requests (`list_frames` has no timeout
        /// parameter of its own).
        pub fn with_index_timeout(mut self, timeout: Duration) -> Self {
            self.index_timeout = timeout;
            self
        }

        fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
            let resp = self
                .http
                .get(url)
                .timeout(timeout)
                .send()
                .map_err(map_reqwest)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(SourceError::Status(status.as_u16()));
            }
            Ok(resp.bytes().map_err(map_reqwest)?.to_vec())
        }
    }

    impl std::fmt::Debug for RainViewerSource {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RainViewerSource")
                .field("index_url", &self.index_url)
                .field("tiles", &self.tiles)
                .finish_non_exhaustive()
        }
    }

    fn map_reqwest(e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout
        } else if let Some(status) = e.status() {
            SourceError::Status(status.as_u16())
        } else {
            SourceError::Http(e.to_string())
        }
    }

    impl FrameSource for RainViewerSource {
        fn list_frames(
            &mut self,
        ) -> std::result::Result<Vec<FrameRef>, Box<dyn std::error::Error + Send + Sync>> {
            let body = self.get_bytes(&self.index_url, self.index_timeout)?;
            let text = String::from_utf8(body)
                .map_err(|e| SourceError::Malformed(format!("index is not utf-8: {e}")))?;
            let frames = parse_index(&text)?;
            tracing::debug!(count = frames.len(), "frame index fetched");
            Ok(frames)
        }

        fn coverage(&mut self, center: GeoPoint, want: Option<GeoSpan>) -> Option<GeoSpan> {
            let zoom = want.map_or(self.base_zoom, |w| zoom_to_cover(center, self.tiles.size, w));
            if zoom != self.tiles.zoom {
                tracing::debug!(from = self.tiles.zoom, to = zoom, "tile zoom changed");
                self.tiles.zoom = zoom;
            }
            Some(tile_extent(center, self.tiles.size, zoom))
        }

        fn fetch_raster(
            &mut self,
            frame: &FrameRef,
            center: GeoPoint,
            timeout: Duration,
        ) -> std::result::Result<RasterImage, Box<dyn std::error::Error + Send + Sync>> {
            let url = tile_url(&frame.path, &self.tiles, center);
            tracing::debug!(%url, ts = frame.timestamp, "fetching tile");
            let bytes = self.get_bytes(&url, timeout)?;
            Ok(decode_png(&bytes)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const INDEX: &str = r#"{
        "version": "2.0",
        "generated": 1700000900,
        "host": "https://tilecache.rainviewer.com",
        "radar": {
            "past": [
                {"time": 1700000600, "path": "/v2/radar/1700000600"},
                {"time": 1700000000, "path": "/v2/radar/1700000000"}
            ],
            "nowcast": []
        }
    }"#;

    #[test]
    fn index_is_sorted_and_prefixed() {
        let frames = parse_index(INDEX).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].timestamp, 1_700_000_000);
        assert_eq!(
            frames[1].path,
            "https://tilecache.rainviewer.com/v2/radar/1700000600"
        );
    }

    #[rstest]
    #[case(r#"{"host": "h"}"#)]
    #[case(r#"{"host": "h", "radar": {}}"#)]
    #[case(r#"{"host": "h", "radar": {"past": []}}"#)]
    #[case(r#"{"host": "h", "radar": {"past": [{"time": 1}]}}"#)]
    #[case(r#"{"radar": {"past": [{"time": 1, "path": "/p"}]}}"#)]
    #[case("<html>")]
    fn malformed_indexes_are_rejected(#[case] json: &str) {
        assert!(matches!(parse_index(json), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn tile_url_matches_api_layout() {
        let url = tile_url(
            "https://tilecache.rainviewer.com/v2/radar/1700000600",
            &TileOptions::default(),
            GeoPoint::new(-24.98761, 151.86428),
        );
        assert_eq!(
            url,
            "https://tilecache.rainviewer.com/v2/radar/1700000600/256/8/-24.9876/151.8643/2/0_0.png"
        );
    }

    #[test]
    fn default_tile_is_about_one_and_a_half_degrees() {
        let opts = TileOptions::default();
        let e = tile_extent(GeoPoint::new(-24.98, 151.86), opts.size, opts.zoom);
        assert!((e.lon_deg - 1.40625).abs() < 1e-12, "lon span {}", e.lon_deg);
        // mercator: latitude span shrinks by about cos(lat)
        let expected = 1.40625 * 24.98_f64.to_radians().cos();
        assert!((e.lat_deg - expected).abs() < 0.01, "lat span {}", e.lat_deg);
    }

    #[test]
    fn tile_extent_halves_per_zoom_level() {
        let c = GeoPoint::new(10.0, 20.0);
        let a = tile_extent(c, 512, 6);
        let b = tile_extent(c, 512, 7);
        assert!((a.lon_deg / b.lon_deg - 2.0).abs() < 1e-12);
        assert!((a.lat_deg / b.lat_deg - 2.0).abs() < 0.01);
    }

    #[rstest]
    #[case(GeoSpan::new(0.3, 0.3), 10)]
    #[case(GeoSpan::new(1.2, 1.3), 8)]
    #[case(GeoSpan::new(4.0, 4.0), 6)]
    #[case(GeoSpan::new(170.0, 400.0), MIN_ZOOM)]
    fn zoom_is_the_tightest_that_covers(#[case] want: GeoSpan, #[case] zoom: u8) {
        let center = GeoPoint::new(-25.0, 152.0);
        let z = zoom_to_cover(center, 256, want);
        assert_eq!(z, zoom);
        let e = tile_extent(center, 256, z);
        if z > MIN_ZOOM {
            assert!(e.lat_deg >= want.lat_deg && e.lon_deg >= want.lon_deg);
        }
    }
}
