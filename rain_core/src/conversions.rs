//! `From` implementations bridging `rain_config` types to `rain_core` types.

use std::time::Duration;

use rain_traits::GeoPoint;

use crate::config::{
    Connectivity, ExtractCfg, MotionCfg, PipelineCfg, PolicyKind, Sentinels, SmoothingCfg,
    TrackerCfg, WindowCfg,
};
use crate::runner::FetchTimeouts;
use crate::window::{GeoWindow, RowOrder};

// ── Enums ────────────────────────────────────────────────────────────────────

impl From<rain_config::Connectivity> for Connectivity {
    fn from(c: rain_config::Connectivity) -> Self {
        match c {
            rain_config::Connectivity::Four => Self::Four,
            rain_config::Connectivity::Eight => Self::Eight,
        }
    }
}

impl From<rain_config::RowOrder> for RowOrder {
    fn from(o: rain_config::RowOrder) -> Self {
        match o {
            rain_config::RowOrder::NorthUp => Self::NorthUp,
            rain_config::RowOrder::SouthUp => Self::SouthUp,
        }
    }
}

impl From<rain_config::SelectionPolicy> for PolicyKind {
    fn from(p: rain_config::SelectionPolicy) -> Self {
        match p {
            rain_config::SelectionPolicy::Nearest => Self::Nearest,
            rain_config::SelectionPolicy::Weighted => Self::Weighted,
        }
    }
}

// ── Analysis ─────────────────────────────────────────────────────────────────

impl From<&rain_config::AnalysisCfg> for ExtractCfg {
    fn from(c: &rain_config::AnalysisCfg) -> Self {
        Self {
            rain_threshold: c.rain_threshold,
            min_cell_pixels: c.min_cell_pixels,
            connectivity: c.connectivity.into(),
        }
    }
}

impl From<&rain_config::AnalysisCfg> for WindowCfg {
    fn from(c: &rain_config::AnalysisCfg) -> Self {
        Self {
            lat_range_deg: c.lat_range_deg,
            lon_range_deg: c.lon_range_deg,
            row_order: c.row_order.into(),
        }
    }
}

// ── Tracking ─────────────────────────────────────────────────────────────────

impl From<&rain_config::TrackingCfg> for TrackerCfg {
    fn from(c: &rain_config::TrackingCfg) -> Self {
        Self {
            max_distance_km: c.max_tracking_distance_km,
            max_positions: c.max_track_positions,
        }
    }
}

// ── Smoothing / sentinels / timeouts ─────────────────────────────────────────

impl From<&rain_config::SmoothingCfg> for SmoothingCfg {
    fn from(c: &rain_config::SmoothingCfg) -> Self {
        Self {
            eta_alpha: c.eta_alpha,
            max_jump_km: c.max_jump_km,
        }
    }
}

impl From<&rain_config::DefaultsCfg> for Sentinels {
    fn from(c: &rain_config::DefaultsCfg) -> Self {
        Self {
            no_rain_value: c.no_rain_value,
            no_direction_value: c.no_direction_value,
            no_bearing_value: c.no_bearing_value,
        }
    }
}

impl From<&rain_config::Timeouts> for FetchTimeouts {
    fn from(c: &rain_config::Timeouts) -> Self {
        Self {
            index: Duration::from_millis(c.index_ms),
            frame: Duration::from_millis(c.frame_ms),
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&rain_config::Config> for PipelineCfg {
    fn from(c: &rain_config::Config) -> Self {
        Self {
            extract: (&c.analysis).into(),
            window: (&c.analysis).into(),
            tracker: (&c.tracking).into(),
            motion: MotionCfg {
                min_track_length: c.tracking.min_track_length,
                consensus_tolerance_deg: c.analysis.consensus_tolerance_deg,
                approach_angle_deg: c.analysis.approach_angle_deg,
                max_speed_kph: c.analysis.max_speed_kph,
            },
            policy: c.selection.policy.into(),
            smoothing: (&c.smoothing).into(),
            sentinels: (&c.defaults).into(),
            detect_overhead: c.analysis.detect_overhead,
        }
    }
}

/// Observer position from config. A free function: neither `GeoPoint` nor
/// `ObserverCfg` is local to this crate.
pub fn observer_point(c: &rain_config::ObserverCfg) -> GeoPoint {
    GeoPoint::new(c.latitude, c.longitude)
}

/// View window from the front end's JSON; `size_km` wins over `bounds`.
impl From<&rain_config::ViewWindowFile> for GeoWindow {
    fn from(v: &rain_config::ViewWindowFile) -> Self {
        let center = GeoPoint::new(v.center.lat, v.center.lng);
        match (v.size_km, v.bounds) {
            (Some(s), _) => Self::from_size_km(center, s.width, s.height),
            (None, Some(b)) => Self::from_bounds(b.north, b.south, b.east, b.west),
            // validate() rejects this; fall back to a point-sized window
            (None, None) => Self::from_spans(center, 0.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_maps_to_pipeline() {
        let cfg = rain_config::load_toml(
            r#"
[observer]
latitude = -25.0
longitude = 152.0

[analysis]
rain_threshold = 40
connectivity = "eight"
row_order = "south_up"
detect_overhead = true

[tracking]
max_tracking_distance_km = 90.0
min_track_length = 3

[selection]
policy = "weighted"

[defaults]
no_rain_value = 9999.0
"#,
        )
        .expect("parse");
        let p = PipelineCfg::from(&cfg);
        assert_eq!(p.extract.rain_threshold, 40);
        assert_eq!(p.extract.connectivity, Connectivity::Eight);
        assert_eq!(p.window.row_order, RowOrder::SouthUp);
        assert_eq!(p.tracker.max_distance_km, 90.0);
        assert_eq!(p.motion.min_track_length, 3);
        assert_eq!(p.policy, PolicyKind::Weighted);
        assert_eq!(p.sentinels.no_rain_value, 9999.0);
        assert!(p.detect_overhead);
        assert_eq!(observer_point(&cfg.observer), GeoPoint::new(-25.0, 152.0));
    }

    #[test]
    fn view_prefers_size_km() {
        let v = rain_config::view::parse_view_window(
            r#"{"center": {"lat": 0.0, "lng": 10.0},
                "bounds": {"north": 5.0, "south": -5.0, "east": 15.0, "west": 5.0},
                "size_km": {"width": 111.0, "height": 222.0}}"#,
        )
        .expect("valid view");
        let w = GeoWindow::from(&v);
        assert!((w.lat_span_deg - 2.0).abs() < 1e-9);
        assert!((w.lon_span_deg - 1.0).abs() < 1e-9);

        let v = rain_config::view::parse_view_window(
            r#"{"center": {"lat": 0.0, "lng": 10.0},
                "bounds": {"north": 5.0, "south": -5.0, "east": 15.0, "west": 5.0}}"#,
        )
        .expect("valid view");
        let w = GeoWindow::from(&v);
        assert_eq!(w.north(), 5.0);
        assert_eq!(w.west(), 5.0);
    }
}
