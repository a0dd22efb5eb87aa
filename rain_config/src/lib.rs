#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]
//! Config schemas and view-window parsing for the rain predictor.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `view` parses the map front end's view-window JSON and applies the
//!   staleness rule before it may override the static analysis window.
use serde::Deserialize;
use serde::de::Deserializer;

pub mod view;

pub use view::{ViewBounds, ViewCenter, ViewSizeKm, ViewWindowFile, load_view_window};

/// Fixed observer location (the place we predict rain for).
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ObserverCfg {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// RainViewer public weather-maps index plus PNG tiles.
    #[default]
    Rainviewer,
    /// Replay `<unix-seconds>.png` files from a directory.
    Directory,
    /// Synthetic storm moving across the window (no network).
    Simulated,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourceCfg {
    pub kind: SourceKind,
    /// Frame index URL (RainViewer weather-maps.json)
    pub api_url: String,
    /// Directory holding replay frames (kind = "directory")
    pub directory: Option<String>,
    /// Keep only the newest N frames of the index (0 keeps all)
    pub max_frames: usize,
    /// Seconds between synthetic frames (kind = "simulated")
    pub sim_interval_s: i64,
    /// Heading of the synthetic storm in degrees (kind = "simulated")
    pub sim_heading_deg: f64,
}

impl Default for SourceCfg {
    fn default() -> Self {
        Self {
            kind: SourceKind::Rainviewer,
            api_url: "https://api.rainviewer.com/public/weather-maps.json".to_string(),
            directory: None,
            max_frames: 6,
            sim_interval_s: 300,
            sim_heading_deg: 135.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ImageCfg {
    /// Tile edge in pixels (256 or 512)
    pub size: u32,
    pub zoom: u8,
    pub color_scheme: u8,
    /// "<smooth>_<snow>" option pair appended to tile URLs
    pub options: String,
}

impl Default for ImageCfg {
    fn default() -> Self {
        Self {
            size: 256,
            zoom: 8,
            color_scheme: 2,
            options: "0_0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Frame index request timeout (ms)
    pub index_ms: u64,
    /// Per-frame tile request timeout (ms). Also accepts alias "tile_ms".
    #[serde(alias = "tile_ms")]
    pub frame_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            index_ms: 10_000,
            frame_ms: 15_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    #[default]
    Four,
    Eight,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    /// Row 0 is the northern edge (web map tiles)
    #[default]
    NorthUp,
    /// Row 0 is the southern edge
    SouthUp,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnalysisCfg {
    /// Pixels strictly above this luminance count as rain
    pub rain_threshold: u8,
    /// Components smaller than this are noise
    pub min_cell_pixels: usize,
    pub connectivity: Connectivity,
    pub row_order: RowOrder,
    /// Analysis window height in degrees for sources with no known extent
    /// (directory, simulated). RainViewer tiles use their own extent.
    pub lat_range_deg: f64,
    /// Static analysis window width in degrees
    pub lon_range_deg: f64,
    /// Max deviation of a track's heading from the system consensus
    pub consensus_tolerance_deg: f64,
    /// Max deviation of a track's heading from the bearing to the observer
    #[serde(alias = "arrival_angle_threshold_deg")]
    pub approach_angle_deg: f64,
    /// Track speeds above this are clamped
    pub max_speed_kph: f64,
    /// Report "rain overhead" when the observer pixel itself is wet
    pub detect_overhead: bool,
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        Self {
            rain_threshold: 50,
            min_cell_pixels: 5,
            connectivity: Connectivity::Four,
            row_order: RowOrder::NorthUp,
            lat_range_deg: 5.0,
            lon_range_deg: 5.0,
            consensus_tolerance_deg: 45.0,
            approach_angle_deg: 90.0,
            max_speed_kph: 200.0,
            detect_overhead: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TrackingCfg {
    /// Max great-circle distance between consecutive positions of a track
    pub max_tracking_distance_km: f64,
    /// Tracks shorter than this are never evaluated (>= 2)
    pub min_track_length: usize,
    /// Backward walk stops after this many positions
    pub max_track_positions: usize,
}

impl Default for TrackingCfg {
    fn default() -> Self {
        Self {
            max_tracking_distance_km: 150.0,
            min_track_length: 2,
            max_track_positions: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Nearest approaching track wins
    #[default]
    Nearest,
    /// Multi-factor score (probability, proximity, speed, intensity)
    Weighted,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SelectionCfg {
    pub policy: SelectionPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SmoothingCfg {
    /// Optional EMA factor for ETA against the previous cycle.
    /// Range: (0.0, 1.0]. Absent disables smoothing.
    pub eta_alpha: Option<f64>,
    /// Prior threat is only blended when within this distance of the new one
    pub max_jump_km: f64,
}

impl Default for SmoothingCfg {
    fn default() -> Self {
        Self {
            eta_alpha: None,
            max_jump_km: 25.0,
        }
    }
}

/// Sentinel values published when no rain is predicted.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct DefaultsCfg {
    pub no_rain_value: f64,
    pub no_direction_value: f64,
    pub no_bearing_value: f64,
}

impl Default for DefaultsCfg {
    fn default() -> Self {
        Self {
            no_rain_value: 999.0,
            no_direction_value: -1.0,
            no_bearing_value: -1.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleCfg {
    /// Minutes between prediction cycles. Accepts 3 or "3".
    #[serde(deserialize_with = "de_lenient_u64")]
    pub run_interval_minutes: u64,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            run_interval_minutes: 3,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ViewCfg {
    /// JSON file written by the map front end; absent disables view windows
    pub file: Option<String>,
    /// Ignore view files older than this many seconds
    pub max_age_s: u64,
}

impl Default for ViewCfg {
    fn default() -> Self {
        Self {
            file: None,
            max_age_s: 30,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub observer: ObserverCfg,
    #[serde(default)]
    pub source: SourceCfg,
    #[serde(default)]
    pub image: ImageCfg,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub analysis: AnalysisCfg,
    #[serde(default)]
    pub tracking: TrackingCfg,
    #[serde(default)]
    pub selection: SelectionCfg,
    #[serde(default)]
    pub smoothing: SmoothingCfg,
    #[serde(default)]
    pub defaults: DefaultsCfg,
    #[serde(default)]
    pub schedule: ScheduleCfg,
    #[serde(default)]
    pub view: ViewCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a TOML config file (no validation).
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))
}

/// Accept "3" or 3 for integer-ish keys edited by hand in the add-on UI.
fn de_lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Int(u64),
        Text(String),
    }
    match Lenient::deserialize(deserializer)? {
        Lenient::Int(v) => Ok(v),
        Lenient::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl Config {
    /// Run interval as a `Duration`.
    pub fn run_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.schedule.run_interval_minutes.saturating_mul(60))
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Observer
        if !(-90.0..=90.0).contains(&self.observer.latitude) {
            eyre::bail!("observer.latitude must be in [-90, 90]");
        }
        if !(-180.0..=180.0).contains(&self.observer.longitude) {
            eyre::bail!("observer.longitude must be in [-180, 180]");
        }

        // Source
        match self.source.kind {
            SourceKind::Rainviewer => {
                if !(self.source.api_url.starts_with("http://")
                    || self.source.api_url.starts_with("https://"))
                {
                    eyre::bail!("source.api_url must be an http(s) URL");
                }
            }
            SourceKind::Directory => {
                if self.source.directory.as_deref().is_none_or(str::is_empty) {
                    eyre::bail!("source.directory is required when source.kind = \"directory\"");
                }
            }
            SourceKind::Simulated => {
                if self.source.sim_interval_s <= 0 {
                    eyre::bail!("source.sim_interval_s must be > 0");
                }
                if !self.source.sim_heading_deg.is_finite() {
                    eyre::bail!("source.sim_heading_deg must be finite");
                }
            }
        }

        // Image
        if !matches!(self.image.size, 256 | 512) {
            eyre::bail!("image.size must be 256 or 512");
        }
        if !(1..=20).contains(&self.image.zoom) {
            eyre::bail!("image.zoom must be in [1, 20]");
        }

        // Timeouts
        if self.timeouts.index_ms == 0 {
            eyre::bail!("timeouts.index_ms must be >= 1");
        }
        if self.timeouts.frame_ms == 0 {
            eyre::bail!("timeouts.frame_ms must be >= 1");
        }

        // Analysis
        if self.analysis.min_cell_pixels == 0 {
            eyre::bail!("analysis.min_cell_pixels must be >= 1");
        }
        if !(self.analysis.lat_range_deg > 0.0 && self.analysis.lat_range_deg <= 180.0) {
            eyre::bail!("analysis.lat_range_deg must be in (0, 180]");
        }
        if !(self.analysis.lon_range_deg > 0.0 && self.analysis.lon_range_deg <= 360.0) {
            eyre::bail!("analysis.lon_range_deg must be in (0, 360]");
        }
        if !(0.0..=180.0).contains(&self.analysis.consensus_tolerance_deg) {
            eyre::bail!("analysis.consensus_tolerance_deg must be in [0, 180]");
        }
        if !(0.0..=180.0).contains(&self.analysis.approach_angle_deg) {
            eyre::bail!("analysis.approach_angle_deg must be in [0, 180]");
        }
        if self.analysis.max_speed_kph.is_nan() || self.analysis.max_speed_kph <= 0.0 {
            eyre::bail!("analysis.max_speed_kph must be > 0");
        }

        // Tracking
        if self.tracking.max_tracking_distance_km.is_nan()
            || self.tracking.max_tracking_distance_km <= 0.0
        {
            eyre::bail!("tracking.max_tracking_distance_km must be > 0");
        }
        if self.tracking.min_track_length < 2 {
            eyre::bail!("tracking.min_track_length must be >= 2");
        }
        if self.tracking.max_track_positions < self.tracking.min_track_length {
            eyre::bail!("tracking.max_track_positions must be >= tracking.min_track_length");
        }

        // Smoothing
        if let Some(alpha) = self.smoothing.eta_alpha
            && !(alpha > 0.0 && alpha <= 1.0)
        {
            eyre::bail!("smoothing.eta_alpha must be in (0.0, 1.0]");
        }
        if self.smoothing.max_jump_km.is_nan() || self.smoothing.max_jump_km < 0.0 {
            eyre::bail!("smoothing.max_jump_km must be >= 0");
        }

        // Schedule
        if self.schedule.run_interval_minutes == 0 {
            eyre::bail!("schedule.run_interval_minutes must be >= 1");
        }
        if self.schedule.run_interval_minutes > 24 * 60 {
            eyre::bail!("schedule.run_interval_minutes is unreasonably large (>24h)");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
