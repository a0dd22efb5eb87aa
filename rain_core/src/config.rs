//! Runtime configuration for the prediction pipeline.
//!
//! These are the plain structs the pipeline stages consume. They are separate
//! from the TOML-deserialized config in `rain_config`; see `conversions`.

use crate::window::RowOrder;

/// Pixel neighbourhood used by connected-component labeling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Connectivity {
    /// Edge neighbours only.
    #[default]
    Four,
    /// Edge and corner neighbours.
    Eight,
}

/// Cell extraction parameters.
#[derive(Debug, Clone, Copy)]
pub struct ExtractCfg {
    /// Pixels strictly above this luminance count as rain.
    pub rain_threshold: u8,
    /// Components with fewer pixels are dropped as noise.
    pub min_cell_pixels: usize,
    pub connectivity: Connectivity,
}

impl Default for ExtractCfg {
    fn default() -> Self {
        Self {
            rain_threshold: 50,
            min_cell_pixels: 5,
            connectivity: Connectivity::Four,
        }
    }
}

/// Static analysis window around the observer, used when no view window is
/// supplied for a cycle.
#[derive(Debug, Clone, Copy)]
pub struct WindowCfg {
    pub lat_range_deg: f64,
    pub lon_range_deg: f64,
    pub row_order: RowOrder,
}

impl Default for WindowCfg {
    fn default() -> Self {
        Self {
            lat_range_deg: 5.0,
            lon_range_deg: 5.0,
            row_order: RowOrder::NorthUp,
        }
    }
}

/// Backward association parameters.
#[derive(Debug, Clone, Copy)]
pub struct TrackerCfg {
    /// Association bound between consecutive positions (km).
    pub max_distance_km: f64,
    /// The backward walk stops once a track holds this many positions.
    pub max_positions: usize,
}

impl Default for TrackerCfg {
    fn default() -> Self {
        Self {
            max_distance_km: 150.0,
            max_positions: 10,
        }
    }
}

/// Movement analysis and interception filter parameters.
#[derive(Debug, Clone, Copy)]
pub struct MotionCfg {
    /// Tracks shorter than this are never evaluated. Expected >= 2.
    pub min_track_length: usize,
    pub consensus_tolerance_deg: f64,
    pub approach_angle_deg: f64,
    pub max_speed_kph: f64,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            min_track_length: 2,
            consensus_tolerance_deg: 45.0,
            approach_angle_deg: 90.0,
            max_speed_kph: 200.0,
        }
    }
}

/// Threat selection strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolicyKind {
    #[default]
    Nearest,
    Weighted,
}

/// ETA smoothing against a prior prediction.
#[derive(Debug, Clone, Copy)]
pub struct SmoothingCfg {
    /// EMA factor in (0.0, 1.0]; `None` disables smoothing.
    pub eta_alpha: Option<f64>,
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

/// Values published in place of a prediction when there is no threat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentinels {
    pub no_rain_value: f64,
    pub no_direction_value: f64,
    pub no_bearing_value: f64,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            no_rain_value: 999.0,
            no_direction_value: -1.0,
            no_bearing_value: -1.0,
        }
    }
}

/// Everything one prediction cycle needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineCfg {
    pub extract: ExtractCfg,
    pub window: WindowCfg,
    pub tracker: TrackerCfg,
    pub motion: MotionCfg,
    pub policy: PolicyKind,
    pub smoothing: SmoothingCfg,
    pub sentinels: Sentinels,
    /// Report rain overhead when the observer pixel itself is wet.
    pub detect_overhead: bool,
}
