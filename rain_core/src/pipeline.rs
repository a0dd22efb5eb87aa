//! One prediction cycle as a pure function of its inputs.
//!
//! `Predictor::predict` takes decoded frames, the observer, an optional view
//! window and an optional prior prediction, and returns a [`CycleReport`].
//! It keeps no state between calls.

use rain_traits::{GeoPoint, RasterImage};

use crate::config::PipelineCfg;
use crate::extract::{Cell, extract_cells, is_wet_at};
use crate::motion::{MotionField, analyze};
use crate::prediction::{
    NoRainReason, Prediction, PublishedValues, smooth_with_prior, threat_from,
};
use crate::threat::ThreatPolicy;
use crate::tracker::{Associator, BackwardNearest, FrameCells};
use crate::window::GeoWindow;

/// A frame of the cycle; `raster` is `None` when fetch or decode failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    pub timestamp: i64,
    pub raster: Option<RasterImage>,
}

impl RasterFrame {
    pub fn new(timestamp: i64, raster: RasterImage) -> Self {
        Self {
            timestamp,
            raster: Some(raster),
        }
    }

    pub const fn missing(timestamp: i64) -> Self {
        Self {
            timestamp,
            raster: None,
        }
    }
}

/// Result of one cycle: the prediction plus what it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub prediction: Prediction,
    /// Cells of the newest frame.
    pub latest_cells: Vec<Cell>,
    /// Window used for pixel -> coordinate mapping.
    pub window: GeoWindow,
    pub frames: usize,
    pub tracks: usize,
    pub approaching: usize,
    pub field: MotionField,
}

impl CycleReport {
    pub fn published(&self, cfg: &PipelineCfg) -> PublishedValues {
        PublishedValues::from_prediction(&self.prediction, &cfg.sentinels)
    }
}

/// Detection-tracking-prediction pipeline. Build with
/// [`Predictor::builder`](crate::builder::PredictorBuilder).
pub struct Predictor {
    pub(crate) cfg: PipelineCfg,
    pub(crate) associator: Option<Box<dyn Associator + Send + Sync>>,
    pub(crate) policy: Box<dyn ThreatPolicy + Send + Sync>,
}

impl core::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Predictor")
            .field("cfg", &self.cfg)
            .field("custom_associator", &self.associator.is_some())
            .finish_non_exhaustive()
    }
}

impl Predictor {
    pub fn cfg(&self) -> &PipelineCfg {
        &self.cfg
    }

    /// Analysis window for a cycle: the view window when given, otherwise
    /// the static window centered on the observer.
    pub fn analysis_window(&self, observer: GeoPoint, view: Option<&GeoWindow>) -> GeoWindow {
        let order = self.cfg.window.row_order;
        view.map_or_else(
            || {
                GeoWindow::from_spans(
                    observer,
                    self.cfg.window.lat_range_deg,
                    self.cfg.window.lon_range_deg,
                )
            },
            |v| *v,
        )
        .with_row_order(order)
    }

    /// Cells of every frame, oldest first.
    pub fn extract_frames(&self, frames: &[RasterFrame], window: &GeoWindow) -> Vec<FrameCells> {
        let mut ordered: Vec<&RasterFrame> = frames.iter().collect();
        ordered.sort_by_key(|f| f.timestamp);
        ordered
            .into_iter()
            .map(|f| FrameCells {
                timestamp: f.timestamp,
                cells: f
                    .raster
                    .as_ref()
                    .map(|r| extract_cells(r, window, f.timestamp, &self.cfg.extract))
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Run one cycle over `frames`.
    pub fn predict(
        &self,
        frames: &[RasterFrame],
        observer: GeoPoint,
        view: Option<&GeoWindow>,
        prior: Option<&Prediction>,
    ) -> CycleReport {
        let window = self.analysis_window(observer, view);
        self.predict_in(frames, window, observer, view, prior)
    }

    /// Run one cycle over `frames` whose geographic extent is `window`.
    /// `view` only sizes the association bound.
    pub fn predict_in(
        &self,
        frames: &[RasterFrame],
        window: GeoWindow,
        observer: GeoPoint,
        view: Option<&GeoWindow>,
        prior: Option<&Prediction>,
    ) -> CycleReport {
        let per_frame = self.extract_frames(frames, &window);
        let latest_cells = per_frame.last().map(|f| f.cells.clone()).unwrap_or_default();
        let mut report = CycleReport {
            prediction: Prediction::NoRain(NoRainReason::InsufficientFrames),
            latest_cells,
            window,
            frames: per_frame.len(),
            tracks: 0,
            approaching: 0,
            field: MotionField::default(),
        };

        let usable = frames.iter().filter(|f| f.raster.is_some()).count();
        if usable < 2 {
            tracing::info!(frames = per_frame.len(), usable, "not enough frames to track");
            return report;
        }

        if self.cfg.detect_overhead && self.observer_is_wet(frames, &window, observer) {
            tracing::info!("rain overhead at observer");
            report.prediction = Prediction::RainOverhead;
            return report;
        }

        let tracks = match &self.associator {
            Some(custom) => custom.associate(&per_frame),
            None => BackwardNearest::for_view(&self.cfg.tracker, view).associate(&per_frame),
        };
        let motion = analyze(&tracks, observer, &self.cfg.motion);
        report.tracks = motion.moving.len();
        report.approaching = motion.approaching.len();
        report.field = motion.field;

        if motion.moving.is_empty() {
            report.prediction = Prediction::NoRain(NoRainReason::NoTracks);
        } else if motion.approaching.is_empty() {
            report.prediction = Prediction::NoRain(NoRainReason::NoApproachingTracks);
        } else {
            report.prediction = self
                .policy
                .select(&motion.approaching)
                .and_then(|i| motion.approaching.get(i))
                .and_then(|c| threat_from(c, &motion.field, self.cfg.extract.rain_threshold))
                .map(|t| smooth_with_prior(t, prior, &self.cfg.smoothing))
                .map_or(
                    Prediction::NoRain(NoRainReason::NoApproachingTracks),
                    Prediction::Threat,
                );
        }

        match &report.prediction {
            Prediction::Threat(t) => tracing::info!(
                eta_min = t.time_to_rain_minutes,
                distance_km = t.distance_km,
                speed_kph = t.speed_kph,
                direction = t.direction_deg,
                bearing = t.bearing_to_cell_deg,
                tracks = report.tracks,
                approaching = report.approaching,
                "rain predicted"
            ),
            other => tracing::info!(
                outcome = ?other,
                cells = report.latest_cells.len(),
                tracks = report.tracks,
                "no rain predicted"
            ),
        }
        report
    }

    fn observer_is_wet(&self, frames: &[RasterFrame], window: &GeoWindow, observer: GeoPoint) -> bool {
        frames
            .iter()
            .max_by_key(|f| f.timestamp)
            .and_then(|f| f.raster.as_ref())
            .is_some_and(|r| is_wet_at(r, window, observer, self.cfg.extract.rain_threshold))
    }
}
