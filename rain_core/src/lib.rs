#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Radar rain-cell detection, tracking and arrival prediction.
//!
//! All I/O goes through `rain_traits::FrameSource`; everything from decoded
//! rasters to the final prediction is pure and synchronous.
//!
//! ## Architecture
//!
//! - **Geometry**: haversine distance, bearings, compass labels (`geo`)
//! - **Window**: pixel <-> coordinate mapping with explicit row order (`window`)
//! - **Extraction**: threshold + connected components -> cells (`extract`)
//! - **Tracking**: backward nearest-neighbour association (`tracker`)
//! - **Motion**: velocity, weighted consensus, interception filter (`motion`)
//! - **Selection**: threat policies and probability (`threat`)
//! - **Outcome**: prediction, smoothing, published values (`prediction`)
//! - **Cycle**: pure `Predictor::predict` (`pipeline`), I/O + gating (`runner`)

pub mod builder;
pub mod config;
pub mod conversions;
pub mod error;
pub mod extract;
pub mod geo;
pub mod mocks;
pub mod motion;
pub mod pipeline;
pub mod prediction;
pub mod runner;
pub mod source_error;
pub mod threat;
pub mod tracker;
pub mod window;

pub use builder::{Missing, PredictorBuilder, RunnerBuilder, Set};
pub use config::{
    Connectivity, ExtractCfg, MotionCfg, PipelineCfg, PolicyKind, Sentinels, SmoothingCfg,
    TrackerCfg, WindowCfg,
};
pub use error::{BuildError, PredictError, Report, Result};
pub use extract::Cell;
pub use pipeline::{CycleReport, Predictor, RasterFrame};
pub use prediction::{NoRainReason, Prediction, PublishedValues, ThreatPrediction};
pub use runner::{CycleGate, CycleRunner, FetchTimeouts, Ticker, raster_window, run_cycle};
pub use window::{GeoWindow, RowOrder};

pub use rain_traits::GeoPoint;
