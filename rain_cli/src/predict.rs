//! Cycle execution: config mapping, source assembly, view windows and
//! result output.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rain_config::{Config, SourceKind};
use rain_core::conversions::observer_point;
use rain_core::geo::cardinal;
use rain_core::{
    CycleReport, CycleRunner, FetchTimeouts, GeoWindow, NoRainReason, PipelineCfg,
    Prediction, Predictor, Ticker,
};
#[cfg(feature = "http")]
use rain_source::TileOptions;
use rain_source::{DirectorySource, SimulatedStorm};
use rain_traits::{FrameSource, MonotonicClock};
use serde_json::json;

use crate::cli::json_mode;
use crate::error_fmt::{CliError, humanize};

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

/// Frame source selected by `[source]`.
pub fn build_source(cfg: &Config) -> eyre::Result<Box<dyn FrameSource + Send>> {
    match cfg.source.kind {
        SourceKind::Rainviewer => rainviewer_source(cfg),
        SourceKind::Directory => {
            let dir = cfg
                .source
                .directory
                .as_deref()
                .ok_or_else(|| CliError::Config("source.directory is required".into()))?;
            if !std::path::Path::new(dir).is_dir() {
                return Err(CliError::SourceInit(format!("{dir} is not a directory")).into());
            }
            Ok(Box::new(DirectorySource::new(dir)))
        }
        SourceKind::Simulated => {
            let frames = cfg.source.max_frames.max(2);
            let interval = cfg.source.sim_interval_s;
            // newest synthetic frame lands on the current interval boundary
            let now = now_unix() as i64;
            let last = now - now.rem_euclid(interval);
            let start = last - interval * (frames as i64 - 1);
            Ok(Box::new(
                SimulatedStorm::new(
                    cfg.image.size as usize,
                    interval,
                    cfg.source.sim_heading_deg,
                    start,
                )
                .with_frames_per_index(frames),
            ))
        }
    }
}

#[cfg(feature = "http")]
fn rainviewer_source(cfg: &Config) -> eyre::Result<Box<dyn FrameSource + Send>> {
    let tiles = TileOptions {
        size: cfg.image.size,
        zoom: cfg.image.zoom,
        color_scheme: cfg.image.color_scheme,
        options: cfg.image.options.clone(),
    };
    let src = rain_source::RainViewerSource::new(cfg.source.api_url.clone(), tiles)
        .map_err(|e| CliError::SourceInit(e.to_string()))?
        .with_index_timeout(Duration::from_millis(cfg.timeouts.index_ms));
    Ok(Box::new(src))
}

#[cfg(not(feature = "http"))]
fn rainviewer_source(_cfg: &Config) -> eyre::Result<Box<dyn FrameSource + Send>> {
    Err(CliError::SourceInit("built without the `http` feature".into()).into())
}

/// Predictor and runner from config, using the `From` mappings in
/// `rain_core::conversions`.
pub fn build_runner(cfg: &Config) -> eyre::Result<CycleRunner> {
    let pipeline = PipelineCfg::from(cfg);
    let predictor = Predictor::builder().config(pipeline).try_build()?;
    let source = build_source(cfg)?;
    let runner = CycleRunner::builder()
        .source(source)
        .observer(observer_point(&cfg.observer))
        .predictor(predictor)
        .timeouts(FetchTimeouts::from(&cfg.timeouts))
        .max_frames(cfg.source.max_frames)
        .build()?;
    Ok(runner)
}

/// Current view window, if configured and fresh. Unreadable files are
/// logged and ignored.
pub fn current_view(cfg: &Config) -> Option<GeoWindow> {
    let path = cfg.view.file.as_deref()?;
    match rain_config::load_view_window(std::path::Path::new(path), cfg.view.max_age_s, now_unix()) {
        Ok(Some(v)) => {
            let w = GeoWindow::from(&v);
            tracing::debug!(center_lat = w.center.lat, center_lon = w.center.lon, "using view window");
            Some(w)
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring view window");
            None
        }
    }
}

fn reason_label(r: NoRainReason) -> &'static str {
    match r {
        NoRainReason::InsufficientFrames => "insufficient_frames",
        NoRainReason::NoTracks => "no_tracks",
        NoRainReason::NoApproachingTracks => "no_approaching_tracks",
    }
}

/// One JSON object per cycle.
pub fn report_json(report: &CycleReport, cfg: &PipelineCfg) -> serde_json::Value {
    let p = report.published(cfg);
    let (outcome, reason) = match report.prediction {
        Prediction::NoRain(r) => ("no_rain", Some(reason_label(r))),
        Prediction::RainOverhead => ("overhead", None),
        Prediction::Threat(_) => ("threat", None),
    };
    json!({
        "timestamp": now_unix() as i64,
        "outcome": outcome,
        "reason": reason,
        "time_to_rain": p.time_to_rain,
        "distance_km": p.distance_km,
        "speed_kph": p.speed_kph,
        "direction_deg": p.direction_deg,
        "bearing_deg": p.bearing_deg,
        "cell_lat": p.cell_lat,
        "cell_lon": p.cell_lon,
        "threat_probability": p.threat_probability,
        "frames": report.frames,
        "cells": report.latest_cells.len(),
        "tracks": report.tracks,
        "approaching": report.approaching,
    })
}

/// One human-readable line per cycle.
pub fn report_text(report: &CycleReport, cfg: &PipelineCfg) -> String {
    let p = report.published(cfg);
    match report.prediction {
        Prediction::NoRain(r) => format!(
            "No rain expected ({}); {} cells in newest frame, {} tracks",
            reason_label(r).replace('_', " "),
            report.latest_cells.len(),
            report.tracks
        ),
        Prediction::RainOverhead => "Rain overhead".to_string(),
        Prediction::Threat(t) => format!(
            "Rain expected in {} min: cell {:.1} km {} of here, moving {} at {:.1} km/h, probability {:.0}%",
            p.time_to_rain,
            p.distance_km,
            cardinal(t.bearing_to_cell_deg),
            cardinal(t.direction_deg),
            p.speed_kph,
            p.threat_probability.unwrap_or(0.0),
        ),
    }
}

fn print_report(report: &CycleReport, cfg: &PipelineCfg) {
    if json_mode() {
        println!("{}", report_json(report, cfg));
    } else {
        println!("{}", report_text(report, cfg));
    }
}

/// `once`: a single cycle; errors propagate to the exit code.
pub fn run_once(cfg: &Config) -> eyre::Result<()> {
    let mut runner = build_runner(cfg)?;
    let view = current_view(cfg);
    let report = runner.run_once(view.as_ref(), None)?;
    print_report(&report, runner.predictor().cfg());
    Ok(())
}

/// `run`: cycles on the schedule until shutdown or `cycles` completed.
/// A failed cycle is logged and the loop carries on.
pub fn run_loop(cfg: &Config, shutdown: &Arc<AtomicBool>, cycles: Option<u64>) -> eyre::Result<()> {
    let mut runner = build_runner(cfg)?;
    let interval = cfg.run_interval();
    tracing::info!(
        interval_s = interval.as_secs(),
        lat = runner.observer().lat,
        lon = runner.observer().lon,
        "prediction loop start"
    );
    let ticker = Ticker::spawn(interval, MonotonicClock::new());
    let mut prior: Option<Prediction> = None;
    let mut done = 0u64;

    while !shutdown.load(Ordering::Relaxed) {
        if cycles.is_some_and(|n| done >= n) {
            break;
        }
        let Some(tick) = ticker.next_tick(Duration::from_millis(200)) else {
            continue;
        };
        let view = current_view(cfg);
        match runner.run_once(view.as_ref(), prior.as_ref()) {
            Ok(report) => {
                print_report(&report, runner.predictor().cfg());
                prior = Some(report.prediction);
            }
            Err(e) => {
                let report = eyre::Report::new(e);
                tracing::error!(tick, error = %report, "cycle failed: {}", humanize(&report));
            }
        }
        done += 1;
    }
    tracing::info!(cycles = done, skipped_ticks = ticker.skipped(), "prediction loop stop");
    Ok(())
}

/// `self-check`: config is valid and the source lists frames.
pub fn self_check(cfg: &Config) -> eyre::Result<()> {
    let mut source = build_source(cfg)?;
    let frames = source.list_frames().map_err(|e| {
        eyre::Report::new(rain_core::source_error::map_source_error(e.as_ref()))
    })?;
    let newest = frames.last().map(|f| f.timestamp);
    if json_mode() {
        println!(
            "{}",
            json!({ "status": "ok", "source": format!("{:?}", cfg.source.kind).to_lowercase(), "frames": frames.len(), "newest": newest })
        );
    } else {
        println!(
            "self-check ok: source={:?} frames={} newest={}",
            cfg.source.kind,
            frames.len(),
            newest.map_or_else(|| "-".to_string(), |t| t.to_string())
        );
    }
    Ok(())
}
