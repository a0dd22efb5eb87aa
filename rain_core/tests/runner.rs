use std::time::Duration;

use rain_core::error::BuildError;
use rain_core::mocks::ScriptedSource;
use rain_core::geo::haversine_km;
use rain_core::{
    CycleGate, CycleRunner, FetchTimeouts, GeoPoint, GeoWindow, NoRainReason, PredictError,
    Prediction, Predictor, Ticker,
};
use rain_traits::{GeoSpan, ManualClock, RasterImage};
use rstest::rstest;

const OBSERVER: GeoPoint = GeoPoint::new(-25.0, 152.0);

/// 256x256 raster with a 5x5 block whose center sits `col_offset` pixels
/// left and `row_offset` pixels above the raster center.
fn raster_with_block(col_offset: usize, row_offset: usize) -> RasterImage {
    let mut r = RasterImage::blank(256, 256);
    let (c, row) = (128 - col_offset, 128 - row_offset);
    for y in row - 2..=row + 2 {
        for x in c - 2..=c + 2 {
            r.set(x, y, 200);
        }
    }
    r
}

fn approaching_source() -> ScriptedSource {
    // moves down-right (south-east) toward the center pixel
    ScriptedSource::new()
        .with_frame(1_000, raster_with_block(40, 40))
        .with_frame(1_600, raster_with_block(30, 30))
        .with_frame(2_200, raster_with_block(20, 20))
}

#[rstest]
fn runner_predicts_from_scripted_source() {
    let mut runner = CycleRunner::builder()
        .source(approaching_source())
        .observer(OBSERVER)
        .build()
        .expect("runner");
    let report = runner.run_once(None, None).expect("cycle");
    let t = report.prediction.threat().expect("threat");
    assert!(t.time_to_rain_minutes > 0.0);
    assert_eq!(report.frames, 3);
}

#[rstest]
fn broken_frames_become_empty() {
    let source = ScriptedSource::new()
        .with_broken_frame(1_000)
        .with_frame(1_600, raster_with_block(30, 30))
        .with_frame(2_200, raster_with_block(20, 20));
    let mut runner = CycleRunner::builder()
        .source(source)
        .observer(OBSERVER)
        .build()
        .expect("runner");
    let report = runner.run_once(None, None).expect("cycle does not abort");
    assert_eq!(report.frames, 3);
    assert!(report.prediction.threat().is_some());
}

#[rstest]
fn one_decoded_frame_is_insufficient() {
    let source = ScriptedSource::new()
        .with_broken_frame(1_000)
        .with_broken_frame(1_600)
        .with_frame(2_200, raster_with_block(20, 20));
    let mut runner = CycleRunner::builder()
        .source(source)
        .observer(OBSERVER)
        .build()
        .expect("runner");
    let report = runner.run_once(None, None).expect("cycle does not abort");
    assert_eq!(report.frames, 3);
    assert_eq!(
        report.prediction,
        Prediction::NoRain(NoRainReason::InsufficientFrames)
    );
}

#[rstest]
#[case("malformed frame index: missing radar.past", true)]
#[case("connection refused", false)]
fn index_failure_aborts_cycle(#[case] message: &str, #[case] upstream: bool) {
    let mut runner = CycleRunner::builder()
        .source(ScriptedSource::new().with_index_error(message))
        .observer(OBSERVER)
        .build()
        .expect("runner");
    let err = runner.run_once(None, None).expect_err("index failure");
    assert_eq!(matches!(err, PredictError::Upstream(_)), upstream, "{err}");
    // the gate is released after a failed cycle
    assert!(!runner.gate().is_busy());
}

#[rstest]
fn max_frames_keeps_newest() {
    let source = ScriptedSource::new()
        .with_frame(1_000, raster_with_block(60, 60))
        .with_frame(1_600, raster_with_block(40, 40))
        .with_frame(2_200, raster_with_block(30, 30))
        .with_frame(2_800, raster_with_block(20, 20));
    let mut runner = CycleRunner::builder()
        .source(source)
        .observer(OBSERVER)
        .max_frames(2)
        .build()
        .expect("runner");
    let report = runner.run_once(None, None).expect("cycle");
    assert_eq!(report.frames, 2);
}

#[rstest]
fn busy_gate_refuses_second_cycle() {
    let gate = CycleGate::new();
    let mut runner = CycleRunner::builder()
        .source(approaching_source())
        .observer(OBSERVER)
        .gate(gate.clone())
        .build()
        .expect("runner");
    let held = gate.try_enter().expect("outer cycle");
    assert_eq!(runner.run_once(None, None).unwrap_err(), PredictError::Busy);
    drop(held);
    assert!(runner.run_once(None, None).is_ok());
}

#[rstest]
fn builder_reports_missing_parts() {
    let err = CycleRunner::builder()
        .observer(OBSERVER)
        .try_build()
        .expect_err("no source");
    assert_eq!(err, BuildError::MissingSource);

    let err = CycleRunner::builder()
        .source(ScriptedSource::new())
        .try_build()
        .expect_err("no observer");
    assert_eq!(err, BuildError::MissingObserver);

    let err = CycleRunner::builder()
        .source(ScriptedSource::new())
        .observer(GeoPoint::new(120.0, 0.0))
        .build()
        .expect_err("bad observer");
    assert!(matches!(err, BuildError::InvalidConfig(_)));
}

#[rstest]
fn predictor_builder_rejects_bad_config() {
    let mut cfg = rain_core::PipelineCfg::default();
    cfg.motion.min_track_length = 1;
    let err = Predictor::builder().config(cfg).try_build().unwrap_err();
    assert!(matches!(err, BuildError::InvalidConfig(_)));
}

#[rstest]
fn fetch_uses_analysis_center() {
    let source = approaching_source();
    let predictor = Predictor::builder().try_build().expect("predictor");
    let mut src = source;
    let report = rain_core::run_cycle(
        &mut src,
        &predictor,
        OBSERVER,
        None,
        None,
        FetchTimeouts::default(),
        0,
    )
    .expect("cycle");
    assert_eq!(report.window.center, OBSERVER);
    assert!(src.requested_centers.iter().all(|c| *c == OBSERVER));
    assert_eq!(src.requested_centers.len(), 3);
}

/// 256 px RainViewer tile at zoom 8 around `OBSERVER`.
const TILE_Z8: GeoSpan = GeoSpan::new(1.2745, 1.40625);

/// 256x256 raster with a 5x5 block centered on (`col`, `row`).
fn raster_with_block_at(col: usize, row: usize) -> RasterImage {
    let mut r = RasterImage::blank(256, 256);
    for y in row - 2..=row + 2 {
        for x in col - 2..=col + 2 {
            r.set(x, y, 200);
        }
    }
    r
}

#[rstest]
fn cells_are_placed_by_source_coverage() {
    // 36 px east of center on a zoom 8 tile is about 20 km
    let mut src = ScriptedSource::new()
        .with_frame(1_000, raster_with_block_at(164, 128))
        .with_frame(1_600, raster_with_block_at(164, 128))
        .with_coverage(TILE_Z8);
    let predictor = Predictor::builder().try_build().expect("predictor");
    let report = rain_core::run_cycle(
        &mut src,
        &predictor,
        OBSERVER,
        None,
        None,
        FetchTimeouts::default(),
        0,
    )
    .expect("cycle");
    assert_eq!(report.window.lat_span_deg, TILE_Z8.lat_deg);
    assert_eq!(report.window.lon_span_deg, TILE_Z8.lon_deg);
    let cell = report.latest_cells.first().expect("one cell");
    let km = haversine_km(OBSERVER, cell.position);
    assert!((19.0..21.0).contains(&km), "cell is {km} km away");
    assert!((cell.position.lat - OBSERVER.lat).abs() < 0.01);
    assert_eq!(src.coverage_requests, vec![None]);
}

#[rstest]
fn view_spans_are_requested_from_source() {
    let view = GeoWindow::from_size_km(OBSERVER, 60.0, 60.0);
    let mut src = approaching_source().with_coverage(GeoSpan::new(0.6, 0.7));
    let predictor = Predictor::builder().try_build().expect("predictor");
    let report = rain_core::run_cycle(
        &mut src,
        &predictor,
        OBSERVER,
        Some(&view),
        None,
        FetchTimeouts::default(),
        0,
    )
    .expect("cycle");
    assert_eq!(
        src.coverage_requests,
        vec![Some(GeoSpan::new(view.lat_span_deg, view.lon_span_deg))]
    );
    assert_eq!(report.window.lat_span_deg, 0.6);
    assert_eq!(report.window.lon_span_deg, 0.7);
    assert_eq!(report.window.center, view.center);
}

#[rstest]
fn ticker_fires_immediately_and_skips_when_consumer_lags() {
    let clock = ManualClock::new();
    let ticker = Ticker::spawn(Duration::from_secs(180), clock);
    let first = ticker.next_tick(Duration::from_secs(2));
    assert_eq!(first, Some(0));
    // manual clock sleeps return at once, so ticks pile up while we wait
    std::thread::sleep(Duration::from_millis(50));
    assert!(ticker.next_tick(Duration::from_secs(2)).is_some());
    assert!(ticker.skipped() > 0);
    drop(ticker);
}
