//! Cycle orchestration: frame fetching through a `FrameSource`, the
//! at-most-one-in-flight gate, and the periodic tick thread.
//!
//! Safety: each `Ticker` owns exactly one thread, shut down and joined when
//! the `Ticker` is dropped.

use crossbeam_channel as xch;
use rain_traits::clock::Clock;
use rain_traits::{FrameRef, FrameSource, GeoPoint, GeoSpan};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::error::PredictError;
use crate::pipeline::{CycleReport, Predictor, RasterFrame};
use crate::prediction::Prediction;
use crate::source_error::map_source_error;
use crate::window::GeoWindow;

/// Bounded waits for network-backed sources.
#[derive(Debug, Clone, Copy)]
pub struct FetchTimeouts {
    pub index: Duration,
    pub frame: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            index: Duration::from_secs(10),
            frame: Duration::from_secs(15),
        }
    }
}

/// Oldest-to-newest, duplicate timestamps dropped, newest `max_frames` kept
/// (0 keeps all).
pub fn order_frames(mut frames: Vec<FrameRef>, max_frames: usize) -> Vec<FrameRef> {
    frames.sort_by_key(|f| f.timestamp);
    frames.dedup_by_key(|f| f.timestamp);
    if max_frames > 0 && frames.len() > max_frames {
        frames.drain(..frames.len() - max_frames);
    }
    frames
}

/// Fetch every listed frame centered on `center`. A frame that fails is
/// kept as a missing frame so the cycle degrades instead of aborting.
pub fn fetch_frames<S: FrameSource + ?Sized>(
    source: &mut S,
    refs: &[FrameRef],
    center: GeoPoint,
    timeout: Duration,
) -> Vec<RasterFrame> {
    refs.iter()
        .map(|r| match source.fetch_raster(r, center, timeout) {
            Ok(raster) => RasterFrame::new(r.timestamp, raster),
            Err(e) => {
                tracing::warn!(timestamp = r.timestamp, path = %r.path, error = %e, "frame unavailable; treating as empty");
                RasterFrame::missing(r.timestamp)
            }
        })
        .collect()
}

/// List, fetch, and predict. Only a failed frame index aborts the cycle.
pub fn run_cycle<S: FrameSource + ?Sized>(
    source: &mut S,
    predictor: &Predictor,
    observer: GeoPoint,
    view: Option<&GeoWindow>,
    prior: Option<&Prediction>,
    timeouts: FetchTimeouts,
    max_frames: usize,
) -> Result<CycleReport, PredictError> {
    let refs = source.list_frames().map_err(|e| {
        let mapped = map_source_error(e.as_ref());
        tracing::error!(error = %e, "frame index request failed");
        mapped
    })?;
    let refs = order_frames(refs, max_frames);
    tracing::debug!(frames = refs.len(), "frame index listed");

    let window = raster_window(source, predictor.analysis_window(observer, view), view);
    let frames = fetch_frames(source, &refs, window.center, timeouts.frame);
    Ok(predictor.predict_in(&frames, window, observer, view, prior))
}

/// The source's own coverage around `wanted.center` when it knows it,
/// otherwise `wanted`. A view asks the source to cover the view's spans.
pub fn raster_window<S: FrameSource + ?Sized>(
    source: &mut S,
    wanted: GeoWindow,
    view: Option<&GeoWindow>,
) -> GeoWindow {
    let want = view.map(|v| GeoSpan::new(v.lat_span_deg, v.lon_span_deg));
    match source.coverage(wanted.center, want) {
        Some(span) if span.lat_deg > 0.0 && span.lon_deg > 0.0 => {
            tracing::debug!(lat_span = span.lat_deg, lon_span = span.lon_deg, "using source coverage");
            GeoWindow::from_spans(wanted.center, span.lat_deg, span.lon_deg)
                .with_row_order(wanted.row_order)
        }
        _ => wanted,
    }
}

/// Refuses to start a cycle while another one is running.
#[derive(Debug, Clone, Default)]
pub struct CycleGate {
    busy: Arc<AtomicBool>,
}

/// Held for the duration of a cycle; releases the gate on drop.
#[derive(Debug)]
pub struct CycleGuard {
    busy: Arc<AtomicBool>,
}

impl CycleGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_enter(&self) -> Result<CycleGuard, PredictError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("prediction cycle already in flight; skipping");
            return Err(PredictError::Busy);
        }
        Ok(CycleGuard {
            busy: self.busy.clone(),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Source, observer and pipeline bundled for repeated cycles. Build with
/// [`CycleRunner::builder`].
pub struct CycleRunner {
    pub(crate) source: Box<dyn FrameSource + Send>,
    pub(crate) predictor: Predictor,
    pub(crate) observer: GeoPoint,
    pub(crate) timeouts: FetchTimeouts,
    pub(crate) max_frames: usize,
    pub(crate) gate: CycleGate,
}

impl core::fmt::Debug for CycleRunner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CycleRunner")
            .field("observer", &self.observer)
            .field("timeouts", &self.timeouts)
            .field("max_frames", &self.max_frames)
            .finish_non_exhaustive()
    }
}

impl CycleRunner {
    pub fn observer(&self) -> GeoPoint {
        self.observer
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// Shared handle on this runner's in-flight gate.
    pub fn gate(&self) -> CycleGate {
        self.gate.clone()
    }

    /// One guarded cycle. `prior` is the previous cycle's prediction, if the
    /// caller wants ETA smoothing.
    pub fn run_once(
        &mut self,
        view: Option<&GeoWindow>,
        prior: Option<&Prediction>,
    ) -> Result<CycleReport, PredictError> {
        let _guard = self.gate.try_enter()?;
        run_cycle(
            self.source.as_mut(),
            &self.predictor,
            self.observer,
            view,
            prior,
            self.timeouts,
            self.max_frames,
        )
    }
}

/// Periodic tick source. Ticks are delivered through a one-slot channel, so
/// a consumer that overran its interval finds one tick waiting and starts
/// immediately; further ticks in that time are dropped.
pub struct Ticker {
    rx: xch::Receiver<u64>,
    skipped: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

/// Shutdown is polled at least this often while waiting out an interval.
const TICK_POLL: Duration = Duration::from_millis(50);

impl Ticker {
    /// First tick fires immediately, then every `interval`.
    pub fn spawn<C: Clock + Send + Sync + 'static>(interval: Duration, clock: C) -> Self {
        let (tx, rx) = xch::bounded(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let skipped = Arc::new(AtomicU64::new(0));
        let skipped_clone = skipped.clone();
        let interval = interval.max(Duration::from_millis(1));

        let join_handle = std::thread::spawn(move || {
            let epoch = clock.now();
            let mut n: u64 = 0;
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("Ticker thread received shutdown signal");
                    break;
                }
                match tx.try_send(n) {
                    Ok(()) => {}
                    Err(xch::TrySendError::Full(_)) => {
                        skipped_clone.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(tick = n, "previous tick still pending; skipping");
                    }
                    Err(xch::TrySendError::Disconnected(_)) => {
                        tracing::debug!("Ticker consumer disconnected, exiting thread");
                        break;
                    }
                }
                n = n.saturating_add(1);

                // Wait until the next slot on the fixed grid, polling shutdown.
                let due = interval.saturating_mul(u32::try_from(n).unwrap_or(u32::MAX));
                loop {
                    if shutdown_clone.load(Ordering::Relaxed) {
                        break;
                    }
                    let elapsed = clock.now().saturating_duration_since(epoch);
                    let Some(left) = due.checked_sub(elapsed).filter(|d| !d.is_zero()) else {
                        break;
                    };
                    clock.sleep(left.min(TICK_POLL));
                }
            }
            tracing::trace!("Ticker thread exiting cleanly");
        });

        Self {
            rx,
            skipped,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Wait up to `timeout` for the next tick.
    pub fn next_tick(&self, timeout: Duration) -> Option<u64> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Ticks dropped because the consumer had not taken the previous one.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("Ticker thread joined successfully"),
                Err(e) => tracing::warn!(?e, "Ticker thread panicked during shutdown"),
            }
        }
    }
}
