//! Builders for `Predictor` and the type-state `CycleRunner` builder.
//!
//! `RunnerBuilder` enforces at compile time that a frame source and an
//! observer are provided before `build()` is available. `try_build()` is
//! always available for dynamic checks.

use std::marker::PhantomData;

use rain_traits::{FrameSource, GeoPoint};

use crate::config::{PipelineCfg, PolicyKind};
use crate::error::BuildError;
use crate::pipeline::Predictor;
use crate::runner::{CycleGate, CycleRunner, FetchTimeouts};
use crate::threat::{ThreatPolicy, policy_for};
use crate::tracker::Associator;

impl Predictor {
    /// Start building a Predictor.
    pub fn builder() -> PredictorBuilder {
        PredictorBuilder::default()
    }
}

#[derive(Default)]
pub struct PredictorBuilder {
    cfg: PipelineCfg,
    associator: Option<Box<dyn Associator + Send + Sync>>,
    policy: Option<Box<dyn ThreatPolicy + Send + Sync>>,
}

impl PredictorBuilder {
    pub fn config(mut self, cfg: PipelineCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn policy(mut self, kind: PolicyKind) -> Self {
        self.cfg.policy = kind;
        self.policy = None;
        self
    }

    /// Replace the configured policy with a custom one.
    pub fn threat_policy(mut self, policy: Box<dyn ThreatPolicy + Send + Sync>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Replace the default backward nearest-neighbour association.
    pub fn associator(mut self, associator: Box<dyn Associator + Send + Sync>) -> Self {
        self.associator = Some(associator);
        self
    }

    pub fn try_build(self) -> Result<Predictor, BuildError> {
        validate(&self.cfg)?;
        let policy = self
            .policy
            .unwrap_or_else(|| policy_for(self.cfg.policy, self.cfg.extract.rain_threshold));
        Ok(Predictor {
            cfg: self.cfg,
            associator: self.associator,
            policy,
        })
    }
}

fn validate(cfg: &PipelineCfg) -> Result<(), BuildError> {
    if cfg.extract.min_cell_pixels == 0 {
        return Err(BuildError::InvalidConfig("min_cell_pixels must be >= 1"));
    }
    if !(cfg.window.lat_range_deg > 0.0 && cfg.window.lon_range_deg > 0.0) {
        return Err(BuildError::InvalidConfig("analysis window spans must be > 0"));
    }
    if cfg.tracker.max_distance_km.is_nan() || cfg.tracker.max_distance_km <= 0.0 {
        return Err(BuildError::InvalidConfig("max_tracking_distance_km must be > 0"));
    }
    if cfg.tracker.max_positions < 2 {
        return Err(BuildError::InvalidConfig("max_track_positions must be >= 2"));
    }
    if cfg.motion.min_track_length < 2 {
        return Err(BuildError::InvalidConfig("min_track_length must be >= 2"));
    }
    if !(0.0..=180.0).contains(&cfg.motion.consensus_tolerance_deg)
        || !(0.0..=180.0).contains(&cfg.motion.approach_angle_deg)
    {
        return Err(BuildError::InvalidConfig("angle tolerances must be in [0, 180]"));
    }
    if cfg.motion.max_speed_kph.is_nan() || cfg.motion.max_speed_kph <= 0.0 {
        return Err(BuildError::InvalidConfig("max_speed_kph must be > 0"));
    }
    if let Some(a) = cfg.smoothing.eta_alpha
        && !(a > 0.0 && a <= 1.0)
    {
        return Err(BuildError::InvalidConfig("eta_alpha must be in (0.0, 1.0]"));
    }
    Ok(())
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `CycleRunner`.
pub struct RunnerBuilder<S, O> {
    source: Option<Box<dyn FrameSource + Send>>,
    observer: Option<GeoPoint>,
    predictor: Option<Predictor>,
    timeouts: FetchTimeouts,
    max_frames: usize,
    gate: Option<CycleGate>,
    _s: PhantomData<S>,
    _o: PhantomData<O>,
}

impl Default for RunnerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            source: None,
            observer: None,
            predictor: None,
            timeouts: FetchTimeouts::default(),
            max_frames: 0,
            gate: None,
            _s: PhantomData,
            _o: PhantomData,
        }
    }
}

impl CycleRunner {
    pub fn builder() -> RunnerBuilder<Missing, Missing> {
        RunnerBuilder::default()
    }
}

impl<S, O> RunnerBuilder<S, O> {
    fn retype<S2, O2>(self) -> RunnerBuilder<S2, O2> {
        RunnerBuilder {
            source: self.source,
            observer: self.observer,
            predictor: self.predictor,
            timeouts: self.timeouts,
            max_frames: self.max_frames,
            gate: self.gate,
            _s: PhantomData,
            _o: PhantomData,
        }
    }

    pub fn source<F: FrameSource + Send + 'static>(mut self, source: F) -> RunnerBuilder<Set, O> {
        self.source = Some(Box::new(source));
        self.retype()
    }

    pub fn observer(mut self, observer: GeoPoint) -> RunnerBuilder<S, Set> {
        self.observer = Some(observer);
        self.retype()
    }

    /// Pipeline to run; defaults to `Predictor::builder()` defaults.
    pub fn predictor(mut self, predictor: Predictor) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn timeouts(mut self, timeouts: FetchTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Keep only the newest N listed frames (0 keeps all).
    pub fn max_frames(mut self, n: usize) -> Self {
        self.max_frames = n;
        self
    }

    /// Share an existing gate, e.g. with a second runner on the same data.
    pub fn gate(mut self, gate: CycleGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn try_build(self) -> Result<CycleRunner, BuildError> {
        let source = self.source.ok_or(BuildError::MissingSource)?;
        let observer = self.observer.ok_or(BuildError::MissingObserver)?;
        if !(-90.0..=90.0).contains(&observer.lat) || !(-180.0..=180.0).contains(&observer.lon) {
            return Err(BuildError::InvalidConfig("observer out of range"));
        }
        let predictor = match self.predictor {
            Some(p) => p,
            None => Predictor::builder().try_build()?,
        };
        Ok(CycleRunner {
            source,
            predictor,
            observer,
            timeouts: self.timeouts,
            max_frames: self.max_frames,
            gate: self.gate.unwrap_or_default(),
        })
    }
}

impl RunnerBuilder<Set, Set> {
    pub fn build(self) -> Result<CycleRunner, BuildError> {
        self.try_build()
    }
}
