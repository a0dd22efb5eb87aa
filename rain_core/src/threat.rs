//! Threat selection among approaching tracks.
//!
//! [`NearestApproaching`] is the default contract: the closest approaching
//! track wins. [`WeightedScore`] is the opt-in multi-factor alternative.

use crate::config::PolicyKind;
use crate::motion::ApproachingTrack;

/// Picks the track to report from the approaching set.
pub trait ThreatPolicy {
    /// Index into `candidates` of the chosen track, `None` when empty.
    fn select(&self, candidates: &[ApproachingTrack]) -> Option<usize>;
}

/// Smallest distance to the observer; earlier candidate on ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestApproaching;

impl ThreatPolicy for NearestApproaching {
    fn select(&self, candidates: &[ApproachingTrack]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in candidates.iter().enumerate() {
            if best.is_none_or(|(_, d)| c.distance_km < d) {
                best = Some((i, c.distance_km));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Score = 0.4 probability + 0.25 proximity + 0.2 speed + 0.15 intensity,
/// each factor on a 0-100 scale. Highest score wins; earlier on ties.
#[derive(Debug, Clone, Copy)]
pub struct WeightedScore {
    pub rain_threshold: u8,
}

impl WeightedScore {
    pub fn score(&self, c: &ApproachingTrack) -> f64 {
        let probability = threat_probability(
            c.distance_km,
            c.velocity.speed_kph,
            c.offset_deg,
            c.track.max_intensity,
            self.rain_threshold,
        );
        let proximity = (100.0 - c.distance_km / 2.0).max(0.0);
        let speed = (c.velocity.speed_kph * 2.0).min(100.0);
        let intensity = intensity_ratio(c.track.max_intensity, self.rain_threshold) * 100.0;
        let intensity = intensity.min(100.0);
        0.4 * probability + 0.25 * proximity + 0.2 * speed + 0.15 * intensity
    }
}

impl ThreatPolicy for WeightedScore {
    fn select(&self, candidates: &[ApproachingTrack]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in candidates.iter().enumerate() {
            let s = self.score(c);
            if !s.is_finite() {
                continue;
            }
            tracing::debug!(index = i, score = s, distance_km = c.distance_km, "weighted score");
            if best.is_none_or(|(_, b)| s > b) {
                best = Some((i, s));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Policy object for a configured [`PolicyKind`].
pub fn policy_for(kind: PolicyKind, rain_threshold: u8) -> Box<dyn ThreatPolicy + Send + Sync> {
    match kind {
        PolicyKind::Nearest => Box::new(NearestApproaching),
        PolicyKind::Weighted => Box::new(WeightedScore { rain_threshold }),
    }
}

#[inline]
fn intensity_ratio(intensity: f64, threshold: u8) -> f64 {
    if threshold == 0 {
        return 0.0;
    }
    intensity / f64::from(threshold)
}

/// Likelihood (0-100) that a track reaches the observer, from distance,
/// speed, heading offset and intensity buckets.
pub fn threat_probability(
    distance_km: f64,
    speed_kph: f64,
    offset_deg: f64,
    intensity: f64,
    rain_threshold: u8,
) -> f64 {
    let distance = match distance_km {
        d if d <= 10.0 => 40.0,
        d if d <= 25.0 => 30.0,
        d if d <= 50.0 => 20.0,
        d if d <= 100.0 => 10.0,
        _ => 0.0,
    };
    let speed = match speed_kph {
        s if s >= 30.0 => 25.0,
        s if s >= 15.0 => 20.0,
        s if s >= 5.0 => 15.0,
        s if s >= 1.0 => 10.0,
        _ => 0.0,
    };
    let heading = match offset_deg {
        a if a <= 30.0 => 25.0,
        a if a <= 60.0 => 20.0,
        a if a <= 90.0 => 15.0,
        a if a <= 120.0 => 10.0,
        a if a <= 150.0 => 5.0,
        _ => 0.0,
    };
    let strength = (intensity_ratio(intensity, rain_threshold) * 10.0).min(10.0);
    (distance + speed + heading + strength).min(100.0)
}
