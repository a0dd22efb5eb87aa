//! Prediction outcome types, ETA smoothing against a prior, and the
//! rounded "published values" form.

use rain_traits::GeoPoint;

use crate::config::{Sentinels, SmoothingCfg};
use crate::geo::haversine_km;
use crate::motion::{ApproachingTrack, MotionField};
use crate::threat::threat_probability;

const MINUTES_PER_HOUR: f64 = 60.0;

/// Why a cycle produced no threat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoRainReason {
    /// Fewer than two frames were available.
    InsufficientFrames,
    /// No track reached the minimum length with a usable velocity.
    NoTracks,
    /// Tracks exist but none is heading for the observer.
    NoApproachingTracks,
}

/// The selected threat. Distance and bearing use the track's current
/// position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreatPrediction {
    pub time_to_rain_minutes: f64,
    pub distance_km: f64,
    pub speed_kph: f64,
    /// Direction the cell is moving toward.
    pub direction_deg: f64,
    /// Bearing from the observer to the cell.
    pub bearing_to_cell_deg: f64,
    pub cell: GeoPoint,
    /// Oldest retained position of the track.
    pub track_origin: GeoPoint,
    /// 0-100.
    pub threat_probability: f64,
    pub system_direction_deg: Option<f64>,
    pub system_speed_kph: Option<f64>,
    /// True when the ETA was blended with a prior prediction.
    pub smoothed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    NoRain(NoRainReason),
    /// The observer's own pixel is wet in the newest frame.
    RainOverhead,
    Threat(ThreatPrediction),
}

impl Prediction {
    pub fn threat(&self) -> Option<&ThreatPrediction> {
        match self {
            Self::Threat(t) => Some(t),
            _ => None,
        }
    }

    pub const fn is_no_rain(&self) -> bool {
        matches!(self, Self::NoRain(_))
    }
}

/// Minutes until a cell `distance_km` away arrives at `speed_kph`.
/// `None` when the speed is not positive or the result is not finite.
pub fn eta_minutes(distance_km: f64, speed_kph: f64) -> Option<f64> {
    if speed_kph <= 0.0 {
        return None;
    }
    let m = distance_km / speed_kph * MINUTES_PER_HOUR;
    m.is_finite().then_some(m.max(0.0))
}

/// Build the prediction for a selected approaching track.
pub fn threat_from(
    chosen: &ApproachingTrack,
    field: &MotionField,
    rain_threshold: u8,
) -> Option<ThreatPrediction> {
    let eta = eta_minutes(chosen.distance_km, chosen.velocity.speed_kph)?;
    let origin = chosen.track.first().map_or(chosen.current, |p| p.position);
    Some(ThreatPrediction {
        time_to_rain_minutes: eta,
        distance_km: chosen.distance_km,
        speed_kph: chosen.velocity.speed_kph,
        direction_deg: chosen.velocity.direction_deg,
        bearing_to_cell_deg: chosen.bearing_from_observer,
        cell: chosen.current,
        track_origin: origin,
        threat_probability: threat_probability(
            chosen.distance_km,
            chosen.velocity.speed_kph,
            chosen.offset_deg,
            chosen.track.max_intensity,
            rain_threshold,
        ),
        system_direction_deg: field.consensus_deg,
        system_speed_kph: field.mean_speed_kph,
        smoothed: false,
    })
}

/// Blend the ETA with a prior threat: `alpha * new + (1 - alpha) * prior`,
/// only when smoothing is enabled and the prior cell lies within
/// `max_jump_km` of the new one.
pub fn smooth_with_prior(
    current: ThreatPrediction,
    prior: Option<&Prediction>,
    cfg: &SmoothingCfg,
) -> ThreatPrediction {
    let (Some(alpha), Some(prev)) = (cfg.eta_alpha, prior.and_then(Prediction::threat)) else {
        return current;
    };
    if !(alpha > 0.0 && alpha <= 1.0) {
        return current;
    }
    let jump = haversine_km(prev.cell, current.cell);
    if jump.is_nan() || jump > cfg.max_jump_km {
        tracing::debug!(jump_km = jump, "prior threat too far away; not smoothing");
        return current;
    }
    let eta = alpha * current.time_to_rain_minutes + (1.0 - alpha) * prev.time_to_rain_minutes;
    if !eta.is_finite() {
        return current;
    }
    ThreatPrediction {
        time_to_rain_minutes: eta.max(0.0),
        smoothed: true,
        ..current
    }
}

/// Values in the form the home-automation side publishes them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishedValues {
    /// Whole minutes.
    pub time_to_rain: f64,
    pub distance_km: f64,
    pub speed_kph: f64,
    pub direction_deg: f64,
    pub bearing_deg: f64,
    pub cell_lat: Option<f64>,
    pub cell_lon: Option<f64>,
    pub threat_probability: Option<f64>,
}

#[inline]
fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

impl PublishedValues {
    pub fn from_prediction(p: &Prediction, s: &Sentinels) -> Self {
        match p {
            Prediction::NoRain(_) => Self {
                time_to_rain: s.no_rain_value,
                distance_km: s.no_rain_value,
                speed_kph: 0.0,
                direction_deg: s.no_direction_value,
                bearing_deg: s.no_bearing_value,
                cell_lat: None,
                cell_lon: None,
                threat_probability: None,
            },
            Prediction::RainOverhead => Self {
                time_to_rain: 0.0,
                distance_km: 0.0,
                speed_kph: 0.0,
                direction_deg: s.no_direction_value,
                bearing_deg: s.no_bearing_value,
                cell_lat: None,
                cell_lon: None,
                threat_probability: None,
            },
            Prediction::Threat(t) => Self {
                time_to_rain: t.time_to_rain_minutes.round().max(0.0),
                distance_km: round_to(t.distance_km, 1).max(0.0),
                speed_kph: round_to(t.speed_kph, 1).max(0.0),
                direction_deg: round_to(t.direction_deg, 1),
                bearing_deg: round_to(t.bearing_to_cell_deg, 1),
                cell_lat: Some(round_to(t.cell.lat, 4)),
                cell_lon: Some(round_to(t.cell.lon, 4)),
                threat_probability: Some(round_to(t.threat_probability, 1)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threat(eta: f64, cell: GeoPoint) -> ThreatPrediction {
        ThreatPrediction {
            time_to_rain_minutes: eta,
            distance_km: 23.456,
            speed_kph: 31.25,
            direction_deg: 134.96,
            bearing_to_cell_deg: 314.94,
            cell,
            track_origin: cell,
            threat_probability: 72.25,
            system_direction_deg: Some(135.0),
            system_speed_kph: Some(30.0),
            smoothed: false,
        }
    }

    const CELL: GeoPoint = GeoPoint::new(-24.87654, 151.12346);

    #[test]
    fn eta_is_distance_over_speed() {
        assert_eq!(eta_minutes(30.0, 60.0), Some(30.0));
        assert_eq!(eta_minutes(30.0, 0.0), None);
        assert_eq!(eta_minutes(f64::INFINITY, 10.0), None);
    }

    #[test]
    fn no_rain_publishes_sentinels() {
        let v = PublishedValues::from_prediction(
            &Prediction::NoRain(NoRainReason::NoTracks),
            &Sentinels::default(),
        );
        assert_eq!(v.time_to_rain, 999.0);
        assert_eq!(v.distance_km, 999.0);
        assert_eq!(v.speed_kph, 0.0);
        assert_eq!(v.direction_deg, -1.0);
        assert_eq!(v.bearing_deg, -1.0);
        assert!(v.cell_lat.is_none() && v.cell_lon.is_none());
    }

    #[test]
    fn overhead_publishes_zero_eta() {
        let v = PublishedValues::from_prediction(&Prediction::RainOverhead, &Sentinels::default());
        assert_eq!(v.time_to_rain, 0.0);
        assert_eq!(v.distance_km, 0.0);
        assert_eq!(v.direction_deg, -1.0);
    }

    #[test]
    fn threat_values_are_rounded() {
        let v = PublishedValues::from_prediction(
            &Prediction::Threat(threat(44.6, CELL)),
            &Sentinels::default(),
        );
        assert_eq!(v.time_to_rain, 45.0);
        assert_eq!(v.distance_km, 23.5);
        assert_eq!(v.speed_kph, 31.3);
        assert_eq!(v.direction_deg, 135.0);
        assert_eq!(v.bearing_deg, 314.9);
        assert_eq!(v.cell_lat, Some(-24.8765));
        assert_eq!(v.cell_lon, Some(151.1235));
    }

    #[test]
    fn smoothing_blends_nearby_prior() {
        let cfg = SmoothingCfg {
            eta_alpha: Some(0.5),
            max_jump_km: 25.0,
        };
        let prior = Prediction::Threat(threat(60.0, CELL));
        let out = smooth_with_prior(threat(40.0, CELL), Some(&prior), &cfg);
        assert!(out.smoothed);
        assert!((out.time_to_rain_minutes - 50.0).abs() < 1e-9);
    }

    #[test]
    fn smoothing_ignores_distant_or_missing_prior() {
        let cfg = SmoothingCfg {
            eta_alpha: Some(0.5),
            max_jump_km: 25.0,
        };
        let far = Prediction::Threat(threat(60.0, GeoPoint::new(-20.0, 151.0)));
        let out = smooth_with_prior(threat(40.0, CELL), Some(&far), &cfg);
        assert!(!out.smoothed);
        assert_eq!(out.time_to_rain_minutes, 40.0);

        let none = Prediction::NoRain(NoRainReason::NoTracks);
        assert!(!smooth_with_prior(threat(40.0, CELL), Some(&none), &cfg).smoothed);
        assert!(!smooth_with_prior(threat(40.0, CELL), None, &cfg).smoothed);
    }

    #[test]
    fn smoothing_disabled_without_alpha() {
        let prior = Prediction::Threat(threat(60.0, CELL));
        let out = smooth_with_prior(threat(40.0, CELL), Some(&prior), &SmoothingCfg::default());
        assert!(!out.smoothed);
    }
}
