//! Movement analysis: per-track velocity, the system-wide motion consensus,
//! and the interception filter that keeps only tracks heading for the
//! observer.

use rain_traits::GeoPoint;

use crate::config::MotionCfg;
use crate::geo::{angle_between, bearing_deg, haversine_km, normalize_deg};
use crate::tracker::Track;

const SECS_PER_HOUR: f64 = 3600.0;
/// Weighted vector sums shorter than this have no defined direction.
const MIN_RESULTANT: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub speed_kph: f64,
    /// Direction of motion (compass heading the cell travels toward).
    pub direction_deg: f64,
}

/// Velocity from the first and last retained positions of `track`.
///
/// `None` for tracks with fewer than two positions, non-increasing
/// timestamps, zero displacement, or non-finite results. Speeds above
/// `max_speed_kph` are clamped.
pub fn velocity(track: &Track, max_speed_kph: f64) -> Option<Velocity> {
    if track.len() < 2 {
        return None;
    }
    let (first, last) = (track.first()?, track.current()?);
    let dt = last.timestamp - first.timestamp;
    if dt <= 0 {
        return None;
    }
    let km = haversine_km(first.position, last.position);
    if !km.is_finite() || km <= 0.0 {
        return None;
    }
    let hours = dt as f64 / SECS_PER_HOUR;
    let speed = km / hours;
    let direction = bearing_deg(first.position, last.position);
    if !speed.is_finite() || !direction.is_finite() {
        return None;
    }
    let speed_kph = if speed > max_speed_kph {
        tracing::debug!(speed, max_speed_kph, "clamping track speed");
        max_speed_kph
    } else {
        speed
    };
    Some(Velocity {
        speed_kph,
        direction_deg: direction,
    })
}

/// Aggregate motion of all moving tracks in a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionField {
    /// Weighted circular mean of track directions; `None` when the weighted
    /// vector sum has zero length.
    pub consensus_deg: Option<f64>,
    /// Weighted mean speed.
    pub mean_speed_kph: Option<f64>,
}

/// Weight of a track in the consensus: size x intensity.
#[inline]
pub fn track_weight(track: &Track) -> f64 {
    track.size as f64 * track.max_intensity
}

/// Weighted circular mean over `(direction_deg, weight)` samples.
pub fn consensus_direction<I>(samples: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (mut sx, mut sy) = (0.0f64, 0.0f64);
    for (dir, w) in samples {
        if !(dir.is_finite() && w.is_finite()) {
            continue;
        }
        let r = dir.to_radians();
        sx += w * r.sin();
        sy += w * r.cos();
    }
    if sx.hypot(sy) < MIN_RESULTANT {
        return None;
    }
    Some(normalize_deg(sx.atan2(sy).to_degrees()))
}

fn mean_speed<'a, I>(moving: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a MovingTrack>,
{
    let (mut num, mut den) = (0.0f64, 0.0f64);
    for m in moving {
        let w = track_weight(&m.track);
        num += w * m.velocity.speed_kph;
        den += w;
    }
    (den > 0.0).then(|| num / den).filter(|v| v.is_finite())
}

/// A track with a defined velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingTrack {
    pub track: Track,
    pub velocity: Velocity,
}

/// A track that passed the interception filter, annotated against the
/// observer.
#[derive(Debug, Clone, PartialEq)]
pub struct ApproachingTrack {
    pub track: Track,
    pub velocity: Velocity,
    /// Newest position of the track.
    pub current: GeoPoint,
    pub distance_km: f64,
    /// Bearing from the observer to the cell.
    pub bearing_from_observer: f64,
    /// Bearing from the cell to the observer.
    pub bearing_to_observer: f64,
    /// Angle between the direction of motion and `bearing_to_observer`.
    pub offset_deg: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionReport {
    pub field: MotionField,
    pub moving: Vec<MovingTrack>,
    pub approaching: Vec<ApproachingTrack>,
}

/// Interception test for one heading.
pub fn is_intercepting(
    direction_deg: f64,
    consensus_deg: Option<f64>,
    bearing_to_observer: f64,
    cfg: &MotionCfg,
) -> bool {
    let agrees = consensus_deg
        .is_none_or(|c| angle_between(direction_deg, c) <= cfg.consensus_tolerance_deg);
    agrees && angle_between(direction_deg, bearing_to_observer) <= cfg.approach_angle_deg
}

/// Velocity, consensus, and interception filtering over all tracks.
pub fn analyze(tracks: &[Track], observer: GeoPoint, cfg: &MotionCfg) -> MotionReport {
    let min_len = cfg.min_track_length.max(2);
    let moving: Vec<MovingTrack> = tracks
        .iter()
        .filter(|t| t.len() >= min_len)
        .filter_map(|t| {
            velocity(t, cfg.max_speed_kph).map(|v| MovingTrack {
                track: t.clone(),
                velocity: v,
            })
        })
        .collect();

    let field = MotionField {
        consensus_deg: consensus_direction(
            moving
                .iter()
                .map(|m| (m.velocity.direction_deg, track_weight(&m.track))),
        ),
        mean_speed_kph: mean_speed(&moving),
    };
    if field.consensus_deg.is_none() && !moving.is_empty() {
        tracing::debug!("motion consensus undefined; consensus test skipped");
    }

    let approaching: Vec<ApproachingTrack> = moving
        .iter()
        .filter_map(|m| {
            let current = m.track.current()?.position;
            let distance_km = haversine_km(current, observer);
            if !distance_km.is_finite() {
                return None;
            }
            let bearing_to_observer = bearing_deg(current, observer);
            let dir = m.velocity.direction_deg;
            if !is_intercepting(dir, field.consensus_deg, bearing_to_observer, cfg) {
                tracing::debug!(
                    direction = dir,
                    bearing_to_observer,
                    "track not approaching"
                );
                return None;
            }
            Some(ApproachingTrack {
                track: m.track.clone(),
                velocity: m.velocity,
                current,
                distance_km,
                bearing_from_observer: bearing_deg(observer, current),
                bearing_to_observer,
                offset_deg: angle_between(dir, bearing_to_observer),
            })
        })
        .collect();

    tracing::debug!(
        tracks = tracks.len(),
        moving = moving.len(),
        approaching = approaching.len(),
        consensus = ?field.consensus_deg,
        "motion analysis"
    );
    MotionReport {
        field,
        moving,
        approaching,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::destination;
    use crate::tracker::TrackPoint;
    use rstest::rstest;

    const ORIGIN: GeoPoint = GeoPoint::new(-25.0, 150.0);

    fn track(points: &[(GeoPoint, i64)]) -> Track {
        Track {
            positions: points
                .iter()
                .map(|&(position, timestamp)| TrackPoint {
                    position,
                    timestamp,
                })
                .collect(),
            max_intensity: 100.0,
            size: 10,
        }
    }

    #[test]
    fn ten_km_in_one_hour_is_ten_kph() {
        let t = track(&[(ORIGIN, 0), (destination(ORIGIN, 10.0, 45.0), 3600)]);
        let v = velocity(&t, 200.0).expect("moving");
        assert!((v.speed_kph - 10.0).abs() < 1e-6);
        assert!(angle_between(v.direction_deg, 45.0) < 0.1);
    }

    #[rstest]
    #[case(3600, 3600)]
    #[case(3600, 0)]
    fn non_increasing_time_has_no_velocity(#[case] t0: i64, #[case] t1: i64) {
        let t = track(&[(ORIGIN, t0), (destination(ORIGIN, 10.0, 45.0), t1)]);
        assert!(velocity(&t, 200.0).is_none());
    }

    #[test]
    fn stationary_and_short_tracks_have_no_velocity() {
        assert!(velocity(&track(&[(ORIGIN, 0), (ORIGIN, 600)]), 200.0).is_none());
        assert!(velocity(&track(&[(ORIGIN, 0)]), 200.0).is_none());
    }

    #[test]
    fn speed_is_clamped() {
        let t = track(&[(ORIGIN, 0), (destination(ORIGIN, 100.0, 90.0), 600)]);
        let v = velocity(&t, 200.0).expect("moving");
        assert_eq!(v.speed_kph, 200.0);
    }

    #[test]
    fn consensus_wraps_across_north() {
        let c = consensus_direction([(350.0, 1.0), (10.0, 1.0)]).expect("defined");
        assert!(angle_between(c, 0.0) < 1e-9, "got {c}");
    }

    #[test]
    fn consensus_follows_heavier_weight() {
        let c = consensus_direction([(90.0, 3.0), (180.0, 1.0)]).expect("defined");
        assert!(c > 90.0 && c < 135.0, "got {c}");
    }

    #[test]
    fn opposing_equal_weights_have_no_consensus() {
        assert!(consensus_direction([(90.0, 1.0), (270.0, 1.0)]).is_none());
        assert!(consensus_direction(std::iter::empty()).is_none());
        assert!(consensus_direction([(90.0, 0.0)]).is_none());
    }

    #[rstest]
    // heading straight at the observer, consensus agrees
    #[case(135.0, Some(135.0), 135.0, true)]
    // heading 60 deg off the consensus
    #[case(135.0, Some(75.0), 135.0, false)]
    // heading away from the observer
    #[case(315.0, Some(315.0), 135.0, false)]
    // consensus undefined: only the approach test applies
    #[case(200.0, None, 135.0, true)]
    #[case(226.0, None, 135.0, false)]
    fn interception_filter(
        #[case] dir: f64,
        #[case] consensus: Option<f64>,
        #[case] to_observer: f64,
        #[case] expected: bool,
    ) {
        assert_eq!(
            is_intercepting(dir, consensus, to_observer, &MotionCfg::default()),
            expected
        );
    }

    #[test]
    fn analyze_keeps_approaching_and_drops_receding() {
        let observer = ORIGIN;
        // 60 km north-west, moving south-east toward the observer
        let a0 = destination(observer, 60.0, 315.0);
        let a1 = destination(a0, 10.0, 135.0);
        // 60 km south-east, moving south-east away from the observer
        let r0 = destination(observer, 60.0, 135.0);
        let r1 = destination(r0, 10.0, 135.0);
        let tracks = vec![
            track(&[(a0, 0), (a1, 600)]),
            track(&[(r0, 0), (r1, 600)]),
        ];
        let report = analyze(&tracks, observer, &MotionCfg::default());
        assert_eq!(report.moving.len(), 2);
        assert_eq!(report.approaching.len(), 1);
        let a = &report.approaching[0];
        assert_eq!(a.current, a1);
        assert!((a.distance_km - 50.0).abs() < 0.5);
        assert!(angle_between(a.bearing_from_observer, 315.0) < 0.5);
        assert!(a.offset_deg < 1.0);
        let mean = report.field.mean_speed_kph.expect("mean speed");
        assert!((mean - 60.0).abs() < 1e-6);
    }

    #[test]
    fn short_tracks_are_not_evaluated() {
        let cfg = MotionCfg {
            min_track_length: 3,
            ..MotionCfg::default()
        };
        let t = track(&[(ORIGIN, 0), (destination(ORIGIN, 10.0, 90.0), 600)]);
        assert!(analyze(&[t], ORIGIN, &cfg).moving.is_empty());
    }
}
