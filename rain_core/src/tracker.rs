//! Cross-frame association of cells into motion tracks.
//!
//! Tracks are rebuilt from scratch each cycle. The default [`BackwardNearest`]
//! associator seeds one track per newest-frame cell and walks older frames
//! greedily picking the nearest cell within a distance bound.

use rain_traits::GeoPoint;

use crate::config::TrackerCfg;
use crate::extract::Cell;
use crate::geo::haversine_km;
use crate::window::GeoWindow;

/// Cells detected in one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameCells {
    pub timestamp: i64,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub position: GeoPoint,
    pub timestamp: i64,
}

/// Ordered positions of one cell, oldest first, strictly increasing in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub positions: Vec<TrackPoint>,
    /// Highest mean intensity seen along the track.
    pub max_intensity: f64,
    /// Pixel count of the newest cell.
    pub size: usize,
}

impl Track {
    fn seed(cell: &Cell, timestamp: i64) -> Self {
        Self {
            positions: vec![TrackPoint {
                position: cell.position,
                timestamp,
            }],
            max_intensity: cell.intensity,
            size: cell.pixel_count,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Oldest retained position.
    pub fn first(&self) -> Option<&TrackPoint> {
        self.positions.first()
    }

    /// Newest (current) position.
    pub fn current(&self) -> Option<&TrackPoint> {
        self.positions.last()
    }
}

/// Cross-frame association strategy. `frames` are ordered oldest to newest.
pub trait Associator {
    fn associate(&self, frames: &[FrameCells]) -> Vec<Track>;
}

/// Greedy nearest-neighbour walk backward from the newest frame.
#[derive(Debug, Clone, Copy)]
pub struct BackwardNearest {
    pub max_distance_km: f64,
    pub max_positions: usize,
}

impl BackwardNearest {
    pub fn new(cfg: &TrackerCfg) -> Self {
        Self {
            max_distance_km: cfg.max_distance_km,
            max_positions: cfg.max_positions.max(1),
        }
    }

    /// Same as [`new`](Self::new) but with the bound widened or narrowed by
    /// an active view window; see [`association_bound`].
    pub fn for_view(cfg: &TrackerCfg, view: Option<&GeoWindow>) -> Self {
        Self {
            max_distance_km: association_bound(cfg.max_distance_km, view),
            ..Self::new(cfg)
        }
    }

    fn walk(&self, seed: &Cell, newest_ts: i64, older: &[FrameCells]) -> Track {
        let mut track = Track::seed(seed, newest_ts);
        let mut cursor = seed.position;
        let mut earliest = newest_ts;

        for frame in older.iter().rev() {
            if track.positions.len() >= self.max_positions {
                break;
            }
            if frame.timestamp >= earliest {
                continue;
            }
            let Some((cell, dist)) = nearest(cursor, &frame.cells) else {
                break;
            };
            if dist > self.max_distance_km {
                break;
            }
            track.positions.push(TrackPoint {
                position: cell.position,
                timestamp: frame.timestamp,
            });
            track.max_intensity = track.max_intensity.max(cell.intensity);
            cursor = cell.position;
            earliest = frame.timestamp;
        }

        track.positions.reverse();
        track
    }
}

impl Default for BackwardNearest {
    fn default() -> Self {
        Self::new(&TrackerCfg::default())
    }
}

impl Associator for BackwardNearest {
    fn associate(&self, frames: &[FrameCells]) -> Vec<Track> {
        let Some((newest, older)) = frames.split_last() else {
            return Vec::new();
        };
        if older.is_empty() {
            return Vec::new();
        }
        let tracks: Vec<Track> = newest
            .cells
            .iter()
            .map(|cell| self.walk(cell, newest.timestamp, older))
            .collect();
        tracing::debug!(
            seeds = newest.cells.len(),
            bound_km = self.max_distance_km,
            multi = tracks.iter().filter(|t| t.len() >= 2).count(),
            "associated tracks"
        );
        tracks
    }
}

/// Association bound for a cycle: the configured distance, or with a view
/// window `max(1.5 x view diagonal, 0.5 x configured)`.
pub fn association_bound(max_distance_km: f64, view: Option<&GeoWindow>) -> f64 {
    match view {
        Some(v) => (1.5 * v.diagonal_km()).max(0.5 * max_distance_km),
        None => max_distance_km,
    }
}

/// Nearest cell to `from`; the first one wins on exact ties.
fn nearest(from: GeoPoint, cells: &[Cell]) -> Option<(&Cell, f64)> {
    let mut best: Option<(&Cell, f64)> = None;
    for cell in cells {
        let d = haversine_km(from, cell.position);
        if !d.is_finite() {
            continue;
        }
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((cell, d));
        }
    }
    best
}
