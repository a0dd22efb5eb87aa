//! Spherical-earth helpers: distance, bearing, projection, compass labels.
//!
//! All angles are decimal degrees; bearings are compass headings in
//! [0, 360) with 0 = north, 90 = east.

use rain_traits::GeoPoint;

/// Mean earth radius used by every distance computation.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Kilometres per degree of latitude for window sizing.
pub const KM_PER_DEG_LAT: f64 = 111.0;

/// Wrap any angle into [0, 360).
#[inline]
pub fn normalize_deg(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if r >= 360.0 { 0.0 } else { r }
}

/// Great-circle distance in kilometres (haversine).
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Clamp guards asin against h drifting past 1.0 for antipodal points.
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();
    (EARTH_RADIUS_KM * c).max(0.0)
}

/// Initial great-circle bearing from `from` to `to`.
pub fn bearing_deg(from: GeoPoint, to: GeoPoint) -> f64 {
    let (lat1, lat2) = (from.lat.to_radians(), to.lat.to_radians());
    let dlon = (to.lon - from.lon).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    normalize_deg(y.atan2(x).to_degrees())
}

/// Point reached by travelling `distance_km` from `origin` on `bearing`.
pub fn destination(origin: GeoPoint, distance_km: f64, bearing: f64) -> GeoPoint {
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let brg = bearing.to_radians();
    let ang = distance_km / EARTH_RADIUS_KM;

    let lat2 = (lat1.sin() * ang.cos() + lat1.cos() * ang.sin() * brg.cos()).asin();
    let lon2 = lon1
        + (brg.sin() * ang.sin() * lat1.cos()).atan2(ang.cos() - lat1.sin() * lat2.sin());

    let lon_deg = (lon2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    GeoPoint::new(lat2.to_degrees(), lon_deg)
}

/// Smallest absolute difference between two headings, in [0, 180].
#[inline]
pub fn angle_between(a: f64, b: f64) -> f64 {
    let d = (a - b + 180.0).rem_euclid(360.0) - 180.0;
    d.abs()
}

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass label; negative or non-finite input (the "no direction"
/// sentinel) renders as "--".
pub fn cardinal(deg: f64) -> &'static str {
    if !deg.is_finite() || deg < 0.0 {
        return "--";
    }
    let idx = ((normalize_deg(deg) + 11.25) / 22.5).floor() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[idx]
}
