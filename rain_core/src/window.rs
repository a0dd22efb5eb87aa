//! Analysis window: the geographic rectangle a raster covers, and the
//! pixel <-> coordinate mapping over it.
//!
//! Sign convention: column 0 is the western edge and column `W-1` the eastern
//! edge. With [`RowOrder::NorthUp`] row 0 is the northern edge, so increasing
//! row decreases latitude; [`RowOrder::SouthUp`] flips the vertical axis.
//! Pixel centers sit on the edges (edge-aligned), so the raster center maps
//! to the window center and the corner pixels map to the window corners.

use crate::geo::{KM_PER_DEG_LAT, haversine_km};
use rain_traits::GeoPoint;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowOrder {
    #[default]
    NorthUp,
    SouthUp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoWindow {
    pub center: GeoPoint,
    /// North-south extent in degrees.
    pub lat_span_deg: f64,
    /// East-west extent in degrees.
    pub lon_span_deg: f64,
    pub row_order: RowOrder,
}

impl GeoWindow {
    pub fn from_spans(center: GeoPoint, lat_span_deg: f64, lon_span_deg: f64) -> Self {
        Self {
            center,
            lat_span_deg,
            lon_span_deg,
            row_order: RowOrder::NorthUp,
        }
    }

    /// Window of `width_km` x `height_km` around `center`, using 111 km per
    /// degree of latitude and a cos(latitude) correction for longitude.
    pub fn from_size_km(center: GeoPoint, width_km: f64, height_km: f64) -> Self {
        let lat_span = height_km / KM_PER_DEG_LAT;
        let cos_lat = center.lat.to_radians().cos().abs().max(1e-6);
        let lon_span = width_km / (KM_PER_DEG_LAT * cos_lat);
        Self::from_spans(center, lat_span, lon_span)
    }

    pub fn from_bounds(north: f64, south: f64, east: f64, west: f64) -> Self {
        let center = GeoPoint::new((north + south) / 2.0, (east + west) / 2.0);
        Self::from_spans(center, north - south, east - west)
    }

    pub fn with_row_order(mut self, order: RowOrder) -> Self {
        self.row_order = order;
        self
    }

    pub fn north(&self) -> f64 {
        self.center.lat + self.lat_span_deg / 2.0
    }

    pub fn south(&self) -> f64 {
        self.center.lat - self.lat_span_deg / 2.0
    }

    pub fn east(&self) -> f64 {
        self.center.lon + self.lon_span_deg / 2.0
    }

    pub fn west(&self) -> f64 {
        self.center.lon - self.lon_span_deg / 2.0
    }

    /// Approximate window diagonal in kilometres.
    pub fn diagonal_km(&self) -> f64 {
        haversine_km(
            GeoPoint::new(self.north(), self.west()),
            GeoPoint::new(self.south(), self.east()),
        )
    }

    /// Map a (possibly fractional) pixel position to a coordinate.
    pub fn pixel_to_geo(&self, col: f64, row: f64, width: usize, height: usize) -> GeoPoint {
        let fx = axis_fraction(col, width);
        let fy = axis_fraction(row, height);
        let lon = self.west() + fx * self.lon_span_deg;
        let lat = match self.row_order {
            RowOrder::NorthUp => self.north() - fy * self.lat_span_deg,
            RowOrder::SouthUp => self.south() + fy * self.lat_span_deg,
        };
        GeoPoint::new(lat.clamp(-90.0, 90.0), lon.clamp(-180.0, 180.0))
    }

    /// Inverse of [`pixel_to_geo`](Self::pixel_to_geo); may fall outside the
    /// raster for points outside the window.
    pub fn geo_to_pixel(&self, point: GeoPoint, width: usize, height: usize) -> (f64, f64) {
        let fx = (point.lon - self.west()) / self.lon_span_deg;
        let fy = match self.row_order {
            RowOrder::NorthUp => (self.north() - point.lat) / self.lat_span_deg,
            RowOrder::SouthUp => (point.lat - self.south()) / self.lat_span_deg,
        };
        (fx * last_index(width), fy * last_index(height))
    }
}

#[inline]
fn last_index(len: usize) -> f64 {
    len.saturating_sub(1) as f64
}

/// Position along an axis of `len` pixels as a fraction in [0, 1]; a single
/// pixel sits at the middle.
#[inline]
fn axis_fraction(pos: f64, len: usize) -> f64 {
    if len <= 1 {
        return 0.5;
    }
    pos / last_index(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn window() -> GeoWindow {
        GeoWindow::from_bounds(-20.0, -30.0, 155.0, 145.0)
    }

    #[test]
    fn center_pixel_maps_to_center() {
        let w = window();
        let p = w.pixel_to_geo(127.5, 127.5, 256, 256);
        assert!((p.lat - w.center.lat).abs() < EPS);
        assert!((p.lon - w.center.lon).abs() < EPS);
    }

    #[test]
    fn odd_raster_center_pixel_maps_to_center() {
        let w = window();
        let p = w.pixel_to_geo(2.0, 2.0, 5, 5);
        assert!((p.lat + 25.0).abs() < EPS);
        assert!((p.lon - 150.0).abs() < EPS);
    }

    #[test]
    fn north_west_pixel_maps_to_north_west_corner() {
        let w = window();
        let p = w.pixel_to_geo(0.0, 0.0, 256, 256);
        assert!((p.lat - w.north()).abs() < EPS);
        assert!((p.lon - w.west()).abs() < EPS);
    }

    #[test]
    fn increasing_row_decreases_latitude_when_north_up() {
        let w = window();
        let top = w.pixel_to_geo(10.0, 10.0, 100, 100);
        let bottom = w.pixel_to_geo(10.0, 90.0, 100, 100);
        assert!(top.lat > bottom.lat);
        let left = w.pixel_to_geo(10.0, 50.0, 100, 100);
        let right = w.pixel_to_geo(90.0, 50.0, 100, 100);
        assert!(right.lon > left.lon);
    }

    #[test]
    fn south_up_flips_vertical_axis_only() {
        let w = window().with_row_order(RowOrder::SouthUp);
        let p = w.pixel_to_geo(0.0, 0.0, 100, 100);
        assert!((p.lat - w.south()).abs() < EPS);
        assert!((p.lon - w.west()).abs() < EPS);
    }

    #[test]
    fn geo_to_pixel_inverts_mapping() {
        for order in [RowOrder::NorthUp, RowOrder::SouthUp] {
            let w = window().with_row_order(order);
            let p = w.pixel_to_geo(37.0, 201.0, 256, 256);
            let (c, r) = w.geo_to_pixel(p, 256, 256);
            assert!((c - 37.0).abs() < 1e-6 && (r - 201.0).abs() < 1e-6);
        }
    }

    #[test]
    fn size_km_applies_cos_latitude() {
        let c = GeoPoint::new(60.0, 10.0);
        let w = GeoWindow::from_size_km(c, 111.0, 222.0);
        assert!((w.lat_span_deg - 2.0).abs() < EPS);
        // cos(60 deg) = 0.5 doubles the longitude span
        assert!((w.lon_span_deg - 2.0).abs() < 1e-6);
    }

    #[test]
    fn single_pixel_axis_maps_to_center() {
        let w = window();
        let p = w.pixel_to_geo(0.0, 0.0, 1, 1);
        assert!((p.lat - w.center.lat).abs() < EPS);
        assert!((p.lon - w.center.lon).abs() < EPS);
    }

    #[test]
    fn coordinates_are_clamped() {
        let w = GeoWindow::from_spans(GeoPoint::new(89.0, 179.0), 10.0, 10.0);
        let p = w.pixel_to_geo(99.0, 0.0, 100, 100);
        assert_eq!(p.lat, 90.0);
        assert_eq!(p.lon, 180.0);
    }
}
