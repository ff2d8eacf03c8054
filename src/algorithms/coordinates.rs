//! Relative-to-absolute coordinate conversion on a spherical Earth
//!
//! USBL fixes arrive as (east, north) offsets in meters from the acoustic
//! reference. These helpers turn them into geodetic positions with the
//! great-circle direct formula, and back again with the inverse (haversine)
//! formula, both on a sphere of radius [`EARTH_RADIUS_M`].

use crate::core::{GeoPoint, NavResult, NavigationError, RelativeFix, EARTH_RADIUS_M};
use log::debug;

/// Converts between relative offsets and geodetic coordinates
#[derive(Debug, Clone, Copy)]
pub struct CoordinateConverter {
    earth_radius_m: f64,
}

impl Default for CoordinateConverter {
    fn default() -> Self {
        Self { earth_radius_m: EARTH_RADIUS_M }
    }
}

impl CoordinateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn earth_radius_m(&self) -> f64 {
        self.earth_radius_m
    }

    /// Absolute position of a fix taken relative to `reference`.
    ///
    /// The result keeps `reference.depth`; the fix carries no depth.
    pub fn to_absolute(&self, reference: &GeoPoint, fix: &RelativeFix) -> NavResult<GeoPoint> {
        validate_point(reference)?;
        if !fix.x.is_finite() {
            return Err(NavigationError::non_finite("fix.x", fix.x));
        }
        if !fix.y.is_finite() {
            return Err(NavigationError::non_finite("fix.y", fix.y));
        }

        let distance = fix.offset().norm();
        if distance == 0.0 {
            return Ok(*reference);
        }

        // Clockwise from north: x is east, y is north
        let bearing = fix.x.atan2(fix.y);
        let result = self.destination(reference, distance, bearing);

        debug!(
            "Converted relative position ({:.2}m, {:.2}m) to lat/lon: {:.6}, {:.6}",
            fix.x, fix.y, result.latitude, result.longitude
        );
        Ok(result)
    }

    /// Offset of `point` from `reference`, inverse of [`Self::to_absolute`]
    pub fn to_relative(&self, reference: &GeoPoint, point: &GeoPoint) -> NavResult<RelativeFix> {
        validate_point(reference)?;
        validate_point(point)?;

        let distance = self.haversine(reference, point);
        if distance == 0.0 {
            return Ok(RelativeFix::new(0.0, 0.0));
        }
        let bearing = initial_bearing(reference, point);
        Ok(RelativeFix::new(distance * bearing.sin(), distance * bearing.cos()))
    }

    /// Great-circle distance between two points in meters, ignoring depth
    pub fn distance_m(&self, a: &GeoPoint, b: &GeoPoint) -> NavResult<f64> {
        validate_point(a)?;
        validate_point(b)?;
        Ok(self.haversine(a, b))
    }

    /// Initial bearing from `from` to `to` in degrees, 0..360 clockwise from north
    pub fn bearing_deg(&self, from: &GeoPoint, to: &GeoPoint) -> NavResult<f64> {
        validate_point(from)?;
        validate_point(to)?;
        Ok(initial_bearing(from, to).to_degrees().rem_euclid(360.0))
    }

    fn destination(&self, origin: &GeoPoint, distance: f64, bearing: f64) -> GeoPoint {
        let angular = distance / self.earth_radius_m;
        let lat1 = origin.latitude.to_radians();
        let lon1 = origin.longitude.to_radians();

        let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
        let lon2 = lon1
            + (bearing.sin() * angular.sin() * lat1.cos())
                .atan2(angular.cos() - lat1.sin() * lat2.sin());

        GeoPoint {
            latitude: lat2.to_degrees(),
            longitude: normalize_longitude(lon2.to_degrees()),
            depth: origin.depth,
        }
    }

    fn haversine(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        let lat1 = a.latitude.to_radians();
        let lat2 = b.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (b.longitude - a.longitude).to_radians();

        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * self.earth_radius_m * h.sqrt().atan2((1.0 - h).sqrt())
    }
}

fn initial_bearing(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x)
}

fn normalize_longitude(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

fn validate_point(point: &GeoPoint) -> NavResult<()> {
    if !point.latitude.is_finite() {
        return Err(NavigationError::non_finite("latitude", point.latitude));
    }
    if !point.longitude.is_finite() {
        return Err(NavigationError::non_finite("longitude", point.longitude));
    }
    if !point.depth.is_finite() {
        return Err(NavigationError::non_finite("depth", point.depth));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(GeoPoint::new(0.0, 0.0, 0.0))]
    #[case(GeoPoint::new(66.442387, 10.369335, 80.0))]
    #[case(GeoPoint::new(-33.8688, 151.2093, 12.5))]
    #[case(GeoPoint::new(89.9, -179.99, 3.0))]
    fn test_zero_offset_returns_reference(#[case] reference: GeoPoint) {
        let converter = CoordinateConverter::new();
        let result = converter
            .to_absolute(&reference, &RelativeFix::new(0.0, 0.0))
            .unwrap();
        assert_eq!(result, reference);
    }

    #[test]
    fn test_one_degree_north_at_equator() {
        let converter = CoordinateConverter::new();
        let reference = GeoPoint::new(0.0, 0.0, 0.0);
        let result = converter
            .to_absolute(&reference, &RelativeFix::new(0.0, 111_320.0))
            .unwrap();
        assert!((result.latitude - 1.0).abs() < 0.01, "lat = {}", result.latitude);
        assert!(result.longitude.abs() < 1e-9, "lon = {}", result.longitude);
    }

    #[test]
    fn test_east_offset_increases_longitude() {
        let converter = CoordinateConverter::new();
        let reference = GeoPoint::new(66.442387, 10.369335, 80.0);
        let result = converter
            .to_absolute(&reference, &RelativeFix::new(100.0, 0.0))
            .unwrap();
        assert!(result.longitude > reference.longitude);
        assert!((result.latitude - reference.latitude).abs() < 1e-5);
        assert_eq!(result.depth, 80.0);
    }

    #[rstest]
    #[case(12.5, -7.25)]
    #[case(-8.5, 8.54)]
    #[case(-350.0, 420.0)]
    #[case(999.0, 0.0)]
    #[case(0.0, -999.0)]
    fn test_round_trip_within_a_centimeter(#[case] x: f64, #[case] y: f64) {
        let converter = CoordinateConverter::new();
        let reference = GeoPoint::new(66.442387, 10.369335, 80.0);
        let absolute = converter.to_absolute(&reference, &RelativeFix::new(x, y)).unwrap();
        let back = converter.to_relative(&reference, &absolute).unwrap();
        assert!((back.x - x).abs() < 0.01, "x: {} vs {}", back.x, x);
        assert!((back.y - y).abs() < 0.01, "y: {} vs {}", back.y, y);
    }

    #[test]
    fn test_distance_matches_offset_length() {
        let converter = CoordinateConverter::new();
        let reference = GeoPoint::new(10.0, 20.0, 0.0);
        let absolute = converter
            .to_absolute(&reference, &RelativeFix::new(30.0, 40.0))
            .unwrap();
        let distance = converter.distance_m(&reference, &absolute).unwrap();
        assert!((distance - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_bearing_east() {
        let converter = CoordinateConverter::new();
        let a = GeoPoint::new(0.0, 0.0, 0.0);
        let b = GeoPoint::new(0.0, 0.001, 0.0);
        let bearing = converter.bearing_deg(&a, &b).unwrap();
        assert!((bearing - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let converter = CoordinateConverter::new();
        let reference = GeoPoint::new(0.0, 0.0, 0.0);

        let result = converter.to_absolute(&reference, &RelativeFix::new(f64::NAN, 1.0));
        assert!(matches!(result, Err(NavigationError::InvalidInput { .. })));

        let bad_reference = GeoPoint::new(f64::INFINITY, 0.0, 0.0);
        let result = converter.to_absolute(&bad_reference, &RelativeFix::new(1.0, 1.0));
        assert!(matches!(result, Err(NavigationError::InvalidInput { .. })));
    }

    #[test]
    fn test_longitude_wraps_across_antimeridian() {
        let converter = CoordinateConverter::new();
        let reference = GeoPoint::new(0.0, 179.9999, 0.0);
        let result = converter
            .to_absolute(&reference, &RelativeFix::new(1000.0, 0.0))
            .unwrap();
        assert!(result.longitude < -179.9 && result.longitude >= -180.0);
    }
}
