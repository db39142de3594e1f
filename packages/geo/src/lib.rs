#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geographic primitives for the immo-map system.
//!
//! Provides the WGS84 coordinate type, great-circle distance via the
//! haversine formula, and the rectangular over-approximation of a circular
//! search radius used by the storage-layer pre-filter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in meters used for all great-circle computations.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_000.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude, -90.0 to 90.0.
    pub latitude: f64,
    /// Longitude, -180.0 to 180.0.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate without validating its components.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and within WGS84 bounds.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A rectangular region in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern latitude boundary.
    pub south: f64,
    /// Northern latitude boundary.
    pub north: f64,
    /// Western longitude boundary.
    pub west: f64,
    /// Eastern longitude boundary.
    pub east: f64,
}

impl BoundingBox {
    /// Builds the rectangular over-approximation of the circle of
    /// `radius_m` meters around `center`.
    ///
    /// The latitude half-width uses the 111 km/degree approximation. The
    /// longitude half-width additionally divides by `cos(latitude)` so the
    /// box never under-covers the circle away from the equator; every point
    /// within `radius_m` of `center` falls inside the box.
    #[must_use]
    pub fn around(center: Coordinate, radius_m: f64) -> Self {
        let lat_delta = radius_m / METERS_PER_DEGREE;
        // cos() shrinks toward the poles; floor it so the division stays
        // bounded for any latitude the validation lets through.
        let cos_lat = center.latitude.to_radians().cos().max(0.01);
        let lng_delta = lat_delta / cos_lat;

        Self {
            south: center.latitude - lat_delta,
            north: center.latitude + lat_delta,
            west: center.longitude - lng_delta,
            east: center.longitude + lng_delta,
        }
    }

    /// Whether the point lies inside the box (inclusive).
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        (self.south..=self.north).contains(&point.latitude)
            && (self.west..=self.east).contains(&point.longitude)
    }
}

/// Error returned when a distance is requested for unusable coordinates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DistanceError {
    /// One of the inputs is NaN, infinite, or outside WGS84 bounds.
    #[error("invalid coordinate: latitude must be in [-90, 90], longitude in [-180, 180]")]
    InvalidCoordinate,
}

/// Computes the great-circle distance between two coordinates in meters
/// using the haversine formula with a fixed Earth radius of
/// [`EARTH_RADIUS_M`].
///
/// The inner square-root argument is clamped to `[0, 1]` so floating-point
/// rounding near zero or near the antipode cannot produce a domain error.
///
/// # Errors
///
/// Returns [`DistanceError::InvalidCoordinate`] if either input has a NaN,
/// infinite, or out-of-range component.
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> Result<f64, DistanceError> {
    if !a.is_valid() || !b.is_valid() {
        return Err(DistanceError::InvalidCoordinate);
    }

    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    Ok(2.0 * EARTH_RADIUS_M * h.sqrt().asin())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS_REPUBLIQUE: Coordinate = Coordinate::new(48.8673, 2.3632);
    const PARIS_BASTILLE: Coordinate = Coordinate::new(48.8532, 2.3692);

    #[test]
    fn distance_is_symmetric() {
        let ab = haversine_distance(PARIS_REPUBLIQUE, PARIS_BASTILLE).unwrap();
        let ba = haversine_distance(PARIS_BASTILLE, PARIS_REPUBLIQUE).unwrap();
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let d = haversine_distance(PARIS_REPUBLIQUE, PARIS_REPUBLIQUE).unwrap();
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn republique_to_bastille_is_about_1600m() {
        let d = haversine_distance(PARIS_REPUBLIQUE, PARIS_BASTILLE).unwrap();
        assert!((1500.0..1700.0).contains(&d), "got {d}");
    }

    #[test]
    fn antipodal_points_do_not_panic() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);
        let d = haversine_distance(a, b).unwrap();
        // Half the Earth's circumference.
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    #[test]
    fn rejects_nan_input() {
        let bad = Coordinate::new(f64::NAN, 2.0);
        assert_eq!(
            haversine_distance(bad, PARIS_REPUBLIQUE),
            Err(DistanceError::InvalidCoordinate)
        );
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let bad = Coordinate::new(91.0, 2.0);
        assert_eq!(
            haversine_distance(PARIS_REPUBLIQUE, bad),
            Err(DistanceError::InvalidCoordinate)
        );
    }

    #[test]
    fn bounding_box_covers_radius_circle() {
        // Sample the circle boundary; every point within the radius must be
        // inside the box, at any Île-de-France latitude.
        let radius = 10_000.0;
        let bbox = BoundingBox::around(PARIS_REPUBLIQUE, radius);

        for step in 0..360 {
            let bearing = f64::from(step).to_radians();
            // Walk ~radius meters along the bearing; membership in the
            // circle is decided by the exact distance, not the approximation.
            let lat = PARIS_REPUBLIQUE.latitude + (radius * bearing.cos()) / 111_000.0;
            let lng = PARIS_REPUBLIQUE.longitude
                + (radius * bearing.sin())
                    / (111_000.0 * PARIS_REPUBLIQUE.latitude.to_radians().cos());
            let point = Coordinate::new(lat, lng);

            let d = haversine_distance(PARIS_REPUBLIQUE, point).unwrap();
            if d <= radius {
                assert!(bbox.contains(point), "point at {d:.0}m escaped the box");
            }
        }
    }

    #[test]
    fn bounding_box_is_wider_in_longitude_away_from_equator() {
        let bbox = BoundingBox::around(PARIS_REPUBLIQUE, 1000.0);
        let lat_half = (bbox.north - bbox.south) / 2.0;
        let lng_half = (bbox.east - bbox.west) / 2.0;
        assert!(lng_half > lat_half);
    }
}
