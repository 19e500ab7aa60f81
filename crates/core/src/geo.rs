//! Geographic primitives
//!
//! Coordinates are WGS84 decimal degrees stored as `(lon, lat)`, matching the
//! order road geometries arrive in.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Geographic coordinate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Latitude in decimal degrees
    pub lat: f64,
}

impl Coordinate {
    /// Create a coordinate from longitude and latitude.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Reject non-finite or out-of-range coordinates.
    pub fn validate(&self) -> Result<()> {
        if !self.lon.is_finite() || !self.lat.is_finite() {
            return Err(Error::Validation(format!(
                "coordinate ({}, {}) is not finite",
                self.lon, self.lat
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::Validation(format!(
                "latitude {} outside [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(Error::Validation(format!(
                "longitude {} outside [-180, 180]",
                self.lon
            )));
        }
        Ok(())
    }

    /// Planar Euclidean distance in coordinate units.
    pub fn euclidean(&self, other: &Coordinate) -> f64 {
        ((self.lon - other.lon).powi(2) + (self.lat - other.lat).powi(2)).sqrt()
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

/// Great-circle distance in meters.
pub fn haversine_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Distance in meters from `point` to the line segment `a`-`b`.
///
/// Projects onto a local equirectangular plane centred on `point`, which is
/// accurate to well under a percent at the tens-of-kilometers scale the
/// impact and feature radii operate at.
pub fn distance_to_segment_m(point: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    let cos_lat = point.lat.to_radians().cos();
    let to_plane = |c: &Coordinate| {
        (
            (c.lon - point.lon).to_radians() * cos_lat * EARTH_RADIUS_M,
            (c.lat - point.lat).to_radians() * EARTH_RADIUS_M,
        )
    };

    let (ax, ay) = to_plane(a);
    let (bx, by) = to_plane(b);
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        return (ax * ax + ay * ay).sqrt();
    }

    // Point sits at the plane origin
    let t = (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (cx * cx + cy * cy).sqrt()
}

/// Shortest distance in meters from `point` to a polyline.
///
/// A single-vertex polyline measures to that vertex; an empty one is
/// infinitely far away.
pub fn distance_to_polyline_m(point: &Coordinate, polyline: &[Coordinate]) -> f64 {
    match polyline {
        [] => f64::INFINITY,
        [only] => haversine_m(point, only),
        _ => polyline
            .windows(2)
            .map(|pair| distance_to_segment_m(point, &pair[0], &pair[1]))
            .fold(f64::INFINITY, f64::min),
    }
}
