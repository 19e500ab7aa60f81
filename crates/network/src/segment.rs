//! Road segment records
//!
//! A segment is one fixed-length stretch of road. Geometry, length, and terrain
//! attributes never change after load; only the risk pair is rewritten, and
//! only by the threat response pipeline.

use convoy_core::{Coordinate, Error, Result};
use serde::{Deserialize, Serialize};

/// Segment identifier
pub type SegmentId = u64;

/// Categorical risk derived from the danger score
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RiskCategory {
    /// Low risk
    #[default]
    Low,
    /// Medium risk
    Medium,
    /// High risk
    High,
}

impl RiskCategory {
    /// Categories in classifier output order
    pub const ALL: [RiskCategory; 3] = [RiskCategory::Low, RiskCategory::Medium, RiskCategory::High];

    /// Display name
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored road segment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Segment identifier
    pub id: SegmentId,
    /// Polyline, first and last points are the junction endpoints
    pub geometry: Vec<Coordinate>,
    /// Length in meters
    pub length_m: f64,
    /// Terrain type (e.g. "mountain", "urban")
    pub terrain: String,
    /// Road classification (e.g. "primary", "track")
    pub road_class: String,
    /// Elevation in meters
    pub elevation_m: f64,
    /// Current danger score in [0, 1]
    pub danger_score: f64,
    /// Category matching `danger_score`
    pub risk_category: RiskCategory,
}

impl Segment {
    /// Junction endpoints, `None` for a degenerate polyline.
    pub fn endpoints(&self) -> Option<(Coordinate, Coordinate)> {
        match (self.geometry.first(), self.geometry.last()) {
            (Some(a), Some(b)) if self.geometry.len() >= 2 => Some((*a, *b)),
            _ => None,
        }
    }
}

/// Segment record before an identifier is assigned
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSegment {
    /// Polyline
    pub geometry: Vec<Coordinate>,
    /// Length in meters
    pub length_m: f64,
    /// Terrain type
    #[serde(default)]
    pub terrain: String,
    /// Road classification
    #[serde(default)]
    pub road_class: String,
    /// Elevation in meters
    #[serde(default)]
    pub elevation_m: f64,
}

impl NewSegment {
    /// Straight two-point segment with blank attributes.
    pub fn straight(start: Coordinate, end: Coordinate, length_m: f64) -> Self {
        Self {
            geometry: vec![start, end],
            length_m,
            terrain: String::new(),
            road_class: String::new(),
            elevation_m: 0.0,
        }
    }

    /// Check geometry and length before the record is stored.
    pub fn validate(&self) -> Result<()> {
        if self.geometry.len() < 2 {
            return Err(Error::Validation(
                "segment geometry needs at least two points".into(),
            ));
        }
        for point in &self.geometry {
            point.validate()?;
        }
        if !(self.length_m.is_finite() && self.length_m >= 0.0) {
            return Err(Error::Validation(format!(
                "segment length {} must be finite and non-negative",
                self.length_m
            )));
        }
        Ok(())
    }

    /// Attach an identifier, starting at zero risk.
    pub fn into_segment(self, id: SegmentId) -> Segment {
        Segment {
            id,
            geometry: self.geometry,
            length_m: self.length_m,
            terrain: self.terrain,
            road_class: self.road_class,
            elevation_m: self.elevation_m,
            danger_score: 0.0,
            risk_category: RiskCategory::Low,
        }
    }
}
