//! Feature records fed to the risk scorer

use convoy_network::Segment;
use serde::{Deserialize, Serialize};

/// Feature name for the recent nearby threat count
pub const THREAT_COUNT_FEATURE: &str = "threats_within_2km_last_24h";
/// Feature name for elevation
pub const ELEVATION_FEATURE: &str = "elevation";

/// Scoring inputs for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFeatures {
    /// Terrain type
    pub terrain: String,
    /// Road classification
    pub road_class: String,
    /// Elevation in meters
    pub elevation_m: f64,
    /// Threats reported near the segment within the feature window
    pub threats_within_2km_last_24h: u32,
}

impl SegmentFeatures {
    /// Static segment attributes plus the live threat count.
    pub fn from_segment(segment: &Segment, nearby_threats: u32) -> Self {
        Self {
            terrain: segment.terrain.clone(),
            road_class: segment.road_class.clone(),
            elevation_m: segment.elevation_m,
            threats_within_2km_last_24h: nearby_threats,
        }
    }

    /// Numeric value of a named feature.
    ///
    /// Categorical attributes are one-hot: `terrain=mountain` is 1.0 for a
    /// mountain segment and 0.0 otherwise. Unknown names read as 0.0.
    pub fn value(&self, name: &str) -> f64 {
        match name {
            THREAT_COUNT_FEATURE => f64::from(self.threats_within_2km_last_24h),
            ELEVATION_FEATURE => self.elevation_m,
            _ => {
                let hot = match name.split_once('=') {
                    Some(("terrain", v)) => v == self.terrain,
                    Some(("road_class", v)) => v == self.road_class,
                    _ => false,
                };
                if hot {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Feature vector in the given order.
    pub fn vector(&self, names: &[String]) -> Vec<f64> {
        names.iter().map(|n| self.value(n)).collect()
    }
}
