//! Route planning: the compute-route operation end to end.

use crate::graph::RoadGraph;
use crate::mode::RoutingMode;
use crate::search::{find_path, nearest_node, path_details, path_segment_ids, SegmentDetail};
use crate::segment::{Segment, SegmentId};
use convoy_core::{Coordinate, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default fuel burn (liters per kilometer)
pub const DEFAULT_FUEL_LITERS_PER_KM: f64 = 0.2;

/// One risk heatmap sample: a path node paired with the segment leaving it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    /// Longitude of the node
    pub lon: f64,
    /// Latitude of the node
    pub lat: f64,
    /// Danger score of the segment leaving the node
    pub risk: f64,
}

/// Computed route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    /// Mode the route was weighted for
    pub mode: RoutingMode,
    /// Junction coordinates in travel order
    pub path_geometry: Vec<Coordinate>,
    /// Traversed segment ids in travel order
    pub segment_ids: Vec<SegmentId>,
    /// Total raw distance in kilometers
    pub total_distance_km: f64,
    /// Fuel estimate in liters
    pub estimated_fuel_liters: f64,
    /// Per-segment detail
    pub segments: Vec<SegmentDetail>,
    /// Risk heatmap samples
    pub risk_heatmap: Vec<HeatPoint>,
}

/// Risk-aware route planner
#[derive(Debug, Clone)]
pub struct RoutePlanner {
    fuel_liters_per_km: f64,
}

impl RoutePlanner {
    /// Create a planner with a fuel burn rate
    pub fn new(fuel_liters_per_km: f64) -> Self {
        Self { fuel_liters_per_km }
    }

    /// Plan a route between two coordinates.
    ///
    /// The mode is validated strictly before any graph work; an unconnected
    /// pair of endpoints is reported as [`Error::NoPathFound`].
    pub fn plan(
        &self,
        segments: &[Segment],
        start: Coordinate,
        end: Coordinate,
        mode: &str,
    ) -> Result<RoutePlan> {
        let mode: RoutingMode = mode.parse()?;
        start.validate()?;
        end.validate()?;

        let graph = RoadGraph::build(segments, mode.as_str());
        let (Some(start_node), Some(end_node)) =
            (nearest_node(&graph, &start), nearest_node(&graph, &end))
        else {
            debug!("Route requested over an empty network");
            return Err(Error::NoPathFound);
        };

        let path = find_path(&graph, start_node, end_node).ok_or(Error::NoPathFound)?;
        let details = path_details(&graph, &path)?;
        let segment_ids = path_segment_ids(&graph, &path)?;

        let path_geometry: Vec<Coordinate> = path.iter().filter_map(|n| graph.node(*n)).collect();
        let risk_heatmap = path_geometry
            .iter()
            .zip(&details.segments)
            .map(|(c, s)| HeatPoint {
                lon: c.lon,
                lat: c.lat,
                risk: s.risk_score,
            })
            .collect();

        let total_distance_km = details.total_distance_m / 1000.0;
        info!(
            mode = %mode,
            segments = segment_ids.len(),
            total_distance_km,
            "Computed route"
        );

        Ok(RoutePlan {
            mode,
            path_geometry,
            segment_ids,
            total_distance_km,
            estimated_fuel_liters: total_distance_km * self.fuel_liters_per_km,
            segments: details.segments,
            risk_heatmap,
        })
    }
}

impl Default for RoutePlanner {
    fn default() -> Self {
        Self::new(DEFAULT_FUEL_LITERS_PER_KM)
    }
}
