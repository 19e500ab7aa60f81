//! Road network model and risk-aware path search.
//!
//! This crate handles:
//! - Road segment records with a mutable risk pair
//! - Routing modes and their risk multipliers
//! - Building a weighted junction graph from the current segment set
//! - Nearest-node lookup and A* search over that graph
//! - Route planning with distance, fuel, and risk heatmap reporting
//! - Segment repository and proximity query interfaces
//!
//! # Example
//!
//! ```
//! use convoy_network::{NewSegment, RoutePlanner};
//! use convoy_core::Coordinate;
//!
//! let segments = vec![
//!     NewSegment::straight((0.0, 0.0).into(), (0.01, 0.0).into(), 1000.0).into_segment(1),
//!     NewSegment::straight((0.01, 0.0).into(), (0.02, 0.0).into(), 1000.0).into_segment(2),
//! ];
//! let plan = RoutePlanner::default()
//!     .plan(&segments, Coordinate::new(0.0, 0.0), Coordinate::new(0.02, 0.0), "balance")
//!     .unwrap();
//! assert_eq!(plan.segment_ids, vec![1, 2]);
//! ```

#![warn(missing_docs)]

pub mod graph;
pub mod mode;
pub mod route;
pub mod search;
pub mod segment;
pub mod store;

pub use graph::{Edge, NodeId, RoadGraph};
pub use mode::{risk_weight, RoutingMode, DEFAULT_RISK_WEIGHT};
pub use route::{HeatPoint, RoutePlan, RoutePlanner, DEFAULT_FUEL_LITERS_PER_KM};
pub use search::{find_path, nearest_node, path_details, path_segment_ids, PathDetails, SegmentDetail};
pub use segment::{NewSegment, RiskCategory, Segment, SegmentId};
pub use store::{InMemorySegmentStore, ProximityIndex, SegmentRepository};
