//! Route planning over the reference chain

use crate::test_utils::{chain, segments, A, B, C, D};
use convoy_core::{Coordinate, Error};
use convoy_network::{risk_weight, RoadGraph, RoutePlanner, RoutingMode};

#[test]
fn test_chain_route_distance_and_fuel() {
    let plan = RoutePlanner::default()
        .plan(&segments(chain()), A, D, "balance")
        .unwrap();

    assert_eq!(plan.mode, RoutingMode::Balance);
    assert_eq!(plan.segment_ids, vec![1, 2, 3]);
    assert_eq!(plan.path_geometry, vec![A, B, C, D]);
    assert!((plan.total_distance_km - 3.0).abs() < 1e-9);
    assert!((plan.estimated_fuel_liters - 0.6).abs() < 1e-9);
    assert_eq!(plan.risk_heatmap.len(), 3);
    assert!(plan.segments.iter().all(|s| s.risk_score == 0.0));
}

#[test]
fn test_off_network_endpoints_snap_to_nearest_junction() {
    let plan = RoutePlanner::default()
        .plan(
            &segments(chain()),
            Coordinate::new(-0.001, 0.0005),
            Coordinate::new(0.0205, -0.0005),
            "speed",
        )
        .unwrap();
    assert_eq!(plan.segment_ids, vec![1, 2]);
    assert_eq!(plan.path_geometry.first(), Some(&A));
    assert_eq!(plan.path_geometry.last(), Some(&C));
}

#[test]
fn test_disconnected_components_have_no_path() {
    let mut roads = segments(chain());
    // Island far from the chain
    roads.push(
        convoy_network::NewSegment::straight(
            Coordinate::new(1.0, 1.0),
            Coordinate::new(1.01, 1.0),
            1000.0,
        )
        .into_segment(9),
    );

    let err = RoutePlanner::default()
        .plan(&roads, A, Coordinate::new(1.01, 1.0), "balance")
        .unwrap_err();
    assert!(matches!(err, Error::NoPathFound));
}

#[test]
fn test_mode_weights() {
    let roads = segments(chain());
    assert_eq!(RoadGraph::build(&roads, "speed").risk_weight(), 5.0);
    assert_eq!(RoadGraph::build(&roads, "stealth").risk_weight(), 20.0);
    assert_eq!(risk_weight("bogus"), 10.0);
    assert_eq!(
        RoadGraph::build(&roads, "bogus").risk_weight(),
        RoadGraph::build(&roads, "balance").risk_weight()
    );
}

#[test]
fn test_planner_rejects_unknown_mode() {
    let err = RoutePlanner::default()
        .plan(&segments(chain()), A, D, "bogus")
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn test_stealth_pays_more_for_the_same_danger() {
    let mut roads = segments(chain());
    for road in &mut roads {
        road.danger_score = 0.5;
    }
    let weight = |mode: &str| {
        let graph = RoadGraph::build(&roads, mode);
        let a = graph.node_id(&A).unwrap();
        let b = graph.node_id(&B).unwrap();
        graph.edge(a, b).unwrap().weight
    };

    assert_eq!(weight("speed"), 1002.5);
    assert_eq!(weight("balance"), 1005.0);
    assert_eq!(weight("stealth"), 1010.0);
}
