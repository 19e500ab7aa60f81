//! Path search over a built road graph
//!
//! A* with straight-line coordinate distance as the heuristic. Every edge
//! weighs at least its raw length, and a road is never shorter than the
//! straight line between its endpoints, so the heuristic never overestimates
//! and the first time the goal is popped its cost is optimal.

use crate::graph::{NodeId, RoadGraph};
use crate::segment::SegmentId;
use convoy_core::{Coordinate, Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Per-segment breakdown of a traversed path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDetail {
    /// Traversed segment
    pub segment_id: SegmentId,
    /// Segment length in kilometers
    pub distance_km: f64,
    /// Danger score at graph build time
    pub risk_score: f64,
}

/// Path walk result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDetails {
    /// One record per traversed segment, in path order
    pub segments: Vec<SegmentDetail>,
    /// Sum of raw segment lengths in meters
    pub total_distance_m: f64,
}

/// Node closest to `point` by Euclidean coordinate distance.
///
/// Ties go to the lowest node id, i.e. the junction interned first when
/// segments are enumerated by ascending id.
pub fn nearest_node(graph: &RoadGraph, point: &Coordinate) -> Option<NodeId> {
    let mut best: Option<(NodeId, f64)> = None;
    for (id, coord) in graph.nodes() {
        let d = coord.euclidean(point);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((id, d)),
        }
    }
    best.map(|(id, _)| id)
}

#[derive(Debug, Clone, Copy)]
struct Frontier {
    f_score: f64,
    node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    // Reversed for a min-heap; equal scores pop the lower node id first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Cheapest node path from `start` to `end`, or `None` when they are
/// disconnected or either is absent.
pub fn find_path(graph: &RoadGraph, start: NodeId, end: NodeId) -> Option<Vec<NodeId>> {
    let goal = graph.node(end)?;
    graph.node(start)?;

    if start == end {
        return Some(vec![start]);
    }

    let n = graph.node_count();
    let mut g_score = vec![f64::INFINITY; n];
    let mut came_from: Vec<Option<NodeId>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut open = BinaryHeap::new();

    let heuristic = |id: NodeId| graph.node(id).map(|c| c.euclidean(&goal)).unwrap_or(0.0);

    g_score[start] = 0.0;
    open.push(Frontier {
        f_score: heuristic(start),
        node: start,
    });

    while let Some(Frontier { node, .. }) = open.pop() {
        if closed[node] {
            continue;
        }
        if node == end {
            return Some(reconstruct(&came_from, end));
        }
        closed[node] = true;

        for (neighbor, edge) in graph.neighbors(node) {
            if closed[neighbor] {
                continue;
            }
            let tentative = g_score[node] + edge.weight;
            if tentative < g_score[neighbor] {
                g_score[neighbor] = tentative;
                came_from[neighbor] = Some(node);
                open.push(Frontier {
                    f_score: tentative + heuristic(neighbor),
                    node: neighbor,
                });
            }
        }
    }

    None
}

fn reconstruct(came_from: &[Option<NodeId>], end: NodeId) -> Vec<NodeId> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(prev) = came_from[current] {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Walk consecutive node pairs, accumulating raw distance.
pub fn path_details(graph: &RoadGraph, path: &[NodeId]) -> Result<PathDetails> {
    let mut segments = Vec::with_capacity(path.len().saturating_sub(1));
    let mut total_distance_m = 0.0;

    for pair in path.windows(2) {
        let edge = graph.edge(pair[0], pair[1]).ok_or_else(|| not_adjacent(pair))?;
        total_distance_m += edge.raw_distance_m;
        segments.push(SegmentDetail {
            segment_id: edge.segment_id,
            distance_km: edge.raw_distance_m / 1000.0,
            risk_score: edge.raw_risk,
        });
    }

    Ok(PathDetails {
        segments,
        total_distance_m,
    })
}

/// Project a node path to its ordered segment ids.
pub fn path_segment_ids(graph: &RoadGraph, path: &[NodeId]) -> Result<Vec<SegmentId>> {
    path.windows(2)
        .map(|pair| {
            graph
                .edge(pair[0], pair[1])
                .map(|e| e.segment_id)
                .ok_or_else(|| not_adjacent(pair))
        })
        .collect()
}

fn not_adjacent(pair: &[NodeId]) -> Error {
    Error::Validation(format!("nodes {} and {} are not adjacent", pair[0], pair[1]))
}
