//! Weighted road network graph
//!
//! Built fresh from the full segment set on every call and never cached, so a
//! route always reflects the risk values stored at build time.
//!
//! Junction identity is exact: two endpoints intern to the same node only when
//! both coordinates are bit-identical. Endpoints that differ by floating-point
//! noise stay separate nodes (and `0.0` / `-0.0` are distinct).

use crate::mode::risk_weight;
use crate::segment::{Segment, SegmentId};
use convoy_core::Coordinate;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Dense node index, assigned in interning order
pub type NodeId = usize;

/// Edge attributes for one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Segment this edge represents
    pub segment_id: SegmentId,
    /// length + mode multiplier x danger score
    pub weight: f64,
    /// Raw segment length in meters
    pub raw_distance_m: f64,
    /// Raw danger score at build time
    pub raw_risk: f64,
}

/// Coordinate to node id table
#[derive(Debug, Default)]
struct NodeInterner {
    ids: HashMap<(u64, u64), NodeId>,
    coords: Vec<Coordinate>,
}

impl NodeInterner {
    fn key(c: &Coordinate) -> (u64, u64) {
        (c.lon.to_bits(), c.lat.to_bits())
    }

    fn intern(&mut self, c: Coordinate) -> NodeId {
        if let Some(id) = self.ids.get(&Self::key(&c)) {
            return *id;
        }
        let id = self.coords.len();
        self.ids.insert(Self::key(&c), id);
        self.coords.push(c);
        id
    }

    fn lookup(&self, c: &Coordinate) -> Option<NodeId> {
        self.ids.get(&Self::key(c)).copied()
    }
}

/// Undirected weighted road graph
#[derive(Debug)]
pub struct RoadGraph {
    interner: NodeInterner,
    adjacency: Vec<BTreeMap<NodeId, Edge>>,
    edge_count: usize,
    risk_weight: f64,
}

impl RoadGraph {
    /// Build a graph for `mode`; unrecognised modes use the balance multiplier.
    pub fn build(segments: &[Segment], mode: &str) -> Self {
        Self::with_risk_weight(segments, risk_weight(mode))
    }

    /// Build with an explicit non-negative risk multiplier.
    pub fn with_risk_weight(segments: &[Segment], multiplier: f64) -> Self {
        let multiplier = if multiplier.is_finite() { multiplier.max(0.0) } else { 0.0 };

        // Enumerate by id so node numbering does not depend on storage order
        let mut ordered: Vec<&Segment> = segments.iter().collect();
        ordered.sort_by_key(|s| s.id);

        let mut graph = Self {
            interner: NodeInterner::default(),
            adjacency: Vec::new(),
            edge_count: 0,
            risk_weight: multiplier,
        };

        for segment in ordered {
            let Some((start, end)) = segment.endpoints() else {
                warn!(segment_id = segment.id, "Skipping segment with degenerate geometry");
                continue;
            };
            let a = graph.intern(start);
            let b = graph.intern(end);
            if a == b {
                continue;
            }

            let danger = if segment.danger_score.is_nan() {
                0.0
            } else {
                segment.danger_score.clamp(0.0, 1.0)
            };
            let edge = Edge {
                segment_id: segment.id,
                weight: segment.length_m + multiplier * danger,
                raw_distance_m: segment.length_m,
                raw_risk: segment.danger_score,
            };
            graph.insert_edge(a, b, edge);
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count,
            risk_weight = multiplier,
            "Built road graph"
        );
        graph
    }

    fn intern(&mut self, c: Coordinate) -> NodeId {
        let id = self.interner.intern(c);
        if id == self.adjacency.len() {
            self.adjacency.push(BTreeMap::new());
        }
        id
    }

    // Parallel segments collapse to the cheapest; equal weights keep the lower id
    fn insert_edge(&mut self, a: NodeId, b: NodeId, edge: Edge) {
        let replace = match self.adjacency[a].get(&b) {
            None => {
                self.edge_count += 1;
                true
            }
            Some(existing) => {
                edge.weight < existing.weight
                    || (edge.weight == existing.weight && edge.segment_id < existing.segment_id)
            }
        };
        if replace {
            self.adjacency[a].insert(b, edge);
            self.adjacency[b].insert(a, edge);
        }
    }

    /// Number of junctions
    pub fn node_count(&self) -> usize {
        self.interner.coords.len()
    }

    /// Number of traversable edges
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// True when no segment contributed a node
    pub fn is_empty(&self) -> bool {
        self.interner.coords.is_empty()
    }

    /// Multiplier this graph was built with
    pub fn risk_weight(&self) -> f64 {
        self.risk_weight
    }

    /// Coordinate of a node
    pub fn node(&self, id: NodeId) -> Option<Coordinate> {
        self.interner.coords.get(id).copied()
    }

    /// Node at exactly this coordinate
    pub fn node_id(&self, c: &Coordinate) -> Option<NodeId> {
        self.interner.lookup(c)
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, Coordinate)> + '_ {
        self.interner.coords.iter().copied().enumerate()
    }

    /// Neighbours of `id` in ascending node order
    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Edge)> + '_ {
        self.adjacency
            .get(id)
            .into_iter()
            .flat_map(|adj| adj.iter().map(|(n, e)| (*n, e)))
    }

    /// Edge between two nodes
    pub fn edge(&self, a: NodeId, b: NodeId) -> Option<&Edge> {
        self.adjacency.get(a).and_then(|adj| adj.get(&b))
    }
}
