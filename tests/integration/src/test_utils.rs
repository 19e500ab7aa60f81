//! Shared fixtures for cross-crate scenarios

use convoy_core::Coordinate;
use convoy_fleet::ConvoyStore;
use convoy_network::{InMemorySegmentStore, NewSegment, RiskCategory, Segment, SegmentRepository};
use convoy_risk::{RiskAssessment, RiskScorer, SegmentFeatures};
use convoy_threat::{
    InMemoryAlertRepository, InMemoryThreatRepository, NewThreat, ResponseSettings,
    ThreatAwareFeatureSource, ThreatClassification, ThreatId, ThreatRepository, ThreatResponder,
    ThreatSource, VerificationStatus,
};
use std::sync::{Arc, Once};

/// Terrain tag that [`TaggedScorer`] scores as critical
pub const HOT: &str = "hot";

/// Junctions of the reference chain, 0.01 degrees apart on the equator
pub const A: Coordinate = Coordinate { lon: 0.00, lat: 0.0 };
pub const B: Coordinate = Coordinate { lon: 0.01, lat: 0.0 };
pub const C: Coordinate = Coordinate { lon: 0.02, lat: 0.0 };
pub const D: Coordinate = Coordinate { lon: 0.03, lat: 0.0 };
/// Bypass junction between B and C
pub const E: Coordinate = Coordinate { lon: 0.015, lat: 0.001 };

static LOGGING: Once = Once::new();

/// Install a test subscriber once per process; honours `RUST_LOG`.
pub fn init_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Scores `HOT` terrain at 0.95 and everything else at zero
pub struct TaggedScorer;

impl RiskScorer for TaggedScorer {
    fn score(&self, features: &SegmentFeatures) -> RiskAssessment {
        if features.terrain == HOT {
            RiskAssessment {
                category: RiskCategory::High,
                danger_score: 0.95,
            }
        } else {
            RiskAssessment {
                category: RiskCategory::Low,
                danger_score: 0.0,
            }
        }
    }

    fn strategy(&self) -> &'static str {
        "tagged"
    }
}

/// Straight road with a terrain tag
pub fn road(from: Coordinate, to: Coordinate, length_m: f64, terrain: &str) -> NewSegment {
    let mut segment = NewSegment::straight(from, to, length_m);
    segment.terrain = terrain.to_string();
    segment
}

/// A-B, B-C, C-D at 1000 m each; B-C tagged `HOT`
pub fn chain() -> Vec<NewSegment> {
    vec![
        road(A, B, 1000.0, "plain"),
        road(B, C, 1000.0, HOT),
        road(C, D, 1000.0, "plain"),
    ]
}

/// The chain plus a B-E-C bypass barely longer than B-C
pub fn chain_with_bypass() -> Vec<NewSegment> {
    let mut roads = chain();
    roads.push(road(B, E, 502.0, "plain"));
    roads.push(road(E, C, 502.0, "plain"));
    roads
}

/// Store seeded with `roads`; ids follow input order from 1
pub async fn seeded_store(roads: Vec<NewSegment>) -> Arc<InMemorySegmentStore> {
    let store = Arc::new(InMemorySegmentStore::new());
    for road in roads {
        store.insert(road).await.unwrap();
    }
    store
}

/// Segments with ids assigned from 1, for pure graph tests
pub fn segments(roads: Vec<NewSegment>) -> Vec<Segment> {
    roads
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.into_segment(i as u64 + 1))
        .collect()
}

/// Orchestrator wired to in-memory collaborators
pub struct Harness {
    pub segments: Arc<InMemorySegmentStore>,
    pub threats: Arc<InMemoryThreatRepository>,
    pub alerts: Arc<InMemoryAlertRepository>,
    pub convoys: Arc<ConvoyStore>,
    pub responder: Arc<ThreatResponder>,
}

impl Harness {
    /// Harness over `roads` scored by [`TaggedScorer`]
    pub async fn new(roads: Vec<NewSegment>) -> Self {
        init_logging();
        let segments = seeded_store(roads).await;
        let threats = Arc::new(InMemoryThreatRepository::new());
        let alerts = Arc::new(InMemoryAlertRepository::new());
        let convoys = Arc::new(ConvoyStore::new());
        let features = Arc::new(ThreatAwareFeatureSource::new(threats.clone(), 2_000.0, 24));

        let responder = Arc::new(ThreatResponder::new(
            threats.clone(),
            segments.clone(),
            segments.clone(),
            alerts.clone(),
            features,
            Arc::new(TaggedScorer),
            convoys.clone(),
            ResponseSettings::default(),
        ));

        Self {
            segments,
            threats,
            alerts,
            convoys,
            responder,
        }
    }

    /// Record a confirmed IED report at `at`
    pub async fn report_threat(&self, at: Coordinate) -> ThreatId {
        self.threats
            .create(NewThreat {
                location: at,
                classification: ThreatClassification::Ied,
                source: ThreatSource::Uav,
                status: VerificationStatus::Confirmed,
            })
            .await
            .unwrap()
            .id
    }
}
