//! Segment persistence and proximity query interfaces
//!
//! Durable storage lives outside this workspace; these traits are the seam.
//! [`InMemorySegmentStore`] backs both for tests, demos, and single-node runs.

use crate::segment::{NewSegment, RiskCategory, Segment, SegmentId};
use async_trait::async_trait;
use convoy_core::{distance_to_polyline_m, Coordinate, Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;

/// Segment persistence
#[async_trait]
pub trait SegmentRepository: Send + Sync {
    /// Every stored segment
    async fn all_segments(&self) -> Result<Vec<Segment>>;

    /// One segment by id
    async fn segment(&self, id: SegmentId) -> Result<Option<Segment>>;

    /// Store a new segment and assign its id
    async fn insert(&self, segment: NewSegment) -> Result<Segment>;

    /// Overwrite a segment's risk pair
    async fn update_risk(&self, id: SegmentId, category: RiskCategory, score: f64) -> Result<()>;

    /// Return every segment to zero danger, category Low
    async fn reset_risk(&self) -> Result<()>;
}

/// Geospatial proximity query
#[async_trait]
pub trait ProximityIndex: Send + Sync {
    /// Segments whose polyline passes within `radius_m` of `point`
    async fn segments_near(&self, point: Coordinate, radius_m: f64) -> Result<Vec<Segment>>;
}

/// In-process segment store
#[derive(Debug, Default)]
pub struct InMemorySegmentStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    segments: BTreeMap<SegmentId, Segment>,
    next_id: SegmentId,
}

impl InMemorySegmentStore {
    /// Empty store; ids start at 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `NewSegment` records from a JSON array file.
    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let records: Vec<NewSegment> = serde_json::from_str(&raw)?;
        let store = Self::new();
        for record in records {
            store.insert(record).await?;
        }
        info!(
            path = %path.as_ref().display(),
            segments = store.len().await,
            "Loaded road segments"
        );
        Ok(store)
    }

    /// Number of stored segments
    pub async fn len(&self) -> usize {
        self.inner.read().await.segments.len()
    }

    /// True when no segment is stored
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.segments.is_empty()
    }
}

fn within(segment: &Segment, point: &Coordinate, radius_m: f64) -> bool {
    distance_to_polyline_m(point, &segment.geometry) <= radius_m
}

#[async_trait]
impl SegmentRepository for InMemorySegmentStore {
    async fn all_segments(&self) -> Result<Vec<Segment>> {
        Ok(self.inner.read().await.segments.values().cloned().collect())
    }

    async fn segment(&self, id: SegmentId) -> Result<Option<Segment>> {
        Ok(self.inner.read().await.segments.get(&id).cloned())
    }

    async fn insert(&self, segment: NewSegment) -> Result<Segment> {
        segment.validate()?;
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let stored = segment.into_segment(inner.next_id);
        inner.segments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_risk(&self, id: SegmentId, category: RiskCategory, score: f64) -> Result<()> {
        let mut inner = self.inner.write().await;
        let segment = inner
            .segments
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("segment", id))?;
        segment.risk_category = category;
        segment.danger_score = score;
        Ok(())
    }

    async fn reset_risk(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        for segment in inner.segments.values_mut() {
            segment.danger_score = 0.0;
            segment.risk_category = RiskCategory::Low;
        }
        Ok(())
    }
}

#[async_trait]
impl ProximityIndex for InMemorySegmentStore {
    async fn segments_near(&self, point: Coordinate, radius_m: f64) -> Result<Vec<Segment>> {
        point.validate()?;
        Ok(self
            .inner
            .read()
            .await
            .segments
            .values()
            .filter(|s| within(s, &point, radius_m))
            .cloned()
            .collect())
    }
}
