//! Feature lookup for risk scoring

use crate::threat::ThreatRepository;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use convoy_core::Result;
use convoy_network::Segment;
use convoy_risk::SegmentFeatures;
use std::sync::Arc;

/// Segment to scoring features
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Feature record for one segment
    async fn features(&self, segment: &Segment) -> Result<SegmentFeatures>;
}

/// Static segment attributes plus a live count of recent nearby threats
pub struct ThreatAwareFeatureSource {
    threats: Arc<dyn ThreatRepository>,
    radius_m: f64,
    window: Duration,
}

impl ThreatAwareFeatureSource {
    /// Count threats within `radius_m` over the last `window_hours`
    pub fn new(threats: Arc<dyn ThreatRepository>, radius_m: f64, window_hours: i64) -> Self {
        Self {
            threats,
            radius_m,
            window: Duration::hours(window_hours),
        }
    }
}

#[async_trait]
impl FeatureSource for ThreatAwareFeatureSource {
    async fn features(&self, segment: &Segment) -> Result<SegmentFeatures> {
        let since = Utc::now() - self.window;
        let nearby = self
            .threats
            .count_near_since(&segment.geometry, self.radius_m, since)
            .await?;
        Ok(SegmentFeatures::from_segment(segment, nearby))
    }
}
