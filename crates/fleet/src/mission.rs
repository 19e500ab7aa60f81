//! Historical records of finished missions

use crate::types::{ActiveConvoy, ConvoyId, ConvoyStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use convoy_core::{Error, Result};
use convoy_network::SegmentId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// Mission record identifier
pub type MissionId = u64;

/// A convoy after it left the active registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedMission {
    /// Record identity
    pub id: MissionId,
    /// Convoy the record was taken from
    pub convoy_id: ConvoyId,
    /// Call sign at completion
    pub call_sign: String,
    /// Mission start
    pub start_time: DateTime<Utc>,
    /// Time the record was taken
    pub end_time: DateTime<Utc>,
    /// Distance covered
    pub total_distance_km: f64,
    /// Status at completion
    pub final_status: ConvoyStatus,
    /// Segments actually driven
    pub route_taken: Vec<SegmentId>,
    /// Alerts raised along the way
    pub alerts_triggered: u32,
}

/// Mission history persistence
#[async_trait]
pub trait MissionArchive: Send + Sync {
    /// Record a convoy's final state
    async fn record(&self, convoy: &ActiveConvoy) -> Result<CompletedMission>;

    /// Every record, oldest first
    async fn list(&self) -> Result<Vec<CompletedMission>>;

    /// One record
    async fn get(&self, id: MissionId) -> Result<CompletedMission>;
}

/// Process-local mission archive
#[derive(Default)]
pub struct InMemoryMissionArchive {
    records: RwLock<Vec<CompletedMission>>,
}

impl InMemoryMissionArchive {
    /// Empty archive
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MissionArchive for InMemoryMissionArchive {
    async fn record(&self, convoy: &ActiveConvoy) -> Result<CompletedMission> {
        let mut records = self.records.write().await;
        let mission = CompletedMission {
            id: records.len() as MissionId + 1,
            convoy_id: convoy.id,
            call_sign: convoy.call_sign.clone(),
            start_time: convoy.start_time,
            end_time: Utc::now(),
            total_distance_km: convoy.distance_travelled_km,
            final_status: convoy.status,
            route_taken: convoy.traversed_segments.clone(),
            alerts_triggered: convoy.alerts_triggered,
        };
        records.push(mission.clone());

        info!(
            mission_id = mission.id,
            convoy_id = %mission.convoy_id,
            distance_km = mission.total_distance_km,
            "Mission archived"
        );
        Ok(mission)
    }

    async fn list(&self) -> Result<Vec<CompletedMission>> {
        Ok(self.records.read().await.clone())
    }

    async fn get(&self, id: MissionId) -> Result<CompletedMission> {
        self.records
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("mission", id))
    }
}
