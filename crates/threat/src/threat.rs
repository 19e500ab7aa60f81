//! Threat reports and their persistence
//!
//! Threats are immutable once recorded. They are only ever removed by an
//! administrative reset.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use convoy_core::{distance_to_polyline_m, Coordinate, Error, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Threat identifier
pub type ThreatId = u64;

/// Kind of reported threat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatClassification {
    /// Improvised explosive device
    #[serde(rename = "IED")]
    Ied,
    /// Ambush
    Ambush,
    /// Roadblock
    Roadblock,
    /// Sniper
    Sniper,
    /// Unclassified
    Unknown,
}

/// Reporting channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatSource {
    /// Signals intelligence
    #[serde(rename = "SIGINT")]
    Sigint,
    /// Drone observation
    #[serde(rename = "UAV")]
    Uav,
    /// Human intelligence
    #[serde(rename = "HUMINT")]
    Humint,
    /// Entered by an operator
    Manual,
}

/// Verification state of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    /// Verified
    Confirmed,
    /// Not yet verified
    Unconfirmed,
    /// Verified as spurious
    FalsePositive,
}

/// A recorded threat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    /// Threat identity
    pub id: ThreatId,
    /// Reported position
    pub location: Coordinate,
    /// Time the report was recorded
    pub timestamp: DateTime<Utc>,
    /// Kind of threat
    pub classification: ThreatClassification,
    /// Reporting channel
    pub source: ThreatSource,
    /// Verification state
    pub status: VerificationStatus,
}

/// Threat submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThreat {
    /// Reported position
    pub location: Coordinate,
    /// Kind of threat
    pub classification: ThreatClassification,
    /// Reporting channel
    pub source: ThreatSource,
    /// Verification state
    pub status: VerificationStatus,
}

impl NewThreat {
    /// Reject reports with an impossible location.
    pub fn validate(&self) -> Result<()> {
        self.location.validate()
    }
}

/// Optional filters for listing threats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatFilter {
    /// Only this verification state
    pub status: Option<VerificationStatus>,
    /// Only this kind
    pub classification: Option<ThreatClassification>,
}

impl ThreatFilter {
    /// Whether a threat passes the filter
    pub fn matches(&self, threat: &Threat) -> bool {
        self.status.map_or(true, |s| s == threat.status)
            && self
                .classification
                .map_or(true, |c| c == threat.classification)
    }
}

/// One density cell: `[lat, lon, weight]`
pub type HeatCell = [f64; 3];

/// Density heatmap cells, one per confirmed threat.
pub fn threat_density_heatmap(threats: &[Threat]) -> Vec<HeatCell> {
    threats
        .iter()
        .filter(|t| t.status == VerificationStatus::Confirmed)
        .map(|t| [t.location.lat, t.location.lon, 1.0])
        .collect()
}

/// Threat persistence
#[async_trait]
pub trait ThreatRepository: Send + Sync {
    /// Record a new threat and stamp it
    async fn create(&self, threat: NewThreat) -> Result<Threat>;

    /// One threat by id
    async fn get(&self, id: ThreatId) -> Result<Threat>;

    /// Threats passing the filter, newest first
    async fn list(&self, filter: ThreatFilter) -> Result<Vec<Threat>>;

    /// Threats within `radius_m` of a polyline recorded at or after `since`
    async fn count_near_since(
        &self,
        geometry: &[Coordinate],
        radius_m: f64,
        since: DateTime<Utc>,
    ) -> Result<u32>;

    /// Administrative reset
    async fn clear_all(&self) -> Result<usize>;
}

#[derive(Default)]
struct ThreatTable {
    threats: Vec<Threat>,
    next_id: ThreatId,
}

/// Process-local threat repository
#[derive(Default)]
pub struct InMemoryThreatRepository {
    table: RwLock<ThreatTable>,
}

impl InMemoryThreatRepository {
    /// Empty repository; ids start at 1
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThreatRepository for InMemoryThreatRepository {
    async fn create(&self, threat: NewThreat) -> Result<Threat> {
        threat.validate()?;
        let mut table = self.table.write().await;
        table.next_id += 1;
        let stored = Threat {
            id: table.next_id,
            location: threat.location,
            timestamp: Utc::now(),
            classification: threat.classification,
            source: threat.source,
            status: threat.status,
        };
        table.threats.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: ThreatId) -> Result<Threat> {
        self.table
            .read()
            .await
            .threats
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("threat", id))
    }

    async fn list(&self, filter: ThreatFilter) -> Result<Vec<Threat>> {
        let table = self.table.read().await;
        Ok(table
            .threats
            .iter()
            .rev()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn count_near_since(
        &self,
        geometry: &[Coordinate],
        radius_m: f64,
        since: DateTime<Utc>,
    ) -> Result<u32> {
        let table = self.table.read().await;
        let count = table
            .threats
            .iter()
            .filter(|t| t.timestamp >= since)
            .filter(|t| distance_to_polyline_m(&t.location, geometry) <= radius_m)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn clear_all(&self) -> Result<usize> {
        let mut table = self.table.write().await;
        let cleared = table.threats.len();
        table.threats.clear();
        Ok(cleared)
    }
}
