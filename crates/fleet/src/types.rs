//! Active convoy state

use chrono::{DateTime, Utc};
use convoy_core::Coordinate;
use convoy_network::SegmentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Convoy identifier
pub type ConvoyId = Uuid;

/// Default cruising speed
pub const DEFAULT_SPEED_KMPH: f64 = 60.0;

/// Lifecycle status of a convoy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConvoyStatus {
    /// Following its assigned path
    #[default]
    #[serde(rename = "En Route")]
    EnRoute,
    /// Path was just replaced after a risk change
    Rerouting,
    /// Stopped by operator command
    Halted,
    /// Mission finished
    Completed,
}

impl ConvoyStatus {
    /// Display label
    pub fn as_str(&self) -> &'static str {
        match self {
            ConvoyStatus::EnRoute => "En Route",
            ConvoyStatus::Rerouting => "Rerouting",
            ConvoyStatus::Halted => "Halted",
            ConvoyStatus::Completed => "Completed",
        }
    }

    /// Whether the movement tick advances a convoy in this status
    pub fn is_moving(&self) -> bool {
        matches!(self, ConvoyStatus::EnRoute | ConvoyStatus::Rerouting)
    }
}

impl fmt::Display for ConvoyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Onboard sensor snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorState {
    /// Thermal imaging state
    pub thermal: String,
    /// Communications link state
    pub comms: String,
    /// Environmental conditions
    pub environment: String,
}

impl Default for SensorState {
    fn default() -> Self {
        Self {
            thermal: "Nominal".to_string(),
            comms: "Online".to_string(),
            environment: "Clear".to_string(),
        }
    }
}

/// An in-progress mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveConvoy {
    /// Convoy identity
    pub id: ConvoyId,
    /// Operator-facing call sign
    pub call_sign: String,
    /// Mission start
    pub start_time: DateTime<Utc>,
    /// Last known position
    pub current_location: Coordinate,
    /// Mission destination
    pub destination: Coordinate,
    /// Remaining segments, next segment first
    pub current_path: Vec<SegmentId>,
    /// Cruising speed
    pub speed_kmph: f64,
    /// Estimated arrival, absent until the first movement tick
    pub eta: Option<DateTime<Utc>>,
    /// Stamped on every committed mutation
    pub last_update_time: DateTime<Utc>,
    /// Sensor snapshot
    pub sensors: SensorState,
    /// Lifecycle status
    pub status: ConvoyStatus,
    /// Distance covered so far
    pub distance_travelled_km: f64,
    /// Segments already driven, in order
    pub traversed_segments: Vec<SegmentId>,
    /// Alerts raised on segments of this convoy's path
    pub alerts_triggered: u32,
}

impl ActiveConvoy {
    /// Fresh convoy at the start of its path
    pub fn new(
        call_sign: impl Into<String>,
        path: Vec<SegmentId>,
        start: Coordinate,
        destination: Coordinate,
        speed_kmph: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            call_sign: call_sign.into(),
            start_time: now,
            current_location: start,
            destination,
            current_path: path,
            speed_kmph,
            eta: None,
            last_update_time: now,
            sensors: SensorState::default(),
            status: ConvoyStatus::EnRoute,
            distance_travelled_km: 0.0,
            traversed_segments: Vec::new(),
            alerts_triggered: 0,
        }
    }

    /// Whether the remaining path uses any of the given segments
    pub fn path_touches(&self, segments: &[SegmentId]) -> bool {
        self.current_path.iter().any(|s| segments.contains(s))
    }
}

/// Partial update merged into a convoy; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvoyPatch {
    /// New position
    pub current_location: Option<Coordinate>,
    /// New destination
    pub destination: Option<Coordinate>,
    /// Replacement path
    pub current_path: Option<Vec<SegmentId>>,
    /// New speed
    pub speed_kmph: Option<f64>,
    /// New arrival estimate
    pub eta: Option<DateTime<Utc>>,
    /// New sensor snapshot
    pub sensors: Option<SensorState>,
    /// New status
    pub status: Option<ConvoyStatus>,
    /// New distance total
    pub distance_travelled_km: Option<f64>,
}

impl ConvoyPatch {
    /// Patch that only sets status
    pub fn status(status: ConvoyStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Patch that replaces the path and sets status
    pub fn reroute(path: Vec<SegmentId>) -> Self {
        Self {
            current_path: Some(path),
            status: Some(ConvoyStatus::Rerouting),
            ..Default::default()
        }
    }

    /// Merge set fields into `convoy`
    pub fn apply(self, convoy: &mut ActiveConvoy) {
        if let Some(v) = self.current_location {
            convoy.current_location = v;
        }
        if let Some(v) = self.destination {
            convoy.destination = v;
        }
        if let Some(v) = self.current_path {
            convoy.current_path = v;
        }
        if let Some(v) = self.speed_kmph {
            convoy.speed_kmph = v;
        }
        if let Some(v) = self.eta {
            convoy.eta = Some(v);
        }
        if let Some(v) = self.sensors {
            convoy.sensors = v;
        }
        if let Some(v) = self.status {
            convoy.status = v;
        }
        if let Some(v) = self.distance_travelled_km {
            convoy.distance_travelled_km = v;
        }
    }
}
