//! Threat intake and response.
//!
//! This crate handles:
//! - Threat and alert records with their repository interfaces
//! - Feature lookup for risk scoring
//! - The threat response pipeline (rescore, alert, reroute)
//! - The work queue that runs that pipeline off the request path

#![warn(missing_docs)]

pub mod alert;
pub mod features;
pub mod locks;
pub mod pipeline;
pub mod queue;
pub mod threat;

pub use alert::{
    Alert, AlertId, AlertRepository, AlertSeverity, AlertStatus, InMemoryAlertRepository, NewAlert,
};
pub use features::{FeatureSource, ThreatAwareFeatureSource};
pub use locks::SegmentLocks;
pub use pipeline::{
    ResponseSettings, SegmentRiskUpdate, ThreatHandler, ThreatResponder, ThreatResponseReport,
};
pub use queue::{JobId, JobRecord, JobState, JobTracker, QueueError, QueueMetrics, ThreatWorkQueue};
pub use threat::{
    threat_density_heatmap, HeatCell, InMemoryThreatRepository, NewThreat, Threat,
    ThreatClassification, ThreatFilter, ThreatId, ThreatRepository, ThreatSource,
    VerificationStatus,
};
