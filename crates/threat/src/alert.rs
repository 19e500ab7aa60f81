//! Operator alerts raised by risk recomputation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use convoy_core::{Error, Result};
use convoy_network::SegmentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::RwLock;

/// Alert identifier
pub type AlertId = u64;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertSeverity {
    /// Score at or above the high threshold
    High,
    /// Score at or above the critical threshold
    Critical,
}

impl AlertSeverity {
    /// Severity for a danger score, or `None` below the high threshold.
    pub fn classify(danger_score: f64, high: f64, critical: f64) -> Option<Self> {
        if danger_score >= critical {
            Some(AlertSeverity::Critical)
        } else if danger_score >= high {
            Some(AlertSeverity::High)
        } else {
            None
        }
    }

    /// Upper-case label used in messages
    pub fn label(&self) -> &'static str {
        match self {
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Alert lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertStatus {
    /// Awaiting operator attention
    Active,
    /// Seen by an operator
    Acknowledged,
}

/// A recorded alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert identity
    pub id: AlertId,
    /// Segment whose risk crossed a threshold
    pub segment_id: SegmentId,
    /// Severity
    pub severity: AlertSeverity,
    /// Operator-facing text
    pub message: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Lifecycle status
    pub status: AlertStatus,
}

/// Alert to be recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    /// Segment whose risk crossed a threshold
    pub segment_id: SegmentId,
    /// Severity
    pub severity: AlertSeverity,
    /// Operator-facing text
    pub message: String,
}

impl NewAlert {
    /// Standard threshold-crossing alert for a segment.
    pub fn threshold_crossed(segment_id: SegmentId, severity: AlertSeverity, danger_score: f64) -> Self {
        Self {
            segment_id,
            severity,
            message: format!(
                "{} risk ({:.2}) on segment {} due to new threat.",
                severity.label(),
                danger_score,
                segment_id
            ),
        }
    }
}

/// Alert persistence
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Record a new Active alert
    async fn create(&self, alert: NewAlert) -> Result<Alert>;

    /// One alert by id
    async fn get(&self, id: AlertId) -> Result<Alert>;

    /// Alerts in a status, newest first
    async fn list_by_status(&self, status: AlertStatus) -> Result<Vec<Alert>>;

    /// Number of alerts in a status
    async fn count_by_status(&self, status: AlertStatus) -> Result<usize>;

    /// Mark acknowledged; acknowledging twice is a no-op
    async fn acknowledge(&self, id: AlertId) -> Result<Alert>;

    /// Administrative reset
    async fn clear_all(&self) -> Result<usize>;
}

#[derive(Default)]
struct AlertTable {
    alerts: Vec<Alert>,
    next_id: AlertId,
}

/// Process-local alert repository
#[derive(Default)]
pub struct InMemoryAlertRepository {
    table: RwLock<AlertTable>,
}

impl InMemoryAlertRepository {
    /// Empty repository; ids start at 1
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn create(&self, alert: NewAlert) -> Result<Alert> {
        let mut table = self.table.write().await;
        table.next_id += 1;
        let stored = Alert {
            id: table.next_id,
            segment_id: alert.segment_id,
            severity: alert.severity,
            message: alert.message,
            timestamp: Utc::now(),
            status: AlertStatus::Active,
        };
        table.alerts.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: AlertId) -> Result<Alert> {
        self.table
            .read()
            .await
            .alerts
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("alert", id))
    }

    async fn list_by_status(&self, status: AlertStatus) -> Result<Vec<Alert>> {
        let table = self.table.read().await;
        Ok(table
            .alerts
            .iter()
            .rev()
            .filter(|a| a.status == status)
            .cloned()
            .collect())
    }

    async fn count_by_status(&self, status: AlertStatus) -> Result<usize> {
        let table = self.table.read().await;
        Ok(table.alerts.iter().filter(|a| a.status == status).count())
    }

    async fn acknowledge(&self, id: AlertId) -> Result<Alert> {
        let mut table = self.table.write().await;
        let alert = table
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::not_found("alert", id))?;
        alert.status = AlertStatus::Acknowledged;
        Ok(alert.clone())
    }

    async fn clear_all(&self) -> Result<usize> {
        let mut table = self.table.write().await;
        let cleared = table.alerts.len();
        table.alerts.clear();
        Ok(cleared)
    }
}
