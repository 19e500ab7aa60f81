//! Threat Response Orchestrator
//!
//! One run per recorded threat:
//! 1. Impact scan of segments within the impact radius
//! 2. Risk recompute for each candidate, serialized per segment
//! 3. Threshold alerts for each updated segment
//! 4. Reroute of convoys whose remaining path touches an updated segment
//!
//! Steps are not checkpointed. A failure partway leaves earlier segment
//! updates in place and abandons the rest of the run.

use crate::alert::{AlertId, AlertRepository, AlertSeverity, NewAlert};
use crate::features::FeatureSource;
use crate::locks::SegmentLocks;
use crate::threat::{ThreatId, ThreatRepository};
use async_trait::async_trait;
use convoy_core::config::ThreatConfig;
use convoy_core::{Coordinate, Error, Result};
use convoy_fleet::{ActiveConvoy, ConvoyId, ConvoyStatus, ConvoyStore};
use convoy_network::{
    find_path, nearest_node, path_segment_ids, ProximityIndex, RiskCategory, RoadGraph,
    SegmentId, SegmentRepository,
};
use convoy_risk::RiskScorer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrator tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSettings {
    /// Radius of the impact scan
    pub impact_radius_m: f64,
    /// Lower bound for a High alert
    pub high_threshold: f64,
    /// Lower bound for a Critical alert
    pub critical_threshold: f64,
    /// Mode used to rebuild the graph for reroutes
    pub reroute_mode: String,
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self::from(&ThreatConfig::default())
    }
}

impl From<&ThreatConfig> for ResponseSettings {
    fn from(config: &ThreatConfig) -> Self {
        Self {
            impact_radius_m: config.impact_radius_m,
            high_threshold: config.high_threshold,
            critical_threshold: config.critical_threshold,
            reroute_mode: config.reroute_mode.clone(),
        }
    }
}

/// New risk written for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRiskUpdate {
    /// Segment rescored
    pub segment_id: SegmentId,
    /// Score before this run
    pub previous_score: f64,
    /// Score written
    pub danger_score: f64,
    /// Category written
    pub category: RiskCategory,
    /// Alert raised for the new score, if any
    pub severity: Option<AlertSeverity>,
}

/// Outcome of one orchestrator run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreatResponseReport {
    /// Triggering threat
    pub threat_id: ThreatId,
    /// Segments rescored, in scan order
    pub updated: Vec<SegmentRiskUpdate>,
    /// Alerts created
    pub alerts: Vec<AlertId>,
    /// Convoys given a new path
    pub rerouted: Vec<ConvoyId>,
    /// Affected convoys whose best path is still the current one
    pub unchanged: Vec<ConvoyId>,
    /// Affected convoys for which no path exists
    pub stranded: Vec<ConvoyId>,
}

/// Unit of work executed by the threat queue
#[async_trait]
pub trait ThreatHandler: Send + Sync {
    /// Run the full response for one threat
    async fn handle(&self, threat_id: ThreatId) -> Result<ThreatResponseReport>;
}

/// The orchestrator and its collaborators
pub struct ThreatResponder {
    threats: Arc<dyn ThreatRepository>,
    segments: Arc<dyn SegmentRepository>,
    proximity: Arc<dyn ProximityIndex>,
    alerts: Arc<dyn AlertRepository>,
    features: Arc<dyn FeatureSource>,
    scorer: Arc<dyn RiskScorer>,
    convoys: Arc<ConvoyStore>,
    locks: SegmentLocks,
    settings: ResponseSettings,
}

enum RerouteOutcome {
    Rerouted,
    Unchanged,
    Stranded,
}

impl ThreatResponder {
    /// Wire the orchestrator to its collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        threats: Arc<dyn ThreatRepository>,
        segments: Arc<dyn SegmentRepository>,
        proximity: Arc<dyn ProximityIndex>,
        alerts: Arc<dyn AlertRepository>,
        features: Arc<dyn FeatureSource>,
        scorer: Arc<dyn RiskScorer>,
        convoys: Arc<ConvoyStore>,
        settings: ResponseSettings,
    ) -> Self {
        Self {
            threats,
            segments,
            proximity,
            alerts,
            features,
            scorer,
            convoys,
            locks: SegmentLocks::new(),
            settings,
        }
    }

    /// Active settings
    pub fn settings(&self) -> &ResponseSettings {
        &self.settings
    }

    /// Run all four steps for one threat.
    pub async fn respond(&self, threat_id: ThreatId) -> Result<ThreatResponseReport> {
        let threat = self.threats.get(threat_id).await?;
        let mut report = ThreatResponseReport {
            threat_id,
            ..Default::default()
        };

        let candidates = self
            .proximity
            .segments_near(threat.location, self.settings.impact_radius_m)
            .await?;
        debug!(threat_id, candidates = candidates.len(), "Impact scan complete");

        for candidate in candidates {
            let update = self.rescore(candidate.id).await?;
            let Some(update) = update else { continue };

            if let Some(severity) = update.severity {
                let alert = self
                    .alerts
                    .create(NewAlert::threshold_crossed(
                        update.segment_id,
                        severity,
                        update.danger_score,
                    ))
                    .await?;
                warn!(
                    alert_id = alert.id,
                    segment_id = update.segment_id,
                    severity = %severity,
                    danger_score = update.danger_score,
                    "Risk alert raised"
                );
                report.alerts.push(alert.id);
            }
            report.updated.push(update);
        }

        self.reroute_affected(&mut report).await?;

        info!(
            threat_id,
            updated = report.updated.len(),
            alerts = report.alerts.len(),
            rerouted = report.rerouted.len(),
            unchanged = report.unchanged.len(),
            stranded = report.stranded.len(),
            "Threat response complete"
        );
        Ok(report)
    }

    /// Gather features, score, and persist one segment under its lock.
    async fn rescore(&self, segment_id: SegmentId) -> Result<Option<SegmentRiskUpdate>> {
        let _guard = self.locks.acquire(segment_id).await;

        // Re-read under the lock; the scan result may be stale
        let Some(segment) = self.segments.segment(segment_id).await? else {
            debug!(segment_id, "Segment vanished before rescoring");
            return Ok(None);
        };

        let features = self.features.features(&segment).await?;
        let assessment = self.scorer.score(&features);
        self.segments
            .update_risk(segment_id, assessment.category, assessment.danger_score)
            .await?;

        Ok(Some(SegmentRiskUpdate {
            segment_id,
            previous_score: segment.danger_score,
            danger_score: assessment.danger_score,
            category: assessment.category,
            severity: AlertSeverity::classify(
                assessment.danger_score,
                self.settings.high_threshold,
                self.settings.critical_threshold,
            ),
        }))
    }

    async fn reroute_affected(&self, report: &mut ThreatResponseReport) -> Result<()> {
        let updated: Vec<SegmentId> = report.updated.iter().map(|u| u.segment_id).collect();
        let affected: Vec<ActiveConvoy> = self
            .convoys
            .list_all()
            .into_iter()
            .filter(|c| c.status != ConvoyStatus::Completed && c.path_touches(&updated))
            .collect();
        if affected.is_empty() {
            return Ok(());
        }

        let mut alerted: HashMap<SegmentId, u32> = HashMap::new();
        for update in report.updated.iter().filter(|u| u.severity.is_some()) {
            *alerted.entry(update.segment_id).or_insert(0) += 1;
        }

        let segments = self.segments.all_segments().await?;
        let graph = RoadGraph::build(&segments, &self.settings.reroute_mode);

        for convoy in affected {
            match self.reroute(&graph, &convoy, &alerted) {
                Ok(RerouteOutcome::Rerouted) => {
                    info!(convoy_id = %convoy.id, call_sign = %convoy.call_sign, "Convoy rerouted");
                    report.rerouted.push(convoy.id);
                }
                Ok(RerouteOutcome::Unchanged) => {
                    warn!(
                        convoy_id = %convoy.id,
                        call_sign = %convoy.call_sign,
                        "No safer alternative for convoy; keeping current route"
                    );
                    report.unchanged.push(convoy.id);
                }
                Ok(RerouteOutcome::Stranded) => {
                    warn!(
                        convoy_id = %convoy.id,
                        call_sign = %convoy.call_sign,
                        "No alternative path for convoy on a re-scored segment"
                    );
                    report.stranded.push(convoy.id);
                }
                // Convoy finished or was reset mid-run
                Err(Error::NotFound { .. }) => {
                    debug!(convoy_id = %convoy.id, "Convoy left the store before reroute");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn reroute(
        &self,
        graph: &RoadGraph,
        convoy: &ActiveConvoy,
        alerted: &HashMap<SegmentId, u32>,
    ) -> Result<RerouteOutcome> {
        let planned = best_path(graph, &convoy.current_location, &convoy.destination)?;

        let mut outcome = RerouteOutcome::Stranded;
        self.convoys.modify(&convoy.id, |live| {
            // A tick may have moved the convoy since it was listed
            let new_path = if live.current_location == convoy.current_location
                && live.current_path.first() == convoy.current_path.first()
            {
                planned
            } else {
                debug!(convoy_id = %live.id, "Convoy moved during reroute, planning from live position");
                best_path(graph, &live.current_location, &live.destination)?
            };

            live.alerts_triggered += live
                .current_path
                .iter()
                .filter_map(|s| alerted.get(s))
                .sum::<u32>();

            outcome = match new_path {
                None => RerouteOutcome::Stranded,
                Some(path) if path == live.current_path => RerouteOutcome::Unchanged,
                Some(path) => {
                    live.current_path = path;
                    // Halted convoys take the new path but stay put
                    if live.status != ConvoyStatus::Halted {
                        live.status = ConvoyStatus::Rerouting;
                    }
                    RerouteOutcome::Rerouted
                }
            };
            Ok(())
        })?;
        Ok(outcome)
    }
}

/// Cheapest segment path between the junctions nearest `from` and `to`.
fn best_path(
    graph: &RoadGraph,
    from: &Coordinate,
    to: &Coordinate,
) -> Result<Option<Vec<SegmentId>>> {
    nearest_node(graph, from)
        .zip(nearest_node(graph, to))
        .and_then(|(start, end)| find_path(graph, start, end))
        .map(|nodes| path_segment_ids(graph, &nodes))
        .transpose()
}

#[async_trait]
impl ThreatHandler for ThreatResponder {
    async fn handle(&self, threat_id: ThreatId) -> Result<ThreatResponseReport> {
        self.respond(threat_id).await
    }
}
