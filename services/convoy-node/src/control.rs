//! Mission control facade
//!
//! Every caller-facing operation lives here, gated by role. Threat
//! submission records the report and hands its id to the work queue; the
//! response pipeline runs on the queue's workers.

use crate::auth::{authorize, Operation, Role};
use crate::simulation::retire;
use convoy_core::{Config, Coordinate, Error, Result};
use convoy_fleet::{
    ActiveConvoy, CompletedMission, ConvoyCommand, ConvoyId, ConvoyStore, InMemoryMissionArchive,
    MissionArchive,
};
use convoy_network::{ProximityIndex, RoutePlan, RoutePlanner, SegmentRepository};
use convoy_risk::select_scorer;
use convoy_threat::{
    threat_density_heatmap, Alert, AlertId, AlertRepository, AlertStatus, HeatCell,
    InMemoryAlertRepository, InMemoryThreatRepository, JobId, NewThreat, QueueMetrics,
    ResponseSettings, Threat, ThreatAwareFeatureSource, ThreatFilter, ThreatRepository,
    ThreatResponder, ThreatWorkQueue,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

/// Route request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Start coordinate
    pub start: Coordinate,
    /// End coordinate
    pub end: Coordinate,
    /// Routing mode; the configured default when absent
    #[serde(default)]
    pub mode: Option<String>,
}

/// Mission start request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionRequest {
    /// Convoy call sign
    pub call_sign: String,
    /// Route to follow
    #[serde(flatten)]
    pub route: RouteRequest,
}

/// Accepted threat and the job processing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatReceipt {
    /// Recorded threat
    pub threat: Threat,
    /// Queue job running the response pipeline
    pub job_id: JobId,
}

/// Service health snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Node identity
    pub node_id: String,
    /// Scoring strategy chosen at startup
    pub scoring_strategy: String,
    /// Known road segments
    pub segments: usize,
    /// Active convoys
    pub active_convoys: usize,
    /// Recorded threats
    pub threats: usize,
    /// Unacknowledged alerts
    pub active_alerts: usize,
    /// Threat queue counters
    pub queue: QueueMetrics,
}

/// What a reset cleared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSummary {
    /// Convoys removed
    pub convoys: usize,
    /// Threats removed
    pub threats: usize,
    /// Alerts removed
    pub alerts: usize,
    /// Settled job records dropped
    pub jobs: usize,
}

/// Service state and operations
pub struct MissionControl {
    node_id: String,
    default_mode: String,
    planner: RoutePlanner,
    scoring_strategy: &'static str,
    segments: Arc<dyn SegmentRepository>,
    threats: Arc<dyn ThreatRepository>,
    alerts: Arc<dyn AlertRepository>,
    convoys: Arc<ConvoyStore>,
    missions: Arc<dyn MissionArchive>,
    queue: ThreatWorkQueue,
}

impl MissionControl {
    /// Assemble the service over a segment store and start the threat workers.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start<S>(config: &Config, segments: Arc<S>) -> (Self, Vec<JoinHandle<()>>)
    where
        S: SegmentRepository + ProximityIndex + 'static,
    {
        let scorer = select_scorer(config.risk.model_path.as_deref());
        let scoring_strategy = scorer.strategy();

        let threats: Arc<dyn ThreatRepository> = Arc::new(InMemoryThreatRepository::new());
        let alerts: Arc<dyn AlertRepository> = Arc::new(InMemoryAlertRepository::new());
        let convoys = Arc::new(ConvoyStore::with_settings(
            config.fleet.observer_buffer,
            f64::from(config.simulation.default_speed_kmph),
        ));
        let features = Arc::new(ThreatAwareFeatureSource::new(
            threats.clone(),
            config.threat.feature_radius_m,
            config.threat.feature_window_hours,
        ));

        let responder = Arc::new(ThreatResponder::new(
            threats.clone(),
            segments.clone(),
            segments.clone(),
            alerts.clone(),
            features,
            scorer,
            convoys.clone(),
            ResponseSettings::from(&config.threat),
        ));
        let (queue, workers) =
            ThreatWorkQueue::start(responder, config.threat.workers, config.threat.queue_capacity);

        info!(
            node_id = %config.service.node_id,
            scoring = scoring_strategy,
            workers = workers.len(),
            "Mission control ready"
        );

        let control = Self {
            node_id: config.service.node_id.clone(),
            default_mode: config.routing.default_mode.clone(),
            planner: RoutePlanner::new(config.routing.fuel_liters_per_km),
            scoring_strategy,
            segments,
            threats,
            alerts,
            convoys,
            missions: Arc::new(InMemoryMissionArchive::new()),
            queue,
        };
        (control, workers)
    }

    /// Shared convoy store
    pub fn convoys(&self) -> Arc<ConvoyStore> {
        Arc::clone(&self.convoys)
    }

    /// Shared mission archive
    pub fn missions(&self) -> Arc<dyn MissionArchive> {
        Arc::clone(&self.missions)
    }

    /// Shared segment repository
    pub fn segments(&self) -> Arc<dyn SegmentRepository> {
        Arc::clone(&self.segments)
    }

    /// Threat work queue
    pub fn queue(&self) -> &ThreatWorkQueue {
        &self.queue
    }

    async fn plan(&self, request: &RouteRequest) -> Result<RoutePlan> {
        let mode = request.mode.as_deref().unwrap_or(&self.default_mode);
        // Reject a bad mode before loading the network
        let _: convoy_network::RoutingMode = mode.parse()?;
        let segments = self.segments.all_segments().await?;
        self.planner.plan(&segments, request.start, request.end, mode)
    }

    /// Risk-aware route between two coordinates.
    pub async fn compute_route(&self, role: Option<Role>, request: RouteRequest) -> Result<RoutePlan> {
        authorize(role, Operation::ComputeRoute)?;
        self.plan(&request).await
    }

    /// Plan a route and put a convoy on it.
    pub async fn start_mission(
        &self,
        role: Option<Role>,
        request: MissionRequest,
    ) -> Result<ActiveConvoy> {
        authorize(role, Operation::StartMission)?;
        if request.call_sign.trim().is_empty() {
            return Err(Error::Validation("call sign must not be empty".into()));
        }
        let plan = self.plan(&request.route).await?;
        Ok(self.convoys.create(
            request.call_sign,
            plan.segment_ids,
            request.route.start,
            request.route.end,
        ))
    }

    /// Start a convoy between two random distinct segments.
    pub async fn simulate_mission(&self, role: Option<Role>) -> Result<ActiveConvoy> {
        authorize(role, Operation::SimulateMission)?;
        let segments = self.segments.all_segments().await?;

        let (start, end, call_sign) = {
            let mut rng = rand::thread_rng();
            let picked: Vec<_> = segments.choose_multiple(&mut rng, 2).collect();
            let [from, to] = picked.as_slice() else {
                return Err(Error::Validation(
                    "simulation needs at least two road segments".into(),
                ));
            };
            let start = from.endpoints().map(|(a, _)| a);
            let end = to.endpoints().map(|(_, b)| b);
            (start, end, format!("SIM-{:03}", rng.gen_range(1..1000)))
        };
        let (Some(start), Some(end)) = (start, end) else {
            return Err(Error::NoPathFound);
        };

        let request = RouteRequest {
            start,
            end,
            mode: None,
        };
        let plan = self.plan(&request).await?;
        info!(call_sign = %call_sign, segments = plan.segment_ids.len(), "Simulated mission started");
        Ok(self.convoys.create(call_sign, plan.segment_ids, start, end))
    }

    /// Record a threat and queue its response.
    pub async fn submit_threat(&self, role: Option<Role>, threat: NewThreat) -> Result<ThreatReceipt> {
        authorize(role, Operation::SubmitThreat)?;
        let threat = self.threats.create(threat).await?;
        let job_id = self.queue.enqueue(threat.id)?;
        info!(threat_id = threat.id, job_id, classification = ?threat.classification, "Threat accepted");
        Ok(ThreatReceipt { threat, job_id })
    }

    /// Threats matching a filter, newest first.
    pub async fn list_threats(&self, role: Option<Role>, filter: ThreatFilter) -> Result<Vec<Threat>> {
        authorize(role, Operation::ListThreats)?;
        self.threats.list(filter).await
    }

    /// Density cells for confirmed threats.
    pub async fn threat_heatmap(&self, role: Option<Role>) -> Result<Vec<HeatCell>> {
        authorize(role, Operation::ThreatHeatmap)?;
        let threats = self.threats.list(ThreatFilter::default()).await?;
        Ok(threat_density_heatmap(&threats))
    }

    /// Unacknowledged alerts, newest first.
    pub async fn active_alerts(&self, role: Option<Role>) -> Result<Vec<Alert>> {
        authorize(role, Operation::Alerts)?;
        self.alerts.list_by_status(AlertStatus::Active).await
    }

    /// Acknowledge one alert.
    pub async fn acknowledge_alert(&self, role: Option<Role>, id: AlertId) -> Result<Alert> {
        authorize(role, Operation::Alerts)?;
        self.alerts.acknowledge(id).await
    }

    /// One convoy.
    pub fn convoy_status(&self, role: Option<Role>, id: &ConvoyId) -> Result<ActiveConvoy> {
        authorize(role, Operation::ConvoyStatus)?;
        self.convoys.get(id)
    }

    /// Every active convoy.
    pub fn list_convoys(&self, role: Option<Role>) -> Result<Vec<ActiveConvoy>> {
        authorize(role, Operation::ConvoyStatus)?;
        Ok(self.convoys.list_all())
    }

    /// Apply an operator command. Completing a convoy archives it.
    pub async fn command_convoy(
        &self,
        role: Option<Role>,
        id: &ConvoyId,
        command: ConvoyCommand,
    ) -> Result<ActiveConvoy> {
        authorize(role, Operation::CommandConvoy)?;

        if command == ConvoyCommand::Complete {
            let before = self.convoys.get(id)?;
            let mission = retire(&self.convoys, self.missions.as_ref(), id).await?;
            info!(convoy_id = %id, mission_id = mission.id, "Convoy completed by command");
            return Ok(ActiveConvoy {
                status: mission.final_status,
                ..before
            });
        }

        let convoy = self.convoys.modify(id, |c| command.apply(c))?;
        info!(convoy_id = %id, command = %command, status = %convoy.status, "Convoy command applied");
        Ok(convoy)
    }

    /// Live snapshots of one convoy.
    pub fn subscribe_convoy(
        &self,
        role: Option<Role>,
        id: &ConvoyId,
    ) -> Result<broadcast::Receiver<ActiveConvoy>> {
        authorize(role, Operation::ConvoyStatus)?;
        self.convoys.subscribe(id)
    }

    /// Mission history.
    pub async fn completed_missions(&self, role: Option<Role>) -> Result<Vec<CompletedMission>> {
        authorize(role, Operation::Missions)?;
        self.missions.list().await
    }

    /// Run a failed threat job again.
    pub async fn retry_threat_job(&self, role: Option<Role>, job_id: JobId) -> Result<JobId> {
        authorize(role, Operation::RetryJob)?;
        Ok(self.queue.retry(job_id)?)
    }

    /// Counts and queue health.
    pub async fn system_status(&self, role: Option<Role>) -> Result<SystemStatus> {
        authorize(role, Operation::SystemStatus)?;
        Ok(SystemStatus {
            node_id: self.node_id.clone(),
            scoring_strategy: self.scoring_strategy.to_string(),
            segments: self.segments.all_segments().await?.len(),
            active_convoys: self.convoys.len(),
            threats: self.threats.list(ThreatFilter::default()).await?.len(),
            active_alerts: self.alerts.count_by_status(AlertStatus::Active).await?,
            queue: self.queue.metrics(),
        })
    }

    /// Clear operational state and settled job records; zero every segment's risk.
    pub async fn reset(&self, role: Option<Role>) -> Result<ResetSummary> {
        authorize(role, Operation::Reset)?;
        let summary = ResetSummary {
            convoys: self.convoys.clear_all(),
            threats: self.threats.clear_all().await?,
            alerts: self.alerts.clear_all().await?,
            jobs: self.queue.tracker().clear_settled(),
        };
        self.segments.reset_risk().await?;
        info!(
            convoys = summary.convoys,
            threats = summary.threats,
            alerts = summary.alerts,
            jobs = summary.jobs,
            "Environment reset"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_fleet::ConvoyStatus;
    use convoy_network::{InMemorySegmentStore, NewSegment};
    use convoy_threat::{ThreatClassification, ThreatSource, VerificationStatus};

    async fn control() -> MissionControl {
        let segments = Arc::new(InMemorySegmentStore::new());
        for i in 0..3 {
            let a = Coordinate::new(0.01 * i as f64, 0.0);
            let b = Coordinate::new(0.01 * (i + 1) as f64, 0.0);
            segments.insert(NewSegment::straight(a, b, 1000.0)).await.unwrap();
        }
        let (control, _workers) = MissionControl::start(&Config::default_config(), segments);
        control
    }

    fn route() -> RouteRequest {
        RouteRequest {
            start: Coordinate::new(0.0, 0.0),
            end: Coordinate::new(0.03, 0.0),
            mode: Some("balance".into()),
        }
    }

    #[tokio::test]
    async fn test_role_checked_before_work() {
        let control = control().await;
        assert!(matches!(
            control.compute_route(None, route()).await,
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            control.compute_route(Some(Role::Analyst), route()).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(control.reset(Some(Role::Operator)).await.is_err());
    }

    #[tokio::test]
    async fn test_bad_mode_rejected() {
        let control = control().await;
        let mut request = route();
        request.mode = Some("bogus".into());
        assert!(matches!(
            control.compute_route(Some(Role::Operator), request).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_start_mission_and_commands() {
        let control = control().await;
        let convoy = control
            .start_mission(
                Some(Role::Operator),
                MissionRequest {
                    call_sign: "BISON".into(),
                    route: route(),
                },
            )
            .await
            .unwrap();
        assert_eq!(convoy.current_path, vec![1, 2, 3]);

        let commander = Some(Role::Commander);
        let halted = control
            .command_convoy(commander, &convoy.id, ConvoyCommand::Halt)
            .await
            .unwrap();
        assert_eq!(halted.status, ConvoyStatus::Halted);

        let done = control
            .command_convoy(commander, &convoy.id, ConvoyCommand::Complete)
            .await
            .unwrap();
        assert_eq!(done.status, ConvoyStatus::Completed);
        assert!(matches!(
            control.convoy_status(commander, &convoy.id),
            Err(Error::NotFound { .. })
        ));

        let missions = control.completed_missions(commander).await.unwrap();
        assert_eq!(missions.len(), 1);
        assert_eq!(missions[0].call_sign, "BISON");
    }

    #[tokio::test]
    async fn test_submit_threat_is_queued_and_processed() {
        let control = control().await;
        let receipt = control
            .submit_threat(
                Some(Role::Analyst),
                NewThreat {
                    location: Coordinate::new(0.015, 0.0),
                    classification: ThreatClassification::Roadblock,
                    source: ThreatSource::Humint,
                    status: VerificationStatus::Confirmed,
                },
            )
            .await
            .unwrap();

        let job = control.queue().tracker().settled(receipt.job_id).await.unwrap();
        assert_eq!(job.state, convoy_threat::JobState::Completed);

        let heat = control.threat_heatmap(Some(Role::Analyst)).await.unwrap();
        assert_eq!(heat, vec![[0.0, 0.015, 1.0]]);
    }

    #[tokio::test]
    async fn test_simulate_mission() {
        let control = control().await;
        let convoy = control.simulate_mission(Some(Role::Analyst)).await.unwrap();
        assert!(convoy.call_sign.starts_with("SIM-"));
        assert_eq!(control.list_convoys(Some(Role::Commander)).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let control = control().await;
        control
            .start_mission(
                Some(Role::Commander),
                MissionRequest {
                    call_sign: "BISON".into(),
                    route: route(),
                },
            )
            .await
            .unwrap();
        let receipt = control
            .submit_threat(
                Some(Role::Commander),
                NewThreat {
                    location: Coordinate::new(0.015, 0.0),
                    classification: ThreatClassification::Sniper,
                    source: ThreatSource::Manual,
                    status: VerificationStatus::Unconfirmed,
                },
            )
            .await
            .unwrap();
        control.queue().tracker().settled(receipt.job_id).await.unwrap();

        let summary = control.reset(Some(Role::Commander)).await.unwrap();
        assert_eq!(summary.convoys, 1);
        assert_eq!(summary.threats, 1);
        assert_eq!(summary.jobs, 1);
        assert!(control.queue().tracker().is_empty());

        let status = control.system_status(Some(Role::Analyst)).await.unwrap();
        assert_eq!(status.active_convoys, 0);
        assert_eq!(status.segments, 3);
        assert_eq!(status.scoring_strategy, "fallback");
    }
}
