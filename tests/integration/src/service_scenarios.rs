//! The assembled service driven through its role-gated operations

use crate::test_utils::{chain, init_logging, seeded_store, A, D};
use convoy_core::config::Config;
use convoy_core::{Coordinate, Error};
use convoy_fleet::{ConvoyCommand, ConvoyStatus};
use convoy_network::SegmentRepository;
use convoy_node::{MissionControl, MissionRequest, Role};
use convoy_threat::{JobState, NewThreat, ThreatClassification, ThreatSource, VerificationStatus};
use serde_json::json;

async fn control() -> MissionControl {
    init_logging();
    let segments = seeded_store(chain()).await;
    let (control, _workers) = MissionControl::start(&Config::default_config(), segments);
    control
}

fn mission_request(mode: &str) -> MissionRequest {
    serde_json::from_value(json!({
        "call_sign": "RAVEN",
        "start": serde_json::to_value(A).unwrap(),
        "end": serde_json::to_value(D).unwrap(),
        "mode": mode,
    }))
    .unwrap()
}

fn sighting() -> NewThreat {
    NewThreat {
        location: Coordinate::new(0.015, 0.0),
        classification: ThreatClassification::Ambush,
        source: ThreatSource::Humint,
        status: VerificationStatus::Confirmed,
    }
}

#[tokio::test]
async fn test_threat_job_rescores_network() {
    let control = control().await;
    let convoy = control
        .start_mission(Some(Role::Operator), mission_request("stealth"))
        .await
        .unwrap();
    assert_eq!(convoy.current_path, vec![1, 2, 3]);

    let receipt = control
        .submit_threat(Some(Role::Analyst), sighting())
        .await
        .unwrap();
    let job = control.queue().tracker().settled(receipt.job_id).await.unwrap();
    assert_eq!(job.state, JobState::Completed);

    // One nearby threat under the fallback heuristic
    for segment in control.segments().all_segments().await.unwrap() {
        assert!((segment.danger_score - 0.175).abs() < 1e-9, "{}", segment.id);
    }

    let status = control.system_status(Some(Role::Analyst)).await.unwrap();
    assert_eq!(status.scoring_strategy, "fallback");
    assert_eq!(status.threats, 1);
    assert_eq!(status.active_alerts, 0);
    assert_eq!(status.active_convoys, 1);
    assert_eq!(status.queue.completed, 1);
}

#[tokio::test]
async fn test_reset_clears_operational_state() {
    let control = control().await;
    control
        .start_mission(Some(Role::Commander), mission_request("balance"))
        .await
        .unwrap();
    let receipt = control
        .submit_threat(Some(Role::Commander), sighting())
        .await
        .unwrap();
    control.queue().tracker().settled(receipt.job_id).await;

    let summary = control.reset(Some(Role::Commander)).await.unwrap();
    assert_eq!(summary.convoys, 1);
    assert_eq!(summary.threats, 1);

    assert!(control.list_convoys(Some(Role::Operator)).unwrap().is_empty());
    for segment in control.segments().all_segments().await.unwrap() {
        assert_eq!(segment.danger_score, 0.0);
    }
    // Road network survives a reset
    assert_eq!(control.segments().all_segments().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_complete_command_archives_mission() {
    let control = control().await;
    let convoy = control
        .start_mission(Some(Role::Operator), mission_request("speed"))
        .await
        .unwrap();

    let done = control
        .command_convoy(Some(Role::Commander), &convoy.id, ConvoyCommand::Complete)
        .await
        .unwrap();
    assert_eq!(done.status, ConvoyStatus::Completed);

    assert!(matches!(
        control.convoy_status(Some(Role::Operator), &convoy.id),
        Err(Error::NotFound { .. })
    ));
    let missions = control.completed_missions(Some(Role::Analyst)).await.unwrap();
    assert_eq!(missions.len(), 1);
    assert_eq!(missions[0].call_sign, "RAVEN");
}

#[tokio::test]
async fn test_operator_cannot_submit_threats() {
    let control = control().await;
    let err = control
        .submit_threat(Some(Role::Operator), sighting())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));

    let status = control.system_status(Some(Role::Operator)).await.unwrap();
    assert_eq!(status.threats, 0);
}
