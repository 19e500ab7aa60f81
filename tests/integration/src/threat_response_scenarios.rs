//! Threat reports flowing through rescoring, alerting and reroute

use crate::test_utils::{chain, chain_with_bypass, road, Harness, A, B, D};
use convoy_core::Coordinate;
use convoy_fleet::{ConvoyPatch, ConvoyStatus};
use convoy_network::{RiskCategory, SegmentRepository};
use convoy_threat::{AlertRepository, AlertSeverity, AlertStatus};

const BC_MIDPOINT: Coordinate = Coordinate { lon: 0.015, lat: 0.0 };

#[tokio::test]
async fn test_hot_segment_raises_one_critical_alert() {
    let h = Harness::new(chain()).await;
    let convoy = h.convoys.create("ATLAS", vec![1, 2, 3], A, D);

    let threat = h.report_threat(BC_MIDPOINT).await;
    let report = h.responder.respond(threat).await.unwrap();

    assert_eq!(report.updated.len(), 3);
    assert_eq!(report.alerts.len(), 1);

    let alerts = h.alerts.list_by_status(AlertStatus::Active).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].segment_id, 2);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    assert_eq!(
        alerts[0].message,
        "CRITICAL risk (0.95) on segment 2 due to new threat."
    );

    let hot = h.segments.segment(2).await.unwrap().unwrap();
    assert_eq!(hot.danger_score, 0.95);
    assert_eq!(hot.risk_category, RiskCategory::High);

    // The chain is the only way through, so the route stands
    let live = h.convoys.get(&convoy.id).unwrap();
    assert_eq!(live.status, ConvoyStatus::EnRoute);
    assert_eq!(live.current_path, vec![1, 2, 3]);
    assert_eq!(live.alerts_triggered, 1);
    assert!(report.rerouted.is_empty());
    assert_eq!(report.unchanged, vec![convoy.id]);
    assert!(report.stranded.is_empty());
}

#[tokio::test]
async fn test_bypass_takes_convoy_off_hot_segment() {
    let h = Harness::new(chain_with_bypass()).await;
    let convoy = h.convoys.create("ATLAS", vec![1, 2, 3], A, D);

    let threat = h.report_threat(BC_MIDPOINT).await;
    let report = h.responder.respond(threat).await.unwrap();

    assert_eq!(report.rerouted, vec![convoy.id]);
    let live = h.convoys.get(&convoy.id).unwrap();
    assert_eq!(live.status, ConvoyStatus::Rerouting);
    assert_eq!(live.current_path, vec![1, 4, 5, 3]);
    assert_eq!(live.alerts_triggered, 1);
}

#[tokio::test]
async fn test_halted_convoy_keeps_status_on_reroute() {
    let h = Harness::new(chain_with_bypass()).await;
    let convoy = h.convoys.create("ATLAS", vec![1, 2, 3], A, D);
    h.convoys
        .update(&convoy.id, ConvoyPatch::status(ConvoyStatus::Halted))
        .unwrap();

    let threat = h.report_threat(BC_MIDPOINT).await;
    h.responder.respond(threat).await.unwrap();

    let live = h.convoys.get(&convoy.id).unwrap();
    assert_eq!(live.status, ConvoyStatus::Halted);
    assert_eq!(live.current_path, vec![1, 4, 5, 3]);
}

#[tokio::test]
async fn test_repeat_reports_are_not_deduplicated() {
    let h = Harness::new(chain()).await;

    for _ in 0..3 {
        let threat = h.report_threat(BC_MIDPOINT).await;
        h.responder.respond(threat).await.unwrap();
    }

    assert_eq!(h.alerts.count_by_status(AlertStatus::Active).await.unwrap(), 3);
}

#[tokio::test]
async fn test_unreachable_destination_strands_convoy() {
    let mut roads = chain();
    let island_a = Coordinate::new(1.0, 1.0);
    let island_b = Coordinate::new(1.01, 1.0);
    roads.push(road(island_a, island_b, 1000.0, "plain"));
    let h = Harness::new(roads).await;

    let convoy = h.convoys.create("ATLAS", vec![2], B, island_b);
    let threat = h.report_threat(BC_MIDPOINT).await;
    let report = h.responder.respond(threat).await.unwrap();

    assert_eq!(report.stranded, vec![convoy.id]);
    let live = h.convoys.get(&convoy.id).unwrap();
    assert_eq!(live.current_path, vec![2]);
    assert_eq!(live.status, ConvoyStatus::EnRoute);
}

#[tokio::test]
async fn test_completed_convoy_is_left_alone() {
    let h = Harness::new(chain_with_bypass()).await;
    let convoy = h.convoys.create("ATLAS", vec![1, 2, 3], A, D);
    h.convoys
        .update(&convoy.id, ConvoyPatch::status(ConvoyStatus::Completed))
        .unwrap();

    let threat = h.report_threat(BC_MIDPOINT).await;
    let report = h.responder.respond(threat).await.unwrap();

    assert!(report.rerouted.is_empty());
    let live = h.convoys.get(&convoy.id).unwrap();
    assert_eq!(live.current_path, vec![1, 2, 3]);
    assert_eq!(live.alerts_triggered, 0);
}

#[tokio::test]
async fn test_convoy_off_the_impact_zone_is_untouched() {
    let mut roads = chain();
    let far_a = Coordinate::new(1.0, 1.0);
    let far_b = Coordinate::new(1.01, 1.0);
    roads.push(road(far_a, far_b, 1000.0, "plain"));
    let h = Harness::new(roads).await;

    let convoy = h.convoys.create("ATLAS", vec![4], far_a, far_b);
    let threat = h.report_threat(BC_MIDPOINT).await;
    let report = h.responder.respond(threat).await.unwrap();

    assert!(report.updated.iter().all(|u| u.segment_id != 4));
    assert_eq!(h.convoys.get(&convoy.id).unwrap().alerts_triggered, 0);
}
