//! Convoy state under concurrent writers

use crate::test_utils::{chain, seeded_store, Harness, A, D};
use convoy_core::config::SimulationConfig;
use convoy_core::Coordinate;
use convoy_fleet::{ConvoyCommand, ConvoyStatus, ConvoyStore, InMemoryMissionArchive, MissionArchive};
use convoy_node::MovementSimulator;
use convoy_threat::{AlertRepository, AlertStatus};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_modifies_lose_no_updates() {
    let store = Arc::new(ConvoyStore::new());
    let convoy = store.create("HAMMER", vec![1, 2, 3], A, D);

    let mut handles = Vec::new();
    for _ in 0..32 {
        let store = store.clone();
        let id = convoy.id;
        handles.push(tokio::spawn(async move {
            for _ in 0..10 {
                store
                    .modify(&id, |c| {
                        c.alerts_triggered += 1;
                        Ok(())
                    })
                    .unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.get(&convoy.id).unwrap().alerts_triggered, 320);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_observer_sees_updates_in_commit_order() {
    let store = Arc::new(ConvoyStore::new());
    let convoy = store.create("HAMMER", vec![1, 2, 3], A, D);
    let mut rx = store.subscribe(&convoy.id).unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        let id = convoy.id;
        handles.push(tokio::spawn(async move {
            for _ in 0..10 {
                store
                    .modify(&id, |c| {
                        c.alerts_triggered += 1;
                        Ok(())
                    })
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut seen = Vec::new();
    while let Ok(snapshot) = rx.try_recv() {
        seen.push(snapshot.alerts_triggered);
    }
    assert_eq!(seen, (1..=40).collect::<Vec<u32>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_threat_runs_on_one_segment() {
    let h = Arc::new(Harness::new(chain()).await);
    let convoy = h.convoys.create("HAMMER", vec![1, 2, 3], A, D);

    let mut threats = Vec::new();
    for _ in 0..8 {
        threats.push(h.report_threat(Coordinate::new(0.015, 0.0)).await);
    }

    let mut handles = Vec::new();
    for threat in threats {
        let h = h.clone();
        handles.push(tokio::spawn(async move { h.responder.respond(threat).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.alerts.count_by_status(AlertStatus::Active).await.unwrap(), 8);
    let live = h.convoys.get(&convoy.id).unwrap();
    assert_eq!(live.alerts_triggered, 8);
    assert_eq!(live.current_path, vec![1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_movement_interleaved_with_commands() {
    let segments = seeded_store(chain()).await;
    let convoys = Arc::new(ConvoyStore::new());
    let missions = Arc::new(InMemoryMissionArchive::new());
    let (simulator, _scale) = MovementSimulator::new(
        convoys.clone(),
        segments,
        missions.clone(),
        &SimulationConfig::default(),
    );

    let fleet: Vec<_> = (0..16)
        .map(|i| convoys.create(format!("HAMMER-{i}"), vec![1, 2, 3], A, D))
        .collect();

    let commander = {
        let convoys = convoys.clone();
        let ids: Vec<_> = fleet.iter().map(|c| c.id).collect();
        tokio::spawn(async move {
            for round in 0..6 {
                for id in &ids {
                    let command = if round % 2 == 0 {
                        ConvoyCommand::Halt
                    } else {
                        ConvoyCommand::Resume
                    };
                    // Convoys may finish and leave the store mid-run
                    let _ = convoys.modify(id, |c| command.apply(c));
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    for _ in 0..3 {
        simulator.tick().await.unwrap();
        tokio::task::yield_now().await;
    }
    commander.await.unwrap();

    // Resumed convoys finish the route
    for id in fleet.iter().map(|c| c.id) {
        let _ = convoys.modify(&id, |c| ConvoyCommand::Resume.apply(c));
    }
    for _ in 0..4 {
        simulator.tick().await.unwrap();
    }

    assert!(convoys.is_empty());
    let archived = missions.list().await.unwrap();
    assert_eq!(archived.len(), 16);
    for mission in archived {
        assert_eq!(mission.route_taken, vec![1, 2, 3]);
        assert_eq!(mission.final_status, ConvoyStatus::Completed);
        assert!((mission.total_distance_km - 3.0).abs() < 1e-9);
    }
}
