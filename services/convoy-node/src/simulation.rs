//! Periodic convoy movement
//!
//! Every tick moves each En Route or Rerouting convoy across the next
//! segment of its path. Convoys whose path runs out are completed, removed
//! from the store, and archived. All changes go through the store's
//! per-convoy atomic update, so ticks interleave safely with operator
//! commands and reroutes.

use chrono::{Duration as ChronoDuration, Utc};
use convoy_core::config::SimulationConfig;
use convoy_core::{haversine_m, Coordinate, Result};
use convoy_fleet::{
    ActiveConvoy, CompletedMission, ConvoyId, ConvoyStatus, ConvoyStore, MissionArchive,
};
use convoy_network::{Segment, SegmentId, SegmentRepository};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Mark a convoy Completed, drop it from the store, and archive it.
pub(crate) async fn retire(
    convoys: &ConvoyStore,
    missions: &dyn MissionArchive,
    id: &ConvoyId,
) -> Result<CompletedMission> {
    convoys.modify(id, |c| {
        c.status = ConvoyStatus::Completed;
        Ok(())
    })?;
    let last = convoys.remove(id)?;
    missions.record(&last).await
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSummary {
    /// Convoys moved one segment
    pub advanced: Vec<ConvoyId>,
    /// Missions archived this tick
    pub completed: Vec<CompletedMission>,
}

/// Drives convoy movement on a timer
pub struct MovementSimulator {
    convoys: Arc<ConvoyStore>,
    segments: Arc<dyn SegmentRepository>,
    missions: Arc<dyn MissionArchive>,
    base_tick: Duration,
    time_scale: watch::Receiver<f64>,
}

impl MovementSimulator {
    /// Create a simulator and the handle that rescales its clock.
    ///
    /// Dropping the handle stops [`MovementSimulator::run`].
    pub fn new(
        convoys: Arc<ConvoyStore>,
        segments: Arc<dyn SegmentRepository>,
        missions: Arc<dyn MissionArchive>,
        config: &SimulationConfig,
    ) -> (Self, watch::Sender<f64>) {
        let (tx, rx) = watch::channel(config.time_scale);
        let simulator = Self {
            convoys,
            segments,
            missions,
            base_tick: Duration::from_secs(config.base_tick_secs.max(1)),
            time_scale: rx,
        };
        (simulator, tx)
    }

    fn period(&self, last: Duration) -> Duration {
        let scale = *self.time_scale.borrow();
        if scale.is_finite() && scale > 0.0 {
            self.base_tick.div_f64(scale)
        } else {
            warn!(scale, "Ignoring invalid time scale");
            last
        }
    }

    /// Tick until the time-scale handle is dropped.
    pub async fn run(mut self) {
        let mut period = self.period(self.base_tick);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick of a tokio interval fires immediately
        ticker.tick().await;
        info!(period_ms = period.as_millis() as u64, "Movement simulator started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Movement tick failed");
                    }
                }
                changed = self.time_scale.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    period = self.period(period);
                    ticker = interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    ticker.tick().await;
                    info!(period_ms = period.as_millis() as u64, "Movement tick rescaled");
                }
            }
        }
        info!("Movement simulator stopped");
    }

    /// Advance every moving convoy by one segment.
    pub async fn tick(&self) -> Result<TickSummary> {
        let moving: Vec<ActiveConvoy> = self
            .convoys
            .list_all()
            .into_iter()
            .filter(|c| c.status.is_moving())
            .collect();
        let mut summary = TickSummary::default();
        if moving.is_empty() {
            return Ok(summary);
        }

        let segments: HashMap<SegmentId, Segment> = self
            .segments
            .all_segments()
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        for convoy in moving {
            let exhausted = match convoy.current_path.first() {
                None => true,
                Some(next) => match self.advance(&convoy, *next, &segments) {
                    Ok(Some(moved)) => {
                        summary.advanced.push(moved.id);
                        moved.current_path.is_empty() && moved.status.is_moving()
                    }
                    Ok(None) => false,
                    Err(e) => {
                        debug!(convoy_id = %convoy.id, error = %e, "Convoy skipped this tick");
                        false
                    }
                },
            };

            if exhausted {
                match retire(&self.convoys, self.missions.as_ref(), &convoy.id).await {
                    Ok(mission) => {
                        info!(convoy_id = %convoy.id, mission_id = mission.id, "Convoy reached destination");
                        summary.completed.push(mission);
                    }
                    Err(e) => debug!(convoy_id = %convoy.id, error = %e, "Convoy gone before completion"),
                }
            }
        }
        Ok(summary)
    }

    // Ok(None) when the convoy changed between listing and update
    fn advance(
        &self,
        convoy: &ActiveConvoy,
        next: SegmentId,
        segments: &HashMap<SegmentId, Segment>,
    ) -> Result<Option<ActiveConvoy>> {
        let mut moved = false;
        let updated = self.convoys.modify(&convoy.id, |live| {
            if !live.status.is_moving() || live.current_path.first() != Some(&next) {
                return Ok(());
            }
            live.current_path.remove(0);
            moved = true;

            match segments.get(&next) {
                Some(segment) => {
                    live.current_location = far_end(segment, &live.current_location);
                    live.distance_travelled_km += segment.length_m / 1000.0;
                    live.traversed_segments.push(next);
                }
                None => warn!(convoy_id = %live.id, segment_id = next, "Path references unknown segment"),
            }

            if live.status == ConvoyStatus::Rerouting {
                live.status = ConvoyStatus::EnRoute;
            }

            let remaining_km: f64 = live
                .current_path
                .iter()
                .filter_map(|id| segments.get(id))
                .map(|s| s.length_m / 1000.0)
                .sum();
            if live.speed_kmph > 0.0 {
                let ms = remaining_km / live.speed_kmph * 3_600_000.0;
                live.eta = Some(Utc::now() + ChronoDuration::milliseconds(ms as i64));
            }
            Ok(())
        })?;
        Ok(moved.then_some(updated))
    }
}

/// Endpoint of `segment` farther from `from`; segments are driven either way.
fn far_end(segment: &Segment, from: &Coordinate) -> Coordinate {
    match segment.endpoints() {
        Some((a, b)) => {
            if haversine_m(from, &a) <= haversine_m(from, &b) {
                b
            } else {
                a
            }
        }
        None => *from,
    }
}
