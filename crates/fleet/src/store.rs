//! Convoy State Store
//!
//! Concurrent keyed registry of active convoys. The outer map lock is only
//! held to find, insert, or drop an entry; every mutation of one convoy goes
//! through that convoy's own mutex, so unrelated convoys never contend.
//! Committed snapshots are pushed to the convoy's observers while the entry
//! lock is still held, keeping delivery order equal to commit order.

use crate::types::{ActiveConvoy, ConvoyId, ConvoyPatch, DEFAULT_SPEED_KMPH};
use chrono::Utc;
use convoy_core::{Coordinate, Error, Result};
use convoy_network::SegmentId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Default per-convoy observer buffer
pub const DEFAULT_OBSERVER_BUFFER: usize = 64;

struct ConvoyEntry {
    state: Mutex<ActiveConvoy>,
    observers: broadcast::Sender<ActiveConvoy>,
}

impl ConvoyEntry {
    fn new(convoy: ActiveConvoy, buffer: usize) -> Self {
        let (observers, _) = broadcast::channel(buffer);
        Self {
            state: Mutex::new(convoy),
            observers,
        }
    }
}

/// Concurrent convoy registry
pub struct ConvoyStore {
    entries: RwLock<HashMap<ConvoyId, Arc<ConvoyEntry>>>,
    observer_buffer: usize,
    default_speed_kmph: f64,
}

impl Default for ConvoyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvoyStore {
    /// Empty store with default settings
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_OBSERVER_BUFFER, DEFAULT_SPEED_KMPH)
    }

    /// Empty store with explicit observer buffer and starting speed
    pub fn with_settings(observer_buffer: usize, default_speed_kmph: f64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            observer_buffer: observer_buffer.max(1),
            default_speed_kmph,
        }
    }

    fn entry(&self, id: &ConvoyId) -> Result<Arc<ConvoyEntry>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("convoy", id))
    }

    /// Register a new convoy with status En Route.
    pub fn create(
        &self,
        call_sign: impl Into<String>,
        path: Vec<SegmentId>,
        start: Coordinate,
        destination: Coordinate,
    ) -> ActiveConvoy {
        let convoy = ActiveConvoy::new(call_sign, path, start, destination, self.default_speed_kmph);
        let entry = Arc::new(ConvoyEntry::new(convoy.clone(), self.observer_buffer));

        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(convoy.id, entry);

        info!(convoy_id = %convoy.id, call_sign = %convoy.call_sign, segments = convoy.current_path.len(), "Convoy created");
        convoy
    }

    /// Snapshot of one convoy.
    pub fn get(&self, id: &ConvoyId) -> Result<ActiveConvoy> {
        let entry = self.entry(id)?;
        let state = entry.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.clone())
    }

    /// Snapshots of every convoy, ordered by start time.
    pub fn list_all(&self) -> Vec<ActiveConvoy> {
        let entries: Vec<Arc<ConvoyEntry>> = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();

        let mut convoys: Vec<ActiveConvoy> = entries
            .iter()
            .map(|e| e.state.lock().unwrap_or_else(|p| p.into_inner()).clone())
            .collect();
        convoys.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        convoys
    }

    /// Number of active convoys
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when no convoy is active
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge `patch` into the convoy and stamp the update time.
    pub fn update(&self, id: &ConvoyId, patch: ConvoyPatch) -> Result<ActiveConvoy> {
        self.modify(id, |convoy| {
            patch.apply(convoy);
            Ok(())
        })
    }

    /// Atomic read-modify-write of one convoy.
    ///
    /// `f` runs against a working copy under the convoy's lock. The copy is
    /// committed only if `f` succeeds, so a failed closure leaves the stored
    /// state untouched.
    pub fn modify<F>(&self, id: &ConvoyId, f: F) -> Result<ActiveConvoy>
    where
        F: FnOnce(&mut ActiveConvoy) -> Result<()>,
    {
        let entry = self.entry(id)?;
        let mut state = entry.state.lock().unwrap_or_else(|e| e.into_inner());

        let mut working = state.clone();
        f(&mut working)?;
        working.id = state.id;
        working.last_update_time = Utc::now();
        *state = working;

        // No receivers is fine; lagging receivers drop old snapshots.
        let _ = entry.observers.send(state.clone());
        debug!(convoy_id = %id, status = %state.status, "Convoy updated");
        Ok(state.clone())
    }

    /// Drop a convoy, returning its final state.
    pub fn remove(&self, id: &ConvoyId) -> Result<ActiveConvoy> {
        let entry = self
            .entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
            .ok_or_else(|| Error::not_found("convoy", id))?;

        let state = entry.state.lock().unwrap_or_else(|e| e.into_inner());
        info!(convoy_id = %id, "Convoy removed");
        Ok(state.clone())
    }

    /// Live snapshots of one convoy from now on.
    ///
    /// The stream ends when the convoy is removed.
    pub fn subscribe(&self, id: &ConvoyId) -> Result<broadcast::Receiver<ActiveConvoy>> {
        Ok(self.entry(id)?.observers.subscribe())
    }

    /// Administrative reset
    pub fn clear_all(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let cleared = entries.len();
        entries.clear();
        info!(cleared, "Convoy store cleared");
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConvoyStatus;
    use std::thread;

    fn store_with_convoy() -> (ConvoyStore, ActiveConvoy) {
        let store = ConvoyStore::new();
        let convoy = store.create(
            "HAWK-2",
            vec![1, 2, 3],
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.03, 0.0),
        );
        (store, convoy)
    }

    #[test]
    fn test_create_and_get() {
        let (store, convoy) = store_with_convoy();
        let fetched = store.get(&convoy.id).unwrap();
        assert_eq!(fetched, convoy);
        assert_eq!(fetched.status, ConvoyStatus::EnRoute);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let store = ConvoyStore::new();
        let id = uuid::Uuid::new_v4();
        assert!(matches!(store.get(&id), Err(Error::NotFound { kind: "convoy", .. })));
        assert!(store.update(&id, ConvoyPatch::default()).is_err());
        assert!(store.subscribe(&id).is_err());
        assert!(store.remove(&id).is_err());
    }

    #[test]
    fn test_update_stamps_time_and_merges() {
        let (store, convoy) = store_with_convoy();
        let updated = store
            .update(&convoy.id, ConvoyPatch::status(ConvoyStatus::Halted))
            .unwrap();

        assert_eq!(updated.status, ConvoyStatus::Halted);
        assert_eq!(updated.current_path, convoy.current_path);
        assert!(updated.last_update_time >= convoy.last_update_time);
    }

    #[test]
    fn test_failed_modify_leaves_state() {
        let (store, convoy) = store_with_convoy();
        let result = store.modify(&convoy.id, |c| {
            c.current_path.clear();
            Err(Error::Validation("nope".into()))
        });

        assert!(result.is_err());
        assert_eq!(store.get(&convoy.id).unwrap().current_path, vec![1, 2, 3]);
    }

    #[test]
    fn test_clear_all() {
        let (store, _) = store_with_convoy();
        store.create("HAWK-3", vec![], Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.0));
        assert_eq!(store.clear_all(), 2);
        assert!(store.is_empty());
        assert!(store.list_all().is_empty());
    }

    #[test]
    fn test_concurrent_updates_never_tear() {
        let (store, convoy) = store_with_convoy();
        let store = Arc::new(store);
        let id = convoy.id;

        let a = ConvoyPatch {
            current_path: Some(vec![10, 11]),
            speed_kmph: Some(10.0),
            ..Default::default()
        };
        let b = ConvoyPatch {
            current_path: Some(vec![20, 21]),
            speed_kmph: Some(20.0),
            ..Default::default()
        };

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = Arc::clone(&store);
                let patch = if i % 2 == 0 { a.clone() } else { b.clone() };
                thread::spawn(move || store.update(&id, patch).map(|_| ()))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        let end = store.get(&id).unwrap();
        let from_a = end.current_path == vec![10, 11] && end.speed_kmph == 10.0;
        let from_b = end.current_path == vec![20, 21] && end.speed_kmph == 20.0;
        assert!(from_a || from_b);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates_after_subscribing() {
        let (store, convoy) = store_with_convoy();

        store
            .update(&convoy.id, ConvoyPatch::status(ConvoyStatus::Halted))
            .unwrap();
        let mut rx = store.subscribe(&convoy.id).unwrap();
        store
            .update(&convoy.id, ConvoyPatch::status(ConvoyStatus::EnRoute))
            .unwrap();

        // Only the post-subscription snapshot arrives.
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.status, ConvoyStatus::EnRoute);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscription_closes_on_remove() {
        let (store, convoy) = store_with_convoy();
        let mut rx = store.subscribe(&convoy.id).unwrap();
        store.remove(&convoy.id).unwrap();
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
