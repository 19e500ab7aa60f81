//! Per-segment serialization of risk read-modify-write

use convoy_network::SegmentId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async lock table
///
/// Pipelines touching the same segment queue up on its lock; disjoint
/// segment sets never wait on each other.
#[derive(Default)]
pub struct SegmentLocks {
    table: Mutex<HashMap<SegmentId, Arc<AsyncMutex<()>>>>,
}

impl SegmentLocks {
    /// Empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one segment.
    pub async fn acquire(&self, segment_id: SegmentId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(table.entry(segment_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of segments that have been locked at least once
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True before any segment has been locked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
