//! Latest-reading cache shared between the ingest task and the HTTP handlers

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;
use super::reading::SensorReading;

#[derive(Default)]
struct Slot {
    reading: SensorReading,
    updated_at: Option<SystemTime>,
    update_count: u64,
}

/// Single-slot store holding the most recent [`SensorReading`].
///
/// Cloning the cache clones the handle, not the reading: every clone sees the
/// same slot. Writers replace the whole reading under the lock, so a
/// [`snapshot`](ReadingCache::snapshot) never observes a half-written record.
#[derive(Clone, Default)]
pub struct ReadingCache {
    slot: Arc<Mutex<Slot>>,
}

impl ReadingCache {
    /// Create a cache holding the zero-valued reading
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored reading (called from the ingest loop)
    pub fn update(&self, reading: SensorReading) {
        let mut slot = self.lock();
        slot.reading = reading;
        slot.updated_at = Some(SystemTime::now());
        slot.update_count += 1;
    }

    /// Get a copy of the current reading
    pub fn snapshot(&self) -> SensorReading {
        self.lock().reading.clone()
    }

    /// Wall-clock time of the last update, `None` until the first one
    pub fn updated_at(&self) -> Option<SystemTime> {
        self.lock().updated_at
    }

    pub fn update_count(&self) -> u64 {
        self.lock().update_count
    }

    // A panic while holding the guard can only happen between plain field
    // assignments, so the slot is still a whole reading: keep serving it.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
