// src/cache/inflight.rs
//! Per-content-hash serialization of submissions.
//!
//! Concurrent submissions of the same posting would all miss the exact-match
//! cache and each pay for a fresh analysis. Holding a permit for the hash
//! around the lookup, analysis and persist steps makes the followers wait for the leader
//! and then hit the record it wrote.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

#[derive(Debug, Default)]
pub struct InFlightGuards {
    slots: Mutex<HashMap<String, Slot>>,
}

impl InFlightGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder owns `key`, then own it until the permit drops.
    pub async fn acquire(&self, key: &str) -> InFlightPermit<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = slot.clone().lock_owned().await;

        InFlightPermit {
            guards: self,
            key: key.to_string(),
            slot,
            guard: Some(guard),
        }
    }

    /// Number of hashes currently held or awaited.
    pub fn in_flight(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

pub struct InFlightPermit<'a> {
    guards: &'a InFlightGuards,
    key: String,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InFlightPermit<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut slots = self.guards.slots.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map and this permit still reference the slot: nobody is waiting.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}
