//! # Deferred Backlog
//!
//! When a tier queue is full and nobody is free, a case is not lost
//! immediately: it is parked here, FIFO per tier, and promoted into the queue
//! as soon as a slot frees up. The backlog is bounded as well; once it is
//! full the router reports the case as dropped.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::queue::QueueEntry;
use crate::types::{CaseId, SupportTier};

/// Bounded per-tier backlog of cases waiting for a queue slot
#[derive(Debug)]
pub struct DeferredBacklog {
    tiers: [Mutex<VecDeque<QueueEntry>>; 4],
    capacity: usize,
}

impl DeferredBacklog {
    /// `capacity` of 0 disables deferral entirely
    pub fn new(capacity: usize) -> Self {
        Self {
            tiers: Default::default(),
            capacity,
        }
    }

    /// Park an entry; returns it back if the backlog is full
    pub fn defer(&self, entry: QueueEntry) -> std::result::Result<usize, QueueEntry> {
        let mut backlog = self.tiers[entry.tier.index()].lock();
        if backlog.len() >= self.capacity {
            warn!("🚫 {} backlog full, dropping case {}", entry.tier, entry.case_id);
            return Err(entry);
        }
        info!("⏸️ Deferred case {} in {} backlog", entry.case_id, entry.tier);
        backlog.push_back(entry);
        Ok(backlog.len())
    }

    /// Oldest deferred entry of a tier
    pub fn pop(&self, tier: SupportTier) -> Option<QueueEntry> {
        let entry = self.tiers[tier.index()].lock().pop_front();
        if let Some(entry) = &entry {
            debug!("Promoting deferred case {} in {}", entry.case_id, tier);
        }
        entry
    }

    /// Put an entry back at the head, used when promotion loses a race
    pub fn restore(&self, entry: QueueEntry) {
        self.tiers[entry.tier.index()].lock().push_front(entry);
    }

    pub fn remove(&self, tier: SupportTier, case_id: &CaseId) -> Option<QueueEntry> {
        let mut backlog = self.tiers[tier.index()].lock();
        let index = backlog.iter().position(|e| &e.case_id == case_id)?;
        backlog.remove(index)
    }

    pub fn len(&self, tier: SupportTier) -> usize {
        self.tiers[tier.index()].lock().len()
    }

    pub fn is_empty(&self, tier: SupportTier) -> bool {
        self.len(tier) == 0
    }
}
