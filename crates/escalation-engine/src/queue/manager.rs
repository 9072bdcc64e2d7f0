//! # Tiered Queue Manager
//!
//! Four independent, bounded priority queues, one per [`SupportTier`]. Each
//! queue has its own lock, so traffic on one tier never contends with another.
//!
//! ## Ordering
//!
//! Entries leave a queue by highest priority first, then earliest
//! `enqueued_at`, then insertion sequence. Internally each queue is a
//! `BTreeMap` keyed on exactly that triple plus a `case_id -> key` index, so
//! withdrawal by id does not scan the queue.
//!
//! ## Examples
//!
//! ```rust
//! use escalation_engine::agent::LanguageCode;
//! use escalation_engine::queue::{QueueEntry, QueueManager};
//! use escalation_engine::routing::AgentRequirements;
//! use escalation_engine::types::{EscalationId, EscalationReason, Priority, SupportTier};
//!
//! # fn example() -> escalation_engine::Result<()> {
//! let queues = QueueManager::new(100);
//! let requirements = AgentRequirements::for_reason(
//!     EscalationReason::LowConfidence, SupportTier::Elite, LanguageCode::new("en"), false);
//! let entry = QueueEntry::new("case-1".into(), EscalationId::new(), SupportTier::Elite,
//!                             Priority::new(4)?, EscalationReason::LowConfidence, requirements);
//!
//! let position = queues.enqueue(entry)?;
//! assert_eq!(position, 1);
//! let next = queues.dequeue_next(SupportTier::Elite).expect("queued");
//! assert_eq!(next.case_id.0, "case-1");
//! # Ok(())
//! # }
//! ```

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EscalationError, Result};
use crate::routing::AgentRequirements;
use crate::types::{CaseId, EscalationId, EscalationReason, Priority, SupportTier};

/// A case waiting for an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub case_id: CaseId,
    pub escalation_id: EscalationId,
    pub tier: SupportTier,
    pub priority: Priority,
    pub reason: EscalationReason,
    pub enqueued_at: DateTime<Utc>,
    /// What the case needs from whoever picks it up
    pub requirements: AgentRequirements,
}

impl QueueEntry {
    pub fn new(
        case_id: CaseId,
        escalation_id: EscalationId,
        tier: SupportTier,
        priority: Priority,
        reason: EscalationReason,
        requirements: AgentRequirements,
    ) -> Self {
        Self {
            case_id,
            escalation_id,
            tier,
            priority,
            reason,
            enqueued_at: Utc::now(),
            requirements,
        }
    }

    pub fn wait_seconds(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.enqueued_at).num_seconds().max(0) as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    priority: Reverse<Priority>,
    enqueued_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Debug, Default)]
struct TierQueue {
    entries: BTreeMap<QueueKey, QueueEntry>,
    index: HashMap<CaseId, QueueKey>,
}

impl TierQueue {
    fn remove_key(&mut self, key: &QueueKey) -> Option<QueueEntry> {
        let entry = self.entries.remove(key)?;
        self.index.remove(&entry.case_id);
        Some(entry)
    }
}

/// Point-in-time statistics of one tier queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub tier: SupportTier,
    pub size: usize,
    pub capacity: usize,
    pub longest_wait_seconds: u64,
    pub average_wait_seconds: u64,
    /// Entry counts indexed by priority - 1
    pub by_priority: [usize; 5],
}

/// Owner of the four tier queues
#[derive(Debug)]
pub struct QueueManager {
    queues: [Mutex<TierQueue>; 4],
    capacity: usize,
    seq: AtomicU64,
}

impl QueueManager {
    /// Create four empty queues, each holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            queues: Default::default(),
            capacity,
            seq: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn queue(&self, tier: SupportTier) -> &Mutex<TierQueue> {
        &self.queues[tier.index()]
    }

    /// Add an entry to its tier's queue
    ///
    /// Returns the 1-based position the entry now holds. Fails with
    /// [`EscalationError::QueueOverflow`] when the queue is at capacity and with
    /// `AlreadyExists` when the case is already queued.
    pub fn enqueue(&self, entry: QueueEntry) -> Result<usize> {
        let tier = entry.tier;
        let mut queue = self.queue(tier).lock();

        if queue.index.contains_key(&entry.case_id) {
            warn!("📋 Case {} already queued in {}, not re-queuing", entry.case_id, tier);
            return Err(EscalationError::already_exists(format!(
                "Case {} already queued",
                entry.case_id
            )));
        }

        if queue.entries.len() >= self.capacity {
            warn!(
                "🚫 {} queue full ({} entries), rejecting case {}",
                tier, self.capacity, entry.case_id
            );
            return Err(EscalationError::QueueOverflow {
                tier,
                capacity: self.capacity,
            });
        }

        let key = QueueKey {
            priority: Reverse(entry.priority),
            enqueued_at: entry.enqueued_at,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };
        let position = queue.entries.range(..key).count() + 1;
        info!(
            "📋 Queued case {} in {} ({}, position {}/{})",
            entry.case_id,
            tier,
            entry.priority,
            position,
            queue.entries.len() + 1
        );
        queue.index.insert(entry.case_id.clone(), key);
        queue.entries.insert(key, entry);
        Ok(position)
    }

    /// Remove and return the next entry of a tier
    pub fn dequeue_next(&self, tier: SupportTier) -> Option<QueueEntry> {
        let mut queue = self.queue(tier).lock();
        let key = *queue.entries.keys().next()?;
        let entry = queue.remove_key(&key);
        if let Some(entry) = &entry {
            debug!(
                "📤 Dequeued case {} from {} (remaining: {})",
                entry.case_id,
                tier,
                queue.entries.len()
            );
        }
        entry
    }

    /// Remove and return the first entry, in queue order, accepted by `claim`
    ///
    /// `claim` runs under the tier lock and may take resources (such as an
    /// agent reservation) for the entry it accepts; the entry is removed
    /// exactly when `claim` returns `true`, and `claim` is not called again
    /// after that.
    pub fn dequeue_first_matching<F>(&self, tier: SupportTier, mut claim: F) -> Option<QueueEntry>
    where
        F: FnMut(&QueueEntry) -> bool,
    {
        let mut queue = self.queue(tier).lock();
        let key = queue
            .entries
            .iter()
            .find(|(_, entry)| claim(*entry))
            .map(|(key, _)| *key)?;
        let entry = queue.remove_key(&key);
        if let Some(entry) = &entry {
            debug!(
                "📤 Matched case {} in {} (remaining: {})",
                entry.case_id,
                tier,
                queue.entries.len()
            );
        }
        entry
    }

    /// Remove a specific case from a tier queue
    pub fn withdraw(&self, tier: SupportTier, case_id: &CaseId) -> Option<QueueEntry> {
        let mut queue = self.queue(tier).lock();
        let key = *queue.index.get(case_id)?;
        let entry = queue.remove_key(&key);
        if entry.is_some() {
            info!("↩️ Withdrew case {} from {} queue", case_id, tier);
        }
        entry
    }

    /// 1-based position of a queued case
    pub fn position_of(&self, tier: SupportTier, case_id: &CaseId) -> Option<usize> {
        let queue = self.queue(tier).lock();
        let key = *queue.index.get(case_id)?;
        Some(queue.entries.range(..key).count() + 1)
    }

    pub fn contains(&self, tier: SupportTier, case_id: &CaseId) -> bool {
        self.queue(tier).lock().index.contains_key(case_id)
    }

    pub fn len(&self, tier: SupportTier) -> usize {
        self.queue(tier).lock().entries.len()
    }

    pub fn is_empty(&self, tier: SupportTier) -> bool {
        self.len(tier) == 0
    }

    pub fn is_full(&self, tier: SupportTier) -> bool {
        self.len(tier) >= self.capacity
    }

    pub fn total_queued(&self) -> usize {
        SupportTier::ALL.iter().map(|t| self.len(*t)).sum()
    }

    /// Entries of a tier in dequeue order
    pub fn snapshot(&self, tier: SupportTier) -> Vec<QueueEntry> {
        self.queue(tier).lock().entries.values().cloned().collect()
    }

    pub fn get_queue_stats(&self, tier: SupportTier, now: DateTime<Utc>) -> QueueStats {
        let queue = self.queue(tier).lock();
        let size = queue.entries.len();
        let mut by_priority = [0usize; 5];
        let mut total_wait = 0u64;
        let mut longest = 0u64;
        for entry in queue.entries.values() {
            by_priority[(entry.priority.value() - 1) as usize] += 1;
            let wait = entry.wait_seconds(now);
            total_wait += wait;
            longest = longest.max(wait);
        }
        QueueStats {
            tier,
            size,
            capacity: self.capacity,
            longest_wait_seconds: longest,
            average_wait_seconds: if size > 0 { total_wait / size as u64 } else { 0 },
            by_priority,
        }
    }
}
