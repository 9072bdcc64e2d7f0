//! # Escalation Analytics
//!
//! Counters and a bounded history of closed escalations, folded into an
//! [`AnalyticsReport`] on demand.
//!
//! SLA compliance is `1 - (breached + dropped) / total_escalations`, counting
//! every escalation ever accepted (open or closed). A dropped case never
//! reaches the SLA monitor, so it is counted as a miss here; with no
//! escalations the rate is 1.0.
//! Average resolution time only covers records an agent resolved, not
//! withdrawn ones.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::{EscalationRecord, SupportTier};

/// Per-tier totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TierAnalytics {
    pub escalations: u64,
    pub resolutions: u64,
    pub withdrawals: u64,
    pub breaches: u64,
    pub queue_overflows: u64,
}

/// Aggregated analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub total_escalations: u64,
    /// Messages answered without a human
    pub auto_resolved: u64,
    pub by_tier: HashMap<SupportTier, TierAnalytics>,
    pub queue_overflows: u64,
    pub service_unavailable: u64,
    /// Cases dropped because both queue and backlog were full
    pub dropped: u64,
    /// Mean seconds from escalation to resolution, 0.0 when none resolved
    pub average_resolution_seconds: f64,
    /// Fraction of escalations that met their SLA, 0.0..=1.0
    pub sla_compliance_rate: f64,
}

#[derive(Debug, Default)]
struct AnalyticsState {
    auto_resolved: u64,
    tiers: [TierAnalytics; 4],
    service_unavailable: u64,
    dropped: u64,
    resolved_count: u64,
    cumulative_resolution_seconds: f64,
    history: VecDeque<EscalationRecord>,
}

/// Running escalation analytics
#[derive(Debug)]
pub struct EscalationAnalytics {
    state: Mutex<AnalyticsState>,
    history_size: usize,
}

impl EscalationAnalytics {
    pub fn new(history_size: usize) -> Self {
        Self {
            state: Mutex::new(AnalyticsState::default()),
            history_size,
        }
    }

    pub fn record_auto_resolved(&self) {
        self.state.lock().auto_resolved += 1;
    }

    pub fn record_escalation(&self, tier: SupportTier) {
        self.state.lock().tiers[tier.index()].escalations += 1;
    }

    pub fn record_queue_overflow(&self, tier: SupportTier) {
        self.state.lock().tiers[tier.index()].queue_overflows += 1;
    }

    pub fn record_service_unavailable(&self, dropped: bool) {
        let mut state = self.state.lock();
        state.service_unavailable += 1;
        if dropped {
            state.dropped += 1;
        }
    }

    /// Fold a closed record into the totals and the bounded history
    pub fn record_closed(&self, record: EscalationRecord) {
        let mut state = self.state.lock();
        let tier = &mut state.tiers[record.tier.index()];
        if record.withdrawn {
            tier.withdrawals += 1;
        } else {
            tier.resolutions += 1;
        }
        if !record.withdrawn {
            if let Some(seconds) = record.resolution_seconds() {
                state.resolved_count += 1;
                state.cumulative_resolution_seconds += seconds;
            }
        }
        if self.history_size > 0 {
            if state.history.len() >= self.history_size {
                state.history.pop_front();
            }
            state.history.push_back(record);
        }
    }

    /// Closed records, oldest first
    pub fn closed_history(&self) -> Vec<EscalationRecord> {
        self.state.lock().history.iter().cloned().collect()
    }

    /// Build a report; `breaches` holds per-tier breach counts indexed by
    /// [`SupportTier::index`]
    pub fn report(&self, now: DateTime<Utc>, breaches: [u64; 4]) -> AnalyticsReport {
        let state = self.state.lock();
        let mut by_tier = HashMap::new();
        let mut total_escalations = 0;
        let mut queue_overflows = 0;
        for tier in SupportTier::ALL {
            let mut totals = state.tiers[tier.index()];
            totals.breaches = breaches[tier.index()];
            total_escalations += totals.escalations;
            queue_overflows += totals.queue_overflows;
            by_tier.insert(tier, totals);
        }
        let missed: u64 = breaches.iter().sum::<u64>() + state.dropped;

        let average_resolution_seconds = if state.resolved_count > 0 {
            state.cumulative_resolution_seconds / state.resolved_count as f64
        } else {
            0.0
        };
        let sla_compliance_rate = if total_escalations > 0 {
            (1.0 - missed as f64 / total_escalations as f64).clamp(0.0, 1.0)
        } else {
            1.0
        };

        AnalyticsReport {
            generated_at: now,
            total_escalations,
            auto_resolved: state.auto_resolved,
            by_tier,
            queue_overflows,
            service_unavailable: state.service_unavailable,
            dropped: state.dropped,
            average_resolution_seconds,
            sla_compliance_rate,
        }
    }
}
