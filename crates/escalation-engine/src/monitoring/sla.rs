//! # SLA Monitor
//!
//! Tracks every open [`EscalationRecord`] and flags the ones that have run
//! past their tier's response target. A record breaches when
//! `now - started_at > sla_target_seconds`, strictly; it is flagged once, on
//! the first check after the deadline, however late that check runs.
//!
//! The monitor only observes. It marks records breached and publishes
//! `SlaBreach` (plus `ExecutiveAlert` for Black), and hands the breached
//! records back to the caller, which owns any reassignment policy.
//!
//! Checks are driven from two tick loops (see
//! [`EscalationRouter::start`](crate::orchestrator::EscalationRouter::start)):
//! Black records on a short tick, everything else on the normal tick. Every
//! check takes `now` explicitly, which keeps the breach rule testable without
//! sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::agent::AgentId;
use crate::config::TierPolicies;
use crate::monitoring::events::{EscalationEvent, EscalationEvents, EventKind};
use crate::types::{EscalationId, EscalationRecord, SupportTier};

/// Which records a tick looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickScope {
    /// Black records only (fast tick)
    BlackOnly,
    /// Every tier except Black (normal tick)
    StandardTiers,
    /// Everything
    All,
}

impl TickScope {
    pub fn covers(self, tier: SupportTier) -> bool {
        match self {
            TickScope::BlackOnly => tier == SupportTier::Black,
            TickScope::StandardTiers => tier != SupportTier::Black,
            TickScope::All => true,
        }
    }
}

/// SLA state of one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSlaStatus {
    pub tier: SupportTier,
    pub open_cases: usize,
    /// Elapsed seconds of the oldest open record, 0 when none
    pub oldest_elapsed_seconds: u64,
    pub target_seconds: u64,
    /// Breaches since start, open and closed records alike
    pub breach_count: u64,
    /// Open records currently past their target
    pub open_breached: usize,
}

/// SLA state of every tier, highest tier first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaStatus {
    pub generated_at: DateTime<Utc>,
    pub tiers: Vec<TierSlaStatus>,
}

impl SlaStatus {
    pub fn tier(&self, tier: SupportTier) -> Option<&TierSlaStatus> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}

/// Open-record tracker and breach detector
#[derive(Debug)]
pub struct SlaMonitor {
    open: DashMap<EscalationId, EscalationRecord>,
    breaches: [AtomicU64; 4],
    events: Arc<EscalationEvents>,
}

impl SlaMonitor {
    pub fn new(events: Arc<EscalationEvents>) -> Self {
        Self {
            open: DashMap::new(),
            breaches: Default::default(),
            events,
        }
    }

    /// Start watching a record
    pub fn track(&self, record: EscalationRecord) {
        self.open.insert(record.escalation_id, record);
    }

    /// Note the agent a tracked record was handed to
    pub fn mark_assigned(
        &self,
        escalation_id: &EscalationId,
        agent_id: &AgentId,
        at: DateTime<Utc>,
    ) -> Option<EscalationRecord> {
        let mut record = self.open.get_mut(escalation_id)?;
        record.assigned_agent_id = Some(agent_id.clone());
        record.assigned_at = Some(at);
        Some(record.value().clone())
    }

    /// Stop watching a record and return it closed
    pub fn close(
        &self,
        escalation_id: &EscalationId,
        at: DateTime<Utc>,
        withdrawn: bool,
    ) -> Option<EscalationRecord> {
        let (_, mut record) = self.open.remove(escalation_id)?;
        record.resolved_at = Some(at);
        record.withdrawn = withdrawn;
        Some(record)
    }

    pub fn get(&self, escalation_id: &EscalationId) -> Option<EscalationRecord> {
        self.open.get(escalation_id).map(|r| r.value().clone())
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Open records that hold an agent
    pub fn assigned_count(&self) -> usize {
        self.open.iter().filter(|r| r.assigned_agent_id.is_some()).count()
    }

    pub fn breach_count(&self, tier: SupportTier) -> u64 {
        self.breaches[tier.index()].load(Ordering::Relaxed)
    }

    pub fn total_breaches(&self) -> u64 {
        SupportTier::ALL.iter().map(|t| self.breach_count(*t)).sum()
    }

    /// Flag every in-scope record that is past its target and not yet flagged
    ///
    /// Returns the newly breached records.
    pub fn check_at(&self, now: DateTime<Utc>, scope: TickScope) -> Vec<EscalationRecord> {
        let mut breached = Vec::new();
        for mut record in self.open.iter_mut() {
            if record.breached || !scope.covers(record.tier) || !record.is_past_deadline(now) {
                continue;
            }
            record.breached = true;
            breached.push(record.value().clone());
        }

        for record in &breached {
            self.breaches[record.tier.index()].fetch_add(1, Ordering::Relaxed);
            let elapsed = record.elapsed_seconds(now);
            warn!(
                "⏰ SLA breach: case {} ({}) open {}s, target {}s",
                record.case_id, record.tier, elapsed, record.sla_target_seconds
            );
            self.events.publish(
                EscalationEvent::new(
                    EventKind::SlaBreach,
                    format!(
                        "Case {} exceeded its {}s {} target ({}s elapsed)",
                        record.case_id, record.sla_target_seconds, record.tier, elapsed
                    ),
                )
                .with_case(&record.case_id)
                .with_escalation(record.escalation_id)
                .with_tier(record.tier),
            );

            if record.tier == SupportTier::Black {
                error!("🚨 Executive alert: Black case {} breached SLA", record.case_id);
                self.events.publish(
                    EscalationEvent::new(
                        EventKind::ExecutiveAlert,
                        format!(
                            "Black tier case {} unanswered after {}s (target {}s)",
                            record.case_id, elapsed, record.sla_target_seconds
                        ),
                    )
                    .with_case(&record.case_id)
                    .with_escalation(record.escalation_id)
                    .with_tier(record.tier),
                );
            }
        }

        breached
    }

    /// Per-tier SLA picture at `now`
    pub fn status(&self, now: DateTime<Utc>, tiers: &TierPolicies) -> SlaStatus {
        let mut per_tier: Vec<TierSlaStatus> = SupportTier::ALL
            .iter()
            .rev()
            .map(|tier| TierSlaStatus {
                tier: *tier,
                open_cases: 0,
                oldest_elapsed_seconds: 0,
                target_seconds: tiers.sla_target_seconds(*tier),
                breach_count: self.breach_count(*tier),
                open_breached: 0,
            })
            .collect();

        for record in self.open.iter() {
            if let Some(status) = per_tier.iter_mut().find(|s| s.tier == record.tier) {
                status.open_cases += 1;
                status.oldest_elapsed_seconds =
                    status.oldest_elapsed_seconds.max(record.elapsed_seconds(now));
                if record.breached {
                    status.open_breached += 1;
                }
            }
        }

        SlaStatus {
            generated_at: now,
            tiers: per_tier,
        }
    }
}
