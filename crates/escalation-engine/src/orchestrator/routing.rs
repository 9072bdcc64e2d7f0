//! Inbound routing and queue draining
//!
//! Lock order is case entry, then tier queue, then agent. A case entry is
//! never held while anything else takes a case entry, so every drain path
//! releases the queue before it touches the case map.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use crate::agent::AgentId;
use crate::error::{EscalationError, Result};
use crate::integration::{AgentAssignment, ClassifiedMessage, DispatchJob, UserNotice};
use crate::monitoring::{EscalationEvent, EventKind};
use crate::queue::QueueEntry;
use crate::routing::{decide, select_best_agent, AgentRequirements};
use crate::types::{CaseId, EscalationId, EscalationReason, EscalationRecord, SupportTier};

use super::core::EscalationRouter;
use super::types::{CaseInfo, CaseState, Disposition, RoutingOutcome};

enum Placement {
    Assigned(AgentId),
    Queued(usize),
    Deferred,
    Dropped,
    Withdrawn,
}

impl EscalationRouter {
    /// Decide whether a classified message needs a human and, if so, get it
    /// to one
    ///
    /// Errors (bad confidence, duplicate case id) are returned before any
    /// state changes. Every other outcome, including a full queue, is a
    /// [`Disposition`].
    pub async fn route(
        &self,
        message: &ClassifiedMessage,
        tier: SupportTier,
    ) -> Result<RoutingOutcome> {
        self.route_at(message, tier, Utc::now())
    }

    /// Like [`route`](Self::route), looking the tier up in the configured
    /// [`TierDirectory`](crate::integration::TierDirectory)
    ///
    /// Unknown users are served as Lite.
    pub async fn route_for_user(&self, message: &ClassifiedMessage) -> Result<RoutingOutcome> {
        let directory = self
            .tier_directory
            .as_ref()
            .ok_or_else(|| EscalationError::configuration("No tier directory configured"))?;
        let tier = match directory.get_tier(&message.user_id).await? {
            Some(tier) => tier,
            None => {
                debug!("User {} has no tier on record, serving as Lite", message.user_id);
                SupportTier::Lite
            }
        };
        self.route_at(message, tier, Utc::now())
    }

    fn route_at(
        &self,
        message: &ClassifiedMessage,
        tier: SupportTier,
        now: DateTime<Utc>,
    ) -> Result<RoutingOutcome> {
        let case_id = message.case_id.clone();
        let computed = self.calculator.calculate_priority(&message.text, tier);
        let hint = if self.calculator.detect_emergency(&message.text) {
            Some(EscalationReason::EmergencyDetected)
        } else {
            message.effective_hint()
        };
        let decision = decide(
            &self.config.tiers,
            message.classification.confidence,
            hint,
            tier,
            computed,
        )?;

        match self.cases.entry(case_id.clone()) {
            Entry::Occupied(_) => {
                return Err(EscalationError::already_exists(format!(
                    "Case {} is already being handled",
                    case_id
                )));
            }
            Entry::Vacant(vacant) => {
                let mut info = vacant.insert(CaseInfo {
                    case_id: case_id.clone(),
                    user_id: message.user_id.clone(),
                    tier,
                    state: CaseState::Received,
                    priority: decision.target_priority,
                    reason: None,
                    escalation_id: None,
                    requirements: None,
                    agent_id: None,
                    received_at: now,
                    assigned_at: None,
                });
                info.state = CaseState::Evaluated;
            }
        }

        let priority = decision.target_priority;
        let reason = match decision.reason {
            Some(reason) if decision.escalate => reason,
            _ => {
                self.cases.remove(&case_id);
                self.remember_closed(case_id.clone(), CaseState::AutoResolved);
                self.analytics.record_auto_resolved();
                self.publish(
                    EscalationEvent::new(
                        EventKind::AutoResolved,
                        format!("Case {} answered automatically", case_id),
                    )
                    .with_case(&case_id)
                    .with_tier(tier),
                );
                debug!(
                    "Case {} auto-resolved ({} confidence {:.2})",
                    case_id, tier, message.classification.confidence
                );
                return Ok(RoutingOutcome::new(case_id, Disposition::AutoResolved, priority));
            }
        };

        let requirements = AgentRequirements::for_reason(
            reason,
            tier,
            message.classification.language.clone(),
            priority > self.config.tiers.base_priority(tier),
        );
        let sla_target = self.config.tiers.sla_target_seconds(tier);
        let record =
            EscalationRecord::new(case_id.clone(), tier, priority, reason, sla_target, now);
        let escalation_id = record.escalation_id;

        self.analytics.record_escalation(tier);
        self.publish(
            EscalationEvent::new(
                EventKind::EscalationCreated,
                format!("Case {} escalated: {} (priority {})", case_id, reason, priority),
            )
            .with_case(&case_id)
            .with_escalation(escalation_id)
            .with_tier(tier),
        );
        info!("🔔 Escalating case {} ({}, {}, priority {})", case_id, tier, reason, priority);

        let placement = self.place(&case_id, record, &requirements, now)?;

        let mut outcome = RoutingOutcome::new(case_id.clone(), Disposition::Queued, priority);
        outcome.escalated = true;
        outcome.reason = Some(reason);
        outcome.escalation_id = Some(escalation_id);

        match placement {
            Placement::Assigned(agent_id) => {
                self.announce_assignment(&case_id, escalation_id, tier, &agent_id);
                outcome.disposition = Disposition::Assigned;
                outcome.agent_id = Some(agent_id);
                outcome.estimated_response_seconds = Some(0);
            }
            Placement::Queued(position) => {
                self.publish(
                    EscalationEvent::new(
                        EventKind::CaseQueued,
                        format!("Case {} queued at position {}", case_id, position),
                    )
                    .with_case(&case_id)
                    .with_escalation(escalation_id)
                    .with_tier(tier),
                );

                // An agent may have freed up between selection and enqueue
                self.rebalance_tier(tier, now);

                let assigned_to = self
                    .cases
                    .get(&case_id)
                    .filter(|info| info.state == CaseState::Assigned)
                    .and_then(|info| info.agent_id.clone());
                if let Some(agent_id) = assigned_to {
                    outcome.disposition = Disposition::Assigned;
                    outcome.agent_id = Some(agent_id);
                    outcome.estimated_response_seconds = Some(0);
                } else {
                    let position = self.queues.position_of(tier, &case_id).unwrap_or(position);
                    let wait = self.estimated_wait(tier, position);
                    self.dispatch(DispatchJob::NotifyUser {
                        case_id: case_id.clone(),
                        notice: UserNotice::Queued {
                            position,
                            estimated_wait_seconds: wait,
                        },
                    });
                    outcome.queued = true;
                    outcome.queue_position = Some(position);
                    outcome.estimated_response_seconds = Some(wait);
                }
            }
            Placement::Deferred => {
                // a slot may have freed between the failed enqueue and the deferral
                self.rebalance_tier(tier, now);
                let current = self
                    .cases
                    .get(&case_id)
                    .map(|info| (info.state, info.agent_id.clone()));
                match current {
                    Some((CaseState::Assigned, agent_id)) => {
                        outcome.disposition = Disposition::Assigned;
                        outcome.agent_id = agent_id;
                        outcome.estimated_response_seconds = Some(0);
                    }
                    Some((CaseState::Queued, _)) => {
                        let position = self.queues.position_of(tier, &case_id).unwrap_or(1);
                        outcome.queued = true;
                        outcome.queue_position = Some(position);
                        outcome.estimated_response_seconds =
                            Some(self.estimated_wait(tier, position));
                    }
                    _ => {
                        self.analytics.record_service_unavailable(false);
                        self.publish(
                            EscalationEvent::new(
                                EventKind::CaseDeferred,
                                format!(
                                    "Case {} parked until a {} queue slot frees",
                                    case_id, tier
                                ),
                            )
                            .with_case(&case_id)
                            .with_escalation(escalation_id)
                            .with_tier(tier),
                        );
                        self.dispatch(DispatchJob::NotifyUser {
                            case_id: case_id.clone(),
                            notice: UserNotice::PleaseHold { retry_scheduled: true },
                        });
                        outcome.disposition = Disposition::ServiceUnavailable;
                        outcome.retry_scheduled = true;
                        outcome.estimated_response_seconds = Some(sla_target);
                    }
                }
            }
            Placement::Dropped => {
                self.analytics.record_service_unavailable(true);
                self.remember_closed(case_id.clone(), CaseState::Dropped);
                warn!("⚠️ Case {} dropped: {} queue and backlog are full", case_id, tier);
                self.publish(
                    EscalationEvent::new(
                        EventKind::ServiceUnavailable,
                        format!("No room for case {} in {} queue or backlog", case_id, tier),
                    )
                    .with_case(&case_id)
                    .with_escalation(escalation_id)
                    .with_tier(tier),
                );
                self.dispatch(DispatchJob::NotifyUser {
                    case_id: case_id.clone(),
                    notice: UserNotice::PleaseHold { retry_scheduled: false },
                });
                outcome.disposition = Disposition::ServiceUnavailable;
            }
            Placement::Withdrawn => {
                debug!("Case {} withdrawn while routing", case_id);
                outcome.disposition = Disposition::Withdrawn;
            }
        }

        Ok(outcome)
    }

    /// Assign, queue, defer or drop an escalated case
    ///
    /// Runs under the case entry so a concurrent withdrawal either happens
    /// before (and we back out) or after (and sees the final state).
    fn place(
        &self,
        case_id: &CaseId,
        mut record: EscalationRecord,
        requirements: &AgentRequirements,
        now: DateTime<Utc>,
    ) -> Result<Placement> {
        let tier = record.tier;
        let reserved = self.reserve_agent(requirements);

        let Some(mut info) = self.cases.get_mut(case_id) else {
            if let Some(agent_id) = reserved {
                self.registry.release(&agent_id);
                self.drain_for_agent(&agent_id, now);
            }
            return Ok(Placement::Withdrawn);
        };
        info.reason = Some(record.reason);
        info.escalation_id = Some(record.escalation_id);
        info.requirements = Some(requirements.clone());

        if let Some(agent_id) = reserved {
            info.state = CaseState::Assigned;
            info.agent_id = Some(agent_id.clone());
            info.assigned_at = Some(now);
            record.assigned_agent_id = Some(agent_id.clone());
            record.assigned_at = Some(now);
            self.sla.track(record.clone());
            self.dispatch(DispatchJob::PersistCreated(record));
            return Ok(Placement::Assigned(agent_id));
        }

        let entry = QueueEntry::new(
            case_id.clone(),
            record.escalation_id,
            tier,
            record.priority,
            record.reason,
            requirements.clone(),
        );
        // older deferred cases keep their place in line
        if self.backlog.is_empty(tier) {
            match self.queues.enqueue(entry.clone()) {
                Ok(position) => {
                    info.state = CaseState::Queued;
                    self.sla.track(record.clone());
                    self.dispatch(DispatchJob::PersistCreated(record));
                    return Ok(Placement::Queued(position));
                }
                Err(EscalationError::QueueOverflow { .. }) => self.note_overflow(tier, case_id),
                Err(e) => {
                    drop(info);
                    self.cases.remove(case_id);
                    return Err(e);
                }
            }
        } else if self.queues.is_full(tier) {
            self.note_overflow(tier, case_id);
        }

        match self.backlog.defer(entry) {
            Ok(_) => {
                info.state = CaseState::Deferred;
                self.sla.track(record.clone());
                self.dispatch(DispatchJob::PersistCreated(record));
                Ok(Placement::Deferred)
            }
            Err(entry) => match self.queues.enqueue(entry) {
                // a slot freed while the backlog filled up
                Ok(position) => {
                    info.state = CaseState::Queued;
                    self.sla.track(record.clone());
                    self.dispatch(DispatchJob::PersistCreated(record));
                    Ok(Placement::Queued(position))
                }
                Err(_) => {
                    info.state = CaseState::Dropped;
                    drop(info);
                    self.cases.remove(case_id);
                    Ok(Placement::Dropped)
                }
            },
        }
    }

    fn note_overflow(&self, tier: SupportTier, case_id: &CaseId) {
        self.analytics.record_queue_overflow(tier);
        self.publish(
            EscalationEvent::new(
                EventKind::QueueOverflow,
                format!("{} queue full, case {} cannot be queued", tier, case_id),
            )
            .with_case(case_id)
            .with_tier(tier),
        );
    }

    /// Select and reserve an agent
    ///
    /// A lost reservation means someone else took that capacity, so
    /// reselecting always converges: either a reservation succeeds or no
    /// candidate is left.
    pub(super) fn reserve_agent(&self, requirements: &AgentRequirements) -> Option<AgentId> {
        loop {
            let agent = select_best_agent(&self.registry, requirements)?;
            if self.registry.try_reserve(&agent.id) {
                return Some(agent.id);
            }
            debug!("Reservation of {} lost a race, reselecting", agent.id);
        }
    }

    /// Estimated seconds until a human picks up a case at `position`
    pub(super) fn estimated_wait(&self, tier: SupportTier, position: usize) -> u64 {
        let per_case = self.config.queues.estimated_handle_seconds;
        (position as u64)
            .saturating_mul(per_case)
            .min(self.config.tiers.sla_target_seconds(tier))
    }

    fn announce_assignment(
        &self,
        case_id: &CaseId,
        escalation_id: EscalationId,
        tier: SupportTier,
        agent_id: &AgentId,
    ) {
        let Some(info) = self.cases.get(case_id).map(|c| c.value().clone()) else {
            return;
        };
        info!("👤 Case {} assigned to agent {}", case_id, agent_id);
        self.publish(
            EscalationEvent::new(
                EventKind::AgentAssigned,
                format!("Case {} assigned to {}", case_id, agent_id),
            )
            .with_case(case_id)
            .with_escalation(escalation_id)
            .with_tier(tier)
            .with_agent(agent_id),
        );
        self.dispatch(DispatchJob::NotifyAgent {
            agent_id: agent_id.clone(),
            assignment: AgentAssignment {
                case_id: case_id.clone(),
                escalation_id,
                tier,
                priority: info.priority,
                reason: info.reason.unwrap_or(EscalationReason::LowConfidence),
            },
        });
        self.dispatch(DispatchJob::NotifyUser {
            case_id: case_id.clone(),
            notice: UserNotice::AgentAssigned {
                agent_id: agent_id.clone(),
            },
        });
    }

    /// Hand a dequeued entry to an agent already reserved for it
    ///
    /// If the case was withdrawn in the meantime the reservation is given
    /// back and `false` returned.
    pub(super) fn complete_assignment(
        &self,
        entry: QueueEntry,
        agent_id: &AgentId,
        now: DateTime<Utc>,
    ) -> bool {
        let assigned = match self.cases.get_mut(&entry.case_id) {
            Some(mut info) if info.state == CaseState::Queued => {
                info.state = CaseState::Assigned;
                info.agent_id = Some(agent_id.clone());
                info.assigned_at = Some(now);
                if let Some(record) = self.sla.mark_assigned(&entry.escalation_id, agent_id, now) {
                    self.dispatch(DispatchJob::PersistUpdated(record));
                }
                true
            }
            _ => false,
        };
        if !assigned {
            debug!("Case {} left the queue before agent {} got it", entry.case_id, agent_id);
            self.registry.release(agent_id);
            return false;
        }
        self.announce_assignment(&entry.case_id, entry.escalation_id, entry.tier, agent_id);
        true
    }

    /// Offer queued cases to an agent with fresh capacity, top tier first
    pub(super) fn drain_for_agent(&self, agent_id: &AgentId, now: DateTime<Utc>) {
        let Some(agent) = self.registry.snapshot(agent_id) else {
            return;
        };
        if !agent.is_available {
            return;
        }
        for tier in SupportTier::ALL.iter().rev().copied() {
            if !agent.is_cleared_for(tier) {
                continue;
            }
            while let Some(entry) = self.queues.dequeue_first_matching(tier, |entry| {
                entry.requirements.language_compatible(&agent)
                    && self.registry.try_reserve(agent_id)
            }) {
                self.complete_assignment(entry, agent_id, now);
            }
            self.rebalance_tier(tier, now);
        }
    }

    /// Assign waiting cases of one tier to whoever can take them
    ///
    /// Returns the number of cases assigned.
    pub(super) fn assign_waiting_in_tier(&self, tier: SupportTier, now: DateTime<Utc>) -> usize {
        let mut assigned = 0;
        while !self.queues.is_empty(tier) && self.registry.get_statistics().idle_capacity > 0 {
            let mut chosen: Option<AgentId> = None;
            let claimed = self.queues.dequeue_first_matching(tier, |entry| {
                match self.reserve_agent(&entry.requirements) {
                    Some(agent_id) => {
                        chosen = Some(agent_id);
                        true
                    }
                    None => false,
                }
            });
            match (claimed, chosen) {
                (Some(entry), Some(agent_id)) => {
                    if self.complete_assignment(entry, &agent_id, now) {
                        assigned += 1;
                    }
                }
                _ => break,
            }
        }
        assigned
    }

    /// Move one deferred case into its tier queue
    ///
    /// Returns `false` when the backlog is empty or the queue had no room.
    pub(super) fn promote_deferred(&self, tier: SupportTier) -> bool {
        let Some(entry) = self.backlog.pop(tier) else {
            return false;
        };
        let Some(mut info) = self
            .cases
            .get_mut(&entry.case_id)
            .filter(|info| info.state == CaseState::Deferred)
        else {
            // withdrawn while parked
            return true;
        };
        let case_id = entry.case_id.clone();
        let escalation_id = entry.escalation_id;
        match self.queues.enqueue(entry.clone()) {
            Ok(position) => {
                info.state = CaseState::Queued;
                drop(info);
                debug!("Deferred case {} promoted to {} queue at {}", case_id, tier, position);
                self.publish(
                    EscalationEvent::new(
                        EventKind::CaseQueued,
                        format!("Deferred case {} queued at position {}", case_id, position),
                    )
                    .with_case(&case_id)
                    .with_escalation(escalation_id)
                    .with_tier(tier),
                );
                self.dispatch(DispatchJob::NotifyUser {
                    case_id,
                    notice: UserNotice::Queued {
                        position,
                        estimated_wait_seconds: self.estimated_wait(tier, position),
                    },
                });
                true
            }
            Err(_) => {
                drop(info);
                self.backlog.restore(entry);
                false
            }
        }
    }

    /// Refill a tier queue from its backlog and assign what can be assigned
    pub(super) fn rebalance_tier(&self, tier: SupportTier, now: DateTime<Utc>) {
        loop {
            let mut promoted = 0;
            while !self.queues.is_full(tier) && self.promote_deferred(tier) {
                promoted += 1;
            }
            let assigned = self.assign_waiting_in_tier(tier, now);
            if promoted == 0 && assigned == 0 {
                break;
            }
        }
    }
}
