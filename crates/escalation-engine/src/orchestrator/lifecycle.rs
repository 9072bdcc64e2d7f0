//! Case lifecycle: resolution, withdrawal and SLA supervision
//!
//! The SLA loops hold a weak reference to the router so dropping the last
//! handle ends them even without [`EscalationRouter::shutdown`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::agent::AgentId;
use crate::error::{EscalationError, Result};
use crate::integration::{DispatchJob, ExecutiveNotice, UserNotice};
use crate::monitoring::{EscalationEvent, EventKind, TickScope};
use crate::routing::select_best_agent_any_language;
use crate::types::{CaseId, EscalationRecord, SupportTier};

use super::core::EscalationRouter;
use super::types::CaseState;

impl EscalationRouter {
    /// Spawn the SLA tick loops: Black on the fast interval, every other
    /// tier on the normal one
    pub fn start(self: &Arc<Self>) {
        let mut tasks = self.sla_tasks.lock();
        if !tasks.is_empty() {
            warn!("⚠️ SLA monitoring already running");
            return;
        }
        let monitoring = &self.config.monitoring;
        tasks.push(self.spawn_sla_loop(monitoring.black_check_interval(), TickScope::BlackOnly));
        tasks.push(self.spawn_sla_loop(monitoring.sla_check_interval(), TickScope::StandardTiers));
        info!(
            "🚀 SLA monitoring started (Black every {}s, others every {}s)",
            monitoring.black_check_interval_seconds, monitoring.sla_check_interval_seconds
        );
    }

    fn spawn_sla_loop(self: &Arc<Self>, period: Duration, scope: TickScope) -> JoinHandle<()> {
        let router = Arc::downgrade(self);
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(router) = router.upgrade() else {
                            break;
                        };
                        router.check_sla_at(Utc::now(), scope);
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("SLA loop {:?} stopped", scope);
        })
    }

    /// Stop the SLA loops and flush the dispatcher
    pub async fn shutdown(&self) -> Result<()> {
        info!("🛑 Shutting down escalation router");
        let _ = self.shutdown_tx.send(true);
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.sla_tasks.lock());
        for task in tasks {
            task.await?;
        }
        self.dispatcher.shutdown().await?;
        info!("✅ Escalation router stopped");
        Ok(())
    }

    /// Close an assigned case; the agent's capacity goes back to the queues
    pub fn resolve_case(&self, case_id: &CaseId, satisfaction: Option<f64>) -> Result<()> {
        self.resolve_case_at(case_id, satisfaction, Utc::now())
    }

    pub(super) fn resolve_case_at(
        &self,
        case_id: &CaseId,
        satisfaction: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some((_, info)) = self
            .cases
            .remove_if(case_id, |_, info| info.state == CaseState::Assigned)
        else {
            return Err(match self.case_state(case_id) {
                Some(state) => Self::invalid_transition(case_id, state, CaseState::Resolved),
                None => EscalationError::not_found(format!("Case not found: {}", case_id)),
            });
        };
        self.remember_closed(case_id.clone(), CaseState::Resolved);

        let record = info.escalation_id.and_then(|id| self.sla.close(&id, now, false));
        if let Some(agent_id) = &info.agent_id {
            self.registry.release(agent_id);
            if let Some(seconds) = record.as_ref().and_then(EscalationRecord::resolution_seconds) {
                if let Err(e) = self.registry.record_resolution(agent_id, seconds, satisfaction) {
                    warn!("⚠️ Could not update performance of {}: {}", agent_id, e);
                }
            }
        }
        if let Some(record) = record {
            self.analytics.record_closed(record.clone());
            self.dispatch(DispatchJob::PersistUpdated(record));
        }

        info!("✅ Case {} resolved", case_id);
        let mut event =
            EscalationEvent::new(EventKind::CaseResolved, format!("Case {} resolved", case_id))
                .with_case(case_id)
                .with_tier(info.tier);
        if let Some(escalation_id) = info.escalation_id {
            event = event.with_escalation(escalation_id);
        }
        if let Some(agent_id) = &info.agent_id {
            event = event.with_agent(agent_id);
        }
        self.publish(event);
        self.dispatch(DispatchJob::NotifyUser {
            case_id: case_id.clone(),
            notice: UserNotice::Resolved,
        });

        if let Some(agent_id) = &info.agent_id {
            self.drain_for_agent(agent_id, now);
        }
        Ok(())
    }

    /// An agent finished its oldest held case
    ///
    /// Returns the case that was closed, or `None` if the agent held none.
    pub fn release_agent(&self, agent_id: &AgentId) -> Result<Option<CaseId>> {
        if !self.registry.contains(agent_id) {
            return Err(EscalationError::not_found(format!("Agent not found: {}", agent_id)));
        }
        loop {
            let held = self
                .cases
                .iter()
                .filter(|c| c.state == CaseState::Assigned && c.agent_id.as_ref() == Some(agent_id))
                .map(|c| (c.assigned_at, c.case_id.clone()))
                .min();
            let Some((_, case_id)) = held else {
                return Ok(None);
            };
            match self.resolve_case(&case_id, None) {
                Ok(()) => return Ok(Some(case_id)),
                // someone else closed it first
                Err(EscalationError::NotFound(_))
                | Err(EscalationError::InvalidTransition { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Take a case out of the system wherever it is
    pub fn withdraw_case(&self, case_id: &CaseId) -> Result<()> {
        let now = Utc::now();
        let Some((_, info)) = self.cases.remove(case_id) else {
            return Err(match self.closed.lock().get(case_id) {
                Some(state) => Self::invalid_transition(case_id, state, CaseState::Withdrawn),
                None => EscalationError::not_found(format!("Case not found: {}", case_id)),
            });
        };
        self.remember_closed(case_id.clone(), CaseState::Withdrawn);

        if let Some(record) = info.escalation_id.and_then(|id| self.sla.close(&id, now, true)) {
            self.analytics.record_closed(record.clone());
            self.dispatch(DispatchJob::PersistUpdated(record));
        }
        info!("↩️ Case {} withdrawn while {}", case_id, info.state);
        self.publish(
            EscalationEvent::new(
                EventKind::CaseWithdrawn,
                format!("Case {} withdrawn while {}", case_id, info.state),
            )
            .with_case(case_id)
            .with_tier(info.tier),
        );

        match info.state {
            CaseState::Queued => {
                self.queues.withdraw(info.tier, case_id);
                self.rebalance_tier(info.tier, now);
            }
            CaseState::Deferred => {
                self.backlog.remove(info.tier, case_id);
            }
            CaseState::Assigned => {
                if let Some(agent_id) = &info.agent_id {
                    self.registry.release(agent_id);
                    self.drain_for_agent(agent_id, now);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Run one SLA pass over every tier
    pub fn check_sla(&self) -> Vec<EscalationRecord> {
        self.check_sla_at(Utc::now(), TickScope::All)
    }

    /// Flag overdue cases in `scope` as of `now` and react to each breach
    ///
    /// Black breaches page executives. Breached cases still waiting in a
    /// queue are offered to any cleared agent regardless of language when
    /// `routing.reassign_on_breach` is set.
    pub fn check_sla_at(&self, now: DateTime<Utc>, scope: TickScope) -> Vec<EscalationRecord> {
        let breached = self.sla.check_at(now, scope);
        for record in &breached {
            self.dispatch(DispatchJob::PersistUpdated(record.clone()));
            if record.tier == SupportTier::Black {
                self.dispatch(DispatchJob::NotifyExecutive(ExecutiveNotice {
                    case_id: record.case_id.clone(),
                    escalation_id: record.escalation_id,
                    tier: record.tier,
                    elapsed_seconds: record.elapsed_seconds(now),
                    target_seconds: record.sla_target_seconds,
                }));
            }
            if self.config.routing.reassign_on_breach {
                self.reassign_overdue(record, now);
            }
        }
        breached
    }

    fn reassign_overdue(&self, record: &EscalationRecord, now: DateTime<Utc>) {
        let requirements = self
            .cases
            .get(&record.case_id)
            .filter(|info| info.state == CaseState::Queued)
            .and_then(|info| info.requirements.clone());
        let Some(requirements) = requirements else {
            return;
        };

        loop {
            let Some(agent) = select_best_agent_any_language(&self.registry, &requirements) else {
                return;
            };
            if !self.registry.try_reserve(&agent.id) {
                continue;
            }
            let assigned = match self.queues.withdraw(record.tier, &record.case_id) {
                Some(entry) => self.complete_assignment(entry, &agent.id, now),
                None => {
                    self.registry.release(&agent.id);
                    false
                }
            };
            if !assigned {
                // someone else moved the case; offer the freed slot elsewhere
                self.drain_for_agent(&agent.id, now);
                return;
            }
            info!("🔁 Overdue case {} reassigned to {}", record.case_id, agent.id);
            self.publish(
                EscalationEvent::new(
                    EventKind::BreachReassigned,
                    format!("Overdue case {} handed to {}", record.case_id, agent.id),
                )
                .with_case(&record.case_id)
                .with_escalation(record.escalation_id)
                .with_tier(record.tier)
                .with_agent(&agent.id),
            );
            // the withdrawn entry left a slot for the backlog
            self.rebalance_tier(record.tier, now);
            return;
        }
    }
}
