//! Core escalation router
//!
//! This module contains the [`EscalationRouter`] struct that owns every piece
//! of routing state: the agent registry, the tier queues, the deferred
//! backlog, the SLA monitor, the event bus, analytics and the live case map.
//! Its behaviour is split across sibling modules: `routing` (inbound
//! messages, queue draining) and `lifecycle` (resolution, withdrawal, SLA
//! ticks).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::info;

use crate::agent::{AgentId, AgentRegistry, AgentStats, HumanAgent};
use crate::config::EscalationConfig;
use crate::error::{EscalationError, Result};
use crate::integration::{
    DispatchJob, Dispatcher, LoggingNotifier, Notifier, TierDirectory,
};
use crate::monitoring::{
    AnalyticsReport, EscalationAnalytics, EscalationEvent, EscalationEvents, SlaMonitor, SlaStatus,
};
use crate::queue::{DeferredBacklog, QueueManager, QueueStats};
use crate::routing::PriorityCalculator;
use crate::store::{EscalationStore, InMemoryEscalationStore};
use crate::types::{CaseId, SupportTier};

use super::types::{CaseInfo, CaseState};

/// Bounded memory of how recently closed cases ended
#[derive(Debug, Default)]
pub(super) struct ClosedCases {
    states: HashMap<CaseId, CaseState>,
    order: VecDeque<CaseId>,
}

impl ClosedCases {
    pub(super) fn remember(&mut self, case_id: CaseId, state: CaseState, limit: usize) {
        if limit == 0 {
            return;
        }
        if self.states.insert(case_id.clone(), state).is_none() {
            self.order.push_back(case_id);
        }
        while self.order.len() > limit {
            if let Some(oldest) = self.order.pop_front() {
                self.states.remove(&oldest);
            }
        }
    }

    pub(super) fn get(&self, case_id: &CaseId) -> Option<CaseState> {
        self.states.get(case_id).copied()
    }
}

/// Tiered support escalation router
///
/// One explicit owner for all routing state; there are no globals. Create it
/// with [`EscalationRouter::new`] (logging notifier, in-memory store) or
/// [`EscalationRouter::with_collaborators`], then call
/// [`start`](EscalationRouter::start) to run the SLA tick loops.
///
/// # Examples
///
/// ```rust
/// use escalation_engine::prelude::*;
///
/// # async fn example() -> Result<()> {
/// let router = EscalationRouter::new(EscalationConfig::default()).await?;
/// router.register_agent(HumanAgent::new(
///     "agent-1", "Dana", AgentSpecialty::GeneralSupport, &["en"], SupportTier::Black, 2,
/// ))?;
///
/// let message = ClassifiedMessage::new("case-1", "user-9", "my money is stuck!", 0.15, "en");
/// let outcome = router.route(&message, SupportTier::Black).await?;
/// assert!(outcome.escalated);
/// assert_eq!(outcome.priority.value(), 5);
/// # router.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct EscalationRouter {
    pub(super) config: EscalationConfig,
    pub(super) calculator: PriorityCalculator,
    pub(super) registry: AgentRegistry,
    pub(super) queues: QueueManager,
    pub(super) backlog: DeferredBacklog,
    pub(super) sla: SlaMonitor,
    pub(super) events: Arc<EscalationEvents>,
    pub(super) analytics: EscalationAnalytics,
    /// Non-terminal cases only
    pub(super) cases: DashMap<CaseId, CaseInfo>,
    pub(super) closed: Mutex<ClosedCases>,
    pub(super) dispatcher: Dispatcher,
    pub(super) tier_directory: Option<Arc<dyn TierDirectory>>,
    pub(super) shutdown_tx: watch::Sender<bool>,
    pub(super) sla_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for EscalationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationRouter")
            .field("agents", &self.registry.len())
            .field("active_cases", &self.cases.len())
            .field("queued", &self.queues.total_queued())
            .finish()
    }
}

impl EscalationRouter {
    /// Create a router with a logging notifier and an in-memory store
    ///
    /// Must be called inside a tokio runtime: the dispatcher worker is
    /// spawned immediately.
    pub async fn new(config: EscalationConfig) -> Result<Arc<Self>> {
        Self::with_collaborators(
            config,
            Arc::new(LoggingNotifier),
            Arc::new(InMemoryEscalationStore::new()),
            None,
        )
        .await
    }

    /// Create a router wired to external collaborators
    pub async fn with_collaborators(
        config: EscalationConfig,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn EscalationStore>,
        tier_directory: Option<Arc<dyn TierDirectory>>,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let events = Arc::new(EscalationEvents::new(
            config.monitoring.event_history_size,
            config.monitoring.event_channel_capacity,
        ));
        let (shutdown_tx, _) = watch::channel(false);

        let router = Self {
            calculator: PriorityCalculator::new(config.tiers.clone(), &config.routing),
            registry: AgentRegistry::new(),
            queues: QueueManager::new(config.queues.max_queue_size),
            backlog: DeferredBacklog::new(config.queues.deferred_backlog_size),
            sla: SlaMonitor::new(events.clone()),
            analytics: EscalationAnalytics::new(config.monitoring.history_size),
            events,
            cases: DashMap::new(),
            closed: Mutex::new(ClosedCases::default()),
            dispatcher: Dispatcher::spawn(config.dispatch.channel_capacity, notifier, store),
            tier_directory,
            shutdown_tx,
            sla_tasks: Mutex::new(Vec::new()),
            config,
        };

        info!(
            "✅ Escalation router ready (queue cap {}, backlog {}, SLA ticks {}s/{}s)",
            router.config.queues.max_queue_size,
            router.config.queues.deferred_backlog_size,
            router.config.monitoring.black_check_interval_seconds,
            router.config.monitoring.sla_check_interval_seconds
        );
        Ok(Arc::new(router))
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    pub fn events(&self) -> &EscalationEvents {
        &self.events
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EscalationEvent> {
        self.events.subscribe()
    }

    /// Register a new agent and offer it any waiting cases
    pub fn register_agent(&self, agent: HumanAgent) -> Result<()> {
        let agent_id = agent.id.clone();
        self.registry.register(agent)?;
        self.drain_for_agent(&agent_id, Utc::now());
        Ok(())
    }

    /// Replace an agent's profile, keeping its live load
    ///
    /// A profile that now takes more cases, covers more tiers or speaks more
    /// languages may fit waiting work, so the queues are drained for it.
    pub fn update_agent(&self, agent: HumanAgent) -> Result<()> {
        let agent_id = agent.id.clone();
        self.registry.update_agent(agent)?;
        self.drain_for_agent(&agent_id, Utc::now());
        Ok(())
    }

    /// Toggle an agent's availability; becoming available drains the queues
    pub fn set_agent_available(&self, agent_id: &AgentId, available: bool) -> Result<()> {
        if available {
            self.registry.mark_available(agent_id)?;
            self.drain_for_agent(agent_id, Utc::now());
        } else {
            self.registry.mark_unavailable(agent_id)?;
        }
        Ok(())
    }

    /// Point-in-time copy of one agent
    pub fn agent(&self, agent_id: &AgentId) -> Option<HumanAgent> {
        self.registry.snapshot(agent_id)
    }

    /// Point-in-time copies of every agent, ordered by id
    pub fn agents(&self) -> Vec<HumanAgent> {
        self.registry.list()
    }

    pub fn agent_load(&self, agent_id: &AgentId) -> Option<u32> {
        self.registry.load_of(agent_id)
    }

    /// Sum of agent loads; equals [`assigned_escalations`](Self::assigned_escalations)
    /// whenever no routing call is in flight
    pub fn total_agent_load(&self) -> u64 {
        self.registry.total_load()
    }

    pub fn agent_stats(&self) -> AgentStats {
        self.registry.get_statistics()
    }

    /// Current state of a case, including recently closed ones
    pub fn case_state(&self, case_id: &CaseId) -> Option<CaseState> {
        if let Some(info) = self.cases.get(case_id) {
            return Some(info.state);
        }
        self.closed.lock().get(case_id)
    }

    /// Live information about a non-terminal case
    pub fn case_info(&self, case_id: &CaseId) -> Option<CaseInfo> {
        self.cases.get(case_id).map(|c| c.value().clone())
    }

    pub fn active_case_count(&self) -> usize {
        self.cases.len()
    }

    pub fn queue_stats(&self, tier: SupportTier) -> QueueStats {
        self.queues.get_queue_stats(tier, Utc::now())
    }

    pub fn deferred_count(&self, tier: SupportTier) -> usize {
        self.backlog.len(tier)
    }

    pub fn get_sla_status(&self) -> SlaStatus {
        self.get_sla_status_at(Utc::now())
    }

    pub fn get_sla_status_at(&self, now: DateTime<Utc>) -> SlaStatus {
        self.sla.status(now, &self.config.tiers)
    }

    pub fn get_analytics(&self) -> AnalyticsReport {
        let mut breaches = [0u64; 4];
        for tier in SupportTier::ALL {
            breaches[tier.index()] = self.sla.breach_count(tier);
        }
        self.analytics.report(Utc::now(), breaches)
    }

    /// Open escalations currently holding an agent
    pub fn assigned_escalations(&self) -> usize {
        self.sla.assigned_count()
    }

    /// Jobs dropped because the dispatch channel was full
    pub fn dropped_dispatch_jobs(&self) -> u64 {
        self.dispatcher.dropped_jobs()
    }

    pub(super) fn publish(&self, event: EscalationEvent) {
        self.events.publish(event);
    }

    pub(super) fn dispatch(&self, job: DispatchJob) {
        self.dispatcher.submit(job);
    }

    pub(super) fn remember_closed(&self, case_id: CaseId, state: CaseState) {
        self.closed
            .lock()
            .remember(case_id, state, self.config.monitoring.history_size);
    }

    pub(super) fn invalid_transition(
        case_id: &CaseId,
        from: CaseState,
        to: CaseState,
    ) -> EscalationError {
        EscalationError::InvalidTransition {
            case: case_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_cases_bounded() {
        let mut closed = ClosedCases::default();
        for i in 0..5 {
            closed.remember(CaseId::from(format!("c{}", i).as_str()), CaseState::Resolved, 3);
        }
        assert_eq!(closed.get(&CaseId::from("c0")), None);
        assert_eq!(closed.get(&CaseId::from("c4")), Some(CaseState::Resolved));
        assert_eq!(closed.order.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = EscalationConfig::default();
        config.queues.max_queue_size = 0;
        assert!(matches!(
            EscalationRouter::new(config).await,
            Err(EscalationError::Configuration(_))
        ));
    }
}
