//! # Escalation Event System
//!
//! Every state change the router makes is published as an
//! [`EscalationEvent`]: broadcast to live subscribers, appended to a bounded
//! history and counted per kind. SLA breaches and executive alerts travel the
//! same way, so dashboards and alerting hooks need a single subscription.
//!
//! Publishing never blocks on subscribers. A lagging receiver loses the
//! oldest events (tokio broadcast semantics); the history and counters stay
//! complete.
//!
//! ## Examples
//!
//! ```rust
//! use escalation_engine::monitoring::events::{EscalationEvent, EscalationEvents, EventKind};
//! use escalation_engine::types::SupportTier;
//!
//! # async fn example() {
//! let events = EscalationEvents::new(1000, 64);
//! let mut rx = events.subscribe();
//!
//! events.publish(
//!     EscalationEvent::new(EventKind::SlaBreach, "case-9 breached its 60s target")
//!         .with_tier(SupportTier::Black),
//! );
//!
//! let received = rx.recv().await.unwrap();
//! assert_eq!(received.kind, EventKind::SlaBreach);
//! assert_eq!(events.count(EventKind::SlaBreach), 1);
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::types::{CaseId, EscalationId, SupportTier};

/// Event kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Escalation accepted and a record opened
    EscalationCreated,
    /// A case was handed to an agent
    AgentAssigned,
    /// A case entered a tier queue
    CaseQueued,
    /// A case was parked in the deferred backlog
    CaseDeferred,
    /// A tier queue rejected a case
    QueueOverflow,
    /// No agent, no queue slot: the customer gets a "please hold" answer
    ServiceUnavailable,
    /// A record passed its SLA target
    SlaBreach,
    /// Top-tier breach escalated to executives
    ExecutiveAlert,
    /// An agent resolved a case
    CaseResolved,
    /// A case was withdrawn before resolution
    CaseWithdrawn,
    /// The AI answer stood, no human involved
    AutoResolved,
    /// A breached case was re-offered with a widened search and assigned
    BreachReassigned,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl EventKind {
    /// Severity events of this kind carry unless overridden
    pub fn default_severity(self) -> EventSeverity {
        match self {
            EventKind::ExecutiveAlert => EventSeverity::Critical,
            EventKind::SlaBreach | EventKind::ServiceUnavailable => EventSeverity::Error,
            EventKind::QueueOverflow | EventKind::CaseDeferred => EventSeverity::Warning,
            _ => EventSeverity::Info,
        }
    }
}

/// Individual escalation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationEvent {
    pub event_id: Uuid,
    pub kind: EventKind,
    pub severity: EventSeverity,
    pub escalation_id: Option<EscalationId>,
    pub case_id: Option<CaseId>,
    pub tier: Option<SupportTier>,
    pub agent_id: Option<AgentId>,
    /// Human-readable description
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl EscalationEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            severity: kind.default_severity(),
            escalation_id: None,
            case_id: None,
            tier: None,
            agent_id: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_case(mut self, case_id: &CaseId) -> Self {
        self.case_id = Some(case_id.clone());
        self
    }

    pub fn with_escalation(mut self, escalation_id: EscalationId) -> Self {
        self.escalation_id = Some(escalation_id);
        self
    }

    pub fn with_tier(mut self, tier: SupportTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_agent(mut self, agent_id: &AgentId) -> Self {
        self.agent_id = Some(agent_id.clone());
        self
    }

    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Event system statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventStats {
    pub total_events: u64,
    pub events_by_kind: HashMap<EventKind, u64>,
    pub events_by_severity: HashMap<EventSeverity, u64>,
    pub active_subscribers: usize,
}

#[derive(Debug, Default)]
struct EventState {
    history: VecDeque<EscalationEvent>,
    stats: EventStats,
}

/// Broadcast + history + counters for escalation events
#[derive(Debug)]
pub struct EscalationEvents {
    sender: broadcast::Sender<EscalationEvent>,
    state: Mutex<EventState>,
    max_history: usize,
}

impl EscalationEvents {
    pub fn new(max_history: usize, channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            sender,
            state: Mutex::new(EventState::default()),
            max_history,
        }
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EscalationEvent> {
        self.sender.subscribe()
    }

    /// Record and broadcast an event
    pub fn publish(&self, event: EscalationEvent) {
        {
            let mut state = self.state.lock();
            state.stats.total_events += 1;
            *state.stats.events_by_kind.entry(event.kind).or_insert(0) += 1;
            *state.stats.events_by_severity.entry(event.severity).or_insert(0) += 1;
            if self.max_history > 0 {
                if state.history.len() >= self.max_history {
                    state.history.pop_front();
                }
                state.history.push_back(event.clone());
            }
        }

        debug!("📡 {} - {}", event.kind, event.message);
        if self.sender.send(event).is_err() {
            trace!("No event subscribers");
        }
    }

    /// Events in `[start, end]`, oldest first
    pub fn get_event_history(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<EscalationEvent> {
        self.state
            .lock()
            .history
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect()
    }

    /// The most recent `limit` events, oldest first
    pub fn recent(&self, limit: usize) -> Vec<EscalationEvent> {
        let state = self.state.lock();
        let skip = state.history.len().saturating_sub(limit);
        state.history.iter().skip(skip).cloned().collect()
    }

    /// History events of one kind, oldest first
    pub fn history_of(&self, kind: EventKind) -> Vec<EscalationEvent> {
        self.state
            .lock()
            .history
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.state
            .lock()
            .stats
            .events_by_kind
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    pub fn get_stats(&self) -> EventStats {
        let mut stats = self.state.lock().stats.clone();
        stats.active_subscribers = self.sender.receiver_count();
        stats
    }
}
