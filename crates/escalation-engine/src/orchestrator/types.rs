//! Types used by the router

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::routing::AgentRequirements;
use crate::types::{CaseId, EscalationId, EscalationReason, Priority, SupportTier};

/// Where a case stands
///
/// ```text
/// Received -> Evaluated -> AutoResolved
///                       -> Assigned -> Resolved
///                       -> Queued   -> Assigned
///                       -> Deferred -> Queued
///                       -> Dropped
/// any non-terminal      -> Withdrawn
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseState {
    Received,
    Evaluated,
    /// The AI answer stood
    AutoResolved,
    /// Waiting in a tier queue
    Queued,
    /// Waiting for a queue slot
    Deferred,
    /// An agent holds the case
    Assigned,
    Resolved,
    Withdrawn,
    /// No agent, no queue slot, no backlog slot
    Dropped,
}

impl CaseState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CaseState::AutoResolved
                | CaseState::Resolved
                | CaseState::Withdrawn
                | CaseState::Dropped
        )
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: CaseState) -> bool {
        use CaseState::*;
        if self.is_terminal() {
            return false;
        }
        if next == Withdrawn {
            return true;
        }
        matches!(
            (self, next),
            (Received, Evaluated)
                | (Evaluated, AutoResolved)
                | (Evaluated, Assigned)
                | (Evaluated, Queued)
                | (Evaluated, Deferred)
                | (Evaluated, Dropped)
                | (Queued, Assigned)
                | (Deferred, Queued)
                | (Assigned, Resolved)
        )
    }
}

impl std::fmt::Display for CaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Live information about a case the router is handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseInfo {
    pub case_id: CaseId,
    pub user_id: String,
    pub tier: SupportTier,
    pub state: CaseState,
    pub priority: Priority,
    pub reason: Option<EscalationReason>,
    pub escalation_id: Option<EscalationId>,
    pub requirements: Option<AgentRequirements>,
    pub agent_id: Option<AgentId>,
    pub received_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}

/// What happened to a routed message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// No human needed
    AutoResolved,
    /// An agent took the case immediately
    Assigned,
    /// Waiting in the tier queue
    Queued,
    /// Nobody free and the queue is full; see `retry_scheduled`
    ServiceUnavailable,
    /// Withdrawn while it was being routed
    Withdrawn,
}

/// Result of [`EscalationRouter::route`](crate::orchestrator::EscalationRouter::route)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingOutcome {
    pub case_id: CaseId,
    pub disposition: Disposition,
    pub escalated: bool,
    pub priority: Priority,
    pub reason: Option<EscalationReason>,
    pub escalation_id: Option<EscalationId>,
    pub agent_id: Option<AgentId>,
    pub queued: bool,
    /// 1-based position in the tier queue
    pub queue_position: Option<usize>,
    /// Seconds until a human is expected to respond, `None` when none will
    pub estimated_response_seconds: Option<u64>,
    /// The case was parked and will enter the queue when a slot frees
    pub retry_scheduled: bool,
}

impl RoutingOutcome {
    pub(crate) fn new(case_id: CaseId, disposition: Disposition, priority: Priority) -> Self {
        Self {
            case_id,
            disposition,
            escalated: false,
            priority,
            reason: None,
            escalation_id: None,
            agent_id: None,
            queued: false,
            queue_position: None,
            estimated_response_seconds: None,
            retry_scheduled: false,
        }
    }
}
