//! Types exchanged with external collaborators

use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, LanguageCode};
use crate::types::{CaseId, EscalationId, EscalationReason, Priority, SupportTier};

/// Output of the upstream NLP classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Free-form topic label, e.g. `"derivatives"` or `"account_access"`
    pub category: String,
    /// Confidence of the AI answer, 0.0..=1.0
    pub confidence: f64,
    pub language: LanguageCode,
}

/// An inbound message after classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedMessage {
    pub case_id: CaseId,
    pub user_id: String,
    pub text: String,
    pub classification: Classification,
    /// Reason suggested upstream, if any
    #[serde(default)]
    pub reason_hint: Option<EscalationReason>,
}

impl ClassifiedMessage {
    pub fn new(
        case_id: impl Into<CaseId>,
        user_id: impl Into<String>,
        text: impl Into<String>,
        confidence: f64,
        language: &str,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            user_id: user_id.into(),
            text: text.into(),
            classification: Classification {
                category: "general".to_string(),
                confidence,
                language: LanguageCode::new(language),
            },
            reason_hint: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.classification.category = category.into();
        self
    }

    pub fn with_reason(mut self, reason: EscalationReason) -> Self {
        self.reason_hint = Some(reason);
        self
    }

    /// Explicit hint, else one derived from the category label
    pub fn effective_hint(&self) -> Option<EscalationReason> {
        self.reason_hint.or_else(|| reason_for_category(&self.classification.category))
    }
}

fn reason_for_category(category: &str) -> Option<EscalationReason> {
    let category = category.to_lowercase();
    if category.contains("derivative") || category.contains("complex") {
        Some(EscalationReason::ComplexQuery)
    } else if category.contains("technical") || category.contains("outage") {
        Some(EscalationReason::TechnicalFailure)
    } else if category.contains("language") || category.contains("translation") {
        Some(EscalationReason::LanguageBarrier)
    } else {
        None
    }
}

/// What an agent is told when a case lands on them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAssignment {
    pub case_id: CaseId,
    pub escalation_id: EscalationId,
    pub tier: SupportTier,
    pub priority: Priority,
    pub reason: EscalationReason,
}

/// What the customer is told; rendering is the transport's job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UserNotice {
    /// A human has the case
    AgentAssigned { agent_id: AgentId },
    /// Waiting in line
    Queued {
        position: usize,
        estimated_wait_seconds: u64,
    },
    /// Nobody free and no room to wait
    PleaseHold { retry_scheduled: bool },
    /// The case was closed by an agent
    Resolved,
}

/// Alert for the executive escalation line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveNotice {
    pub case_id: CaseId,
    pub escalation_id: EscalationId,
    pub tier: SupportTier,
    pub elapsed_seconds: u64,
    pub target_seconds: u64,
}
