//! Agent matching
//!
//! Deterministic best-agent selection over a registry snapshot. Selection
//! never mutates the registry; callers reserve the chosen agent with
//! [`AgentRegistry::try_reserve`](crate::agent::AgentRegistry::try_reserve)
//! right after and retry if the reservation loses a race.
//!
//! Ranking, after filtering on tier clearance, spare capacity and language:
//!
//! 1. exact specialty, then `GeneralSupport`, then anything else
//! 2. lowest `current_load / max_concurrent_cases`
//! 3. highest customer satisfaction
//! 4. agent id ascending

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentRegistry, AgentSpecialty, HumanAgent, LanguageCode};
use crate::types::{EscalationReason, SupportTier};

/// How urgently the case needs a human
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    Normal,
    High,
    /// No language-family fallback; only exact speakers qualify
    Emergency,
}

/// What a case needs from an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequirements {
    pub tier: SupportTier,
    pub specialty: AgentSpecialty,
    pub language: LanguageCode,
    pub urgency: Urgency,
}

impl AgentRequirements {
    /// Specialty a reason calls for
    pub fn specialty_for(reason: EscalationReason, tier: SupportTier) -> AgentSpecialty {
        match reason {
            EscalationReason::ComplexQuery => AgentSpecialty::DerivativesExpert,
            EscalationReason::LanguageBarrier => AgentSpecialty::MultilingualSupport,
            EscalationReason::TechnicalFailure => AgentSpecialty::TechnicalSupport,
            EscalationReason::EmergencyDetected if tier == SupportTier::Black => {
                AgentSpecialty::CeoCtoDirect
            }
            EscalationReason::EmergencyDetected | EscalationReason::LowConfidence => {
                AgentSpecialty::GeneralSupport
            }
        }
    }

    pub fn for_reason(
        reason: EscalationReason,
        tier: SupportTier,
        language: LanguageCode,
        high_priority: bool,
    ) -> Self {
        let urgency = match reason {
            EscalationReason::EmergencyDetected => Urgency::Emergency,
            _ if high_priority => Urgency::High,
            _ => Urgency::Normal,
        };
        Self {
            tier,
            specialty: Self::specialty_for(reason, tier),
            language,
            urgency,
        }
    }

    /// Whether `agent` could serve this case language-wise
    ///
    /// Used when draining queues: an exact speaker always qualifies, a
    /// same-family speaker only for non-emergency cases.
    pub fn language_compatible(&self, agent: &HumanAgent) -> bool {
        agent.speaks(&self.language)
            || (self.urgency != Urgency::Emergency && agent.speaks_family(&self.language))
    }
}

/// Select the best available agent for `requirements`
pub fn select_best_agent(
    registry: &AgentRegistry,
    requirements: &AgentRequirements,
) -> Option<HumanAgent> {
    select_from(registry.list(), requirements, true)
}

/// Same as [`select_best_agent`] but ignoring language
///
/// Used by the breach policy to widen the search for an overdue case.
pub fn select_best_agent_any_language(
    registry: &AgentRegistry,
    requirements: &AgentRequirements,
) -> Option<HumanAgent> {
    select_from(registry.list(), requirements, false)
}

fn select_from(
    agents: Vec<HumanAgent>,
    requirements: &AgentRequirements,
    match_language: bool,
) -> Option<HumanAgent> {
    let eligible: Vec<HumanAgent> = agents
        .into_iter()
        .filter(|a| a.is_cleared_for(requirements.tier) && a.can_take_case())
        .collect();

    let candidates: Vec<HumanAgent> = if match_language {
        let exact: Vec<HumanAgent> = eligible
            .iter()
            .filter(|a| a.speaks(&requirements.language))
            .cloned()
            .collect();
        if !exact.is_empty() || requirements.urgency == Urgency::Emergency {
            exact
        } else {
            eligible
                .into_iter()
                .filter(|a| a.speaks_family(&requirements.language))
                .collect()
        }
    } else {
        eligible
    };

    candidates
        .into_iter()
        .min_by(|a, b| rank(a, b, &requirements.specialty))
}

fn specialty_rank(agent: &HumanAgent, wanted: &AgentSpecialty) -> u8 {
    if &agent.specialty == wanted {
        0
    } else if agent.specialty == AgentSpecialty::GeneralSupport {
        1
    } else {
        2
    }
}

fn rank(a: &HumanAgent, b: &HumanAgent, wanted: &AgentSpecialty) -> Ordering {
    specialty_rank(a, wanted)
        .cmp(&specialty_rank(b, wanted))
        .then_with(|| a.load_ratio().total_cmp(&b.load_ratio()))
        .then_with(|| {
            b.performance
                .customer_satisfaction_score
                .total_cmp(&a.performance.customer_satisfaction_score)
        })
        .then_with(|| a.id.cmp(&b.id))
}
