//! Escalation decision
//!
//! Given the AI's confidence, an optional reason hint and the tier, decide
//! whether a human must take over. `EmergencyDetected` always escalates at
//! priority 5. Otherwise the case escalates when confidence falls below the
//! tier's threshold (never below the global floor of 0.5).

use serde::{Deserialize, Serialize};

use crate::config::TierPolicies;
use crate::error::{EscalationError, Result};
use crate::types::{EscalationReason, Priority, SupportTier};

/// Result of [`decide`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscalationOutcome {
    pub escalate: bool,
    /// `None` when the AI answer stands
    pub reason: Option<EscalationReason>,
    pub target_priority: Priority,
}

/// Decide whether to escalate
///
/// Confidence outside `[0, 1]` (or NaN) is rejected with
/// [`EscalationError::InvalidConfidence`]; it is never clamped.
///
/// ```
/// use escalation_engine::config::TierPolicies;
/// use escalation_engine::routing::decide;
/// use escalation_engine::types::{EscalationReason, Priority, SupportTier};
///
/// let tiers = TierPolicies::default();
/// let p3 = Priority::new(3).unwrap();
///
/// let pro = decide(&tiers, 0.6, None, SupportTier::Pro, p3).unwrap();
/// assert!(!pro.escalate);
///
/// let elite = decide(&tiers, 0.6, None, SupportTier::Elite, p3).unwrap();
/// assert_eq!(elite.reason, Some(EscalationReason::LowConfidence));
/// ```
pub fn decide(
    tiers: &TierPolicies,
    ai_confidence: f64,
    reason_hint: Option<EscalationReason>,
    tier: SupportTier,
    computed_priority: Priority,
) -> Result<EscalationOutcome> {
    if !(0.0..=1.0).contains(&ai_confidence) {
        return Err(EscalationError::InvalidConfidence(ai_confidence));
    }

    if reason_hint == Some(EscalationReason::EmergencyDetected) {
        return Ok(EscalationOutcome {
            escalate: true,
            reason: Some(EscalationReason::EmergencyDetected),
            target_priority: Priority::MAX,
        });
    }

    let escalate = ai_confidence < tiers.confidence_threshold(tier);
    let reason = escalate.then(|| reason_hint.unwrap_or(EscalationReason::LowConfidence));

    Ok(EscalationOutcome {
        escalate,
        reason,
        target_priority: computed_priority,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: u8) -> Priority {
        Priority::new(v).unwrap()
    }

    #[test]
    fn test_emergency_forces_priority_five() {
        let tiers = TierPolicies::default();
        for tier in SupportTier::ALL {
            let emergency = Some(EscalationReason::EmergencyDetected);
            let out = decide(&tiers, 0.99, emergency, tier, p(2)).unwrap();
            assert!(out.escalate);
            assert_eq!(out.target_priority, Priority::MAX);
            assert_eq!(out.reason, Some(EscalationReason::EmergencyDetected));
        }
    }

    #[test]
    fn test_low_confidence_escalates_everywhere() {
        let tiers = TierPolicies::default();
        for tier in SupportTier::ALL {
            let out = decide(&tiers, 0.49, None, tier, p(3)).unwrap();
            assert!(out.escalate, "{}", tier);
            assert_eq!(out.reason, Some(EscalationReason::LowConfidence));
            assert_eq!(out.target_priority, p(3));
        }
    }

    #[test]
    fn test_middle_band_escalates_only_premium_tiers() {
        let tiers = TierPolicies::default();
        assert!(decide(&tiers, 0.5, None, SupportTier::Black, p(5)).unwrap().escalate);
        assert!(decide(&tiers, 0.69, None, SupportTier::Elite, p(4)).unwrap().escalate);
        assert!(!decide(&tiers, 0.5, None, SupportTier::Pro, p(3)).unwrap().escalate);
        assert!(!decide(&tiers, 0.69, None, SupportTier::Lite, p(2)).unwrap().escalate);
        assert!(!decide(&tiers, 0.7, None, SupportTier::Black, p(5)).unwrap().escalate);
    }

    #[test]
    fn test_hint_carried_as_reason() {
        let tiers = TierPolicies::default();
        let hint = Some(EscalationReason::LanguageBarrier);
        let out = decide(&tiers, 0.3, hint, SupportTier::Pro, p(3)).unwrap();
        assert_eq!(out.reason, Some(EscalationReason::LanguageBarrier));

        let hint = Some(EscalationReason::ComplexQuery);
        let confident = decide(&tiers, 0.95, hint, SupportTier::Pro, p(3)).unwrap();
        assert!(!confident.escalate);
        assert_eq!(confident.reason, None);
    }

    #[test]
    fn test_invalid_confidence_rejected() {
        let tiers = TierPolicies::default();
        for bad in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                decide(&tiers, bad, None, SupportTier::Pro, p(3)),
                Err(EscalationError::InvalidConfidence(_))
            ));
        }
        assert!(decide(&tiers, 0.0, None, SupportTier::Pro, p(3)).is_ok());
        assert!(decide(&tiers, 1.0, None, SupportTier::Pro, p(3)).is_ok());
    }
}
