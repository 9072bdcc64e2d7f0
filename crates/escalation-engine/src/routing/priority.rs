//! Message priority calculation
//!
//! Priority starts at the tier's base priority and is raised one step when the
//! message contains any urgency keyword. Matching is case-insensitive substring
//! matching over a configured multilingual lexicon.

use crate::config::{RoutingConfig, TierPolicies};
use crate::types::{Priority, SupportTier};

/// Pure priority and emergency scoring over configured lexicons
#[derive(Debug, Clone)]
pub struct PriorityCalculator {
    tiers: TierPolicies,
    urgency_keywords: Vec<String>,
    emergency_keywords: Vec<String>,
}

impl PriorityCalculator {
    pub fn new(tiers: TierPolicies, routing: &RoutingConfig) -> Self {
        Self {
            tiers,
            urgency_keywords: normalise(&routing.urgency_keywords),
            emergency_keywords: normalise(&routing.emergency_keywords),
        }
    }

    /// Priority of `message_text` for a customer of `tier`
    ///
    /// Never lower than the tier's base priority, never above 5.
    ///
    /// ```
    /// use escalation_engine::config::EscalationConfig;
    /// use escalation_engine::routing::PriorityCalculator;
    /// use escalation_engine::types::SupportTier;
    ///
    /// let config = EscalationConfig::default();
    /// let calc = PriorityCalculator::new(config.tiers.clone(), &config.routing);
    /// assert_eq!(calc.calculate_priority("hello", SupportTier::Pro).value(), 3);
    /// assert_eq!(calc.calculate_priority("URGENT: withdrawal", SupportTier::Pro).value(), 4);
    /// assert_eq!(calc.calculate_priority("urgent", SupportTier::Black).value(), 5);
    /// ```
    pub fn calculate_priority(&self, message_text: &str, tier: SupportTier) -> Priority {
        let base = self.tiers.base_priority(tier);
        if contains_any(message_text, &self.urgency_keywords) {
            base.bumped()
        } else {
            base
        }
    }

    /// Whether the message matches the emergency lexicon
    pub fn detect_emergency(&self, message_text: &str) -> bool {
        contains_any(message_text, &self.emergency_keywords)
    }
}

fn normalise(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    keywords.iter().any(|k| text.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EscalationConfig;

    fn calculator() -> PriorityCalculator {
        let config = EscalationConfig::default();
        PriorityCalculator::new(config.tiers, &config.routing)
    }

    #[test]
    fn test_priority_never_below_base() {
        let calc = calculator();
        let messages = ["", "what is my balance", "URGENT help", "urgente por favor", "紧急"];
        for tier in SupportTier::ALL {
            let base = TierPolicies::default().base_priority(tier);
            for msg in messages {
                let p = calc.calculate_priority(msg, tier);
                assert!(p >= base, "{} {:?} -> {}", tier, msg, p);
                assert!(p <= Priority::MAX);
            }
        }
    }

    #[test]
    fn test_urgency_bumps_one_step() {
        let calc = calculator();
        assert_eq!(calc.calculate_priority("my money is STUCK", SupportTier::Lite).value(), 3);
        assert_eq!(calc.calculate_priority("cuenta bloqueado", SupportTier::Elite).value(), 5);
        assert_eq!(calc.calculate_priority("thanks", SupportTier::Elite).value(), 4);
    }

    #[test]
    fn test_emergency_detection() {
        let calc = calculator();
        assert!(calc.detect_emergency("My money is stuck in transfer"));
        assert!(calc.detect_emergency("I think my account was HACKED"));
        assert!(calc.detect_emergency("posible fraude en mi cuenta"));
        assert!(!calc.detect_emergency("how do I change my avatar"));
    }

    #[test]
    fn test_empty_lexicon_never_matches() {
        let mut routing = crate::config::RoutingConfig::default();
        routing.urgency_keywords = vec!["  ".to_string()];
        routing.emergency_keywords.clear();
        let calc = PriorityCalculator::new(TierPolicies::default(), &routing);
        assert_eq!(calc.calculate_priority("urgent", SupportTier::Pro).value(), 3);
        assert!(!calc.detect_emergency("hacked"));
    }
}
