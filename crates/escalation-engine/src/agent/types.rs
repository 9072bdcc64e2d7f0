//! Core types for human agent management

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::SupportTier;

/// Agent identifier type for strongly-typed agent references
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        AgentId(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        AgentId(s.to_string())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Language tag such as `en`, `es-MX` or `pt_BR`
///
/// Comparison is case-insensitive; tags are normalised to lowercase with `-`
/// separators on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(tag: &str) -> Self {
        LanguageCode(tag.trim().replace('_', "-").to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary subtag: `es-mx` -> `es`
    pub fn family(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    pub fn same_family(&self, other: &LanguageCode) -> bool {
        self.family() == other.family()
    }
}

impl From<String> for LanguageCode {
    fn from(s: String) -> Self {
        LanguageCode::new(&s)
    }
}

impl From<&str> for LanguageCode {
    fn from(s: &str) -> Self {
        LanguageCode::new(s)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> String {
        code.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What an agent is best at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentSpecialty {
    GeneralSupport,
    DerivativesExpert,
    MultilingualSupport,
    TechnicalSupport,
    /// Executive escalation line, reserved for the top tier
    CeoCtoDirect,
    Custom(String),
}

impl fmt::Display for AgentSpecialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentSpecialty::GeneralSupport => write!(f, "general"),
            AgentSpecialty::DerivativesExpert => write!(f, "derivatives"),
            AgentSpecialty::MultilingualSupport => write!(f, "multilingual"),
            AgentSpecialty::TechnicalSupport => write!(f, "technical"),
            AgentSpecialty::CeoCtoDirect => write!(f, "ceo-cto-direct"),
            AgentSpecialty::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// Running performance statistics of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub total_cases_handled: u64,

    /// Mean resolution time in seconds
    pub average_resolution_time: f64,

    /// Rolling satisfaction score, 0.0..=5.0
    pub customer_satisfaction_score: f64,
}

impl Default for AgentPerformance {
    fn default() -> Self {
        Self {
            total_cases_handled: 0,
            average_resolution_time: 0.0,
            customer_satisfaction_score: 5.0,
        }
    }
}

impl AgentPerformance {
    /// Fold one resolved case into the running averages
    pub fn record(&mut self, resolution_seconds: f64, satisfaction: Option<f64>) {
        let n = self.total_cases_handled as f64;
        self.average_resolution_time =
            (self.average_resolution_time * n + resolution_seconds) / (n + 1.0);
        if let Some(score) = satisfaction {
            let score = score.clamp(0.0, 5.0);
            self.customer_satisfaction_score =
                (self.customer_satisfaction_score * n + score) / (n + 1.0);
        }
        self.total_cases_handled += 1;
    }
}

/// Human agent profile and live load
///
/// Agents are never removed from the registry, only marked unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanAgent {
    pub id: AgentId,

    pub display_name: String,

    pub specialty: AgentSpecialty,

    /// Languages the agent can serve
    pub languages: Vec<LanguageCode>,

    /// Highest tier the agent is cleared for
    pub tier_access: SupportTier,

    /// Cases currently held
    #[serde(default)]
    pub current_load: u32,

    pub max_concurrent_cases: u32,

    #[serde(default = "default_available")]
    pub is_available: bool,

    #[serde(default)]
    pub performance: AgentPerformance,
}

fn default_available() -> bool {
    true
}

impl HumanAgent {
    pub fn new(
        id: impl Into<AgentId>,
        display_name: impl Into<String>,
        specialty: AgentSpecialty,
        languages: &[&str],
        tier_access: SupportTier,
        max_concurrent_cases: u32,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            specialty,
            languages: languages.iter().map(|l| LanguageCode::new(l)).collect(),
            tier_access,
            current_load: 0,
            max_concurrent_cases,
            is_available: true,
            performance: AgentPerformance::default(),
        }
    }

    /// Cleared for cases of `tier`
    pub fn is_cleared_for(&self, tier: SupportTier) -> bool {
        tier <= self.tier_access
    }

    pub fn has_capacity(&self) -> bool {
        self.current_load < self.max_concurrent_cases
    }

    pub fn can_take_case(&self) -> bool {
        self.is_available && self.has_capacity()
    }

    pub fn load_ratio(&self) -> f64 {
        if self.max_concurrent_cases == 0 {
            return 1.0;
        }
        self.current_load as f64 / self.max_concurrent_cases as f64
    }

    pub fn speaks(&self, language: &LanguageCode) -> bool {
        self.languages.iter().any(|l| l == language)
    }

    pub fn speaks_family(&self, language: &LanguageCode) -> bool {
        self.languages.iter().any(|l| l.same_family(language))
    }
}
