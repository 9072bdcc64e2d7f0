//! Core domain types shared by every component of the escalation engine

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::error::{EscalationError, Result};

/// Service tier assigned to a customer
///
/// Ordering is escalation precedence: `Lite < Pro < Elite < Black`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SupportTier {
    Lite,
    Pro,
    Elite,
    Black,
}

impl SupportTier {
    /// All tiers, lowest precedence first
    pub const ALL: [SupportTier; 4] = [
        SupportTier::Lite,
        SupportTier::Pro,
        SupportTier::Elite,
        SupportTier::Black,
    ];

    /// Dense index used for per-tier arrays
    pub fn index(self) -> usize {
        match self {
            SupportTier::Lite => 0,
            SupportTier::Pro => 1,
            SupportTier::Elite => 2,
            SupportTier::Black => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SupportTier::Lite => "LITE",
            SupportTier::Pro => "PRO",
            SupportTier::Elite => "ELITE",
            SupportTier::Black => "BLACK",
        }
    }
}

impl fmt::Display for SupportTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupportTier {
    type Err = EscalationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LITE" => Ok(SupportTier::Lite),
            "PRO" => Ok(SupportTier::Pro),
            "ELITE" => Ok(SupportTier::Elite),
            "BLACK" => Ok(SupportTier::Black),
            _ => Err(EscalationError::InvalidTier(s.to_string())),
        }
    }
}

/// Why a case is handed to a human
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscalationReason {
    LowConfidence,
    EmergencyDetected,
    ComplexQuery,
    LanguageBarrier,
    TechnicalFailure,
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EscalationReason::LowConfidence => "low_confidence",
            EscalationReason::EmergencyDetected => "emergency_detected",
            EscalationReason::ComplexQuery => "complex_query",
            EscalationReason::LanguageBarrier => "language_barrier",
            EscalationReason::TechnicalFailure => "technical_failure",
        };
        f.write_str(name)
    }
}

/// Case priority, always within 1..=5 (5 is the most urgent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const MIN: Priority = Priority(1);
    pub const MAX: Priority = Priority(5);

    /// Build a priority, failing fast on out-of-range values
    ///
    /// ```
    /// use escalation_engine::types::Priority;
    ///
    /// assert_eq!(Priority::new(3).unwrap().value(), 3);
    /// assert!(Priority::new(0).is_err());
    /// assert!(Priority::new(6).is_err());
    /// ```
    pub fn new(value: u8) -> Result<Self> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Priority(value))
        } else {
            Err(EscalationError::InvalidPriority(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// One step more urgent, capped at [`Priority::MAX`]
    pub fn bumped(self) -> Self {
        Priority((self.0 + 1).min(Self::MAX.0))
    }
}

impl TryFrom<u8> for Priority {
    type Error = EscalationError;

    fn try_from(value: u8) -> Result<Self> {
        Priority::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> u8 {
        p.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Reference to the inbound support message / case, assigned by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId(pub String);

impl From<String> for CaseId {
    fn from(s: String) -> Self {
        CaseId(s)
    }
}

impl From<&str> for CaseId {
    fn from(s: &str) -> Self {
        CaseId(s.to_string())
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an accepted escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscalationId(pub Uuid);

impl EscalationId {
    pub fn new() -> Self {
        EscalationId(Uuid::new_v4())
    }
}

impl Default for EscalationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EscalationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "esc-{}", self.0)
    }
}

/// Lifecycle record of an accepted escalation
///
/// Created when the router accepts an escalation, mutated by the SLA monitor
/// (breach flag) and by resolution, and kept in a bounded history once closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub escalation_id: EscalationId,
    pub case_id: CaseId,
    pub tier: SupportTier,
    pub priority: Priority,
    pub reason: EscalationReason,
    pub assigned_agent_id: Option<AgentId>,
    pub started_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub sla_target_seconds: u64,
    pub resolved_at: Option<DateTime<Utc>>,
    pub breached: bool,
    /// Closed by withdrawal rather than by an agent
    pub withdrawn: bool,
}

impl EscalationRecord {
    pub fn new(
        case_id: CaseId,
        tier: SupportTier,
        priority: Priority,
        reason: EscalationReason,
        sla_target_seconds: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            escalation_id: EscalationId::new(),
            case_id,
            tier,
            priority,
            reason,
            assigned_agent_id: None,
            started_at,
            assigned_at: None,
            sla_target_seconds,
            resolved_at: None,
            breached: false,
            withdrawn: false,
        }
    }

    /// Whole seconds elapsed since the escalation started (never negative)
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.started_at).num_seconds().max(0) as u64
    }

    /// Strictly past the SLA target at `now`
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        let target_ms = i64::try_from(self.sla_target_seconds)
            .ok()
            .and_then(|seconds| seconds.checked_mul(1000))
            .unwrap_or(i64::MAX);
        now.signed_duration_since(self.started_at).num_milliseconds() > target_ms
    }

    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }

    /// Seconds from start to resolution, if resolved
    pub fn resolution_seconds(&self) -> Option<f64> {
        self.resolved_at.map(|at| {
            at.signed_duration_since(self.started_at).num_milliseconds().max(0) as f64 / 1000.0
        })
    }
}
