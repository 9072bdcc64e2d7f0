use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EscalationError, Result};
use crate::types::{Priority, SupportTier};

/// Lowest confidence any tier may accept without a human
pub const GLOBAL_CONFIDENCE_FLOOR: f64 = 0.5;

/// Longest SLA target a tier may promise (30 days)
pub const MAX_SLA_TARGET_SECONDS: u64 = 30 * 24 * 3600;

/// Complete escalation engine configuration
///
/// This is the main configuration structure for the router, covering tier
/// contracts, queue bounds, routing lexicons, monitoring cadence and the
/// notification dispatcher.
///
/// # Configuration Sections
///
/// - [`tiers`](EscalationConfig::tiers): per-tier SLA target, base priority and confidence threshold
/// - [`queues`](EscalationConfig::queues): queue caps, wait estimates and the deferred backlog
/// - [`routing`](EscalationConfig::routing): urgency/emergency lexicons and breach policy
/// - [`monitoring`](EscalationConfig::monitoring): SLA tick intervals and history sizes
/// - [`dispatch`](EscalationConfig::dispatch): fire-and-forget job channel sizing
///
/// # Examples
///
/// ```
/// use escalation_engine::config::EscalationConfig;
/// use escalation_engine::types::SupportTier;
///
/// let config = EscalationConfig::default();
/// assert_eq!(config.tiers.policy(SupportTier::Black).sla_target_seconds, 60);
/// assert_eq!(config.queues.max_queue_size, 100);
/// config.validate().expect("default configuration is valid");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Per-tier service contracts
    pub tiers: TierPolicies,

    /// Queue bounds and backlog sizing
    pub queues: QueueConfig,

    /// Lexicons and reassignment policy
    pub routing: RoutingConfig,

    /// SLA monitor cadence and retention
    pub monitoring: MonitoringConfig,

    /// Notification/persistence dispatcher
    pub dispatch: DispatchConfig,
}

/// Contract for a single tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Seconds to first human response
    pub sla_target_seconds: u64,

    /// Priority floor for every message of this tier (1..=5)
    pub base_priority: u8,

    /// AI answers below this confidence are escalated
    pub escalation_confidence_threshold: f64,
}

/// Policies for all four tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierPolicies {
    pub black: TierPolicy,
    pub elite: TierPolicy,
    pub pro: TierPolicy,
    pub lite: TierPolicy,
}

impl TierPolicies {
    pub fn policy(&self, tier: SupportTier) -> &TierPolicy {
        match tier {
            SupportTier::Black => &self.black,
            SupportTier::Elite => &self.elite,
            SupportTier::Pro => &self.pro,
            SupportTier::Lite => &self.lite,
        }
    }

    pub fn policy_mut(&mut self, tier: SupportTier) -> &mut TierPolicy {
        match tier {
            SupportTier::Black => &mut self.black,
            SupportTier::Elite => &mut self.elite,
            SupportTier::Pro => &mut self.pro,
            SupportTier::Lite => &mut self.lite,
        }
    }

    pub fn sla_target_seconds(&self, tier: SupportTier) -> u64 {
        self.policy(tier).sla_target_seconds
    }

    /// Base priority of a tier
    ///
    /// Falls back to the minimum priority if the policy was never validated.
    pub fn base_priority(&self, tier: SupportTier) -> Priority {
        Priority::new(self.policy(tier).base_priority).unwrap_or(Priority::MIN)
    }

    /// Effective threshold, never below [`GLOBAL_CONFIDENCE_FLOOR`]
    pub fn confidence_threshold(&self, tier: SupportTier) -> f64 {
        self.policy(tier)
            .escalation_confidence_threshold
            .max(GLOBAL_CONFIDENCE_FLOOR)
    }
}

impl Default for TierPolicies {
    fn default() -> Self {
        Self {
            black: TierPolicy {
                sla_target_seconds: 60,
                base_priority: 5,
                escalation_confidence_threshold: 0.7,
            },
            elite: TierPolicy {
                sla_target_seconds: 300,
                base_priority: 4,
                escalation_confidence_threshold: 0.7,
            },
            pro: TierPolicy {
                sla_target_seconds: 1800,
                base_priority: 3,
                escalation_confidence_threshold: 0.5,
            },
            lite: TierPolicy {
                sla_target_seconds: 7200,
                base_priority: 2,
                escalation_confidence_threshold: 0.5,
            },
        }
    }
}

/// Queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum entries per tier queue
    pub max_queue_size: usize,

    /// Estimated seconds an agent needs per queued case, used for wait estimates
    pub estimated_handle_seconds: u64,

    /// Cases parked per tier while the queue is full (0 disables deferral)
    pub deferred_backlog_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 100,
            estimated_handle_seconds: 120,
            deferred_backlog_size: 50,
        }
    }
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Terms that raise a message's priority by one step
    pub urgency_keywords: Vec<String>,

    /// Terms that mark a message as an emergency
    pub emergency_keywords: Vec<String>,

    /// Whether a breached, still-queued case is re-offered to any cleared agent
    /// regardless of language
    pub reassign_on_breach: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let urgency = [
            "urgent", "asap", "immediately", "stuck", "fraud", "emergency", "hacked",
            "stolen", "locked", "missing", "urgente", "inmediato", "bloqueado", "fraude",
            "dringend", "betrug", "urgence", "bloqué", "紧急", "緊急",
        ];
        let emergency = [
            "emergency", "stuck money", "money stuck", "money is stuck", "funds stuck",
            "hacked", "stolen", "fraud", "unauthorized", "account compromised",
            "emergencia", "fraude", "robado", "hackeado", "notfall", "betrug", "urgence",
            "piraté",
        ];
        Self {
            urgency_keywords: urgency.iter().map(|s| s.to_string()).collect(),
            emergency_keywords: emergency.iter().map(|s| s.to_string()).collect(),
            reassign_on_breach: true,
        }
    }
}

/// SLA monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Tick for Elite, Pro and Lite records, in seconds
    pub sla_check_interval_seconds: u64,

    /// Tick for Black records, in seconds
    pub black_check_interval_seconds: u64,

    /// Closed escalation records kept for analytics
    pub history_size: usize,

    /// Events kept in the event history ring buffer
    pub event_history_size: usize,

    /// Capacity of the event broadcast channel
    pub event_channel_capacity: usize,
}

impl MonitoringConfig {
    pub fn sla_check_interval(&self) -> Duration {
        Duration::from_secs(self.sla_check_interval_seconds)
    }

    pub fn black_check_interval(&self) -> Duration {
        Duration::from_secs(self.black_check_interval_seconds)
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sla_check_interval_seconds: 10,
            black_check_interval_seconds: 5,
            history_size: 1000,
            event_history_size: 1000,
            event_channel_capacity: 1024,
        }
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Pending notification/persistence jobs before new ones are dropped
    pub channel_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { channel_capacity: 256 }
    }
}

impl EscalationConfig {
    /// Load a configuration from a JSON file
    ///
    /// Missing sections and fields take their defaults. The loaded
    /// configuration is validated before it is returned.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EscalationError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            EscalationError::configuration(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        for tier in SupportTier::ALL {
            let policy = self.tiers.policy(tier);
            let target = policy.sla_target_seconds;
            if target == 0 || target > MAX_SLA_TARGET_SECONDS {
                return Err(EscalationError::configuration(format!(
                    "{} sla_target_seconds must be within 1..={}, got {}",
                    tier, MAX_SLA_TARGET_SECONDS, target
                )));
            }
            if Priority::new(policy.base_priority).is_err() {
                return Err(EscalationError::configuration(format!(
                    "{} base_priority must be within 1..=5, got {}",
                    tier, policy.base_priority
                )));
            }
            let threshold = policy.escalation_confidence_threshold;
            if !(0.0..=1.0).contains(&threshold) {
                return Err(EscalationError::configuration(format!(
                    "{} escalation_confidence_threshold must be within [0, 1], got {}",
                    tier, threshold
                )));
            }
        }

        if self.queues.max_queue_size == 0 {
            return Err(EscalationError::configuration(
                "max_queue_size must be greater than 0",
            ));
        }

        if self.monitoring.sla_check_interval_seconds == 0
            || self.monitoring.black_check_interval_seconds == 0
        {
            return Err(EscalationError::configuration(
                "SLA check intervals must be greater than 0",
            ));
        }

        if self.monitoring.event_channel_capacity == 0 {
            return Err(EscalationError::configuration(
                "event_channel_capacity must be greater than 0",
            ));
        }

        if self.dispatch.channel_capacity == 0 {
            return Err(EscalationError::configuration(
                "dispatch channel_capacity must be greater than 0",
            ));
        }

        Ok(())
    }
}
