//! # Escalation Engine
//!
//! Routing core for a tiered customer support desk. An upstream classifier
//! answers customer messages automatically; this crate decides when that
//! answer is not good enough and gets the case to the right human in time.
//!
//! ## Overview
//!
//! - **Priority**: every message gets a 1..=5 priority from the customer's
//!   tier and an urgency lexicon; an emergency lexicon forces priority 5
//! - **Escalation decision**: a per-tier confidence threshold, never below a
//!   global floor of 0.5, decides whether a human takes over
//! - **Agent matching**: tier clearance, spare capacity, language (with
//!   same-family fallback) and specialty pick one best agent deterministically
//! - **Tier queues**: four bounded priority queues, FIFO within a priority,
//!   with O(log n) withdrawal by case id, plus a small deferred backlog
//! - **SLA monitoring**: Black is checked on a fast tick, the other tiers on
//!   a normal one; breaches raise events and Black breaches page executives
//! - **Analytics**: escalation counts, resolution times and SLA compliance
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────┐
//!   message ────────►│ EscalationRouter │────────► RoutingOutcome
//!                    └──────────────────┘
//!                              │
//!      ┌──────────────┬────────┼─────────┬─────────────────┐
//!      │              │        │         │                 │
//! ┌──────────┐ ┌────────────┐ ┌───────┐ ┌────────────┐ ┌────────────┐
//! │ Priority │ │   Agent    │ │ Queue │ │ SlaMonitor │ │ Dispatcher │
//! │ + decide │ │  Registry  │ │Manager│ │ + Events   │ │ (notify,   │
//! └──────────┘ └────────────┘ └───────┘ └────────────┘ │  persist)  │
//!                                                       └────────────┘
//! ```
//!
//! Routing never waits on I/O: notifications and persistence are submitted
//! to the [`integration::Dispatcher`] and executed by its worker task.
//!
//! ## Quick Start
//!
//! ```
//! use escalation_engine::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let router = EscalationRouter::new(EscalationConfig::default()).await?;
//! router.start();
//!
//! router.register_agent(HumanAgent::new(
//!     "agent-001",
//!     "Alice Johnson",
//!     AgentSpecialty::DerivativesExpert,
//!     &["en", "es"],
//!     SupportTier::Elite,
//!     3,
//! ))?;
//!
//! let message = ClassifiedMessage::new(
//!     "case-42",
//!     "user-7",
//!     "how is funding computed on perpetual futures?",
//!     0.35,
//!     "en",
//! )
//! .with_category("derivatives");
//!
//! let outcome = router.route(&message, SupportTier::Elite).await?;
//! assert_eq!(outcome.disposition, Disposition::Assigned);
//!
//! router.resolve_case(&CaseId::from("case-42"), Some(4.5))?;
//! router.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Monitoring
//!
//! ```
//! use escalation_engine::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! # let router = EscalationRouter::new(EscalationConfig::default()).await?;
//! let mut events = router.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("{:?}: {}", event.kind, event.message);
//!     }
//! });
//!
//! let sla = router.get_sla_status();
//! let analytics = router.get_analytics();
//! println!("Black open cases: {:?}", sla.tier(SupportTier::Black).map(|t| t.open_cases));
//! println!("SLA compliance: {:.1}%", analytics.sla_compliance_rate * 100.0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`orchestrator`]: the router and case lifecycle
//! - [`agent`]: agent profiles and the registry
//! - [`routing`]: priority, escalation decision and agent matching
//! - [`queue`]: tier queues and the deferred backlog
//! - [`monitoring`]: events, SLA tracking and analytics
//! - [`store`]: escalation record persistence
//! - [`integration`]: notifier, tier directory and the dispatcher
//! - [`config`]: configuration and validation
//! - [`error`]: error types

// Core modules
pub mod config;
pub mod error;
pub mod types;

// Escalation functionality
pub mod agent;
pub mod monitoring;
pub mod orchestrator;
pub mod queue;
pub mod routing;

// External interfaces
pub mod integration;
pub mod store;

pub use config::EscalationConfig;
pub use error::{EscalationError, Result};
pub use orchestrator::EscalationRouter;

/// Prelude module for convenient imports
///
/// ```
/// use escalation_engine::prelude::*;
/// ```
pub mod prelude {
    //! Commonly used types and traits

    pub use crate::{EscalationConfig, EscalationError, EscalationRouter, Result};

    pub use crate::config::{
        DispatchConfig, MonitoringConfig, QueueConfig, RoutingConfig, TierPolicies, TierPolicy,
    };

    pub use crate::types::{
        CaseId, EscalationId, EscalationReason, EscalationRecord, Priority, SupportTier,
    };

    pub use crate::orchestrator::{CaseInfo, CaseState, Disposition, RoutingOutcome};

    pub use crate::agent::{
        AgentId, AgentRegistry, AgentSpecialty, AgentStats, HumanAgent, LanguageCode,
    };

    pub use crate::routing::{AgentRequirements, PriorityCalculator, Urgency};

    pub use crate::queue::{QueueEntry, QueueStats};

    pub use crate::monitoring::{
        AnalyticsReport, EscalationEvent, EventKind, EventSeverity, SlaStatus, TickScope,
        TierSlaStatus,
    };

    pub use crate::integration::{
        ClassifiedMessage, InMemoryTierDirectory, LoggingNotifier, Notifier, TierDirectory,
        UserNotice,
    };

    pub use crate::store::{EscalationStore, InMemoryEscalationStore, JsonlEscalationStore};

    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
}
