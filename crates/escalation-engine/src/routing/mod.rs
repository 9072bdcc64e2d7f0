//! Routing decisions
//!
//! Pure building blocks used by the router for every inbound message:
//!
//! - [`PriorityCalculator`]: tier + text -> priority 1..=5, emergency detection
//! - [`decide`]: confidence + reason hint -> escalate or not
//! - [`select_best_agent`]: deterministic agent choice for a set of requirements

pub mod decision;
pub mod matcher;
pub mod priority;

pub use decision::{decide, EscalationOutcome};
pub use matcher::{select_best_agent, select_best_agent_any_language, AgentRequirements, Urgency};
pub use priority::PriorityCalculator;
