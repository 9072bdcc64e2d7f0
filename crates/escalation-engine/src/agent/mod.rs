//! Human agent management
//!
//! Agents are described by a [`HumanAgent`] profile: a specialty, the
//! languages they serve, the highest [`SupportTier`](crate::types::SupportTier)
//! they are cleared for and how many cases they can hold at once. The
//! [`AgentRegistry`] owns every profile and its live load.
//!
//! # Tier clearance
//!
//! `tier_access` is a ceiling: an agent cleared for `Elite` serves `Elite`,
//! `Pro` and `Lite` customers, never `Black` ones.

pub mod registry;
pub mod types;

pub use registry::{AgentRegistry, AgentStats};
pub use types::{AgentId, AgentPerformance, AgentSpecialty, HumanAgent, LanguageCode};
