//! # Escalation Orchestration
//!
//! The [`EscalationRouter`] ties the engine together. A classified message
//! enters through [`EscalationRouter::route`] and leaves with a
//! [`RoutingOutcome`]:
//!
//! ```text
//! message ──► priority + emergency scan ──► decide
//!                                             │
//!                ┌─ confident ──────────────► AutoResolved
//!                │
//!                └─ escalate ─► best agent? ─► Assigned
//!                                   │ no
//!                                   ├─► tier queue ─► Queued
//!                                   │ full
//!                                   ├─► backlog ────► ServiceUnavailable (retry)
//!                                   │ full
//!                                   └──────────────► ServiceUnavailable (dropped)
//! ```
//!
//! Freed agent capacity (resolution, withdrawal, a newly available agent)
//! drains the highest tier first and refills queues from the backlog. SLA
//! loops started by [`EscalationRouter::start`] flag overdue cases.

pub mod core;
pub mod lifecycle;
pub mod routing;
pub mod types;

pub use self::core::EscalationRouter;
pub use self::types::{CaseInfo, CaseState, Disposition, RoutingOutcome};
