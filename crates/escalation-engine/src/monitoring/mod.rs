//! Monitoring: events, SLA tracking and analytics
//!
//! - [`events`]: broadcast bus with history and per-kind counters
//! - [`sla`]: open-record tracking and breach detection
//! - [`metrics`]: escalation counters and the analytics report

pub mod events;
pub mod metrics;
pub mod sla;

pub use events::{EscalationEvent, EscalationEvents, EventKind, EventSeverity, EventStats};
pub use metrics::{AnalyticsReport, EscalationAnalytics, TierAnalytics};
pub use sla::{SlaMonitor, SlaStatus, TickScope, TierSlaStatus};
