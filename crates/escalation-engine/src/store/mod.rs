//! Escalation record persistence
//!
//! The router never awaits persistence on its hot path: record snapshots are
//! handed to the dispatcher, which calls the configured [`EscalationStore`]
//! from its worker task. Two implementations ship with the crate:
//!
//! - [`InMemoryEscalationStore`]: a `DashMap`, for tests and ephemeral runs
//! - [`JsonlEscalationStore`]: an append-only JSON-lines file of snapshots

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EscalationId, EscalationRecord};

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlEscalationStore;
pub use memory::InMemoryEscalationStore;

/// Durable home for escalation records
#[async_trait]
pub trait EscalationStore: Send + Sync {
    /// Persist a newly accepted escalation
    async fn record_created(&self, record: &EscalationRecord) -> Result<()>;

    /// Persist the latest state of an existing escalation
    async fn record_updated(&self, record: &EscalationRecord) -> Result<()>;

    /// Latest known state of an escalation
    async fn get(&self, escalation_id: &EscalationId) -> Result<Option<EscalationRecord>>;
}
