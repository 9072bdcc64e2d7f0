//! Tier queues
//!
//! Cases that could not be assigned immediately wait in one of four bounded
//! priority queues ([`QueueManager`]). When a queue is full, cases may wait in a
//! small [`DeferredBacklog`] until a slot frees.

pub mod manager;
pub mod overflow;

pub use manager::{QueueEntry, QueueManager, QueueStats};
pub use overflow::DeferredBacklog;
