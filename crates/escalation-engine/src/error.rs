use thiserror::Error;

use crate::types::SupportTier;

/// Error types for escalation routing operations
///
/// Routing shortages (a full queue, no free agent) are normally reported through
/// [`RoutingOutcome`](crate::orchestrator::RoutingOutcome) rather than as errors.
/// `QueueOverflow` comes from [`QueueManager::enqueue`](crate::queue::QueueManager::enqueue)
/// and `NoAgentAvailable` from [`AgentRegistry::reserve`](crate::agent::AgentRegistry::reserve)
/// when those are driven directly.
///
/// # Examples
///
/// ```
/// use escalation_engine::{EscalationError, Result};
///
/// fn lookup(agent_id: &str) -> Result<()> {
///     Err(EscalationError::not_found(format!("Agent not found: {}", agent_id)))
/// }
///
/// match lookup("agent-404") {
///     Err(EscalationError::NotFound(msg)) => assert!(msg.contains("agent-404")),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum EscalationError {
    /// The tier queue is at capacity; signals degraded service, not a crash
    #[error("Queue overflow: {tier} queue is at capacity ({capacity})")]
    QueueOverflow {
        /// Tier whose queue rejected the entry
        tier: SupportTier,
        /// Configured cap of that queue
        capacity: usize,
    },

    /// No agent can take the case right now; transient
    #[error("No agent available: {0}")]
    NoAgentAvailable(String),

    /// A tier name could not be parsed
    #[error("Invalid tier: {0}")]
    InvalidTier(String),

    /// A priority outside 1..=5 was supplied
    #[error("Invalid priority: {0} (expected 1..=5)")]
    InvalidPriority(u8),

    /// An AI confidence outside [0, 1] (or NaN) was supplied
    #[error("Invalid confidence: {0} (expected 0.0..=1.0)")]
    InvalidConfidence(f64),

    /// Requested agent, case or record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempt to create something that already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Illegal case state transition
    #[error("Invalid transition for case {case}: {from} -> {to}")]
    InvalidTransition {
        /// Case reference
        case: String,
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// Configuration validation and loading errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Persistence collaborator failures
    #[error("Store error: {0}")]
    Store(String),

    /// Unexpected internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for EscalationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<std::io::Error> for EscalationError {
    fn from(err: std::io::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<serde_json::Error> for EscalationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<tokio::task::JoinError> for EscalationError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl EscalationError {
    /// Create a new NoAgentAvailable error
    pub fn no_agent<S: Into<String>>(msg: S) -> Self {
        Self::NoAgentAvailable(msg.into())
    }

    /// Create a new NotFound error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new AlreadyExists error
    pub fn already_exists<S: Into<String>>(msg: S) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create a new Configuration error
    ///
    /// ```
    /// use escalation_engine::EscalationError;
    ///
    /// let error = EscalationError::configuration("max_queue_size must be greater than 0");
    /// assert_eq!(error.to_string(), "Configuration error: max_queue_size must be greater than 0");
    /// ```
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new Store error
    pub fn store<S: Into<String>>(msg: S) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new Internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error is a transient capacity shortage the caller should
    /// answer with a "please hold" message
    pub fn is_capacity_shortage(&self) -> bool {
        matches!(self, Self::QueueOverflow { .. } | Self::NoAgentAvailable(_))
    }
}

/// Result type for escalation operations
pub type Result<T> = std::result::Result<T, EscalationError>;
