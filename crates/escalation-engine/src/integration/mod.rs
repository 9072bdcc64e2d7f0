//! External collaborators
//!
//! The engine consumes a tier lookup ([`TierDirectory`]), an outbound
//! messaging hook ([`Notifier`]) and a persistence backend
//! ([`EscalationStore`](crate::store::EscalationStore)). Notifications and
//! persistence are fire-and-forget jobs run by the [`Dispatcher`].

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{info, warn};

use crate::agent::AgentId;
use crate::error::Result;
use crate::types::{CaseId, SupportTier};

pub mod dispatcher;
pub mod types;

pub use dispatcher::{DispatchJob, Dispatcher};
pub use types::{AgentAssignment, Classification, ClassifiedMessage, ExecutiveNotice, UserNotice};

/// Outbound messaging to agents, customers and executives
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_agent(&self, agent_id: &AgentId, assignment: &AgentAssignment) -> Result<()>;

    async fn notify_user(&self, case_id: &CaseId, notice: &UserNotice) -> Result<()>;

    async fn notify_executive(&self, notice: &ExecutiveNotice) -> Result<()> {
        warn!(
            "🚨 Executive notice for case {} ({}s / {}s) has no dedicated channel",
            notice.case_id, notice.elapsed_seconds, notice.target_seconds
        );
        Ok(())
    }
}

/// Customer tier lookup
#[async_trait]
pub trait TierDirectory: Send + Sync {
    /// Tier of a user, `None` if the user is unknown
    async fn get_tier(&self, user_id: &str) -> Result<Option<SupportTier>>;
}

/// Notifier that only logs
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify_agent(&self, agent_id: &AgentId, assignment: &AgentAssignment) -> Result<()> {
        info!(
            "📨 Agent {} <- case {} ({}, {}, {})",
            agent_id, assignment.case_id, assignment.tier, assignment.priority, assignment.reason
        );
        Ok(())
    }

    async fn notify_user(&self, case_id: &CaseId, notice: &UserNotice) -> Result<()> {
        info!("📨 Customer of case {} <- {:?}", case_id, notice);
        Ok(())
    }

    async fn notify_executive(&self, notice: &ExecutiveNotice) -> Result<()> {
        warn!(
            "🚨 Executives <- case {} ({}) unanswered for {}s",
            notice.case_id, notice.tier, notice.elapsed_seconds
        );
        Ok(())
    }
}

/// In-memory user -> tier map
#[derive(Debug, Default)]
pub struct InMemoryTierDirectory {
    tiers: DashMap<String, SupportTier>,
}

impl InMemoryTierDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tier(&self, user_id: impl Into<String>, tier: SupportTier) {
        self.tiers.insert(user_id.into(), tier);
    }
}

#[async_trait]
impl TierDirectory for InMemoryTierDirectory {
    async fn get_tier(&self, user_id: &str) -> Result<Option<SupportTier>> {
        Ok(self.tiers.get(user_id).map(|t| *t.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_directory() {
        let directory = InMemoryTierDirectory::new();
        directory.set_tier("whale", SupportTier::Black);
        assert_eq!(directory.get_tier("whale").await.unwrap(), Some(SupportTier::Black));
        assert_eq!(directory.get_tier("nobody").await.unwrap(), None);
    }
}
