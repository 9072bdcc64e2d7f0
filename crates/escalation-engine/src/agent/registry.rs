//! # Agent Registry
//!
//! In-memory catalogue of human agents and their live load.
//!
//! Each agent sits behind its own [`parking_lot::Mutex`]; the surrounding
//! [`DashMap`] only hands out `Arc` clones, so a reservation never holds a
//! lock on the registry as a whole. [`AgentRegistry::try_reserve`] is the single
//! atomic check-and-increment the router relies on to keep
//! `current_load <= max_concurrent_cases` under concurrent routing.
//!
//! ## Examples
//!
//! ```rust
//! use escalation_engine::agent::{AgentRegistry, AgentSpecialty, HumanAgent};
//! use escalation_engine::types::SupportTier;
//!
//! # fn example() -> escalation_engine::Result<()> {
//! let registry = AgentRegistry::new();
//! let agent = HumanAgent::new("agent-001", "Alice", AgentSpecialty::GeneralSupport,
//!                             &["en"], SupportTier::Pro, 1);
//! registry.register(agent)?;
//!
//! let id = "agent-001".into();
//! assert!(registry.try_reserve(&id));
//! assert!(!registry.try_reserve(&id)); // at capacity
//! registry.release(&id);
//! assert_eq!(registry.load_of(&id), Some(0));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agent::{AgentId, HumanAgent};
use crate::error::{EscalationError, Result};

/// Registry of human agents
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: DashMap<AgentId, Arc<Mutex<HumanAgent>>>,
}

/// Registry-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub total: usize,
    pub available: usize,
    /// Available with spare capacity
    pub idle_capacity: usize,
    pub at_capacity: usize,
    pub unavailable: usize,
    pub total_load: u64,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
        }
    }

    fn handle(&self, agent_id: &AgentId) -> Option<Arc<Mutex<HumanAgent>>> {
        self.agents.get(agent_id).map(|entry| entry.value().clone())
    }

    /// Register a new agent
    ///
    /// Fails with `AlreadyExists` if the id is taken; use
    /// [`update_agent`](Self::update_agent) to change a profile.
    pub fn register(&self, agent: HumanAgent) -> Result<()> {
        match self.agents.entry(agent.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(EscalationError::already_exists(
                format!("Agent {} already registered", agent.id),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                info!(
                    "👤 Registered agent {} ({}, cleared up to {}, capacity {})",
                    agent.id, agent.specialty, agent.tier_access, agent.max_concurrent_cases
                );
                slot.insert(Arc::new(Mutex::new(agent)));
                Ok(())
            }
        }
    }

    /// Replace an agent's profile, keeping its live load
    pub fn update_agent(&self, agent: HumanAgent) -> Result<()> {
        let handle = self
            .handle(&agent.id)
            .ok_or_else(|| EscalationError::not_found(format!("Agent not found: {}", agent.id)))?;
        let mut current = handle.lock();
        let load = current.current_load;
        *current = agent;
        current.current_load = load;
        debug!("Updated profile of agent {}", current.id);
        Ok(())
    }

    pub fn mark_unavailable(&self, agent_id: &AgentId) -> Result<()> {
        self.set_available(agent_id, false)
    }

    pub fn mark_available(&self, agent_id: &AgentId) -> Result<()> {
        self.set_available(agent_id, true)
    }

    fn set_available(&self, agent_id: &AgentId, available: bool) -> Result<()> {
        let handle = self
            .handle(agent_id)
            .ok_or_else(|| EscalationError::not_found(format!("Agent not found: {}", agent_id)))?;
        handle.lock().is_available = available;
        if available {
            info!("🟢 Agent {} is available", agent_id);
        } else {
            info!("🔴 Agent {} marked unavailable", agent_id);
        }
        Ok(())
    }

    /// Atomically take one unit of capacity
    ///
    /// Fails with `NotFound` for an unknown agent and `NoAgentAvailable` if
    /// the agent is unavailable or already at capacity; nothing is mutated
    /// on failure.
    pub fn reserve(&self, agent_id: &AgentId) -> Result<()> {
        let handle = self
            .handle(agent_id)
            .ok_or_else(|| EscalationError::not_found(format!("Agent not found: {}", agent_id)))?;
        let mut agent = handle.lock();
        if !agent.can_take_case() {
            return Err(EscalationError::no_agent(format!(
                "Agent {} cannot take a case ({}/{}, available: {})",
                agent_id, agent.current_load, agent.max_concurrent_cases, agent.is_available
            )));
        }
        agent.current_load += 1;
        debug!(
            "Reserved agent {} ({}/{})",
            agent_id, agent.current_load, agent.max_concurrent_cases
        );
        Ok(())
    }

    /// [`reserve`](Self::reserve) for callers that only need to know
    /// whether it worked
    pub fn try_reserve(&self, agent_id: &AgentId) -> bool {
        self.reserve(agent_id).is_ok()
    }

    /// Give back one unit of capacity; load never goes below zero
    pub fn release(&self, agent_id: &AgentId) {
        let Some(handle) = self.handle(agent_id) else {
            warn!("⚠️ Release for unknown agent {}", agent_id);
            return;
        };
        let mut agent = handle.lock();
        debug_assert!(agent.current_load > 0, "release without reservation for {}", agent_id);
        if agent.current_load == 0 {
            warn!("⚠️ Release for agent {} with no load held", agent_id);
            return;
        }
        agent.current_load -= 1;
        debug!(
            "Released agent {} ({}/{})",
            agent_id, agent.current_load, agent.max_concurrent_cases
        );
    }

    /// Fold a resolved case into the agent's performance statistics
    pub fn record_resolution(
        &self,
        agent_id: &AgentId,
        resolution_seconds: f64,
        satisfaction: Option<f64>,
    ) -> Result<()> {
        let handle = self
            .handle(agent_id)
            .ok_or_else(|| EscalationError::not_found(format!("Agent not found: {}", agent_id)))?;
        handle.lock().performance.record(resolution_seconds, satisfaction);
        Ok(())
    }

    /// Point-in-time copy of one agent
    pub fn snapshot(&self, agent_id: &AgentId) -> Option<HumanAgent> {
        self.handle(agent_id).map(|h| h.lock().clone())
    }

    pub fn load_of(&self, agent_id: &AgentId) -> Option<u32> {
        self.handle(agent_id).map(|h| h.lock().current_load)
    }

    /// Point-in-time copies of every agent, ordered by id
    pub fn list(&self) -> Vec<HumanAgent> {
        let handles: Vec<_> = self.agents.iter().map(|e| e.value().clone()).collect();
        let mut agents: Vec<HumanAgent> = handles.iter().map(|h| h.lock().clone()).collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    pub fn contains(&self, agent_id: &AgentId) -> bool {
        self.agents.contains_key(agent_id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Sum of `current_load` over all agents
    pub fn total_load(&self) -> u64 {
        self.list().iter().map(|a| a.current_load as u64).sum()
    }

    pub fn get_statistics(&self) -> AgentStats {
        let mut stats = AgentStats::default();
        for agent in self.list() {
            stats.total += 1;
            stats.total_load += agent.current_load as u64;
            if !agent.is_available {
                stats.unavailable += 1;
                continue;
            }
            stats.available += 1;
            if agent.has_capacity() {
                stats.idle_capacity += 1;
            } else {
                stats.at_capacity += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentSpecialty;
    use crate::types::SupportTier;

    fn agent(id: &str, capacity: u32) -> HumanAgent {
        HumanAgent::new(id, id, AgentSpecialty::GeneralSupport, &["en"], SupportTier::Pro, capacity)
    }

    #[test]
    fn test_register_duplicate() {
        let registry = AgentRegistry::new();
        registry.register(agent("a1", 1)).unwrap();
        assert!(matches!(
            registry.register(agent("a1", 2)),
            Err(EscalationError::AlreadyExists(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reserve_respects_capacity_and_availability() {
        let registry = AgentRegistry::new();
        registry.register(agent("a1", 2)).unwrap();
        let id = AgentId::from("a1");

        assert!(registry.try_reserve(&id));
        assert!(registry.try_reserve(&id));
        assert!(!registry.try_reserve(&id));
        assert_eq!(registry.load_of(&id), Some(2));

        registry.release(&id);
        registry.mark_unavailable(&id).unwrap();
        assert!(!registry.try_reserve(&id));
        assert_eq!(registry.load_of(&id), Some(1));

        assert!(!registry.try_reserve(&AgentId::from("ghost")));
    }

    #[test]
    fn test_reserve_reports_why_it_failed() {
        let registry = AgentRegistry::new();
        registry.register(agent("a1", 1)).unwrap();
        let id = AgentId::from("a1");

        registry.reserve(&id).unwrap();
        let full = registry.reserve(&id).unwrap_err();
        assert!(matches!(full, EscalationError::NoAgentAvailable(_)));
        assert!(full.is_capacity_shortage());
        assert_eq!(registry.load_of(&id), Some(1));

        let unknown = registry.reserve(&AgentId::from("ghost")).unwrap_err();
        assert!(matches!(unknown, EscalationError::NotFound(_)));
        assert!(!unknown.is_capacity_shortage());
    }

    #[test]
    fn test_reserve_then_release_leaves_load_unchanged() {
        let registry = AgentRegistry::new();
        registry.register(agent("a1", 3)).unwrap();
        let id = AgentId::from("a1");
        assert!(registry.try_reserve(&id));
        let before = registry.load_of(&id);
        assert!(registry.try_reserve(&id));
        registry.release(&id);
        assert_eq!(registry.load_of(&id), before);
    }

    #[test]
    fn test_update_keeps_load() {
        let registry = AgentRegistry::new();
        registry.register(agent("a1", 2)).unwrap();
        let id = AgentId::from("a1");
        assert!(registry.try_reserve(&id));

        let mut updated = agent("a1", 5);
        updated.specialty = AgentSpecialty::TechnicalSupport;
        registry.update_agent(updated).unwrap();

        let snapshot = registry.snapshot(&id).unwrap();
        assert_eq!(snapshot.current_load, 1);
        assert_eq!(snapshot.max_concurrent_cases, 5);
        assert_eq!(snapshot.specialty, AgentSpecialty::TechnicalSupport);
        assert!(registry.update_agent(agent("nobody", 1)).is_err());
    }

    #[test]
    fn test_statistics() {
        let registry = AgentRegistry::new();
        registry.register(agent("a1", 1)).unwrap();
        registry.register(agent("a2", 1)).unwrap();
        registry.register(agent("a3", 1)).unwrap();
        assert!(registry.try_reserve(&AgentId::from("a1")));
        registry.mark_unavailable(&AgentId::from("a3")).unwrap();

        let stats = registry.get_statistics();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.available, 2);
        assert_eq!(stats.at_capacity, 1);
        assert_eq!(stats.idle_capacity, 1);
        assert_eq!(stats.unavailable, 1);
        assert_eq!(stats.total_load, 1);
        assert_eq!(registry.total_load(), 1);
    }
}
