use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{EscalationError, Result};
use crate::store::EscalationStore;
use crate::types::{EscalationId, EscalationRecord};

/// In-memory record store
#[derive(Debug, Default)]
pub struct InMemoryEscalationStore {
    records: DashMap<EscalationId, EscalationRecord>,
}

impl InMemoryEscalationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl EscalationStore for InMemoryEscalationStore {
    async fn record_created(&self, record: &EscalationRecord) -> Result<()> {
        if self.records.contains_key(&record.escalation_id) {
            return Err(EscalationError::already_exists(format!(
                "Escalation {} already stored",
                record.escalation_id
            )));
        }
        self.records.insert(record.escalation_id, record.clone());
        Ok(())
    }

    async fn record_updated(&self, record: &EscalationRecord) -> Result<()> {
        match self.records.get_mut(&record.escalation_id) {
            Some(mut existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(EscalationError::not_found(format!(
                "Escalation {} not stored",
                record.escalation_id
            ))),
        }
    }

    async fn get(&self, escalation_id: &EscalationId) -> Result<Option<EscalationRecord>> {
        Ok(self.records.get(escalation_id).map(|r| r.value().clone()))
    }
}
