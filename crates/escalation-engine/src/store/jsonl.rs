//! Append-only JSON-lines store
//!
//! Every create/update appends one line holding the full record snapshot.
//! Reads replay the file and keep the latest snapshot per escalation id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::EscalationStore;
use crate::types::{EscalationId, EscalationRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SnapshotOp {
    Created,
    Updated,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotLine {
    op: SnapshotOp,
    record: EscalationRecord,
}

/// JSON-lines file store
#[derive(Debug)]
pub struct JsonlEscalationStore {
    path: PathBuf,
    // serialises appends so lines never interleave
    write_lock: Mutex<()>,
}

impl JsonlEscalationStore {
    /// Use (and create on first write) the file at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, op: SnapshotOp, record: &EscalationRecord) -> Result<()> {
        let mut line = serde_json::to_string(&SnapshotLine {
            op,
            record: record.clone(),
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        debug!("💾 Stored {:?} snapshot of {}", op, record.escalation_id);
        Ok(())
    }

    /// Latest snapshot of every stored escalation
    ///
    /// Unparseable lines (for example a torn final write) are skipped.
    pub async fn load_all(&self) -> Result<HashMap<EscalationId, EscalationRecord>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        let mut latest = HashMap::new();
        for (number, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SnapshotLine>(line) {
                Ok(snapshot) => {
                    latest.insert(snapshot.record.escalation_id, snapshot.record);
                }
                Err(e) => warn!(
                    "⚠️ Skipping bad line {} in {}: {}",
                    number + 1,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(latest)
    }
}

#[async_trait]
impl EscalationStore for JsonlEscalationStore {
    async fn record_created(&self, record: &EscalationRecord) -> Result<()> {
        self.append(SnapshotOp::Created, record).await
    }

    async fn record_updated(&self, record: &EscalationRecord) -> Result<()> {
        self.append(SnapshotOp::Updated, record).await
    }

    async fn get(&self, escalation_id: &EscalationId) -> Result<Option<EscalationRecord>> {
        let mut all = self.load_all().await?;
        Ok(all.remove(escalation_id))
    }
}
