//! Fire-and-forget job dispatcher
//!
//! Routing decisions must never wait on a notification or a disk write. The
//! router submits [`DispatchJob`]s with `try_send` into a bounded channel; a
//! single worker task executes them against the configured [`Notifier`] and
//! [`EscalationStore`]. When the channel is full the job is dropped with a
//! warning and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::agent::AgentId;
use crate::error::Result;
use crate::integration::{AgentAssignment, ExecutiveNotice, Notifier, UserNotice};
use crate::store::EscalationStore;
use crate::types::{CaseId, EscalationRecord};

/// Work item for the dispatcher worker
#[derive(Debug, Clone)]
pub enum DispatchJob {
    NotifyAgent {
        agent_id: AgentId,
        assignment: AgentAssignment,
    },
    NotifyUser {
        case_id: CaseId,
        notice: UserNotice,
    },
    NotifyExecutive(ExecutiveNotice),
    PersistCreated(EscalationRecord),
    PersistUpdated(EscalationRecord),
}

impl DispatchJob {
    fn label(&self) -> &'static str {
        match self {
            DispatchJob::NotifyAgent { .. } => "notify_agent",
            DispatchJob::NotifyUser { .. } => "notify_user",
            DispatchJob::NotifyExecutive(_) => "notify_executive",
            DispatchJob::PersistCreated(_) => "persist_created",
            DispatchJob::PersistUpdated(_) => "persist_updated",
        }
    }
}

/// Bounded job channel plus its worker task
pub struct Dispatcher {
    sender: mpsc::Sender<DispatchJob>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("dropped", &self.dropped_jobs())
            .field("failed", &self.failed_jobs())
            .finish()
    }
}

impl Dispatcher {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(
        capacity: usize,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn EscalationStore>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let failed = Arc::new(AtomicU64::new(0));
        let worker =
            tokio::spawn(run_worker(receiver, shutdown_rx, notifier, store, failed.clone()));

        Self {
            sender,
            shutdown,
            worker: Mutex::new(Some(worker)),
            dropped: Arc::new(AtomicU64::new(0)),
            failed,
        }
    }

    /// Queue a job without waiting; returns `false` if it was dropped
    pub fn submit(&self, job: DispatchJob) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("⚠️ Dispatch channel full, dropping {} job", job.label());
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("⚠️ Dispatcher stopped, dropping {} job", job.label());
                false
            }
        }
    }

    pub fn dropped_jobs(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn failed_jobs(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Stop the worker after it has run every job already queued
    pub async fn shutdown(&self) -> Result<()> {
        let _ = self.shutdown.send(true);
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.await?;
        }
        Ok(())
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<DispatchJob>,
    mut shutdown: watch::Receiver<bool>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn EscalationStore>,
    failed: Arc<AtomicU64>,
) {
    debug!("Dispatcher worker started");
    loop {
        tokio::select! {
            job = receiver.recv() => match job {
                Some(job) => execute(job, notifier.as_ref(), store.as_ref(), &failed).await,
                None => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    while let Ok(job) = receiver.try_recv() {
                        execute(job, notifier.as_ref(), store.as_ref(), &failed).await;
                    }
                    break;
                }
            }
        }
    }
    info!("🛑 Dispatcher worker stopped");
}

async fn execute(
    job: DispatchJob,
    notifier: &dyn Notifier,
    store: &dyn EscalationStore,
    failed: &AtomicU64,
) {
    let label = job.label();
    let outcome = match &job {
        DispatchJob::NotifyAgent { agent_id, assignment } => {
            notifier.notify_agent(agent_id, assignment).await
        }
        DispatchJob::NotifyUser { case_id, notice } => notifier.notify_user(case_id, notice).await,
        DispatchJob::NotifyExecutive(notice) => notifier.notify_executive(notice).await,
        DispatchJob::PersistCreated(record) => store.record_created(record).await,
        DispatchJob::PersistUpdated(record) => store.record_updated(record).await,
    };
    if let Err(e) = outcome {
        failed.fetch_add(1, Ordering::Relaxed);
        error!("❌ Dispatch job {} failed: {}", label, e);
    }
}
