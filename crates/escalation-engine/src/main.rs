use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use escalation_engine::agent::HumanAgent;
use escalation_engine::integration::LoggingNotifier;
use escalation_engine::monitoring::EventSeverity;
use escalation_engine::store::{EscalationStore, InMemoryEscalationStore, JsonlEscalationStore};
use escalation_engine::{EscalationConfig, EscalationRouter};

/// Run the escalation router with SLA monitoring
#[derive(Debug, Parser)]
#[command(name = "escalation-router", version, about)]
struct Args {
    /// JSON configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON array of agent profiles to register at startup
    #[arg(short, long)]
    roster: Option<PathBuf>,

    /// Append escalation records to this JSON-lines file
    #[arg(long)]
    store: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();
    info!("🚀 Starting escalation router");

    let config = match &args.config {
        Some(path) => EscalationConfig::from_json_file(path)?,
        None => EscalationConfig::default(),
    };

    let store: Arc<dyn EscalationStore> = match &args.store {
        Some(path) => {
            info!("💾 Persisting escalations to {}", path.display());
            Arc::new(JsonlEscalationStore::new(path))
        }
        None => Arc::new(InMemoryEscalationStore::new()),
    };

    let router =
        EscalationRouter::with_collaborators(config, Arc::new(LoggingNotifier), store, None).await?;

    if let Some(path) = &args.roster {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading roster {}", path.display()))?;
        let agents: Vec<HumanAgent> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing roster {}", path.display()))?;
        for agent in agents {
            let id = agent.id.clone();
            if let Err(e) = router.register_agent(agent) {
                warn!("⚠️ Skipping agent {}: {}", id, e);
            }
        }
        info!("👥 {} agents registered", router.agent_stats().total);
    } else {
        warn!("⚠️ No roster given; every escalation will queue");
    }

    router.start();

    let mut events = router.subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event.severity >= EventSeverity::Error => {
                    error!("{}: {}", event.kind, event.message);
                }
                Ok(event) => info!("{}: {}", event.kind, event.message),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("⚠️ Event watcher lagged, {} events missed", missed);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received");

    router.shutdown().await?;
    watcher.abort();

    let report = router.get_analytics();
    info!(
        "📊 {} escalations, {} auto-resolved, SLA compliance {:.1}%",
        report.total_escalations,
        report.auto_resolved,
        report.sla_compliance_rate * 100.0
    );
    Ok(())
}
