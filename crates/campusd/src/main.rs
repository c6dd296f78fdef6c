//! campusd: the campus workflow daemon.
//!
//! Wires the document store, event publisher and notification observer
//! together and runs the election scheduler, which advances every election
//! whose schedule boundary has passed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use campus_core::{
    EventPublisher, MockPaymentGateway, NotificationObserver, Strategies, WorkflowConfig,
    Workflows, COLLECTIONS,
};
use campus_state::{DocumentStore, MemoryDocumentStore, SurrealDocumentStore};
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "campusd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Campus workflow daemon", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, env = "CAMPUS_LOG_JSON")]
    json: bool,

    /// Seconds between election scheduler passes
    #[arg(long, env = "CAMPUS_TICK_SECS", default_value_t = 60)]
    tick_secs: u64,

    /// Run a single scheduler pass and exit
    #[arg(long)]
    once: bool,

    /// Use the in-memory store instead of SurrealDB
    #[arg(long, env = "CAMPUS_MEMORY_STORE")]
    memory: bool,
}

async fn open_store(memory: bool) -> Result<Arc<dyn DocumentStore>> {
    if memory {
        warn!("using in-memory store, data is lost on exit");
        return Ok(Arc::new(MemoryDocumentStore::new()));
    }
    let store = SurrealDocumentStore::from_env()
        .await
        .context("Failed to connect to campus database")?;
    store
        .init_schema(COLLECTIONS)
        .await
        .context("Failed to define campus collections")?;
    Ok(Arc::new(store))
}

fn build_workflows(store: Arc<dyn DocumentStore>, config: WorkflowConfig) -> Workflows {
    let notifications = Arc::new(NotificationObserver::new(store.clone()));
    let publisher = Arc::new(EventPublisher::with_default_observers(notifications));
    Workflows::new(
        store,
        publisher,
        Strategies::standard(),
        config,
        Arc::new(MockPaymentGateway::new()),
    )
}

/// One scheduler pass. Returns how many elections moved.
async fn tick(workflows: &Workflows) -> Result<usize> {
    let advanced = workflows.election.auto_advance_all(Utc::now()).await?;
    for election in &advanced {
        info!(election_id = %election.id, state = %election.state, "election advanced");
    }
    Ok(advanced.len())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    campus_core::telemetry::init_tracing(cli.json, level);

    let config = WorkflowConfig::from_env().context("Invalid workflow configuration")?;
    let store = open_store(cli.memory).await?;
    let workflows = build_workflows(store, config);
    info!(tick_secs = cli.tick_secs, once = cli.once, "campusd started");

    if cli.once {
        tick(&workflows).await?;
        campus_core::metrics::METRICS.flush();
        return Ok(());
    }

    let mut interval = tokio::time::interval(Duration::from_secs(cli.tick_secs.max(1)));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = tick(&workflows).await {
                    warn!(error = %e, "scheduler pass failed");
                }
                campus_core::metrics::METRICS.flush();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    campus_core::metrics::METRICS.flush();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::workflows::NewElection;
    use campus_core::{ElectionSchedule, ElectionState};

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["campusd"]).unwrap();
        assert_eq!(cli.tick_secs, 60);
        assert!(!cli.once);
        assert!(!cli.memory);
    }

    #[test]
    fn test_cli_flags() {
        let cli =
            Cli::try_parse_from(["campusd", "--once", "--memory", "--tick-secs", "5", "--json"])
                .unwrap();
        assert!(cli.once);
        assert!(cli.memory);
        assert!(cli.json);
        assert_eq!(cli.tick_secs, 5);
    }

    #[tokio::test]
    async fn test_tick_advances_due_elections() {
        let store = open_store(true).await.unwrap();
        let workflows = build_workflows(store, WorkflowConfig::default());
        let start = Utc::now() - chrono::Duration::hours(1);
        let election = workflows
            .election
            .create_election(NewElection {
                department_id: "CSE".into(),
                title: "Class representative".into(),
                description: String::new(),
                schedule: ElectionSchedule {
                    nomination_start: start,
                    nomination_end: start + chrono::Duration::days(2),
                    voting_start: start + chrono::Duration::days(3),
                    voting_end: start + chrono::Duration::days(4),
                },
                created_by: "T-1".into(),
            })
            .await
            .unwrap();

        assert_eq!(tick(&workflows).await.unwrap(), 1);
        assert_eq!(tick(&workflows).await.unwrap(), 0);
        let stored = workflows.election.election(&election.id).await.unwrap();
        assert_eq!(stored.state, ElectionState::NominationOpen);
    }
}
