//! Command-line interface for search-sync
//!
//! # Usage Examples
//!
//! ```bash
//! # Check a config file and print the resolved replicas
//! search-sync check-config --config config.yaml
//!
//! # Sync until interrupted, overriding the Meilisearch host
//! search-sync run --config config.yaml --meilisearch-host http://search:7700
//!
//! # Same, configured from the environment
//! SEARCH_SYNC_CONFIG=/etc/search-sync.yaml MEILISEARCH_API_KEY=secret search-sync run
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use meilisearch_sink::{MeilisearchConfig, MeilisearchSink};
use search_sink::IndexWriter;
use search_sync::{
    run_consumers, AnonymizedSource, AppConfig, ConfigOpts, CountingHandler, NoDatabase,
    ReplicaRegistry, Router,
};
use search_sync_kafka_source::Client;
use tokio_postgres::NoTls;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "search-sync")]
#[command(about = "Keep Meilisearch indexes in sync with PostgreSQL change events")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume replication messages and apply them to the search index
    Run {
        #[command(flatten)]
        opts: ConfigOpts,
    },
    /// Validate the configuration and print the replicas
    CheckConfig {
        #[command(flatten)]
        opts: ConfigOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { opts } => {
            let config = opts
                .load()
                .with_context(|| format!("Failed to load config from {:?}", opts.config))?;
            run_sync(config).await?;
        }
        Commands::CheckConfig { opts } => {
            let config = opts
                .load()
                .with_context(|| format!("Failed to load config from {:?}", opts.config))?;
            check_config(&config)?;
        }
    }

    Ok(())
}

fn check_config(config: &AppConfig) -> anyhow::Result<()> {
    let registry = ReplicaRegistry::from_config(&config.replicas)?;
    println!("Configuration OK: {} replicas", registry.len());
    for replica in registry.replicas() {
        let privacy = match &replica.privacy {
            Some(p) => format!(" (anonymized from {}.{} on {})", p.namespace, replica.relation, p.pivot),
            None => String::new(),
        };
        println!(
            "  {}.{} -> index {} [pk {}]{privacy}",
            replica.namespace, replica.relation, replica.index, replica.primary_key
        );
    }
    Ok(())
}

async fn run_sync(config: AppConfig) -> anyhow::Result<()> {
    let registry = Arc::new(ReplicaRegistry::from_config(&config.replicas)?);
    info!("Loaded {} replicas", registry.len());

    let sink = MeilisearchSink::new(MeilisearchConfig {
        host: config.meilisearch.host.clone(),
        api_key: config.meilisearch.api_key.clone(),
        poll_interval: config.poll_interval()?,
    })?;
    match sink.version().await {
        Ok(version) => info!(
            "Connected to Meilisearch {} at {}",
            version.pkg_version, config.meilisearch.host
        ),
        Err(e) => warn!(
            "Meilisearch at {} is not reachable yet: {e:#}",
            config.meilisearch.host
        ),
    }
    let sink = Arc::new(sink);

    if config.needs_database() {
        let (client, connection) =
            tokio_postgres::connect(&config.database.connection_string, NoTls)
                .await
                .context("Failed to connect to PostgreSQL")?;

        // Spawn connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {e}");
            }
        });
        info!("Connected to PostgreSQL for anonymized views");

        consume(&config, registry, sink, client).await
    } else {
        consume(&config, registry, sink, NoDatabase).await
    }
}

async fn consume<W, A>(
    config: &AppConfig,
    registry: Arc<ReplicaRegistry>,
    writer: Arc<W>,
    source: A,
) -> anyhow::Result<()>
where
    W: IndexWriter + 'static,
    A: AnonymizedSource + 'static,
{
    let router = Router::new(registry, writer, source).with_chunk_size(config.batch.chunk_size);
    let handler = Arc::new(CountingHandler::new(router));

    let client = Client::new(config.kafka.consumer_config()?)?;
    run_consumers(&client, config.kafka.num_consumers, Arc::clone(&handler), shutdown_signal())
        .await?;

    info!("Stopped after {} messages", handler.processed());
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
