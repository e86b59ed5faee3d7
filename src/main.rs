use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ragward_core::bootstrap::{
    build_services, create_embedder, create_store, prepare_documents_dir, resolve_config_path,
};
use ragward_core::config::Config;
use ragward_gateway::GatewayServer;
use ragward_index::IndexWatcher;
use tokio::sync::watch;

/// Access-controlled semantic search over a directory of text documents.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.validate()?;
    tracing::info!(path = %config_path.display(), "configuration loaded");

    prepare_documents_dir(&config.documents.dir, config.documents.seed_samples)?;

    let store = create_store(&config.store)?;
    let embedder = create_embedder(&config.embedding);
    let services = build_services(&config, store, embedder)?;

    let vector_size = services
        .indexer
        .ensure_collection()
        .await
        .with_context(|| {
            format!(
                "failed to prepare collection '{}'; is Ollama running with model '{}' pulled?",
                config.store.collection, config.embedding.model
            )
        })?;
    tracing::info!(
        collection = %config.store.collection,
        vector_size,
        "collection ready"
    );

    match services.indexer.sideload(&config.documents.dir).await {
        Ok(report) => tracing::info!(
            scanned = report.files_scanned,
            indexed = report.files_indexed,
            rejected = report.files_rejected,
            empty = report.files_empty,
            chunks = report.chunks_created,
            removed = report.chunks_removed,
            errors = report.errors.len(),
            ms = report.duration_ms,
            "documents sideloaded"
        ),
        Err(e) => tracing::warn!("sideload failed: {e:#}"),
    }

    let _watcher = if config.watcher.enabled {
        match IndexWatcher::start(
            &config.documents.dir,
            services.indexer.clone(),
            &config.watcher_config(),
        ) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!("document watcher failed to start: {e:#}");
                None
            }
        }
    } else {
        tracing::info!("document watcher disabled");
        None
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    GatewayServer::new(
        &config.gateway.bind,
        config.gateway.port,
        services.retriever,
        shutdown_rx,
    )
    .with_max_body_size(config.gateway.max_body_size)
    .serve()
    .await?;

    tracing::info!("shut down");
    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
