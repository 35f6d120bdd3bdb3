//! rl-engine CLI entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use rl_engine::adapters::events::InMemoryEventStream;
use rl_engine::adapters::sqlite::{initialize_database, SqliteRlRepository};
use rl_engine::cli::commands::{generate_action, learn, process, serve, status, strategies};
use rl_engine::cli::{Cli, Commands};
use rl_engine::infrastructure::config::ConfigLoader;
use rl_engine::infrastructure::logging;
use rl_engine::ports::event_stream::EventStream;
use rl_engine::ports::persistence::RlRepository;
use rl_engine::services::RlService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path).with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ConfigLoader::load().context("failed to load configuration")?,
    };

    let _logging_guard = logging::init(&config.logging).context("failed to initialize logging")?;

    let pool = initialize_database(&config.persistence_url)
        .await
        .with_context(|| format!("failed to initialize database at {}", config.persistence_url))?;
    let repository: Arc<dyn RlRepository> = Arc::new(SqliteRlRepository::new(pool));

    // Critical connectivity check: a failure here aborts start-up (spec.md §7).
    repository.ping().await.context("database connectivity check failed")?;

    let events: Option<Arc<dyn EventStream>> =
        if config.event_bus_enabled { Some(Arc::new(InMemoryEventStream::new())) } else { None };

    let service = RlService::new(config.engine_config(), repository, events.clone());

    match cli.command {
        Commands::Serve => {
            return serve::handle(&config, service, events).await;
        }
        _ => {
            service.load_from_repository().await;
        }
    }

    match cli.command {
        Commands::GenerateAction { .. } => {
            generate_action::handle(&service, cli.command, cli.json).await?;
        }
        Commands::Learn { context, action, reward, correlation_id } => {
            learn::handle(&service, context, action, reward, correlation_id, cli.json).await?;
        }
        Commands::Process => {
            process::handle(&service, cli.json).await?;
        }
        Commands::Status => {
            status::handle(&service, cli.json).await?;
        }
        Commands::Strategies => {
            strategies::handle(&service, cli.json).await?;
        }
        Commands::Serve => unreachable!("Serve is handled above"),
    }

    service.flush().await.context("failed to flush learned state before exit")?;

    Ok(())
}
