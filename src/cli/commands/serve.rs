//! `rl-engine serve`: run the event consumer and lifecycle background
//! tasks until interrupted.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::infrastructure::config::Config;
use crate::ports::event_stream::EventStream;
use crate::services::{EventConsumer, Lifecycle, RlService};

pub async fn handle(config: &Config, service: RlService, events: Option<Arc<dyn EventStream>>) -> Result<()> {
    let lifecycle = Lifecycle::new(service.clone(), config.lifecycle_config());
    let shutdown = lifecycle.shutdown_handle();

    let lifecycle_handle = tokio::spawn(async move { lifecycle.run().await });

    let consumer_handle = if config.event_bus_enabled {
        events.as_ref().map(|stream| {
            let stream = stream.clone();
            let consumer = EventConsumer::new(stream, service.clone(), config.event_consumer_group.clone());
            tokio::spawn(async move { consumer.run(1_000).await })
        })
    } else {
        None
    };

    info!(service = %config.service_name, "rl-engine serving; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    shutdown.notify_one();
    lifecycle_handle.await?;

    if let Some(stream) = events {
        stream.shutdown();
    }
    if let Some(handle) = consumer_handle {
        handle.await?;
    }

    Ok(())
}
