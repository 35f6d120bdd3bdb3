//! `rl-engine process`

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::services::RlService;

#[derive(Debug, Serialize)]
struct ProcessOutput {
    processed_count: u64,
    strategies_created: u64,
    strategies_updated: u64,
    avg_new_q: f64,
}

impl CommandOutput for ProcessOutput {
    fn to_human(&self) -> String {
        format!(
            "processed_count: {}\nstrategies_created: {}\nstrategies_updated: {}\navg_new_q: {:.4}",
            self.processed_count, self.strategies_created, self.strategies_updated, self.avg_new_q
        )
    }
}

pub async fn handle(service: &RlService, json: bool) -> Result<()> {
    let stats = service.process().await;
    output(
        &ProcessOutput {
            processed_count: stats.processed_count,
            strategies_created: stats.strategies_created,
            strategies_updated: stats.strategies_updated,
            avg_new_q: stats.avg_new_q,
        },
        json,
    );
    Ok(())
}
