//! `rl-engine status`

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::services::RlService;

#[derive(Debug, Serialize)]
struct StatusOutput {
    contexts_learned: usize,
    total_experiences: u64,
    active_size: usize,
    active_capacity: usize,
    active_unprocessed: usize,
    history_size: usize,
    history_capacity: usize,
    overflow_count: u64,
    average_confidence: f64,
    confidence_samples: usize,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        format!(
            "contexts_learned: {}\ntotal_experiences: {}\nactive: {}/{} (unprocessed {})\nhistory: {}/{}\noverflow_count: {}\naverage_confidence: {:.3} (n={})",
            self.contexts_learned,
            self.total_experiences,
            self.active_size,
            self.active_capacity,
            self.active_unprocessed,
            self.history_size,
            self.history_capacity,
            self.overflow_count,
            self.average_confidence,
            self.confidence_samples
        )
    }
}

pub async fn handle(service: &RlService, json: bool) -> Result<()> {
    let metrics = service.get_metrics().await;
    output(
        &StatusOutput {
            contexts_learned: metrics.contexts_learned,
            total_experiences: metrics.total_experiences,
            active_size: metrics.buffer.active_size,
            active_capacity: metrics.buffer.active_capacity,
            active_unprocessed: metrics.buffer.active_unprocessed,
            history_size: metrics.buffer.history_size,
            history_capacity: metrics.buffer.history_capacity,
            overflow_count: metrics.buffer.overflow_count,
            average_confidence: metrics.average_confidence,
            confidence_samples: metrics.confidence_samples,
        },
        json,
    );
    Ok(())
}
