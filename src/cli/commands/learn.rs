//! `rl-engine learn`

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Action;
use crate::services::engine::ExperienceMetadata;
use crate::services::RlService;

#[derive(Debug, Serialize)]
struct LearnOutput {
    experience_id: String,
    active_buffer_size: usize,
    history_buffer_size: usize,
    strategies_count: usize,
    auto_processed: bool,
    processed_count: Option<u64>,
}

impl CommandOutput for LearnOutput {
    fn to_human(&self) -> String {
        let mut s = format!(
            "experience_id: {}\nbuffer: active={} history={}\nstrategies_count: {}\nauto_processed: {}",
            self.experience_id, self.active_buffer_size, self.history_buffer_size, self.strategies_count, self.auto_processed
        );
        if let Some(count) = self.processed_count {
            s.push_str(&format!("\nprocessed_count: {count}"));
        }
        s
    }
}

pub async fn handle(
    service: &RlService,
    context: String,
    action: String,
    reward: f64,
    correlation_id: Option<String>,
    json: bool,
) -> Result<()> {
    let action: Action = action.parse()?;
    let metadata = ExperienceMetadata { fields: Default::default(), correlation_id };

    let result = service.learn(context, action, reward, metadata).await?;

    output(
        &LearnOutput {
            experience_id: result.experience_id.to_string(),
            active_buffer_size: result.buffer.active_size,
            history_buffer_size: result.buffer.history_size,
            strategies_count: result.strategies_count,
            auto_processed: result.auto_processed,
            processed_count: result.processing.map(|p| p.processed_count),
        },
        json,
    );
    Ok(())
}
