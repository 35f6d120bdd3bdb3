//! `rl-engine strategies`

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, strategies_table, CommandOutput};
use crate::services::RlService;

#[derive(Debug, Serialize)]
struct StrategySummary {
    context: String,
    best_action: String,
    best_q_value: f64,
    total_experiences: u64,
    confidence: f64,
}

#[derive(Debug, Serialize)]
struct StrategiesOutput {
    strategies: Vec<StrategySummary>,
}

impl CommandOutput for StrategiesOutput {
    fn to_human(&self) -> String {
        if self.strategies.is_empty() {
            return "no strategies learned yet".to_string();
        }
        let rows: Vec<(String, String, f64, u64, f64)> = self
            .strategies
            .iter()
            .map(|s| (s.context.clone(), s.best_action.clone(), s.best_q_value, s.total_experiences, s.confidence))
            .collect();
        strategies_table(&rows)
    }
}

pub async fn handle(service: &RlService, json: bool) -> Result<()> {
    let mut strategies: Vec<StrategySummary> = service
        .get_strategies()
        .await
        .into_iter()
        .map(|s| StrategySummary {
            context: s.context.clone(),
            best_action: s.best_action.to_string(),
            best_q_value: s.best_q_value,
            total_experiences: s.total_experiences,
            confidence: s.confidence(),
        })
        .collect();
    strategies.sort_by(|a, b| a.context.cmp(&b.context));

    output(&StrategiesOutput { strategies }, json);
    Ok(())
}
