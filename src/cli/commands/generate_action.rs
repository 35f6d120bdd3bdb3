//! `rl-engine generate-action`

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::types::Commands;
use crate::domain::models::{CampaignContext, CampaignMetrics, CampaignType, Competition, RiskAppetite};
use crate::services::{GenerateActionRequest, RlService};

#[derive(Debug, Serialize)]
struct GenerateActionOutput {
    action: String,
    confidence: f64,
    reasoning: String,
    normalized_context: String,
    context: CampaignContext,
    metrics: CampaignMetrics,
    active_buffer_size: usize,
    history_buffer_size: usize,
    generated_at: String,
}

impl CommandOutput for GenerateActionOutput {
    fn to_human(&self) -> String {
        format!(
            "action: {}\nconfidence: {:.3}\nreasoning: {}\ncontext: {}\nroas: {:.2} ctr: {:.2}\nbuffer: active={} history={}",
            self.action,
            self.confidence,
            self.reasoning,
            self.normalized_context,
            self.metrics.roas,
            self.metrics.ctr,
            self.active_buffer_size,
            self.history_buffer_size
        )
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn handle(service: &RlService, command: Commands, json: bool) -> Result<()> {
    let Commands::GenerateAction {
        strategic_context,
        campaign_type,
        risk_appetite,
        competition,
        time_of_day,
        day_of_week,
        seasonality,
        market_conditions,
        brazil_region,
        ctr,
        cpm,
        cpc,
        impressions,
        clicks,
        conversions,
        spend,
        revenue,
        roas,
        budget_utilization,
        reach,
        frequency,
    } = command
    else {
        unreachable!("handle_generate_action called with a non-GenerateAction command")
    };

    let campaign_type: CampaignType = campaign_type.parse()?;
    let risk_appetite: RiskAppetite = risk_appetite.parse()?;
    let competition: Competition = competition.parse()?;

    let context = CampaignContext::new(
        strategic_context,
        campaign_type,
        risk_appetite,
        competition,
        time_of_day,
        day_of_week,
        seasonality,
        market_conditions,
        brazil_region,
    )?;
    let metrics =
        CampaignMetrics::new(ctr, cpm, cpc, impressions, clicks, conversions, spend, revenue, roas, budget_utilization, reach, frequency)?;

    let result = service.generate_action(GenerateActionRequest { context, metrics }).await;

    output(
        &GenerateActionOutput {
            action: result.action.to_string(),
            confidence: result.confidence,
            reasoning: result.reasoning,
            normalized_context: result.normalized_context,
            context: result.context,
            metrics: result.metrics,
            active_buffer_size: result.buffer.active_size,
            history_buffer_size: result.buffer.history_size,
            generated_at: result.generated_at.to_rfc3339(),
        },
        json,
    );
    Ok(())
}
