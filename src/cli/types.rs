//! Top-level CLI definitions (clap derive).

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rl-engine")]
#[command(about = "Tabular Q-learning decision service for advertising-campaign optimization")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Path to a TOML config file, merged over the built-in defaults
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Request an optimization action for a campaign context
    GenerateAction {
        /// Strategic context label, e.g. "MAXIMIZE_ROAS"
        strategic_context: String,

        #[arg(long, default_value = "conversion")]
        campaign_type: String,
        #[arg(long, default_value = "moderate")]
        risk_appetite: String,
        #[arg(long, default_value = "moderate")]
        competition: String,
        #[arg(long, default_value = "business_hours")]
        time_of_day: String,
        #[arg(long, default_value = "weekday")]
        day_of_week: String,
        #[arg(long, default_value = "normal")]
        seasonality: String,
        #[arg(long, default_value = "stable")]
        market_conditions: String,
        #[arg(long, default_value = "southeast")]
        brazil_region: String,

        #[arg(long, default_value_t = 2.0)]
        ctr: f64,
        #[arg(long, default_value_t = 10.0)]
        cpm: f64,
        #[arg(long, default_value_t = 0.5)]
        cpc: f64,
        #[arg(long, default_value_t = 10_000.0)]
        impressions: f64,
        #[arg(long, default_value_t = 200.0)]
        clicks: f64,
        #[arg(long, default_value_t = 20.0)]
        conversions: f64,
        #[arg(long, default_value_t = 100.0)]
        spend: f64,
        #[arg(long, default_value_t = 200.0)]
        revenue: f64,
        #[arg(long, default_value_t = 2.0)]
        roas: f64,
        #[arg(long, default_value_t = 0.8)]
        budget_utilization: f64,
        #[arg(long, default_value_t = 8_000.0)]
        reach: f64,
        #[arg(long, default_value_t = 1.25)]
        frequency: f64,
    },

    /// Record a (context, action, reward) observation
    Learn {
        /// Normalized context key, e.g. "MAXIMIZE_ROAS_conversion_moderate_moderate"
        context: String,
        /// One of the twelve recognized action strings
        action: String,
        /// Observed reward, in [-1.0, 1.0]
        reward: f64,
        /// Optional correlation id to echo back through published events
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Force a learning pass over the active buffer now
    Process,

    /// Print aggregate learning metrics
    Status,

    /// List every learned strategy
    Strategies,

    /// Run the event consumer and background lifecycle tasks until interrupted
    Serve,
}
