//! The Q-learning engine (C4): orchestrates the Q-table and dual buffer,
//! runs ε-greedy selection with heuristic fallback, and performs the
//! atomic processing pass that applies learning updates.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::error::ValidationError;
use crate::domain::models::{Action, BufferUtilization, CampaignContext, CampaignMetrics, DualBuffer, Experience, QTable, Strategy};
use crate::services::rng::ExplorationRng;

/// Everything a caller may attach to a learning sample beyond the
/// required (context, action, reward) triple.
#[derive(Debug, Clone, Default)]
pub struct ExperienceMetadata {
    pub fields: HashMap<String, String>,
    pub correlation_id: Option<String>,
}

/// Hyperparameters and buffer bounds read once at startup (spec.md §9:
/// "configuration is an explicit options record, not ambient state").
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub learning_rate: f64,
    /// Reserved for a future multi-step extension; never read by the
    /// single-step update in [`QTable::update`].
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub max_active_buffer: usize,
    pub max_history_buffer: usize,
    pub auto_process_threshold: usize,
    pub history_retention_hours: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.95,
            exploration_rate: 0.15,
            max_active_buffer: 25,
            max_history_buffer: 1000,
            auto_process_threshold: 15,
            history_retention_hours: 72,
        }
    }
}

/// Outcome of one `process_experiences` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessingStats {
    pub processed_count: u64,
    pub strategies_created: u64,
    pub strategies_updated: u64,
    pub avg_new_q: f64,
}

const CONFIDENCE_RING_SOFT_CAP: usize = 500;
const CONFIDENCE_RING_HARD_CAP: usize = 1000;

/// The learning core. Not thread-safe on its own; `RlService` serializes
/// all access through the engine lock (spec.md §5).
pub struct QLearningEngine {
    config: EngineConfig,
    q_table: QTable,
    strategies: HashMap<String, Strategy>,
    buffer: DualBuffer,
    rng: Box<dyn ExplorationRng>,
    confidence_history: VecDeque<f64>,
}

impl QLearningEngine {
    pub fn new(config: EngineConfig, rng: Box<dyn ExplorationRng>) -> Self {
        Self {
            buffer: DualBuffer::new(
                config.max_active_buffer,
                config.max_history_buffer,
                config.auto_process_threshold,
                config.history_retention_hours,
            ),
            config,
            q_table: QTable::new(),
            strategies: HashMap::new(),
            rng,
            confidence_history: VecDeque::new(),
        }
    }

    pub fn load_state(&mut self, q_table: QTable, strategies: HashMap<String, Strategy>, buffer: DualBuffer) {
        self.q_table = q_table;
        self.strategies = strategies;
        self.buffer = buffer;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn strategies(&self) -> &HashMap<String, Strategy> {
        &self.strategies
    }

    pub fn buffer_utilization(&self) -> BufferUtilization {
        self.buffer.utilization()
    }

    pub fn active_experiences(&self) -> &VecDeque<Experience> {
        self.buffer.active()
    }

    pub fn history_experiences(&self) -> &VecDeque<Experience> {
        self.buffer.history()
    }

    pub fn should_auto_process(&self) -> bool {
        self.buffer.should_auto_process()
    }

    /// Drops history entries older than the configured retention window.
    pub fn prune_history(&mut self, now: DateTime<Utc>) {
        self.buffer.prune_history(now);
    }

    /// Validates and appends a learning sample to the active buffer, keyed
    /// by `context`'s normalized form. Returns the new experience's id.
    pub fn add_experience(
        &mut self,
        normalized_context: impl Into<String>,
        action: Action,
        reward: f64,
        now: DateTime<Utc>,
        metadata: ExperienceMetadata,
    ) -> Result<Uuid, ValidationError> {
        let exp = Experience::new(normalized_context, action, reward, now, metadata.fields, metadata.correlation_id)?;
        let id = exp.id;
        self.buffer.append(exp);
        Ok(id)
    }

    /// Selects an action for `ctx` per the algorithm in spec.md §4.3.
    pub fn generate_action(&mut self, ctx: &CampaignContext, metrics: &CampaignMetrics) -> (Action, f64, String) {
        let key = ctx.normalize();

        let (action, confidence, reasoning) = if let Some(strategy) = self.strategies.get(&key) {
            if self.rng.next_f64() < self.config.exploration_rate {
                let action = Action::all()[self.rng.next_index(Action::all().len())];
                (action, 0.5, "exploration".to_string())
            } else {
                let confidence = strategy.confidence();
                (
                    strategy.best_action,
                    confidence,
                    format!("exploitation over {} experiences", strategy.total_experiences),
                )
            }
        } else if self.q_table.has_row(&key) {
            let (action, q) = self.q_table.best_action(&key).expect("row exists");
            let confidence = (0.4 + 0.1 * q).clamp(0.0, 0.9);
            (action, confidence, "q-table match".to_string())
        } else {
            let action = heuristic_fallback(&ctx.strategic_context, metrics.roas);
            (action, 0.5, format!("Heuristic fallback for uncharted context: {}", ctx.strategic_context))
        };

        self.record_confidence(confidence);
        (action, confidence, reasoning)
    }

    fn record_confidence(&mut self, confidence: f64) {
        self.confidence_history.push_back(confidence);
        if self.confidence_history.len() > CONFIDENCE_RING_HARD_CAP {
            while self.confidence_history.len() > CONFIDENCE_RING_SOFT_CAP {
                self.confidence_history.pop_front();
            }
        }
    }

    pub fn confidence_history(&self) -> &VecDeque<f64> {
        &self.confidence_history
    }

    /// Runs the atomic processing pass: applies the Q-update to every
    /// unprocessed active experience, restores strategy invariants, and
    /// promotes the batch into history.
    pub fn process_experiences(&mut self, now: DateTime<Utc>) -> ProcessingStats {
        let unprocessed_ids: Vec<Uuid> = self.buffer.unprocessed().iter().map(|e| e.id).collect();
        let mut stats = ProcessingStats::default();
        let mut q_sum = 0.0;

        for id in &unprocessed_ids {
            let (context, action, reward) = {
                let exp = self
                    .buffer
                    .active()
                    .iter()
                    .find(|e| &e.id == id)
                    .expect("id came from this buffer's unprocessed list");
                (exp.context.clone(), exp.action, exp.reward)
            };

            let new_q = self.q_table.update(&context, action, reward, self.config.learning_rate);
            q_sum += new_q;

            let created = !self.strategies.contains_key(&context);
            let strategy = self.strategies.entry(context.clone()).or_insert_with(|| Strategy::new(context.clone(), action, new_q, now));
            if created {
                stats.strategies_created += 1;
            } else {
                stats.strategies_updated += 1;
            }
            strategy.record_outcome(action, reward, new_q, now);
            for candidate in Action::all() {
                let q = self.q_table.get(&context, candidate);
                strategy.q_values.insert(candidate, q);
            }
            strategy.restore_best();

            if let Some(exp) = self.buffer.active_mut().iter_mut().find(|e| &e.id == id) {
                exp.mark_processed(now);
            }
            stats.processed_count += 1;
        }

        self.buffer.promote(&unprocessed_ids);
        self.buffer.prune_history(now);

        stats.avg_new_q = if stats.processed_count > 0 { q_sum / stats.processed_count as f64 } else { 0.0 };
        stats
    }
}

/// Rule-based action for contexts with no learned data yet (spec.md
/// §4.3 step 4). Case-insensitive substring match over
/// `strategic_context`, checked in this fixed order.
fn heuristic_fallback(strategic_context: &str, roas: f64) -> Action {
    let lowered = strategic_context.to_lowercase();
    if lowered.contains("cpa") {
        if roas < 2.0 {
            Action::FocusHighValueAudiences
        } else {
            Action::ReduceBidConservative
        }
    } else if lowered.contains("roas") {
        Action::FocusHighValueAudiences
    } else if lowered.contains("awareness") {
        Action::ExpandReachCampaigns
    } else if lowered.contains("conversion") {
        Action::IncreaseBidConversionKeywords
    } else if lowered.contains("reach") {
        Action::ExpandReachCampaigns
    } else if lowered.contains("ctr") {
        Action::OptimizeForCtr
    } else {
        Action::OptimizeBiddingStrategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CampaignType, Competition, RiskAppetite};
    use crate::services::rng::SplitMix64Rng;

    fn sample_context(strategic_context: &str) -> CampaignContext {
        CampaignContext::new(
            strategic_context,
            CampaignType::Conversion,
            RiskAppetite::Moderate,
            Competition::Moderate,
            "business_hours",
            "weekday",
            "normal",
            "stable",
            "southeast",
        )
        .unwrap()
    }

    fn sample_metrics() -> CampaignMetrics {
        CampaignMetrics::default()
    }

    struct ZeroRng;
    impl ExplorationRng for ZeroRng {
        fn next_f64(&self) -> f64 {
            0.0
        }
    }

    struct OneRng;
    impl ExplorationRng for OneRng {
        fn next_f64(&self) -> f64 {
            0.999_999
        }
    }

    fn engine_with_rng(rng: Box<dyn ExplorationRng>) -> QLearningEngine {
        QLearningEngine::new(EngineConfig::default(), rng)
    }

    #[test]
    fn scenario_s1_cold_start_heuristic() {
        let mut engine = engine_with_rng(Box::new(SplitMix64Rng::new(1)));
        let ctx = sample_context("MAXIMIZE_ROAS");
        let (action, confidence, reasoning) = engine.generate_action(&ctx, &sample_metrics());
        assert_eq!(action, Action::FocusHighValueAudiences);
        assert!((confidence - 0.5).abs() < 1e-9);
        assert!(reasoning.contains("Heuristic"), "reasoning was {reasoning}");
    }

    #[test]
    fn scenario_s2_single_sample_learning_then_exploit() {
        let mut engine = engine_with_rng(Box::new(ZeroRng));
        let ctx = sample_context("MAXIMIZE_ROAS");
        let key = ctx.normalize();
        assert_eq!(key, "MAXIMIZE_ROAS_conversion_moderate_moderate");

        engine
            .add_experience(key.clone(), Action::ExpandReachCampaigns, 1.0, Utc::now(), ExperienceMetadata::default())
            .unwrap();
        engine.process_experiences(Utc::now());

        let (action, confidence, reasoning) = engine.generate_action(&ctx, &sample_metrics());
        assert_eq!(action, Action::ExpandReachCampaigns);
        assert!(confidence > 0.3, "confidence was {confidence}");
        assert!(reasoning.contains("exploitation"), "reasoning was {reasoning}");
    }

    #[test]
    fn scenario_s3_reward_convergence() {
        let mut engine = engine_with_rng(Box::new(ZeroRng));
        let ctx = sample_context("convergence-test");
        for _ in 0..100 {
            engine.add_experience(ctx.normalize(), Action::OptimizeForCtr, 0.8, Utc::now(), ExperienceMetadata::default()).unwrap();
            engine.process_experiences(Utc::now());
        }
        let q = engine.q_table.get(&ctx.normalize(), Action::OptimizeForCtr);
        assert!((q - 0.8).abs() < 0.01, "q was {q}");
    }

    #[test]
    fn scenario_s4_auto_processing_threshold() {
        let mut config = EngineConfig::default();
        config.auto_process_threshold = 15;
        let mut engine = QLearningEngine::new(config, Box::new(ZeroRng));
        let ctx = sample_context("threshold-test");

        for _ in 0..14 {
            engine.add_experience(ctx.normalize(), Action::OptimizeBiddingStrategy, 0.1, Utc::now(), ExperienceMetadata::default()).unwrap();
        }
        assert!(!engine.should_auto_process());
        assert_eq!(engine.buffer_utilization().active_unprocessed, 14);
        assert_eq!(engine.buffer_utilization().history_size, 0);

        engine.add_experience(ctx.normalize(), Action::OptimizeBiddingStrategy, 0.1, Utc::now(), ExperienceMetadata::default()).unwrap();
        assert!(engine.should_auto_process());
        engine.process_experiences(Utc::now());
        assert_eq!(engine.buffer_utilization().history_size, 15);
        assert_eq!(engine.buffer_utilization().active_unprocessed, 0);
    }

    #[test]
    fn scenario_s5_overflow_behaviour() {
        let mut config = EngineConfig::default();
        config.max_active_buffer = 25;
        config.auto_process_threshold = 1000;
        let mut engine = QLearningEngine::new(config, Box::new(ZeroRng));
        let ctx = sample_context("overflow-test");

        let mut ids = Vec::new();
        for _ in 0..30 {
            let id = engine.add_experience(ctx.normalize(), Action::OptimizeBiddingStrategy, 0.1, Utc::now(), ExperienceMetadata::default()).unwrap();
            ids.push(id);
        }

        assert_eq!(engine.buffer_utilization().active_size, 25);
        let present: Vec<Uuid> = engine.active_experiences().iter().map(|e| e.id).collect();
        for dropped in &ids[..5] {
            assert!(!present.contains(dropped));
        }
    }

    #[test]
    fn p6_epsilon_zero_is_purely_exploitative() {
        let mut engine = engine_with_rng(Box::new(OneRng));
        let ctx = sample_context("exploit-only");
        engine.add_experience(ctx.normalize(), Action::NarrowAudienceTargeting, 0.9, Utc::now(), ExperienceMetadata::default()).unwrap();
        engine.process_experiences(Utc::now());
        for _ in 0..20 {
            let (action, _, _) = engine.generate_action(&ctx, &sample_metrics());
            assert_eq!(action, Action::NarrowAudienceTargeting);
        }
    }

    #[test]
    fn heuristic_fallback_order_matches_spec() {
        assert_eq!(heuristic_fallback("low CPA target", 1.0), Action::FocusHighValueAudiences);
        assert_eq!(heuristic_fallback("low CPA target", 3.0), Action::ReduceBidConservative);
        assert_eq!(heuristic_fallback("MAXIMIZE_ROAS", 2.0), Action::FocusHighValueAudiences);
        assert_eq!(heuristic_fallback("brand awareness", 2.0), Action::ExpandReachCampaigns);
        assert_eq!(heuristic_fallback("conversion push", 2.0), Action::IncreaseBidConversionKeywords);
        assert_eq!(heuristic_fallback("reach expansion", 2.0), Action::ExpandReachCampaigns);
        assert_eq!(heuristic_fallback("ctr focus", 2.0), Action::OptimizeForCtr);
        assert_eq!(heuristic_fallback("something else entirely", 2.0), Action::OptimizeBiddingStrategy);
    }
}
