//! Application services: the learning engine, the use-case surface, the
//! event consumer, and lifecycle/background-task orchestration.

pub mod engine;
pub mod event_consumer;
pub mod lifecycle;
pub mod reward;
pub mod rl_service;
pub mod rng;

pub use engine::{EngineConfig, ExperienceMetadata, ProcessingStats, QLearningEngine};
pub use event_consumer::EventConsumer;
pub use lifecycle::{Lifecycle, LifecycleConfig};
pub use reward::{calculate_reward, RewardInputs};
pub use rl_service::{BufferKind, GenerateActionRequest, GenerateActionResult, LearnResult, LearningMetrics, RlService};
