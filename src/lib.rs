//! rl-engine - tabular Q-learning decision service for advertising-campaign
//! optimization.
//!
//! Given a campaign's strategic goal and current performance metrics, the
//! engine recommends an optimization action and a confidence score, while
//! continuously ingesting reward feedback to update a per-context Q-table
//! and its derived strategy index. See `SPEC_FULL.md` for the full design.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod ports;
pub mod services;
