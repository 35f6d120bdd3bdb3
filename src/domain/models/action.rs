//! The closed set of optimization actions the engine can recommend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::ValidationError;

/// One of the twelve fixed optimization verbs. The set is closed: no string
/// outside these variants is ever accepted as an action, at ingress or from
/// an event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    OptimizeBiddingStrategy,
    IncreaseBidConversionKeywords,
    ReduceBidConservative,
    FocusHighValueAudiences,
    ExpandReachCampaigns,
    OptimizeForCtr,
    PauseUnderperformingKeywords,
    IncreaseDailyBudget,
    DecreaseDailyBudget,
    TestNewAdCreative,
    NarrowAudienceTargeting,
    OptimizeForConversions,
}

/// All twelve actions, in the fixed enum order used to break ties in
/// `QTable::best_action`.
pub const ALL: [Action; 12] = [
    Action::OptimizeBiddingStrategy,
    Action::IncreaseBidConversionKeywords,
    Action::ReduceBidConservative,
    Action::FocusHighValueAudiences,
    Action::ExpandReachCampaigns,
    Action::OptimizeForCtr,
    Action::PauseUnderperformingKeywords,
    Action::IncreaseDailyBudget,
    Action::DecreaseDailyBudget,
    Action::TestNewAdCreative,
    Action::NarrowAudienceTargeting,
    Action::OptimizeForConversions,
];

impl Action {
    /// The stable snake_case wire representation, used as the Q-table's
    /// inner key and in persisted rows.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OptimizeBiddingStrategy => "optimize_bidding_strategy",
            Self::IncreaseBidConversionKeywords => "increase_bid_conversion_keywords",
            Self::ReduceBidConservative => "reduce_bid_conservative",
            Self::FocusHighValueAudiences => "focus_high_value_audiences",
            Self::ExpandReachCampaigns => "expand_reach_campaigns",
            Self::OptimizeForCtr => "optimize_for_ctr",
            Self::PauseUnderperformingKeywords => "pause_underperforming_keywords",
            Self::IncreaseDailyBudget => "increase_daily_budget",
            Self::DecreaseDailyBudget => "decrease_daily_budget",
            Self::TestNewAdCreative => "test_new_ad_creative",
            Self::NarrowAudienceTargeting => "narrow_audience_targeting",
            Self::OptimizeForConversions => "optimize_for_conversions",
        }
    }

    /// All actions, for exploration draws and Q-table argmax scans.
    pub const fn all() -> [Action; 12] {
        ALL
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidAction(s.to_string()))
    }
}
