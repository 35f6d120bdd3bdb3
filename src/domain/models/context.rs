//! The descriptor of a decision situation and its canonical normalization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::ValidationError;

macro_rules! closed_string_enum {
    ($name:ident, $field:literal, { $($variant:ident => $repr:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Stable wire representation, also used in the normalized context key.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $repr),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($repr => Ok(Self::$variant),)+
                    other => Err(ValidationError::UnrecognizedEnum {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

closed_string_enum!(CampaignType, "campaign_type", {
    Conversion => "conversion",
    Awareness => "awareness",
    Reach => "reach",
    Engagement => "engagement",
    Traffic => "traffic",
    AppInstall => "app_install",
    VideoView => "video_view",
    LeadGeneration => "lead_generation",
});

closed_string_enum!(RiskAppetite, "risk_appetite", {
    Conservative => "conservative",
    Moderate => "moderate",
    Aggressive => "aggressive",
});

closed_string_enum!(Competition, "competition", {
    Low => "low",
    Moderate => "moderate",
    High => "high",
});

impl Default for CampaignType {
    fn default() -> Self {
        Self::Conversion
    }
}

impl Default for RiskAppetite {
    fn default() -> Self {
        Self::Moderate
    }
}

impl Default for Competition {
    fn default() -> Self {
        Self::Moderate
    }
}

/// Descriptor of the decision situation presented to the engine.
///
/// `normalize()` is lossy and intentional: `time_of_day`, `day_of_week`,
/// `seasonality`, `market_conditions`, and `brazil_region` do not take part
/// in the canonical key, so multiple raw contexts collapse onto the same
/// learned Q-table row/strategy. This must stay stable across restarts,
/// since it is the persisted row key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignContext {
    pub strategic_context: String,
    pub campaign_type: CampaignType,
    pub risk_appetite: RiskAppetite,
    pub competition: Competition,
    pub time_of_day: String,
    pub day_of_week: String,
    pub seasonality: String,
    pub market_conditions: String,
    pub brazil_region: String,
}

impl CampaignContext {
    /// Validates and constructs a context from raw request fields.
    pub fn new(
        strategic_context: impl Into<String>,
        campaign_type: CampaignType,
        risk_appetite: RiskAppetite,
        competition: Competition,
        time_of_day: impl Into<String>,
        day_of_week: impl Into<String>,
        seasonality: impl Into<String>,
        market_conditions: impl Into<String>,
        brazil_region: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let strategic_context = strategic_context.into();
        if strategic_context.trim().is_empty() {
            return Err(ValidationError::InvalidContext);
        }
        Ok(Self {
            strategic_context,
            campaign_type,
            risk_appetite,
            competition,
            time_of_day: time_of_day.into(),
            day_of_week: day_of_week.into(),
            seasonality: seasonality.into(),
            market_conditions: market_conditions.into(),
            brazil_region: brazil_region.into(),
        })
    }

    /// The canonical, restart-stable Q-table row key / strategy key.
    ///
    /// `{strategic_context}_{campaign_type}_{risk_appetite}_{competition}` —
    /// `strategic_context` is trimmed but not case-folded, matching the
    /// literal scenario keys in spec.md §8 (e.g. the S1/S2 pair, where
    /// `generate_action("MAXIMIZE_ROAS", ..defaults..)` and
    /// `learn("MAXIMIZE_ROAS_conversion_moderate_moderate", ...)` refer to
    /// the same cell).
    pub fn normalize(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.strategic_context.trim(),
            self.campaign_type.as_str(),
            self.risk_appetite.as_str(),
            self.competition.as_str()
        )
    }
}
