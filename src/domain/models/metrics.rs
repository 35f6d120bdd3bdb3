//! Campaign performance metrics attached to a decision or outcome.

use serde::{Deserialize, Serialize};

use crate::domain::error::ValidationError;

/// Raw performance numbers reported for a campaign at decision or outcome
/// time. All twelve fields must be finite and non-negative (spec.md §3);
/// `ctr` is a percentage point value (e.g. `2.5` means 2.5%, not a
/// fraction), matching the heuristic-fallback and reward-calculation
/// thresholds in spec.md §4.3, which compare against `2.5`/`0.8`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub ctr: f64,
    pub cpm: f64,
    pub cpc: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub spend: f64,
    pub revenue: f64,
    pub roas: f64,
    pub budget_utilization: f64,
    pub reach: f64,
    pub frequency: f64,
}

/// The defaults from spec.md §6, applied when a caller omits a field.
impl Default for CampaignMetrics {
    fn default() -> Self {
        Self {
            ctr: 2.0,
            cpm: 10.0,
            cpc: 0.5,
            impressions: 10_000.0,
            clicks: 200.0,
            conversions: 20.0,
            spend: 100.0,
            revenue: 200.0,
            roas: 2.0,
            budget_utilization: 0.8,
            reach: 8_000.0,
            frequency: 1.25,
        }
    }
}

impl CampaignMetrics {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctr: f64,
        cpm: f64,
        cpc: f64,
        impressions: f64,
        clicks: f64,
        conversions: f64,
        spend: f64,
        revenue: f64,
        roas: f64,
        budget_utilization: f64,
        reach: f64,
        frequency: f64,
    ) -> Result<Self, ValidationError> {
        let metrics =
            Self { ctr, cpm, cpc, impressions, clicks, conversions, spend, revenue, roas, budget_utilization, reach, frequency };
        metrics.validate()?;
        Ok(metrics)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_non_negative("ctr", self.ctr)?;
        check_non_negative("cpm", self.cpm)?;
        check_non_negative("cpc", self.cpc)?;
        check_non_negative("impressions", self.impressions)?;
        check_non_negative("clicks", self.clicks)?;
        check_non_negative("conversions", self.conversions)?;
        check_non_negative("spend", self.spend)?;
        check_non_negative("revenue", self.revenue)?;
        check_non_negative("roas", self.roas)?;
        check_non_negative("budget_utilization", self.budget_utilization)?;
        check_non_negative("reach", self.reach)?;
        check_non_negative("frequency", self.frequency)?;
        Ok(())
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidMetric { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_formed() -> CampaignMetrics {
        CampaignMetrics::new(2.5, 12.0, 0.6, 50_000.0, 1_200.0, 42.0, 1_000.0, 3_500.0, 3.5, 0.7, 40_000.0, 1.4).unwrap()
    }

    #[test]
    fn accepts_well_formed_metrics() {
        let m = well_formed();
        assert_eq!(m.roas, 3.5);
    }

    #[test]
    fn default_matches_spec_defaults() {
        let m = CampaignMetrics::default();
        assert_eq!(m.ctr, 2.0);
        assert_eq!(m.cpm, 10.0);
        assert_eq!(m.cpc, 0.5);
        assert_eq!(m.impressions, 10_000.0);
        assert_eq!(m.clicks, 200.0);
        assert_eq!(m.conversions, 20.0);
        assert_eq!(m.spend, 100.0);
        assert_eq!(m.revenue, 200.0);
        assert_eq!(m.roas, 2.0);
        assert_eq!(m.budget_utilization, 0.8);
        assert_eq!(m.reach, 8_000.0);
        assert_eq!(m.frequency, 1.25);
    }

    #[test]
    fn rejects_negative_roas() {
        let err = CampaignMetrics::new(2.0, 10.0, 0.5, 100.0, 10.0, 1.0, 10.0, 20.0, -1.0, 0.5, 100.0, 1.0).unwrap_err();
        assert_eq!(err, ValidationError::InvalidMetric { field: "roas", value: -1.0 });
    }

    #[test]
    fn ctr_above_one_is_a_valid_percentage_point_value() {
        // ctr is a percentage (e.g. 2.5 means 2.5%), not a [0,1] fraction,
        // so values above 1.0 must be accepted.
        let m = CampaignMetrics::new(4.2, 10.0, 0.5, 100.0, 10.0, 1.0, 10.0, 20.0, 2.0, 0.5, 100.0, 1.0).unwrap();
        assert_eq!(m.ctr, 4.2);
    }

    #[test]
    fn rejects_non_finite_values() {
        let err = CampaignMetrics::new(f64::NAN, 10.0, 0.5, 100.0, 10.0, 1.0, 10.0, 20.0, 2.0, 0.5, 100.0, 1.0).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMetric { field: "ctr", .. }));
    }

    #[test]
    fn rejects_negative_frequency() {
        let err = CampaignMetrics::new(2.0, 10.0, 0.5, 100.0, 10.0, 1.0, 10.0, 20.0, 2.0, 0.5, 100.0, -0.1).unwrap_err();
        assert_eq!(err, ValidationError::InvalidMetric { field: "frequency", value: -0.1 });
    }
}
