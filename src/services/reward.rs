//! Reward-from-metrics calculation, used when an event carries raw
//! performance numbers instead of an explicit reward.

/// Inputs the reward contract reads from a `traffic.request_completed`
/// or `campaign.performance_updated` event payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardInputs {
    pub success: bool,
    pub roas: f64,
    pub ctr: f64,
    pub conversions: f64,
}

/// Computes reward per the pinned contract in spec.md §4.3:
///
/// start at ±0.5 on `success`; roas > 3.0 adds 0.3, roas < 1.0 subtracts
/// 0.3; ctr > 2.5 adds 0.2, ctr < 0.8 subtracts 0.2; conversions > 30 adds
/// 0.1; clamp to [-1, 1]. This mapping is a contract, not a heuristic —
/// callers must not adjust the thresholds without updating the pinned
/// scenario tests (S6).
pub fn calculate_reward(inputs: RewardInputs) -> f64 {
    let mut r = if inputs.success { 0.5 } else { -0.5 };

    if inputs.roas > 3.0 {
        r += 0.3;
    } else if inputs.roas < 1.0 {
        r -= 0.3;
    }

    if inputs.ctr > 2.5 {
        r += 0.2;
    } else if inputs.ctr < 0.8 {
        r -= 0.2;
    }

    if inputs.conversions > 30.0 {
        r += 0.1;
    }

    r.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s6_reward_from_metrics_mapping() {
        let reward = calculate_reward(RewardInputs { success: true, roas: 4.0, ctr: 3.0, conversions: 40.0 });
        assert!((reward - 1.0).abs() < 1e-9);
    }

    #[test]
    fn failure_with_poor_metrics_bottoms_out_at_minus_one() {
        let reward = calculate_reward(RewardInputs { success: false, roas: 0.5, ctr: 0.2, conversions: 0.0 });
        assert!((reward - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn neutral_metrics_leave_only_the_success_term() {
        let reward = calculate_reward(RewardInputs { success: true, roas: 2.0, ctr: 1.5, conversions: 10.0 });
        assert!((reward - 0.5).abs() < 1e-9);
    }

    #[test]
    fn reward_is_always_in_range() {
        for success in [true, false] {
            for roas in [0.0, 1.0, 3.0, 100.0] {
                for ctr in [0.0, 0.8, 2.5, 10.0] {
                    for conversions in [0.0, 30.0, 31.0] {
                        let r = calculate_reward(RewardInputs { success, roas, ctr, conversions });
                        assert!((-1.0..=1.0).contains(&r), "reward {r} out of range");
                    }
                }
            }
        }
    }
}
