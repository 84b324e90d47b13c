use crate::error::GreenworkError;
use serde::{Deserialize, Serialize};

/// Trait for reward policies applied when a work item settles.
///
/// Implementors decide how much an accepted executor and each verifier earn, and how much
/// a rejected executor loses.
pub trait RewardPolicy: Send + Sync + Clone + 'static {
    /// Total reward for the executor of an accepted item of the given cost.
    fn executor_reward(&self, cost: f64, renewable_share: f64) -> f64;

    /// Reward for each assigned verifier of an accepted item.
    fn verifier_reward(&self, cost: f64) -> f64;

    /// Score penalty for the executor of a rejected item.
    fn penalty(&self, cost: f64) -> f64 {
        cost
    }
}

/// How the renewable-energy bonus is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewableBonus {
    /// \( R_r = k \cdot C \cdot \alpha \).
    #[default]
    AlphaScaled,

    /// \( R_r = C / 2 \), independent of \( \alpha \).
    FlatHalfCost,
}

/// Default reward policy with a renewable-energy incentive.
///
/// Uses \( R_b = k \cdot C \) as the base reward, adds the configured renewable bonus, and
/// pays verifiers \( R_v = k \cdot C \cdot z \).
#[derive(Debug, Clone)]
pub struct GreenIncentive {
    /// Reward multiplier \( k \).
    reward_multiplier: f64,

    /// Verifier reward coefficient \( z \).
    verifier_coeff: f64,

    bonus: RenewableBonus,
}

impl GreenIncentive {
    /// Creates a new reward policy.
    ///
    /// # Arguments
    /// * `reward_multiplier` - \( k \) (must be positive and finite).
    /// * `verifier_coeff` - \( z \) (must be non-negative and finite).
    /// * `bonus` - Renewable bonus variant.
    ///
    /// # Errors
    /// Returns an error if parameters are invalid.
    pub fn new(
        reward_multiplier: f64,
        verifier_coeff: f64,
        bonus: RenewableBonus,
    ) -> Result<Self, GreenworkError> {
        if !reward_multiplier.is_finite() || reward_multiplier <= 0.0 {
            return Err(GreenworkError::InvalidConfig(
                "reward multiplier must be positive".into(),
            ));
        }
        if !verifier_coeff.is_finite() || verifier_coeff < 0.0 {
            return Err(GreenworkError::InvalidConfig(
                "verifier reward coefficient must be non-negative".into(),
            ));
        }
        Ok(Self {
            reward_multiplier,
            verifier_coeff,
            bonus,
        })
    }

    pub fn bonus(&self) -> RenewableBonus {
        self.bonus
    }
}

impl RewardPolicy for GreenIncentive {
    fn executor_reward(&self, cost: f64, renewable_share: f64) -> f64 {
        let base = self.reward_multiplier * cost;
        let bonus = match self.bonus {
            RenewableBonus::AlphaScaled => base * renewable_share,
            RenewableBonus::FlatHalfCost => cost * 0.5,
        };
        base + bonus
    }

    fn verifier_reward(&self, cost: f64) -> f64 {
        self.reward_multiplier * cost * self.verifier_coeff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_scaled_bonus() {
        let incentive = GreenIncentive::new(2.0, 0.5, RenewableBonus::AlphaScaled).unwrap();
        // 2 * 10 + 2 * 10 * 0.25
        assert!((incentive.executor_reward(10.0, 0.25) - 25.0).abs() < 1e-12);
        assert!((incentive.verifier_reward(10.0) - 10.0).abs() < 1e-12);
        assert_eq!(incentive.penalty(10.0), 10.0);
    }

    #[test]
    fn test_flat_half_cost_bonus_ignores_alpha() {
        let incentive = GreenIncentive::new(1.0, 0.5, RenewableBonus::FlatHalfCost).unwrap();
        assert_eq!(incentive.bonus(), RenewableBonus::FlatHalfCost);
        assert_eq!(incentive.executor_reward(10.0, 0.0), 15.0);
        assert_eq!(incentive.executor_reward(10.0, 0.5), 15.0);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(GreenIncentive::new(0.0, 0.5, RenewableBonus::AlphaScaled).is_err());
        assert!(GreenIncentive::new(f64::NAN, 0.5, RenewableBonus::AlphaScaled).is_err());
        assert!(GreenIncentive::new(1.0, -0.1, RenewableBonus::AlphaScaled).is_err());
    }
}
