//! Reward computation for recorded negotiation outcomes.
//!
//! A successful negotiation earns 1.0, plus a salary bonus capped at
//! `max_bonus` once the achieved salary reaches the reference salary.

use serde::{Deserialize, Serialize};

use crate::config::BanditConfig;

/// What happened when a tactic was used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NegotiationOutcome {
    pub success: bool,
    /// Salary reached, if the negotiation got that far.
    pub salary: Option<f64>,
}

impl NegotiationOutcome {
    #[must_use]
    pub const fn success(salary: f64) -> Self {
        Self {
            success: true,
            salary: Some(salary),
        }
    }

    #[must_use]
    pub const fn failure() -> Self {
        Self {
            success: false,
            salary: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardModel {
    pub reference_salary: f64,
    pub max_bonus: f64,
}

impl RewardModel {
    /// `target_salary` is used when the config has no reference salary.
    #[must_use]
    pub fn from_config(config: &BanditConfig, target_salary: f64) -> Self {
        Self {
            reference_salary: config.reference_salary.unwrap_or(target_salary),
            max_bonus: config.max_salary_bonus,
        }
    }

    #[must_use]
    pub fn compute_reward(&self, outcome: &NegotiationOutcome) -> f64 {
        let base = if outcome.success { 1.0 } else { 0.0 };
        base + self.salary_bonus(outcome.salary)
    }

    fn salary_bonus(&self, salary: Option<f64>) -> f64 {
        match salary {
            Some(salary) if salary > 0.0 && self.reference_salary > 0.0 => {
                (salary / self.reference_salary).min(1.0) * self.max_bonus
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestCase, run_table_tests};

    fn model() -> RewardModel {
        RewardModel {
            reference_salary: 200_000.0,
            max_bonus: 0.5,
        }
    }

    #[test]
    fn reward_table() {
        let cases = vec![
            TestCase {
                name: "failure without salary",
                input: NegotiationOutcome::failure(),
                expected: 0.0,
            },
            TestCase {
                name: "success at half the reference",
                input: NegotiationOutcome::success(100_000.0),
                expected: 1.25,
            },
            TestCase {
                name: "bonus is capped",
                input: NegotiationOutcome::success(400_000.0),
                expected: 1.5,
            },
            TestCase {
                name: "failure still earns the salary bonus",
                input: NegotiationOutcome {
                    success: false,
                    salary: Some(200_000.0),
                },
                expected: 0.5,
            },
        ];
        run_table_tests(cases, |outcome| model().compute_reward(&outcome));
    }

    #[test]
    fn reference_defaults_to_target() {
        let config = BanditConfig::default();
        let model = RewardModel::from_config(&config, 250_000.0);
        assert!((model.reference_salary - 250_000.0).abs() < f64::EPSILON);
    }
}
