use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::{OfferError, Result};
use crate::utils::{read_json_optional, write_json_atomic};

/// Negotiation tactic the bandit chooses between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tactic {
    Aggressive,
    Collaborative,
    Accommodating,
    Competitive,
    Avoiding,
}

impl Tactic {
    pub const ALL: [Self; 5] = [
        Self::Aggressive,
        Self::Collaborative,
        Self::Accommodating,
        Self::Competitive,
        Self::Avoiding,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Collaborative => "collaborative",
            Self::Accommodating => "accommodating",
            Self::Competitive => "competitive",
            Self::Avoiding => "avoiding",
        }
    }
}

impl fmt::Display for Tactic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tactic {
    type Err = OfferError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                OfferError::ValidationFailed(format!(
                    "unknown tactic {s:?}; expected one of aggressive, collaborative, accommodating, competitive, avoiding"
                ))
            })
    }
}

/// Reward history of one tactic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TacticArm {
    pub rewards: Vec<f64>,
    pub pulls: u64,
}

impl TacticArm {
    #[must_use]
    pub fn average_reward(&self) -> f64 {
        if self.rewards.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.rewards.len() as f64;
        self.total_reward() / n
    }

    #[must_use]
    pub fn total_reward(&self) -> f64 {
        self.rewards.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmStats {
    pub tactic: Tactic,
    pub pulls: u64,
    pub avg_reward: f64,
    pub total_reward: f64,
}

/// UCB1 bandit over [`Tactic::ALL`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiArmedBandit {
    pub arms: BTreeMap<Tactic, TacticArm>,
    pub exploration_factor: f64,
}

impl Default for MultiArmedBandit {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl MultiArmedBandit {
    #[must_use]
    pub fn new(exploration_factor: f64) -> Self {
        Self {
            arms: Tactic::ALL
                .into_iter()
                .map(|t| (t, TacticArm::default()))
                .collect(),
            exploration_factor,
        }
    }

    #[must_use]
    pub fn total_pulls(&self) -> u64 {
        self.arms.values().map(|arm| arm.pulls).sum()
    }

    /// A random untried tactic while any remain, otherwise the tactic with
    /// the highest `avg + c * sqrt(2 ln(total) / pulls)`. Ties go to the
    /// earlier tactic in [`Tactic::ALL`].
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> Tactic {
        let untried: Vec<Tactic> = self
            .arms
            .iter()
            .filter(|(_, arm)| arm.pulls == 0)
            .map(|(tactic, _)| *tactic)
            .collect();
        if let Some(tactic) = untried.choose(rng) {
            return *tactic;
        }

        #[allow(clippy::cast_precision_loss)]
        let ln_total = (self.total_pulls() as f64).ln();
        let mut best = (Tactic::ALL[0], f64::NEG_INFINITY);
        for tactic in Tactic::ALL {
            let Some(arm) = self.arms.get(&tactic) else {
                continue;
            };
            #[allow(clippy::cast_precision_loss)]
            let bonus = (2.0 * ln_total / arm.pulls as f64).sqrt();
            let ucb = self.exploration_factor.mul_add(bonus, arm.average_reward());
            if ucb > best.1 {
                best = (tactic, ucb);
            }
        }
        best.0
    }

    pub fn update(&mut self, tactic: Tactic, reward: f64) {
        let arm = self.arms.entry(tactic).or_default();
        arm.rewards.push(reward);
        arm.pulls += 1;
    }

    #[must_use]
    pub fn statistics(&self) -> Vec<ArmStats> {
        self.arms
            .iter()
            .map(|(tactic, arm)| ArmStats {
                tactic: *tactic,
                pulls: arm.pulls,
                avg_reward: arm.average_reward(),
                total_reward: arm.total_reward(),
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
    }

    pub fn load(path: &Path, exploration_factor: f64) -> Result<Self> {
        let Some(mut bandit) = read_json_optional::<Self>(path)? else {
            return Ok(Self::new(exploration_factor));
        };
        // Tactics added since the file was written start untried.
        for tactic in Tactic::ALL {
            bandit.arms.entry(tactic).or_default();
        }
        bandit.exploration_factor = exploration_factor;
        Ok(bandit)
    }
}
