//! Negotiation strategies and the diverse-subset selector.

use std::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// How hard a strategy pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Soft,
    Neutral,
    Hard,
    Aggressive,
}

impl Style {
    /// Buckets the selector draws one strategy from, in order.
    pub const SELECTION_ORDER: [Self; 3] = [Self::Soft, Self::Neutral, Self::Hard];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Neutral => "neutral",
            Self::Hard => "hard",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    Professional,
    Friendly,
    Analytical,
    Aggressive,
}

impl Personality {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Friendly => "friendly",
            Self::Analytical => "analytical",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named negotiation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub style: Style,
    pub personality: Personality,
    #[serde(alias = "risk_level")]
    pub risk: RiskLevel,
    /// Multiplier applied to the target salary, e.g. 1.1 asks for target +10%.
    pub target_multiplier: f64,
}

impl Strategy {
    pub fn new(
        name: impl Into<String>,
        style: Style,
        personality: Personality,
        risk: RiskLevel,
        target_multiplier: f64,
    ) -> Self {
        Self {
            name: name.into(),
            style,
            personality,
            risk,
            target_multiplier,
        }
    }
}

/// Immutable list of strategies available to the engine.
#[derive(Debug, Clone, Default)]
pub struct StrategyCatalog {
    strategies: Vec<Strategy>,
}

impl StrategyCatalog {
    #[must_use]
    pub const fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// Three soft, three neutral and three hard strategies.
    #[must_use]
    pub fn builtin() -> Self {
        use Personality::{Aggressive, Analytical, Friendly, Professional};
        use RiskLevel::{High, Low, Medium};
        use Style::{Hard, Neutral, Soft};

        Self::new(vec![
            Strategy::new("soft_professional", Soft, Professional, Low, 1.05),
            Strategy::new("soft_friendly", Soft, Friendly, Low, 1.08),
            Strategy::new("soft_analytical", Soft, Analytical, Medium, 1.12),
            Strategy::new("neutral_professional", Neutral, Professional, Medium, 1.15),
            Strategy::new("neutral_balanced", Neutral, Friendly, Medium, 1.18),
            Strategy::new("neutral_data_driven", Neutral, Analytical, Medium, 1.20),
            Strategy::new("hard_professional", Hard, Professional, High, 1.25),
            Strategy::new("hard_aggressive", Hard, Aggressive, High, 1.30),
            Strategy::new("hard_maximum", Hard, Analytical, High, 1.35),
        ])
    }

    #[must_use]
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Strategy> {
        self.strategies.first()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.name == name)
    }

    /// Pick a diverse subset to run in one round.
    ///
    /// Draws one random soft, one neutral and one hard strategy (each only
    /// while below `max_parallel`), then fills the remaining slots at random
    /// from whatever is left. The result has no duplicates and is non-empty
    /// whenever the catalog is non-empty and `max_parallel > 0`.
    pub fn select_top_strategies<R: Rng + ?Sized>(
        &self,
        max_parallel: usize,
        rng: &mut R,
    ) -> Vec<Strategy> {
        let mut picked: Vec<usize> = Vec::with_capacity(max_parallel);

        for style in Style::SELECTION_ORDER {
            if picked.len() >= max_parallel {
                break;
            }
            let bucket: Vec<usize> = self
                .strategies
                .iter()
                .enumerate()
                .filter(|(_, s)| s.style == style)
                .map(|(idx, _)| idx)
                .collect();
            if let Some(&idx) = bucket.choose(rng) {
                picked.push(idx);
            }
        }

        while picked.len() < max_parallel {
            let remaining: Vec<usize> = (0..self.strategies.len())
                .filter(|idx| !picked.contains(idx))
                .collect();
            let Some(&idx) = remaining.choose(rng) else {
                break;
            };
            picked.push(idx);
        }

        picked
            .into_iter()
            .map(|idx| self.strategies[idx].clone())
            .collect()
    }
}
