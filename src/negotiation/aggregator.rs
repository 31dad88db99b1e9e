//! Ranks strategy results and writes the recommendation.

use std::time::Duration;

use serde::Serialize;

use crate::utils::{format_amount, format_percent};

use super::executor::{NegotiationResult, Speaker, Utterance};
use super::strategy::{Personality, RiskLevel, Strategy, StrategyCatalog, Style};

/// Confidence attached to the no-results fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

/// Outcome of one negotiation round.
///
/// `all_results` is never empty and is sorted by offer, highest first; the
/// best result is its first element.
#[derive(Debug, Clone, Serialize)]
pub struct QuantumResult {
    all_results: Vec<NegotiationResult>,
    recommendation: String,
    expected_gain: f64,
    #[serde(with = "humantime_serde")]
    total_time: Duration,
    fallback: bool,
}

impl QuantumResult {
    #[must_use]
    pub fn best_result(&self) -> &NegotiationResult {
        &self.all_results[0]
    }

    #[must_use]
    pub fn all_results(&self) -> &[NegotiationResult] {
        &self.all_results
    }

    #[must_use]
    pub fn best_offer(&self) -> f64 {
        self.best_result().final_offer
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.best_result().confidence_score
    }

    #[must_use]
    pub const fn expected_gain(&self) -> f64 {
        self.expected_gain
    }

    #[must_use]
    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }

    #[must_use]
    pub const fn total_time(&self) -> Duration {
        self.total_time
    }

    /// `true` when no strategy finished and this is the base-salary fallback.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.fallback
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutcomeAggregator {
    pub materiality_threshold: f64,
}

impl Default for OutcomeAggregator {
    fn default() -> Self {
        Self {
            materiality_threshold: 10_000.0,
        }
    }
}

impl OutcomeAggregator {
    #[must_use]
    pub const fn new(materiality_threshold: f64) -> Self {
        Self {
            materiality_threshold,
        }
    }

    /// Combine strategy results into a [`QuantumResult`].
    ///
    /// With no results this returns a fallback at the base salary. The
    /// fallback strategy is the catalog's first entry, or a synthetic one if
    /// the catalog is empty.
    #[must_use]
    pub fn aggregate(
        &self,
        mut results: Vec<NegotiationResult>,
        catalog: &StrategyCatalog,
        base_salary: f64,
        target_salary: f64,
        total_time: Duration,
    ) -> QuantumResult {
        if results.is_empty() {
            return Self::fallback(catalog, base_salary, total_time);
        }

        // Stable: equal offers keep strategy order.
        results.sort_by(|a, b| b.final_offer.total_cmp(&a.final_offer));

        let best = &results[0];
        let expected_gain = best.final_offer - base_salary;
        let recommendation = self.recommend(&results, target_salary);

        QuantumResult {
            all_results: results,
            recommendation,
            expected_gain,
            total_time,
            fallback: false,
        }
    }

    fn recommend(&self, ranked: &[NegotiationResult], target_salary: f64) -> String {
        let best = &ranked[0];
        let ratio = best.final_offer / target_salary;
        let offer = format_amount(best.final_offer);
        let name = &best.strategy.name;
        let of_target = format_percent(ratio);

        let mut text = if ratio >= 1.0 {
            format!(
                "Excellent: strategy {name} reached {offer} ({of_target} of target, +{} over). Accept this offer.",
                format_percent(ratio - 1.0)
            )
        } else if ratio >= 0.95 {
            format!("Good: strategy {name} reached {offer} ({of_target} of target). Consider accepting.")
        } else if ratio >= 0.85 {
            format!(
                "Acceptable: strategy {name} reached {offer} ({of_target} of target). One more round may help."
            )
        } else {
            format!(
                "Below expectations: strategy {name} reached {offer} ({of_target} of target). Keep negotiating or look at other options."
            )
        };

        if let Some(second) = ranked.get(1) {
            let margin = best.final_offer - second.final_offer;
            if margin > self.materiality_threshold {
                text.push_str(&format!(
                    " It beats the next strategy ({}) by {}.",
                    second.strategy.name,
                    format_amount(margin)
                ));
            }
        }

        text
    }

    fn fallback(catalog: &StrategyCatalog, base_salary: f64, total_time: Duration) -> QuantumResult {
        let strategy = catalog.first().cloned().unwrap_or_else(|| {
            Strategy::new(
                "fallback",
                Style::Neutral,
                Personality::Professional,
                RiskLevel::Medium,
                1.0,
            )
        });
        let reasoning = "No strategy completed; falling back to the base salary".to_string();
        let result = NegotiationResult {
            response_chain: vec![Utterance {
                speaker: Speaker::Candidate,
                text: format!("Using strategy {} (fallback)", strategy.name),
            }],
            strategy,
            final_offer: base_salary,
            confidence_score: FALLBACK_CONFIDENCE,
            execution_time: Duration::ZERO,
            reasoning,
        };

        QuantumResult {
            all_results: vec![result],
            recommendation: format!(
                "No results: every strategy failed or timed out. Stay at the base salary of {} and retry the round.",
                format_amount(base_salary)
            ),
            expected_gain: 0.0,
            total_time,
            fallback: true,
        }
    }
}
