//! Phrase library keyed by tactic and negotiation phase.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OfferError, Result};

use super::bandit::Tactic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Opening,
    Exploration,
    Bargaining,
    Closing,
}

impl Phase {
    pub const ALL: [Self; 4] = [
        Self::Opening,
        Self::Exploration,
        Self::Bargaining,
        Self::Closing,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Exploration => "exploration",
            Self::Bargaining => "bargaining",
            Self::Closing => "closing",
        }
    }

    /// First set flag wins, in conversation order; exploration otherwise.
    #[must_use]
    pub const fn determine(flags: PhaseFlags) -> Self {
        if flags.opening {
            Self::Opening
        } else if flags.exploring {
            Self::Exploration
        } else if flags.bargaining {
            Self::Bargaining
        } else if flags.closing {
            Self::Closing
        } else {
            Self::Exploration
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = OfferError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                OfferError::ValidationFailed(format!(
                    "unknown phase {s:?}; expected opening, exploration, bargaining or closing"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseFlags {
    pub opening: bool,
    pub exploring: bool,
    pub bargaining: bool,
    pub closing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phrase {
    pub id: &'static str,
    /// May contain a `{salary}` placeholder.
    pub text: &'static str,
    pub tactic: Tactic,
    pub phase: Phase,
    pub context: &'static str,
    pub success_rate: f64,
    pub usage_count: u64,
}

impl Phrase {
    const fn new(
        id: &'static str,
        text: &'static str,
        tactic: Tactic,
        phase: Phase,
        context: &'static str,
    ) -> Self {
        Self {
            id,
            text,
            tactic,
            phase,
            context,
            success_rate: 0.0,
            usage_count: 0,
        }
    }

    #[must_use]
    pub fn render(&self, salary: Option<&str>) -> String {
        match salary {
            Some(salary) => self.text.replace("{salary}", salary),
            None => self.text.replace("{salary}", "a competitive salary"),
        }
    }

    /// Usage bumps on every result; the success rate only moves on success.
    fn record(&mut self, success: bool) {
        self.usage_count += 1;
        if success {
            #[allow(clippy::cast_precision_loss)]
            let n = self.usage_count as f64;
            self.success_rate = self.success_rate.mul_add(n - 1.0, 1.0) / n;
        }
    }
}

/// Persisted per-phrase counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhraseStats {
    pub success_rate: f64,
    pub usage_count: u64,
}

#[derive(Debug, Clone)]
pub struct PhraseLibrary {
    phrases: Vec<Phrase>,
}

impl Default for PhraseLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PhraseLibrary {
    #[must_use]
    pub fn builtin() -> Self {
        use Phase::{Bargaining, Closing, Exploration, Opening};
        use Tactic::{Accommodating, Aggressive, Avoiding, Collaborative, Competitive};

        let phrases = vec![
            Phrase::new(
                "agg_001",
                "Given my experience and current market rates, I am looking for {salary}",
                Aggressive,
                Opening,
                "opening_salary",
            ),
            Phrase::new(
                "agg_002",
                "That is below the market rate for my qualifications",
                Aggressive,
                Bargaining,
                "counter_offer",
            ),
            Phrase::new(
                "agg_003",
                "I have other offers with higher compensation",
                Aggressive,
                Bargaining,
                "leverage",
            ),
            Phrase::new(
                "collab_001",
                "Let's find a solution that works for both sides",
                Collaborative,
                Exploration,
                "collaboration",
            ),
            Phrase::new(
                "collab_002",
                "I am open to looking at the whole package, not only the base salary",
                Collaborative,
                Bargaining,
                "total_package",
            ),
            Phrase::new(
                "collab_003",
                "Could we talk about growth opportunities in the company?",
                Collaborative,
                Exploration,
                "growth",
            ),
            Phrase::new(
                "acc_001",
                "I understand the budget constraints and am ready to compromise",
                Accommodating,
                Bargaining,
                "budget_constraints",
            ),
            Phrase::new(
                "acc_002",
                "What matters most to me is interesting work and a good team",
                Accommodating,
                Exploration,
                "motivation",
            ),
            Phrase::new(
                "comp_001",
                "My skills are worth more on the market",
                Competitive,
                Bargaining,
                "market_value",
            ),
            Phrase::new(
                "comp_002",
                "This does not meet my expectations",
                Competitive,
                Bargaining,
                "expectations",
            ),
            Phrase::new(
                "avoid_001",
                "Let's come back to this question later",
                Avoiding,
                Exploration,
                "delay",
            ),
            Phrase::new(
                "avoid_002",
                "I need some time to think it over",
                Avoiding,
                Bargaining,
                "thinking_time",
            ),
            Phrase::new(
                "collab_004",
                "If we can agree on {salary}, I am ready to accept today",
                Collaborative,
                Closing,
                "agreement",
            ),
        ];
        Self { phrases }
    }

    #[must_use]
    pub fn phrases(&self) -> &[Phrase] {
        &self.phrases
    }

    /// Best phrase for the tactic and phase, narrowed to those whose context
    /// contains `context` when any match. Falls back to any phrase of the
    /// tactic, then to the whole library.
    #[must_use]
    pub fn select(&self, tactic: Tactic, phase: Phase, context: Option<&str>) -> Option<&Phrase> {
        let mut candidates: Vec<&Phrase> = self
            .phrases
            .iter()
            .filter(|p| p.tactic == tactic && p.phase == phase)
            .collect();

        if let Some(context) = context.filter(|c| !c.is_empty()) {
            let matching: Vec<&Phrase> = candidates
                .iter()
                .copied()
                .filter(|p| p.context.contains(context))
                .collect();
            if !matching.is_empty() {
                candidates = matching;
            }
        }
        if candidates.is_empty() {
            candidates = self.phrases.iter().filter(|p| p.tactic == tactic).collect();
        }
        if candidates.is_empty() {
            candidates = self.phrases.iter().collect();
        }

        // First phrase wins ties so a fresh library is deterministic.
        candidates
            .into_iter()
            .reduce(|best, p| if p.success_rate > best.success_rate { p } else { best })
    }

    #[must_use]
    pub fn best_for(&self, tactic: Tactic, limit: usize) -> Vec<&Phrase> {
        let mut phrases: Vec<&Phrase> = self.phrases.iter().filter(|p| p.tactic == tactic).collect();
        phrases.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));
        phrases.truncate(limit);
        phrases
    }

    /// Record a result for the phrase with this id or exact text. Returns the
    /// id of the matched phrase.
    pub fn record(&mut self, id_or_text: &str, success: bool) -> Option<&'static str> {
        let phrase = self
            .phrases
            .iter_mut()
            .find(|p| p.id == id_or_text || p.text == id_or_text)?;
        phrase.record(success);
        Some(phrase.id)
    }

    #[must_use]
    pub fn stats(&self) -> BTreeMap<String, PhraseStats> {
        self.phrases
            .iter()
            .filter(|p| p.usage_count > 0)
            .map(|p| {
                (
                    p.id.to_string(),
                    PhraseStats {
                        success_rate: p.success_rate,
                        usage_count: p.usage_count,
                    },
                )
            })
            .collect()
    }

    /// Counters for ids no longer in the library are ignored.
    pub fn apply_stats(&mut self, stats: &BTreeMap<String, PhraseStats>) {
        for phrase in &mut self.phrases {
            if let Some(saved) = stats.get(phrase.id) {
                phrase.success_rate = saved.success_rate;
                phrase.usage_count = saved.usage_count;
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::builtin();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestCase, run_table_tests};

    #[test]
    fn phase_from_flags() {
        let cases = vec![
            TestCase {
                name: "no flags",
                input: PhaseFlags::default(),
                expected: Phase::Exploration,
            },
            TestCase {
                name: "opening wins over closing",
                input: PhaseFlags {
                    opening: true,
                    closing: true,
                    ..PhaseFlags::default()
                },
                expected: Phase::Opening,
            },
            TestCase {
                name: "bargaining",
                input: PhaseFlags {
                    bargaining: true,
                    ..PhaseFlags::default()
                },
                expected: Phase::Bargaining,
            },
            TestCase {
                name: "closing",
                input: PhaseFlags {
                    closing: true,
                    ..PhaseFlags::default()
                },
                expected: Phase::Closing,
            },
        ];
        run_table_tests(cases, Phase::determine);
    }

    #[test]
    fn select_prefers_context_match() {
        let library = PhraseLibrary::builtin();
        let phrase = library
            .select(Tactic::Aggressive, Phase::Bargaining, Some("leverage"))
            .unwrap();
        assert_eq!(phrase.id, "agg_003");

        let phrase = library
            .select(Tactic::Aggressive, Phase::Bargaining, Some("nothing-matches"))
            .unwrap();
        assert_eq!(phrase.id, "agg_002");
    }

    #[test]
    fn select_falls_back_to_tactic() {
        let library = PhraseLibrary::builtin();
        let phrase = library
            .select(Tactic::Competitive, Phase::Opening, None)
            .unwrap();
        assert_eq!(phrase.tactic, Tactic::Competitive);
    }

    #[test]
    fn success_rate_moves_only_on_success() {
        let mut library = PhraseLibrary::builtin();
        assert_eq!(library.record("agg_002", true), Some("agg_002"));
        assert_eq!(
            library.record("That is below the market rate for my qualifications", false),
            Some("agg_002")
        );
        let phrase = library.phrases().iter().find(|p| p.id == "agg_002").unwrap();
        assert_eq!(phrase.usage_count, 2);
        assert!((phrase.success_rate - 1.0).abs() < 1e-9);

        assert!(library.record("unknown", true).is_none());
    }

    #[test]
    fn successful_phrase_becomes_preferred() {
        let mut library = PhraseLibrary::builtin();
        library.record("agg_003", true);
        let phrase = library
            .select(Tactic::Aggressive, Phase::Bargaining, None)
            .unwrap();
        assert_eq!(phrase.id, "agg_003");
        assert_eq!(library.best_for(Tactic::Aggressive, 1)[0].id, "agg_003");
    }

    #[test]
    fn stats_round_trip_through_apply() {
        let mut library = PhraseLibrary::builtin();
        library.record("acc_001", true);
        let stats = library.stats();
        assert_eq!(stats.len(), 1);

        let mut fresh = PhraseLibrary::builtin();
        fresh.apply_stats(&stats);
        assert_eq!(fresh.best_for(Tactic::Accommodating, 1)[0].id, "acc_001");
    }

    #[test]
    fn render_fills_salary() {
        let library = PhraseLibrary::builtin();
        let phrase = library.select(Tactic::Aggressive, Phase::Opening, None).unwrap();
        assert!(phrase.render(Some("$250,000")).ends_with("$250,000"));
        assert!(!phrase.render(None).contains('{'));
    }
}
