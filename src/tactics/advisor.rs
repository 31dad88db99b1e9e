//! Tactic advice backed by the bandit and the phrase library.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BanditConfig;
use crate::error::Result;
use crate::prediction::Durability;
use crate::utils::{format_amount, read_json_optional, remove_if_exists, write_json_atomic};

use super::bandit::{ArmStats, MultiArmedBandit, Tactic};
use super::phrases::{Phase, PhaseFlags, Phrase, PhraseLibrary, PhraseStats};
use super::rewards::{NegotiationOutcome, RewardModel};

pub const BANDIT_FILE: &str = "bandit.json";
pub const HISTORY_FILE: &str = "tactic_history.json";

/// One recorded use of a tactic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticResult {
    pub tactic: Tactic,
    #[serde(default)]
    pub phrase: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub salary: Option<f64>,
    #[serde(default)]
    pub feedback: String,
    pub reward: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TacticHistory {
    #[serde(default)]
    phrase_stats: BTreeMap<String, PhraseStats>,
    #[serde(default)]
    results: Vec<TacticResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub tactic: Tactic,
    pub phase: Phase,
    pub phrase_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordReport {
    pub reward: f64,
    /// `None` when no phrase was given or it is not in the library.
    pub phrase_id: Option<String>,
    pub durability: Durability,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TacticBreakdown {
    pub count: usize,
    pub success_rate: f64,
    pub avg_salary: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TacticAnalytics {
    pub total: usize,
    pub success_rate: f64,
    pub avg_salary: Option<f64>,
    pub per_tactic: BTreeMap<Tactic, TacticBreakdown>,
    pub best_tactics: Vec<(Tactic, f64)>,
    pub bandit: Vec<ArmStats>,
}

pub struct TacticAdvisor {
    bandit: MultiArmedBandit,
    phrases: PhraseLibrary,
    rewards: RewardModel,
    results: Vec<TacticResult>,
    dir: Option<PathBuf>,
    write_blocked: Option<String>,
    rng: StdRng,
}

impl TacticAdvisor {
    #[must_use]
    pub fn in_memory(config: &BanditConfig, target_salary: f64, seed: Option<u64>) -> Self {
        Self {
            bandit: MultiArmedBandit::new(config.exploration_factor),
            phrases: PhraseLibrary::builtin(),
            rewards: RewardModel::from_config(config, target_salary),
            results: Vec::new(),
            dir: None,
            write_blocked: None,
            rng: seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64),
        }
    }

    /// Load state from `dir`. Unreadable files leave the advisor fresh and
    /// block writes so they are never clobbered.
    #[must_use]
    pub fn open(dir: &Path, config: &BanditConfig, target_salary: f64, seed: Option<u64>) -> Self {
        let mut advisor = Self::in_memory(config, target_salary, seed);
        advisor.dir = Some(dir.to_path_buf());

        match MultiArmedBandit::load(&dir.join(BANDIT_FILE), config.exploration_factor) {
            Ok(bandit) => advisor.bandit = bandit,
            Err(err) => {
                warn!(error = %err, "bandit state unreadable; starting fresh");
                advisor.write_blocked = Some(format!("bandit state unreadable: {err}"));
            }
        }
        match read_json_optional::<TacticHistory>(dir.join(HISTORY_FILE)) {
            Ok(history) => {
                let history = history.unwrap_or_default();
                advisor.phrases.apply_stats(&history.phrase_stats);
                advisor.results = history.results;
            }
            Err(err) => {
                warn!(error = %err, "tactic history unreadable; starting fresh");
                advisor.write_blocked = Some(format!("tactic history unreadable: {err}"));
            }
        }
        debug!(
            pulls = advisor.bandit.total_pulls(),
            results = advisor.results.len(),
            "loaded tactic state"
        );
        advisor
    }

    #[must_use]
    pub const fn bandit(&self) -> &MultiArmedBandit {
        &self.bandit
    }

    #[must_use]
    pub const fn phrases(&self) -> &PhraseLibrary {
        &self.phrases
    }

    #[must_use]
    pub fn results(&self) -> &[TacticResult] {
        &self.results
    }

    pub fn select_tactic(&mut self) -> Tactic {
        self.bandit.select(&mut self.rng)
    }

    /// Pick a tactic with the bandit and the best phrase for it.
    pub fn suggest(
        &mut self,
        flags: PhaseFlags,
        context: Option<&str>,
        salary: Option<f64>,
    ) -> Suggestion {
        let tactic = self.select_tactic();
        let phase = Phase::determine(flags);
        let salary = salary.map(|s| format!("${}", format_amount(s)));
        let phrase = self.phrases.select(tactic, phase, context);
        Suggestion {
            tactic,
            phase,
            phrase_id: phrase.map(|p| p.id.to_string()),
            text: phrase.map(|p| p.render(salary.as_deref())).unwrap_or_default(),
        }
    }

    pub fn record_result(
        &mut self,
        tactic: Tactic,
        phrase: Option<&str>,
        outcome: NegotiationOutcome,
        feedback: impl Into<String>,
    ) -> RecordReport {
        let reward = self.rewards.compute_reward(&outcome);
        self.bandit.update(tactic, reward);
        let phrase_id = phrase
            .and_then(|p| self.phrases.record(p, outcome.success))
            .map(str::to_string);
        if phrase.is_some() && phrase_id.is_none() {
            debug!(phrase = ?phrase, "phrase not in library; only the bandit was updated");
        }

        self.results.push(TacticResult {
            tactic,
            phrase: phrase.map(str::to_string),
            success: outcome.success,
            salary: outcome.salary,
            feedback: feedback.into(),
            reward,
            timestamp: Utc::now(),
        });
        info!(%tactic, success = outcome.success, reward, "recorded tactic result");

        RecordReport {
            reward,
            phrase_id,
            durability: self.save(),
        }
    }

    /// Tactics by average reward, best first.
    #[must_use]
    pub fn best_tactics(&self, limit: usize) -> Vec<(Tactic, f64)> {
        let mut ranked: Vec<(Tactic, f64)> = self
            .bandit
            .statistics()
            .into_iter()
            .map(|s| (s.tactic, s.avg_reward))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(limit);
        ranked
    }

    #[must_use]
    pub fn best_phrases(&self, tactic: Tactic, limit: usize) -> Vec<&Phrase> {
        self.phrases.best_for(tactic, limit)
    }

    #[must_use]
    pub fn analytics(&self) -> TacticAnalytics {
        let mut per_tactic = BTreeMap::new();
        for tactic in Tactic::ALL {
            let results: Vec<&TacticResult> =
                self.results.iter().filter(|r| r.tactic == tactic).collect();
            if results.is_empty() {
                continue;
            }
            per_tactic.insert(
                tactic,
                TacticBreakdown {
                    count: results.len(),
                    success_rate: success_rate(&results),
                    avg_salary: average_salary(&results),
                },
            );
        }

        let all: Vec<&TacticResult> = self.results.iter().collect();
        TacticAnalytics {
            total: all.len(),
            success_rate: success_rate(&all),
            avg_salary: average_salary(&all),
            per_tactic,
            best_tactics: self.best_tactics(3),
            bandit: self.bandit.statistics(),
        }
    }

    /// Forget everything and delete the state files.
    pub fn reset(&mut self) -> Result<()> {
        self.bandit = MultiArmedBandit::new(self.bandit.exploration_factor);
        self.phrases.reset();
        self.results.clear();
        self.write_blocked = None;
        if let Some(dir) = &self.dir {
            remove_if_exists(dir.join(BANDIT_FILE))?;
            remove_if_exists(dir.join(HISTORY_FILE))?;
        }
        Ok(())
    }

    fn save(&self) -> Durability {
        let Some(dir) = &self.dir else {
            return Durability::InMemoryOnly {
                reason: "no data directory".to_string(),
            };
        };
        if let Some(reason) = &self.write_blocked {
            return Durability::InMemoryOnly {
                reason: reason.clone(),
            };
        }
        let history = TacticHistory {
            phrase_stats: self.phrases.stats(),
            results: self.results.clone(),
        };
        let written = self
            .bandit
            .save(&dir.join(BANDIT_FILE))
            .and_then(|()| write_json_atomic(dir.join(HISTORY_FILE), &history));
        match written {
            Ok(()) => Durability::Persisted,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "failed to persist tactic state");
                Durability::InMemoryOnly {
                    reason: err.to_string(),
                }
            }
        }
    }
}

fn success_rate(results: &[&TacticResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let wins = results.iter().filter(|r| r.success).count();
    #[allow(clippy::cast_precision_loss)]
    let rate = wins as f64 / results.len() as f64;
    rate
}

fn average_salary(results: &[&TacticResult]) -> Option<f64> {
    let salaries: Vec<f64> = results.iter().filter_map(|r| r.salary).collect();
    if salaries.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = salaries.len() as f64;
    Some(salaries.iter().sum::<f64>() / n)
}
