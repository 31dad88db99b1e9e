//! One negotiation round end to end: select, execute, aggregate, remember.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::NegotiationConfig;
use crate::error::Result;
use crate::utils::write_json_atomic;

use super::agent::{NegotiationAgent, build_agent};
use super::aggregator::{OutcomeAggregator, QuantumResult};
use super::context::NegotiationContext;
use super::executor::{ExecutorSettings, ParallelExecutor, ProgressFn, RoundTargets};
use super::extractor::{OfferExtractor, RegexOfferExtractor};
use super::responder::{HrResponder, ScriptedHrResponder};
use super::strategy::{Style, StrategyCatalog};

/// A finished round kept in memory for the session.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub hr_message: String,
    pub result: QuantumResult,
}

/// Per-strategy totals across the session history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategyStats {
    /// Rounds in which the strategy produced a result.
    pub runs: usize,
    /// Rounds it ranked first in (fallback rounds excluded).
    pub wins: usize,
    pub avg_offer: f64,
}

#[derive(Debug, Serialize)]
struct ExportedStrategy<'a> {
    name: &'a str,
    style: Style,
    offer: f64,
    confidence: f64,
    time_secs: f64,
    reasoning: &'a str,
}

#[derive(Debug, Serialize)]
struct ExportReport<'a> {
    timestamp: DateTime<Utc>,
    best_strategy: &'a str,
    final_offer: f64,
    expected_gain: f64,
    confidence: f64,
    total_time_secs: f64,
    recommendation: &'a str,
    fallback: bool,
    all_strategies: Vec<ExportedStrategy<'a>>,
}

pub struct NegotiationEngine {
    catalog: StrategyCatalog,
    executor: ParallelExecutor,
    aggregator: OutcomeAggregator,
    base_salary: f64,
    target_salary: f64,
    max_parallel: usize,
    rng: StdRng,
    history: Vec<HistoryEntry>,
}

impl NegotiationEngine {
    /// Build the engine with the configured agent, the scripted HR responder
    /// and the regex extractor.
    pub fn from_config(config: &NegotiationConfig) -> Result<Self> {
        let agent = build_agent(config)?;
        Ok(Self::new(
            config,
            agent,
            Arc::new(ScriptedHrResponder::default()),
            Arc::new(RegexOfferExtractor),
        ))
    }

    /// Build the engine around injected collaborators.
    pub fn new(
        config: &NegotiationConfig,
        agent: Arc<dyn NegotiationAgent>,
        responder: Arc<dyn HrResponder>,
        extractor: Arc<dyn OfferExtractor>,
    ) -> Self {
        let catalog = if config.strategies.is_empty() {
            StrategyCatalog::builtin()
        } else {
            StrategyCatalog::new(config.strategies.clone())
        };
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let settings = ExecutorSettings {
            max_parallel: config.max_parallel,
            task_timeout: config.task_timeout,
            rounds: config.rounds,
        };

        Self {
            catalog,
            executor: ParallelExecutor::new(agent, responder, extractor, settings),
            aggregator: OutcomeAggregator::new(config.materiality_threshold),
            base_salary: config.base_salary,
            target_salary: config.target_salary,
            max_parallel: config.max_parallel,
            rng,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: StrategyCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub const fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn agent_name(&self) -> &str {
        self.executor.agent_name()
    }

    pub async fn negotiate(
        &mut self,
        hr_message: &str,
        context: &NegotiationContext,
        progress: Option<ProgressFn<'_>>,
    ) -> QuantumResult {
        self.negotiate_with_cancel(hr_message, context, progress, &CancellationToken::new())
            .await
    }

    /// Run one round. Never fails: if nothing finishes the result is the
    /// base-salary fallback.
    pub async fn negotiate_with_cancel(
        &mut self,
        hr_message: &str,
        context: &NegotiationContext,
        progress: Option<ProgressFn<'_>>,
        cancel: &CancellationToken,
    ) -> QuantumResult {
        let started = Instant::now();
        let targets = RoundTargets {
            base_salary: self.base_salary,
            target_salary: context.target.unwrap_or(self.target_salary),
        };

        let selected = self
            .catalog
            .select_top_strategies(self.max_parallel, &mut self.rng);
        if selected.is_empty() {
            warn!("no strategies available; returning fallback");
        }

        let results = self
            .executor
            .execute(&selected, hr_message, context, targets, progress, cancel)
            .await;

        let result = self.aggregator.aggregate(
            results,
            &self.catalog,
            targets.base_salary,
            targets.target_salary,
            started.elapsed(),
        );

        info!(
            best_strategy = %result.best_result().strategy.name,
            best_offer = result.best_offer(),
            expected_gain = result.expected_gain(),
            fallback = result.is_fallback(),
            elapsed_ms = result.total_time().as_millis(),
            "negotiation round complete"
        );

        self.history.push(HistoryEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            hr_message: hr_message.to_string(),
            result: result.clone(),
        });

        result
    }

    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    #[must_use]
    pub fn strategy_stats(&self) -> BTreeMap<String, StrategyStats> {
        let mut stats: BTreeMap<String, StrategyStats> = BTreeMap::new();
        for entry in &self.history {
            if entry.result.is_fallback() {
                continue;
            }
            for (rank, result) in entry.result.all_results().iter().enumerate() {
                let slot = stats.entry(result.strategy.name.clone()).or_default();
                #[allow(clippy::cast_precision_loss)]
                let runs = slot.runs as f64;
                slot.avg_offer = slot.avg_offer.mul_add(runs, result.final_offer) / (runs + 1.0);
                slot.runs += 1;
                if rank == 0 {
                    slot.wins += 1;
                }
            }
        }
        stats
    }

    /// Write a JSON report of one round.
    pub fn export_results(&self, result: &QuantumResult, path: &Path) -> Result<()> {
        let best = result.best_result();
        let report = ExportReport {
            timestamp: Utc::now(),
            best_strategy: &best.strategy.name,
            final_offer: best.final_offer,
            expected_gain: result.expected_gain(),
            confidence: best.confidence_score,
            total_time_secs: secs(result.total_time()),
            recommendation: result.recommendation(),
            fallback: result.is_fallback(),
            all_strategies: result
                .all_results()
                .iter()
                .map(|r| ExportedStrategy {
                    name: &r.strategy.name,
                    style: r.strategy.style,
                    offer: r.final_offer,
                    confidence: r.confidence_score,
                    time_secs: secs(r.execution_time),
                    reasoning: &r.reasoning,
                })
                .collect(),
        };
        write_json_atomic(path, &report)?;
        info!(path = %path.display(), "exported negotiation report");
        Ok(())
    }
}

fn secs(duration: Duration) -> f64 {
    duration.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::agent::TemplateAgent;

    fn config() -> NegotiationConfig {
        NegotiationConfig {
            seed: Some(7),
            ..NegotiationConfig::default()
        }
    }

    fn engine() -> NegotiationEngine {
        NegotiationEngine::new(
            &config(),
            Arc::new(TemplateAgent),
            Arc::new(ScriptedHrResponder::default()),
            Arc::new(RegexOfferExtractor),
        )
    }

    #[tokio::test]
    async fn empty_catalog_returns_fallback() {
        let mut engine = engine().with_catalog(StrategyCatalog::default());
        let result = engine
            .negotiate("We offer 190k", &NegotiationContext::default(), None)
            .await;

        assert!(result.is_fallback());
        assert!(result.recommendation().starts_with("No results"));
        assert!(result.confidence() <= 0.2);
        assert_eq!(engine.history().len(), 1);
        assert!(engine.strategy_stats().is_empty());
    }

    #[tokio::test]
    async fn round_is_recorded_with_stats() {
        let mut engine = engine();
        let result = engine
            .negotiate("We can offer 200k", &NegotiationContext::default(), None)
            .await;

        assert!(!result.is_fallback());
        assert_eq!(result.all_results().len(), 3);
        assert!(result.best_offer() >= 200_000.0);

        let stats = engine.strategy_stats();
        assert_eq!(stats.values().map(|s| s.runs).sum::<usize>(), 3);
        assert_eq!(stats.values().map(|s| s.wins).sum::<usize>(), 1);
        assert_eq!(
            stats[&result.best_result().strategy.name].wins,
            1,
            "winner should be credited"
        );
    }

    #[tokio::test]
    async fn context_target_overrides_config() {
        let mut engine = engine();
        let context = NegotiationContext {
            target: Some(200_000.0),
            ..NegotiationContext::default()
        };
        let result = engine.negotiate("We offer 200k", &context, None).await;
        assert!(result.recommendation().starts_with("Excellent"), "{}", result.recommendation());
    }

    #[tokio::test]
    async fn export_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut engine = engine();
        let result = engine
            .negotiate("We offer 205k", &NegotiationContext::default(), None)
            .await;

        engine.export_results(&result, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["best_strategy"], result.best_result().strategy.name.as_str());
        assert_eq!(json["all_strategies"].as_array().unwrap().len(), 3);
    }
}
