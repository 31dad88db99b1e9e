//! Runs the selected strategies concurrently.
//!
//! Every strategy becomes a task in a [`JoinSet`]. A semaphore caps how many
//! simulate at once, each task gets its own deadline once it holds a permit,
//! and a round-wide [`CancellationToken`] stops everything still running.
//! Dropping a task's future cancels it at its next await point; external
//! agent processes are killed on drop. Results are merged only here, on the
//! orchestrating task.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{OfferError, Result};
use crate::utils::{format_amount, format_percent};

use super::agent::{AgentTurn, NegotiationAgent};
use super::context::{NegotiationContext, StrategyContext};
use super::extractor::OfferExtractor;
use super::responder::{HrResponder, HrTurn};
use super::strategy::{RiskLevel, Strategy};

/// Progress hook: `(fraction_done, status_text)`.
pub type ProgressFn<'a> = &'a (dyn Fn(f64, &str) + Send + Sync);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Candidate,
    Hr,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candidate => f.write_str("candidate"),
            Self::Hr => f.write_str("hr"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
}

impl Utterance {
    fn candidate(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Candidate,
            text: text.into(),
        }
    }

    fn hr(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Hr,
            text: text.into(),
        }
    }
}

/// Outcome of one strategy run. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationResult {
    pub strategy: Strategy,
    pub final_offer: f64,
    pub confidence_score: f64,
    pub response_chain: Vec<Utterance>,
    #[serde(with = "humantime_serde")]
    pub execution_time: Duration,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutorSettings {
    pub max_parallel: usize,
    pub task_timeout: Duration,
    pub rounds: usize,
}

/// Salary figures that apply to one negotiation round.
#[derive(Debug, Clone, Copy)]
pub struct RoundTargets {
    /// Floor for every final offer.
    pub base_salary: f64,
    /// Unscaled target; strategies multiply it by their own factor.
    pub target_salary: f64,
}

/// Confidence in a result: 0.5 base, +0.3 at or above target, +0.1 within
/// 90% of it, then -0.1 for high risk and +0.1 for low risk, clamped to [0, 1].
#[must_use]
pub fn confidence_score(strategy: &Strategy, final_offer: f64, target_salary: f64) -> f64 {
    let mut confidence = 0.5;

    let ratio = final_offer / target_salary;
    if ratio >= 1.0 {
        confidence += 0.3;
    } else if ratio >= 0.9 {
        confidence += 0.1;
    }

    match strategy.risk {
        RiskLevel::High => confidence -= 0.1,
        RiskLevel::Low => confidence += 0.1,
        RiskLevel::Medium => {}
    }

    f64::clamp(confidence, 0.0, 1.0)
}

/// One-line explanation of a strategy's result.
#[must_use]
pub fn reasoning(strategy: &Strategy, final_offer: f64, confidence: f64, target_salary: f64) -> String {
    let ratio = final_offer / target_salary;
    let offer = format_amount(final_offer);
    let verdict = if ratio >= 1.0 {
        format!(
            "Excellent result: {} reached {offer} (+{} over target)",
            strategy.name,
            format_percent(ratio - 1.0)
        )
    } else if ratio >= 0.9 {
        format!("Good result: {} reached {offer}, close to target", strategy.name)
    } else {
        format!("Below target: {} reached {offer}", strategy.name)
    };
    format!("{verdict}. Confidence: {}", format_percent(confidence))
}

pub struct ParallelExecutor {
    agent: Arc<dyn NegotiationAgent>,
    responder: Arc<dyn HrResponder>,
    extractor: Arc<dyn OfferExtractor>,
    settings: ExecutorSettings,
}

impl ParallelExecutor {
    pub fn new(
        agent: Arc<dyn NegotiationAgent>,
        responder: Arc<dyn HrResponder>,
        extractor: Arc<dyn OfferExtractor>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            agent,
            responder,
            extractor,
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> ExecutorSettings {
        self.settings
    }

    #[must_use]
    pub fn agent_name(&self) -> &str {
        self.agent.name()
    }

    /// Run every strategy and return the results that finished in time, in
    /// strategy order. Failed, timed-out and cancelled strategies are logged
    /// and left out.
    pub async fn execute(
        &self,
        strategies: &[Strategy],
        hr_message: &str,
        context: &NegotiationContext,
        targets: RoundTargets,
        progress: Option<ProgressFn<'_>>,
        cancel: &CancellationToken,
    ) -> Vec<NegotiationResult> {
        if strategies.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.max_parallel.max(1)));
        let hr_message: Arc<str> = Arc::from(hr_message);
        let mut tasks = JoinSet::new();
        let mut task_index = HashMap::new();

        info!(
            strategies = strategies.len(),
            max_parallel = self.settings.max_parallel,
            agent = self.agent.name(),
            "starting parallel negotiation"
        );

        for (idx, strategy) in strategies.iter().enumerate() {
            let run = StrategyRun {
                agent: Arc::clone(&self.agent),
                responder: Arc::clone(&self.responder),
                extractor: Arc::clone(&self.extractor),
                hr_message: Arc::clone(&hr_message),
                rounds: self.settings.rounds,
                unscaled_target: targets.target_salary,
                ctx: StrategyContext {
                    strategy: strategy.clone(),
                    base_salary: targets.base_salary,
                    target_salary: targets.target_salary * strategy.target_multiplier,
                    context: context.clone(),
                },
            };
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let timeout = self.settings.task_timeout;

            let handle = tasks.spawn(async move {
                let timed = async {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| OfferError::Cancelled("worker pool closed".to_string()))?;
                    match tokio::time::timeout(timeout, run.simulate()).await {
                        Ok(result) => result,
                        Err(_) => Err(OfferError::Timeout(timeout)),
                    }
                };
                tokio::select! {
                    () = cancel.cancelled() => Err(OfferError::Cancelled("round cancelled".to_string())),
                    result = timed => result,
                }
            });
            task_index.insert(handle.id(), idx);
        }

        let total = strategies.len();
        let mut finished = 0usize;
        let mut completed: Vec<(usize, NegotiationResult)> = Vec::with_capacity(total);

        while let Some(joined) = tasks.join_next_with_id().await {
            finished += 1;
            let (idx, outcome) = match joined {
                Ok((id, outcome)) => (task_index.get(&id).copied(), outcome),
                Err(err) => (
                    task_index.get(&err.id()).copied(),
                    Err(OfferError::Agent(format!("strategy task aborted: {err}"))),
                ),
            };
            let name = idx.map_or("<unknown>", |i| strategies[i].name.as_str());

            let status = match outcome {
                Ok(result) => {
                    debug!(
                        strategy = name,
                        offer = result.final_offer,
                        elapsed_ms = result.execution_time.as_millis(),
                        "strategy finished"
                    );
                    if let Some(idx) = idx {
                        completed.push((idx, result));
                    }
                    format!("Finished strategy: {name}")
                }
                Err(err) => {
                    warn!(strategy = name, error = %err, "strategy dropped from round");
                    format!("Strategy {name} failed: {err}")
                }
            };

            if let Some(progress) = progress {
                #[allow(clippy::cast_precision_loss)]
                progress(finished as f64 / total as f64, &status);
            }
        }

        completed.sort_by_key(|(idx, _)| *idx);
        completed.into_iter().map(|(_, result)| result).collect()
    }
}

/// Everything one strategy task owns.
struct StrategyRun {
    agent: Arc<dyn NegotiationAgent>,
    responder: Arc<dyn HrResponder>,
    extractor: Arc<dyn OfferExtractor>,
    hr_message: Arc<str>,
    rounds: usize,
    unscaled_target: f64,
    ctx: StrategyContext,
}

impl StrategyRun {
    async fn simulate(self) -> Result<NegotiationResult> {
        let started = Instant::now();
        let strategy = &self.ctx.strategy;
        let base = self.ctx.base_salary;

        if !self.agent.is_available() {
            let confidence = 0.3;
            return Ok(NegotiationResult {
                strategy: strategy.clone(),
                final_offer: base,
                confidence_score: confidence,
                response_chain: vec![Utterance::candidate(format!(
                    "Using strategy {} (no negotiation agent available)",
                    strategy.name
                ))],
                execution_time: started.elapsed(),
                reasoning: reasoning(strategy, base, confidence, self.unscaled_target),
            });
        }

        let mut offer = self
            .ctx
            .context
            .current_offer
            .or_else(|| self.extractor.extract(&self.hr_message))
            .unwrap_or(base);
        let mut chain = Vec::with_capacity(self.rounds * 2 + 1);

        let mut last_reply = self
            .agent
            .reply(
                AgentTurn {
                    incoming: &self.hr_message,
                    round: 0,
                    offer_on_table: offer,
                },
                &self.ctx,
            )
            .await?;
        chain.push(Utterance::candidate(last_reply.clone()));

        for round in 1..=self.rounds {
            let hr_reply = self
                .responder
                .respond(
                    &last_reply,
                    HrTurn {
                        strategy,
                        round,
                        offer_on_table: offer,
                        our_ask: self.extractor.extract(&last_reply),
                        base_salary: base,
                        context: &self.ctx.context,
                    },
                )
                .await?;
            if let Some(extracted) = self.extractor.extract(&hr_reply) {
                offer = extracted;
            }
            chain.push(Utterance::hr(hr_reply.clone()));

            last_reply = self
                .agent
                .reply(
                    AgentTurn {
                        incoming: &hr_reply,
                        round,
                        offer_on_table: offer,
                    },
                    &self.ctx,
                )
                .await?;
            chain.push(Utterance::candidate(last_reply.clone()));
        }

        let final_offer = offer.max(base);
        let confidence = confidence_score(strategy, final_offer, self.unscaled_target);
        Ok(NegotiationResult {
            strategy: strategy.clone(),
            final_offer,
            confidence_score: confidence,
            response_chain: chain,
            execution_time: started.elapsed(),
            reasoning: reasoning(strategy, final_offer, confidence, self.unscaled_target),
        })
    }
}
