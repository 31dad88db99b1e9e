//! The candidate's side of a simulated negotiation.
//!
//! An agent turns the latest HR message into our reply. Which agent runs is
//! decided once from configuration; code downstream only sees the trait.

use std::io;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::{AgentKind, NegotiationConfig};
use crate::error::{OfferError, Result};
use crate::utils::format_amount;

use super::context::StrategyContext;
use super::strategy::{Personality, Style};

/// One turn handed to the agent.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AgentTurn<'a> {
    /// The HR message we are answering.
    pub incoming: &'a str,
    /// 0 for the opening reply, then 1..=rounds.
    pub round: usize,
    /// Best offer extracted so far.
    pub offer_on_table: f64,
}

#[async_trait]
pub trait NegotiationAgent: Send + Sync {
    fn name(&self) -> &str;

    /// `false` when no real agent backs this implementation. Strategies then
    /// produce a degraded result instead of a transcript.
    fn is_available(&self) -> bool {
        true
    }

    async fn reply(&self, turn: AgentTurn<'_>, ctx: &StrategyContext) -> Result<String>;
}

/// Build the agent selected in configuration.
pub fn build_agent(config: &NegotiationConfig) -> Result<Arc<dyn NegotiationAgent>> {
    match config.agent {
        AgentKind::Template => Ok(Arc::new(TemplateAgent)),
        AgentKind::None => Ok(Arc::new(NullAgent)),
        AgentKind::Command => {
            let command = config.agent_command.clone().ok_or_else(|| {
                OfferError::Config("agent = \"command\" requires agent_command".to_string())
            })?;
            Ok(Arc::new(CommandAgent::new(command)))
        }
    }
}

/// Deterministic replies shaped by the strategy's style and personality.
///
/// The ask starts at the strategy target and concedes toward the offer on the
/// table each round; softer styles concede faster.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateAgent;

impl TemplateAgent {
    const fn concession_per_round(style: Style) -> f64 {
        match style {
            Style::Soft => 0.5,
            Style::Neutral => 0.35,
            Style::Hard => 0.2,
            Style::Aggressive => 0.1,
        }
    }

    #[must_use]
    pub fn ask_for(turn: &AgentTurn<'_>, ctx: &StrategyContext) -> f64 {
        let target = ctx.target_salary;
        let gap = (target - turn.offer_on_table).max(0.0);
        #[allow(clippy::cast_precision_loss)]
        let conceded = (Self::concession_per_round(ctx.strategy.style) * turn.round as f64).min(1.0);
        (target - gap * conceded).max(ctx.base_salary)
    }
}

#[async_trait]
impl NegotiationAgent for TemplateAgent {
    fn name(&self) -> &str {
        "template"
    }

    async fn reply(&self, turn: AgentTurn<'_>, ctx: &StrategyContext) -> Result<String> {
        let ask = Self::ask_for(&turn, ctx);
        if turn.round > 0 && turn.offer_on_table >= ask {
            return Ok(format!(
                "That works for me. I accept {} and look forward to the paperwork.",
                format_amount(turn.offer_on_table)
            ));
        }

        let ask = format_amount(ask);
        let text = match ctx.strategy.personality {
            Personality::Professional => format!(
                "Thank you for the details. Given the scope of the role I am looking for {ask}."
            ),
            Personality::Friendly => format!(
                "Thanks, I'm genuinely excited about the team! Could we get to {ask}?"
            ),
            Personality::Analytical => format!(
                "Market data for this level points to {ask}. Can we align on that figure?"
            ),
            Personality::Aggressive => format!(
                "{ask} is my number. Below that I will have to weigh other offers."
            ),
        };
        Ok(text)
    }
}

/// Stands in when no agent is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAgent;

#[async_trait]
impl NegotiationAgent for NullAgent {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn reply(&self, _turn: AgentTurn<'_>, _ctx: &StrategyContext) -> Result<String> {
        Err(OfferError::Agent("no negotiation agent configured".to_string()))
    }
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    round: usize,
    incoming: &'a str,
    offer_on_table: f64,
    strategy: &'a str,
    style: Style,
    personality: Personality,
    base_salary: f64,
    target_salary: f64,
    context: &'a super::context::NegotiationContext,
}

/// Runs an external program per turn.
///
/// The request goes to stdin as one JSON object; trimmed stdout is the
/// reply. The child is killed if the turn is dropped (timeout or cancel).
#[derive(Debug, Clone)]
pub struct CommandAgent {
    command: String,
}

impl CommandAgent {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn shell(&self) -> tokio::process::Command {
        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = tokio::process::Command::new("cmd");
            cmd.arg("/C").arg(&self.command);
            cmd
        };
        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = tokio::process::Command::new("sh");
            cmd.arg("-c").arg(&self.command);
            cmd
        };
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl NegotiationAgent for CommandAgent {
    fn name(&self) -> &str {
        &self.command
    }

    async fn reply(&self, turn: AgentTurn<'_>, ctx: &StrategyContext) -> Result<String> {
        let request = CommandRequest {
            round: turn.round,
            incoming: turn.incoming,
            offer_on_table: turn.offer_on_table,
            strategy: &ctx.strategy.name,
            style: ctx.strategy.style,
            personality: ctx.strategy.personality,
            base_salary: ctx.base_salary,
            target_salary: ctx.target_salary,
            context: &ctx.context,
        };
        let payload = serde_json::to_vec(&request)?;

        let mut child = self
            .shell()
            .spawn()
            .map_err(|err| OfferError::Agent(format!("spawn {}: {err}", self.command)))?;

        // Feed stdin while stdout drains; a child that never reads its input
        // may exit before the write finishes.
        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&payload).await {
                Ok(()) => stdin.shutdown().await,
                Err(err) => Err(err),
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        match fed {
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                debug!(command = %self.command, "agent command ignored its input");
            }
            other => other?,
        }
        if !output.status.success() {
            return Err(OfferError::Agent(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reply = stdout.trim().to_string();
        if reply.is_empty() {
            return Err(OfferError::Agent(format!("{} produced no reply", self.command)));
        }
        debug!(strategy = %ctx.strategy.name, round = turn.round, "command agent replied");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::context::NegotiationContext;
    use crate::negotiation::strategy::{RiskLevel, Strategy};

    fn ctx(style: Style, personality: Personality) -> StrategyContext {
        StrategyContext {
            strategy: Strategy::new("t", style, personality, RiskLevel::Medium, 1.2),
            base_salary: 200_000.0,
            target_salary: 300_000.0,
            context: NegotiationContext::default(),
        }
    }

    #[test]
    fn opening_ask_is_full_target() {
        let turn = AgentTurn {
            incoming: "hi",
            round: 0,
            offer_on_table: 200_000.0,
        };
        let ask = TemplateAgent::ask_for(&turn, &ctx(Style::Hard, Personality::Professional));
        assert!((ask - 300_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn soft_concedes_faster_than_hard() {
        let turn = AgentTurn {
            incoming: "hi",
            round: 1,
            offer_on_table: 200_000.0,
        };
        let soft = TemplateAgent::ask_for(&turn, &ctx(Style::Soft, Personality::Friendly));
        let hard = TemplateAgent::ask_for(&turn, &ctx(Style::Hard, Personality::Friendly));
        assert!(soft < hard);
        assert!(soft >= 200_000.0);
    }

    #[tokio::test]
    async fn template_reply_mentions_ask() {
        let turn = AgentTurn {
            incoming: "We offer 200k",
            round: 0,
            offer_on_table: 200_000.0,
        };
        let reply = TemplateAgent
            .reply(turn, &ctx(Style::Neutral, Personality::Analytical))
            .await
            .unwrap();
        assert!(reply.contains("300,000"), "{reply}");
    }

    #[tokio::test]
    async fn template_accepts_when_offer_meets_ask() {
        let turn = AgentTurn {
            incoming: "We offer 310k",
            round: 2,
            offer_on_table: 310_000.0,
        };
        let reply = TemplateAgent
            .reply(turn, &ctx(Style::Soft, Personality::Friendly))
            .await
            .unwrap();
        assert!(reply.contains("accept 310,000"), "{reply}");
    }

    #[tokio::test]
    async fn null_agent_is_unavailable() {
        assert!(!NullAgent.is_available());
        let turn = AgentTurn {
            incoming: "",
            round: 0,
            offer_on_table: 0.0,
        };
        assert!(
            NullAgent
                .reply(turn, &ctx(Style::Soft, Personality::Friendly))
                .await
                .is_err()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_agent_reads_stdout() {
        let agent = CommandAgent::new("cat >/dev/null; echo 'I would like 260k'");
        let turn = AgentTurn {
            incoming: "We offer 200k",
            round: 1,
            offer_on_table: 200_000.0,
        };
        let reply = agent
            .reply(turn, &ctx(Style::Neutral, Personality::Professional))
            .await
            .unwrap();
        assert_eq!(reply, "I would like 260k");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_agent_that_ignores_stdin_still_replies() {
        let agent = CommandAgent::new("exec echo 'I would like 260k'");
        let incoming = format!("We offer 200k. {}", "Details follow. ".repeat(25_000));
        for _ in 0..20 {
            let turn = AgentTurn {
                incoming: &incoming,
                round: 1,
                offer_on_table: 200_000.0,
            };
            let reply = agent
                .reply(turn, &ctx(Style::Neutral, Personality::Professional))
                .await
                .unwrap();
            assert_eq!(reply, "I would like 260k");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_agent_failure_is_an_error() {
        let agent = CommandAgent::new("cat >/dev/null; exit 3");
        let turn = AgentTurn {
            incoming: "",
            round: 1,
            offer_on_table: 200_000.0,
        };
        let err = agent
            .reply(turn, &ctx(Style::Neutral, Personality::Professional))
            .await
            .unwrap_err();
        assert!(matches!(err, OfferError::Agent(_)));
    }
}
