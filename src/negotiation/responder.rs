//! The employer's side of a simulated negotiation.

use async_trait::async_trait;

use crate::error::Result;
use crate::utils::format_amount;

use super::context::NegotiationContext;
use super::strategy::{Strategy, Style};

/// What the HR side sees when it answers.
#[derive(Debug, Clone, Copy)]
pub struct HrTurn<'a> {
    pub strategy: &'a Strategy,
    /// 1..=rounds.
    pub round: usize,
    pub offer_on_table: f64,
    /// Figure extracted from our last reply, if any.
    pub our_ask: Option<f64>,
    pub base_salary: f64,
    pub context: &'a NegotiationContext,
}

#[async_trait]
pub trait HrResponder: Send + Sync {
    async fn respond(&self, our_reply: &str, turn: HrTurn<'_>) -> Result<String>;
}

/// Deterministic concession model.
///
/// Each round HR moves a style-dependent fraction of the way from the offer
/// on the table toward our ask, never past its budget ceiling and never
/// backwards. Soft requests earn larger concessions than hard ones.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedHrResponder {
    /// Budget ceiling as a multiple of the base salary when the context has
    /// no market rate.
    pub budget_factor: f64,
}

impl Default for ScriptedHrResponder {
    fn default() -> Self {
        Self { budget_factor: 1.1 }
    }
}

impl ScriptedHrResponder {
    const fn concession_rate(style: Style) -> f64 {
        match style {
            Style::Soft => 0.6,
            Style::Neutral => 0.5,
            Style::Hard => 0.35,
            Style::Aggressive => 0.2,
        }
    }

    #[must_use]
    pub fn budget_ceiling(&self, turn: &HrTurn<'_>) -> f64 {
        let ceiling = turn
            .context
            .market_rate
            .unwrap_or(turn.base_salary * self.budget_factor);
        ceiling.max(turn.offer_on_table)
    }

    #[must_use]
    pub fn counter_offer(&self, turn: &HrTurn<'_>) -> f64 {
        let ceiling = self.budget_ceiling(turn);
        let Some(ask) = turn.our_ask else {
            return turn.offer_on_table;
        };
        if ask <= turn.offer_on_table {
            return turn.offer_on_table;
        }
        let step = (ask - turn.offer_on_table) * Self::concession_rate(turn.strategy.style);
        let counter = (turn.offer_on_table + step).min(ceiling);
        // Quote in whole thousands, as recruiters do.
        ((counter / 1000.0).floor() * 1000.0).max(turn.offer_on_table)
    }
}

#[async_trait]
impl HrResponder for ScriptedHrResponder {
    async fn respond(&self, _our_reply: &str, turn: HrTurn<'_>) -> Result<String> {
        let counter = self.counter_offer(&turn);
        let amount = format!("{}k", format_amount(counter / 1000.0));
        let text = match turn.strategy.style {
            Style::Soft => format!("Thanks for your flexibility. We can offer {amount}. Does that work?"),
            Style::Neutral => format!("Good points. Let's say {amount} plus relocation support."),
            Style::Hard => format!("That is above our budget. The most we can do is {amount}."),
            Style::Aggressive => {
                format!("We value your experience, but our budget is capped at {amount}.")
            }
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::strategy::{Personality, RiskLevel};

    fn strategy(style: Style) -> Strategy {
        Strategy::new("s", style, Personality::Professional, RiskLevel::Medium, 1.2)
    }

    #[test]
    fn counter_moves_toward_ask_within_budget() {
        let ctx = NegotiationContext::default();
        let s = strategy(Style::Neutral);
        let turn = HrTurn {
            strategy: &s,
            round: 1,
            offer_on_table: 200_000.0,
            our_ask: Some(240_000.0),
            base_salary: 200_000.0,
            context: &ctx,
        };
        let counter = ScriptedHrResponder::default().counter_offer(&turn);
        assert!((counter - 220_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn counter_capped_by_market_rate() {
        let ctx = NegotiationContext {
            market_rate: Some(205_000.0),
            ..NegotiationContext::default()
        };
        let s = strategy(Style::Soft);
        let turn = HrTurn {
            strategy: &s,
            round: 1,
            offer_on_table: 200_000.0,
            our_ask: Some(300_000.0),
            base_salary: 200_000.0,
            context: &ctx,
        };
        let counter = ScriptedHrResponder::default().counter_offer(&turn);
        assert!((counter - 205_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn counter_never_goes_backwards() {
        let ctx = NegotiationContext::default();
        let s = strategy(Style::Hard);
        let turn = HrTurn {
            strategy: &s,
            round: 2,
            offer_on_table: 215_000.0,
            our_ask: None,
            base_salary: 200_000.0,
            context: &ctx,
        };
        let counter = ScriptedHrResponder::default().counter_offer(&turn);
        assert!((counter - 215_000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn reply_text_carries_counter() {
        let ctx = NegotiationContext::default();
        let s = strategy(Style::Hard);
        let turn = HrTurn {
            strategy: &s,
            round: 1,
            offer_on_table: 200_000.0,
            our_ask: Some(260_000.0),
            base_salary: 200_000.0,
            context: &ctx,
        };
        let text = ScriptedHrResponder::default()
            .respond("I want 260k", turn)
            .await
            .unwrap();
        assert!(text.contains("220k"), "{text}");
    }
}
