use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use offerlab::Result;
use offerlab::config::NegotiationConfig;
use offerlab::negotiation::{
    HrResponder, HrTurn, NegotiationContext, NegotiationEngine, Personality, ProgressFn,
    RegexOfferExtractor, RiskLevel, Strategy, StrategyCatalog, Style, TemplateAgent,
};

/// HR stalls in the first round and names a style-dependent figure in the
/// second.
struct ScenarioResponder;

#[async_trait]
impl HrResponder for ScenarioResponder {
    async fn respond(&self, _our_reply: &str, turn: HrTurn<'_>) -> Result<String> {
        if turn.round == 1 {
            return Ok("Let me check with the hiring manager.".to_string());
        }
        let counter = match turn.strategy.style {
            Style::Soft => "195k",
            Style::Neutral => "205k",
            Style::Hard | Style::Aggressive => "210k",
        };
        Ok(format!("Final answer: {counter}."))
    }
}

fn config() -> NegotiationConfig {
    NegotiationConfig {
        base_salary: 200_000.0,
        target_salary: 250_000.0,
        max_parallel: 3,
        task_timeout: Duration::from_secs(5),
        rounds: 2,
        seed: Some(42),
        ..NegotiationConfig::default()
    }
}

fn soft_neutral_hard() -> StrategyCatalog {
    StrategyCatalog::new(vec![
        Strategy::new("soft", Style::Soft, Personality::Friendly, RiskLevel::Low, 1.05),
        Strategy::new(
            "neutral",
            Style::Neutral,
            Personality::Professional,
            RiskLevel::Medium,
            1.15,
        ),
        Strategy::new("hard", Style::Hard, Personality::Aggressive, RiskLevel::High, 1.30),
    ])
}

fn engine(catalog: StrategyCatalog) -> NegotiationEngine {
    NegotiationEngine::new(
        &config(),
        Arc::new(TemplateAgent),
        Arc::new(ScenarioResponder),
        Arc::new(RegexOfferExtractor),
    )
    .with_catalog(catalog)
}

#[tokio::test]
async fn hard_strategy_wins_the_reference_scenario() {
    let mut engine = engine(soft_neutral_hard());
    let result = engine
        .negotiate("We offer 190k", &NegotiationContext::default(), None)
        .await;

    assert!(!result.is_fallback());
    assert_eq!(result.best_result().strategy.name, "hard");
    assert!((result.best_offer() - 210_000.0).abs() < f64::EPSILON);
    assert!((result.expected_gain() - 10_000.0).abs() < f64::EPSILON);
    assert!(result.recommendation().contains("84.0% of target"));

    let offers: Vec<f64> = result.all_results().iter().map(|r| r.final_offer).collect();
    // Soft is floored at the base salary.
    assert_eq!(offers, vec![210_000.0, 205_000.0, 200_000.0]);
    assert!(
        result
            .all_results()
            .iter()
            .any(|r| std::ptr::eq(r, result.best_result()))
    );
}

#[tokio::test]
async fn empty_catalog_returns_fallback() {
    let mut engine = engine(StrategyCatalog::default());
    let result = engine
        .negotiate("We offer 190k", &NegotiationContext::default(), None)
        .await;

    assert!(result.is_fallback());
    assert!((result.best_offer() - 200_000.0).abs() < f64::EPSILON);
    assert!(result.expected_gain().abs() < f64::EPSILON);
    assert_eq!(result.all_results().len(), 1);
    assert!(result.recommendation().starts_with("No results"));
}

#[tokio::test]
async fn progress_reaches_completion() {
    let mut engine = engine(soft_neutral_hard());
    let seen = Mutex::new(Vec::new());
    let on_progress = |fraction: f64, status: &str| {
        seen.lock().unwrap().push((fraction, status.to_string()));
    };
    let progress: ProgressFn<'_> = &on_progress;

    engine
        .negotiate("We offer 190k", &NegotiationContext::default(), Some(progress))
        .await;

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.len(), 3);
    assert!((seen[2].0 - 1.0).abs() < f64::EPSILON);
    assert!(seen.iter().all(|(_, status)| status.starts_with("Finished strategy")));
    assert_eq!(engine.history().len(), 1);
}

#[tokio::test]
async fn context_current_offer_is_the_starting_point() {
    let mut engine = engine(soft_neutral_hard());
    let context = NegotiationContext::from_pairs(["current_offer=215k"]).unwrap();
    let result = engine.negotiate("Thanks for your time.", &context, None).await;

    // Round two counters replace whatever was on the table.
    assert!((result.best_offer() - 210_000.0).abs() < f64::EPSILON);
    let stats = engine.strategy_stats();
    assert_eq!(stats["hard"].wins, 1);
    assert_eq!(stats["soft"].runs, 1);
}
