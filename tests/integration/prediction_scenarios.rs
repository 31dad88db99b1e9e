use offerlab::config::{BanditConfig, PredictionConfig};
use offerlab::prediction::{ModelState, PredictionSource, SuccessPredictor};
use offerlab::tactics::{NegotiationOutcome, PhaseFlags, Tactic, TacticAdvisor};
use offerlab::test_utils::fixtures::{labelled_samples, strong_features, weak_features};

fn small_config() -> PredictionConfig {
    PredictionConfig {
        min_training_samples: 10,
        n_estimators: 20,
        max_depth: 6,
        ..PredictionConfig::default()
    }
}

fn feed(predictor: &mut SuccessPredictor, n: usize) {
    for sample in labelled_samples(n) {
        predictor.add_training_sample(
            sample.features,
            sample.outcome,
            sample.actual_offer,
            sample.notes,
        );
    }
}

#[test]
fn rules_score_until_threshold() {
    let mut predictor = SuccessPredictor::in_memory(small_config());
    feed(&mut predictor, 9);
    assert_eq!(predictor.state(), ModelState::Untrained);

    let strong = predictor.predict(&strong_features(), false);
    assert_eq!(strong.source, PredictionSource::Rules);
    assert!((strong.probability - 0.9).abs() < 1e-9);
    assert!((strong.confidence_interval.0 - 0.8).abs() < 1e-9);
    assert!((strong.confidence_interval.1 - 1.0).abs() < 1e-9);

    let weak = predictor.predict(&weak_features(), false);
    assert!((weak.probability - 0.3).abs() < 1e-9);
    assert!(!weak.recommendations.is_empty());
}

#[test]
fn model_takes_over_and_separates_profiles() {
    let mut predictor = SuccessPredictor::in_memory(small_config());
    feed(&mut predictor, 12);
    assert_eq!(predictor.state(), ModelState::Trained);
    assert!(predictor.model_accuracy().is_some());

    let strong = predictor.predict(&strong_features(), true);
    let weak = predictor.predict(&weak_features(), true);
    assert_eq!(strong.source, PredictionSource::Model);
    assert!(strong.probability > weak.probability);

    let (low, high) = strong.confidence_interval;
    assert!(low <= strong.probability && strong.probability <= high);
    assert!(strong.similar_cases.iter().all(|c| c.similarity_score >= 2));

    let stats = predictor.stats();
    assert_eq!(stats.total_predictions, 2);
    assert_eq!(stats.training_samples, 12);
}

#[test]
fn reset_returns_to_rules() {
    let mut predictor = SuccessPredictor::in_memory(small_config());
    feed(&mut predictor, 10);
    assert_eq!(predictor.state(), ModelState::Trained);

    predictor.reset().unwrap();
    assert_eq!(predictor.state(), ModelState::Untrained);
    assert_eq!(predictor.sample_count(), 0);
    let result = predictor.predict(&strong_features(), false);
    assert_eq!(result.source, PredictionSource::Rules);
}

#[test]
fn advisor_prefers_the_rewarded_tactic() {
    let mut advisor = TacticAdvisor::in_memory(&BanditConfig::default(), 250_000.0, Some(11));

    for tactic in Tactic::ALL {
        let outcome = if tactic == Tactic::Collaborative {
            NegotiationOutcome::success(250_000.0)
        } else {
            NegotiationOutcome::failure()
        };
        advisor.record_result(tactic, None, outcome, "");
    }

    let suggestion = advisor.suggest(
        PhaseFlags {
            closing: true,
            ..PhaseFlags::default()
        },
        None,
        Some(255_000.0),
    );
    assert_eq!(suggestion.tactic, Tactic::Collaborative);
    assert_eq!(suggestion.phrase_id.as_deref(), Some("collab_004"));

    let analytics = advisor.analytics();
    assert_eq!(analytics.total, 5);
    assert!((analytics.success_rate - 0.2).abs() < 1e-9);
}
