use std::collections::HashSet;
use std::time::Duration;

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use offerlab::negotiation::{
    NegotiationResult, OfferExtractor, OutcomeAggregator, Personality, RegexOfferExtractor,
    RiskLevel, Strategy, StrategyCatalog, Style, confidence_score,
};
use offerlab::negotiation::extractor::{MAX_PLAUSIBLE_SALARY, MIN_PLAUSIBLE_SALARY};

fn result_with_offer(index: usize, offer: f64) -> NegotiationResult {
    NegotiationResult {
        strategy: Strategy::new(
            format!("s{index}"),
            Style::Neutral,
            Personality::Professional,
            RiskLevel::Medium,
            1.1,
        ),
        final_offer: offer,
        confidence_score: 0.5,
        response_chain: Vec::new(),
        execution_time: Duration::ZERO,
        reasoning: String::new(),
    }
}

fn risk() -> impl proptest::strategy::Strategy<Value = RiskLevel> {
    prop_oneof![
        Just(RiskLevel::Low),
        Just(RiskLevel::Medium),
        Just(RiskLevel::High),
    ]
}

proptest! {
    #[test]
    fn test_selection_has_no_duplicates(max_parallel in 0usize..12, seed in any::<u64>()) {
        let catalog = StrategyCatalog::builtin();
        let mut rng = StdRng::seed_from_u64(seed);
        let picked = catalog.select_top_strategies(max_parallel, &mut rng);

        prop_assert_eq!(picked.len(), max_parallel.min(catalog.len()));
        let names: HashSet<&str> = picked.iter().map(|s| s.name.as_str()).collect();
        prop_assert_eq!(names.len(), picked.len());
    }

    #[test]
    fn test_aggregate_ranks_by_offer(
        offers in prop::collection::vec(100_000.0f64..400_000.0, 0..8),
        base in 100_000.0f64..300_000.0,
    ) {
        let results: Vec<NegotiationResult> = offers
            .iter()
            .enumerate()
            .map(|(i, &offer)| result_with_offer(i, offer))
            .collect();
        let aggregated = OutcomeAggregator::default().aggregate(
            results,
            &StrategyCatalog::builtin(),
            base,
            250_000.0,
            Duration::ZERO,
        );

        prop_assert_eq!(aggregated.is_fallback(), offers.is_empty());
        if offers.is_empty() {
            prop_assert!((aggregated.best_offer() - base).abs() < f64::EPSILON);
        } else {
            let max = offers.iter().copied().fold(f64::MIN, f64::max);
            prop_assert!((aggregated.best_offer() - max).abs() < f64::EPSILON);
            prop_assert!((aggregated.expected_gain() - (max - base)).abs() < 1e-6);
            let ranked = aggregated.all_results();
            prop_assert!(ranked.windows(2).all(|w| w[0].final_offer >= w[1].final_offer));
        }
    }

    #[test]
    fn test_confidence_in_unit_range(
        offer in 0.0f64..1_000_000.0,
        target in 50_000.0f64..500_000.0,
        risk in risk(),
    ) {
        let strategy = Strategy::new("p", Style::Hard, Personality::Analytical, risk, 1.2);
        let confidence = confidence_score(&strategy, offer, target);
        prop_assert!((0.0..=1.0).contains(&confidence));
    }

    #[test]
    fn test_extracted_offers_are_plausible(text in ".{0,80}") {
        if let Some(value) = RegexOfferExtractor.extract(&text) {
            prop_assert!((MIN_PLAUSIBLE_SALARY..=MAX_PLAUSIBLE_SALARY).contains(&value));
        }
    }
}
