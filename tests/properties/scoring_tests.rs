use std::collections::HashSet;

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use offerlab::prediction::{PredictionFeatures, rule_score};
use offerlab::tactics::{MultiArmedBandit, NegotiationOutcome, RewardModel, Tactic};

prop_compose! {
    fn features()(
        role_level in prop::sample::select(vec!["junior", "mid", "senior", "lead", "principal"]),
        interview_round in 1u32..6,
        time_spent in 0.0f64..30.0,
        questions_asked in 0u32..10,
        technical_score in 0.0f64..=1.0,
        communication_score in 0.0f64..=1.0,
        cultural_fit in 0.0f64..=1.0,
        salary_expectation in 50_000.0f64..500_000.0,
        market_rate in 50_000.0f64..500_000.0,
        candidate_experience in 0u32..30,
    ) -> PredictionFeatures {
        PredictionFeatures {
            company_size: "mid".to_string(),
            industry: "tech".to_string(),
            role_level: role_level.to_string(),
            interview_round,
            time_spent,
            questions_asked,
            technical_score,
            communication_score,
            cultural_fit,
            salary_expectation,
            market_rate,
            candidate_experience,
            similar_offers_count: 0,
        }
    }
}

proptest! {
    #[test]
    fn test_rule_score_is_clamped(features in features()) {
        let score = rule_score(&features);
        prop_assert!((0.1..=0.9).contains(&score));
    }

    #[test]
    fn test_bandit_tries_every_tactic_first(
        seed in any::<u64>(),
        rewards in prop::collection::vec(0.0f64..2.0, 5),
    ) {
        let mut bandit = MultiArmedBandit::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut seen = HashSet::new();
        for reward in rewards {
            let tactic = bandit.select(&mut rng);
            prop_assert!(seen.insert(tactic));
            bandit.update(tactic, reward);
        }
        prop_assert_eq!(seen.len(), Tactic::ALL.len());
    }

    #[test]
    fn test_reward_is_bounded(
        success in any::<bool>(),
        salary in prop::option::of(0.0f64..1_000_000.0),
        reference in 100_000.0f64..400_000.0,
    ) {
        let model = RewardModel { reference_salary: reference, max_bonus: 0.5 };
        let reward = model.compute_reward(&NegotiationOutcome { success, salary });
        prop_assert!(reward >= 0.0);
        prop_assert!(reward <= 1.5 + f64::EPSILON);
    }
}
