//! Deterministic scorer used while no model is trained, plus the factor and
//! advice text shared by both scorers.

use super::features::PredictionFeatures;

pub const MIN_RULE_PROBABILITY: f64 = 0.1;
pub const MAX_RULE_PROBABILITY: f64 = 0.9;
/// Half-width of the interval around a rule-based score.
pub const RULE_INTERVAL: f64 = 0.1;

/// Additive score from fixed bonuses and penalties, clamped to
/// [`MIN_RULE_PROBABILITY`, `MAX_RULE_PROBABILITY`].
#[must_use]
pub fn rule_score(features: &PredictionFeatures) -> f64 {
    let mut score: f64 = 0.5;

    if features.is_senior() {
        score += 0.1;
    }
    if features.candidate_experience >= 3 {
        score += 0.1;
    }
    for value in [
        features.technical_score,
        features.communication_score,
        features.cultural_fit,
    ] {
        if value >= 0.8 {
            score += 0.1;
        }
    }
    if features.questions_asked >= 3 {
        score += 0.05;
    }
    if features.time_spent >= 10.0 {
        score += 0.05;
    }

    if features.interview_round >= 4 {
        score -= 0.1;
    }
    if features.salary_gap() > 0.2 {
        score -= 0.1;
    }

    // Every step is a multiple of 0.05; drop the accumulated float drift.
    let score = (score * 100.0).round() / 100.0;
    score.clamp(MIN_RULE_PROBABILITY, MAX_RULE_PROBABILITY)
}

#[must_use]
pub fn key_factors(features: &PredictionFeatures) -> Vec<String> {
    let mut factors = Vec::new();

    let mut rate = |value: f64, strong: &str, weak: &str| {
        if value >= 0.8 {
            factors.push(strong.to_string());
        } else if value < 0.6 {
            factors.push(weak.to_string());
        }
    };
    rate(
        features.technical_score,
        "Strong technical performance",
        "Weak technical performance",
    );
    rate(
        features.communication_score,
        "Excellent communication",
        "Communication concerns",
    );
    rate(
        features.cultural_fit,
        "Good cultural fit",
        "Possible cultural fit concerns",
    );

    if features.candidate_experience >= 5 {
        factors.push("Extensive experience".to_string());
    } else if features.candidate_experience < 2 {
        factors.push("Limited experience".to_string());
    }

    if factors.is_empty() {
        factors.push("Not enough signal to single out a factor".to_string());
    }
    factors
}

#[must_use]
pub fn recommendations(features: &PredictionFeatures, probability: f64) -> Vec<String> {
    let headline = if probability >= 0.8 {
        "Excellent chances. Keep doing what you are doing"
    } else if probability >= 0.6 {
        "Good chances. Prepare for the technical questions"
    } else if probability >= 0.4 {
        "Average chances. Improve preparation and communication"
    } else {
        "Low chances. Consider other openings in parallel"
    };
    let mut advice = vec![headline.to_string()];

    if features.technical_score < 0.7 {
        advice.push("Go deeper on the role's technical stack".to_string());
    }
    if features.communication_score < 0.7 {
        advice.push("Practice presenting your work out loud".to_string());
    }
    if features.questions_asked < 2 {
        advice.push("Ask more questions about the team and projects".to_string());
    }
    if features.time_spent < 5.0 {
        advice.push("Spend more time preparing for the interview".to_string());
    }
    advice
}
