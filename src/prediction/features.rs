//! Interview snapshot used as predictor input.

use serde::{Deserialize, Serialize};

/// Number of columns in an encoded feature row.
pub const FEATURE_COUNT: usize = CATEGORICAL_COLUMNS.len() + NUMERIC_COLUMNS.len();

pub const CATEGORICAL_COLUMNS: [&str; 3] = ["company_size", "industry", "role_level"];

pub const NUMERIC_COLUMNS: [&str; 10] = [
    "interview_round",
    "time_spent",
    "questions_asked",
    "technical_score",
    "communication_score",
    "cultural_fit",
    "salary_expectation",
    "market_rate",
    "candidate_experience",
    "similar_offers_count",
];

/// One candidate/interview snapshot.
///
/// Missing fields deserialize to neutral defaults so hand-written or older
/// sample files still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionFeatures {
    /// `startup`, `mid`, `enterprise`, ...
    pub company_size: String,
    /// `tech`, `finance`, ...
    pub industry: String,
    /// `junior`, `middle`, `senior`, `lead`, ...
    pub role_level: String,
    pub interview_round: u32,
    /// Preparation hours.
    pub time_spent: f64,
    pub questions_asked: u32,
    /// 0..=1
    pub technical_score: f64,
    /// 0..=1
    pub communication_score: f64,
    /// 0..=1
    pub cultural_fit: f64,
    pub salary_expectation: f64,
    pub market_rate: f64,
    /// Years.
    pub candidate_experience: u32,
    pub similar_offers_count: u32,
}

impl Default for PredictionFeatures {
    fn default() -> Self {
        Self {
            company_size: "unknown".to_string(),
            industry: "unknown".to_string(),
            role_level: "unknown".to_string(),
            interview_round: 1,
            time_spent: 0.0,
            questions_asked: 0,
            technical_score: 0.5,
            communication_score: 0.5,
            cultural_fit: 0.5,
            salary_expectation: 0.0,
            market_rate: 0.0,
            candidate_experience: 0,
            similar_offers_count: 0,
        }
    }
}

impl PredictionFeatures {
    #[must_use]
    pub fn is_senior(&self) -> bool {
        matches!(
            self.role_level.to_ascii_lowercase().as_str(),
            "senior" | "lead" | "staff" | "principal"
        )
    }

    /// Relative gap between the salary expectation and the market rate.
    #[must_use]
    pub fn salary_gap(&self) -> f64 {
        (self.salary_expectation - self.market_rate).abs() / self.market_rate.max(1.0)
    }

    #[must_use]
    pub fn categorical_values(&self) -> [&str; 3] {
        [&self.company_size, &self.industry, &self.role_level]
    }

    #[must_use]
    pub fn numeric_values(&self) -> [f64; 10] {
        [
            f64::from(self.interview_round),
            self.time_spent,
            f64::from(self.questions_asked),
            self.technical_score,
            self.communication_score,
            self.cultural_fit,
            self.salary_expectation,
            self.market_rate,
            f64::from(self.candidate_experience),
            f64::from(self.similar_offers_count),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let features: PredictionFeatures =
            serde_json::from_str(r#"{"role_level": "senior", "technical_score": 0.9}"#).unwrap();
        assert!(features.is_senior());
        assert_eq!(features.company_size, "unknown");
        assert_eq!(features.interview_round, 1);
        assert!((features.cultural_fit - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn salary_gap_guards_zero_market() {
        let features = PredictionFeatures {
            salary_expectation: 0.0,
            market_rate: 0.0,
            ..PredictionFeatures::default()
        };
        assert!(features.salary_gap().abs() < f64::EPSILON);
    }
}
