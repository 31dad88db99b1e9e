use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::TempDir;

use crate::prediction::{PredictionFeatures, TrainingSample};

/// Isolated data root for a test.
pub struct UnitTestFixture {
    pub temp_dir: TempDir,
    pub data_path: PathBuf,
}

impl Default for UnitTestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitTestFixture {
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_path = temp_dir.path().to_path_buf();

        println!("[FIXTURE] Created temp directory: {data_path:?}");

        Self {
            temp_dir,
            data_path,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.data_path
    }

    /// Create a test file with content.
    #[must_use]
    pub fn create_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.data_path.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        println!(
            "[FIXTURE] Created file: {:?} ({} bytes)",
            full_path,
            content.len()
        );
        full_path
    }

    /// Write a project `config.toml` into the data root.
    #[must_use]
    pub fn create_config(&self, content: &str) -> PathBuf {
        self.create_file("config.toml", content)
    }
}

impl Drop for UnitTestFixture {
    fn drop(&mut self) {
        println!("[FIXTURE] Cleaning up temp directory: {:?}", self.data_path);
    }
}

/// Interview snapshot that reads as a strong candidate.
#[must_use]
pub fn strong_features() -> PredictionFeatures {
    PredictionFeatures {
        company_size: "enterprise".to_string(),
        industry: "tech".to_string(),
        role_level: "senior".to_string(),
        interview_round: 2,
        time_spent: 12.0,
        questions_asked: 4,
        technical_score: 0.9,
        communication_score: 0.85,
        cultural_fit: 0.9,
        salary_expectation: 250_000.0,
        market_rate: 240_000.0,
        candidate_experience: 7,
        similar_offers_count: 2,
    }
}

/// Interview snapshot that reads as a weak candidate.
#[must_use]
pub fn weak_features() -> PredictionFeatures {
    PredictionFeatures {
        company_size: "startup".to_string(),
        industry: "finance".to_string(),
        role_level: "junior".to_string(),
        interview_round: 4,
        time_spent: 1.0,
        questions_asked: 0,
        technical_score: 0.3,
        communication_score: 0.4,
        cultural_fit: 0.35,
        salary_expectation: 180_000.0,
        market_rate: 120_000.0,
        candidate_experience: 1,
        similar_offers_count: 0,
    }
}

/// `n` labelled samples alternating between strong (offer) and weak (no
/// offer) profiles, with small deterministic variation.
#[must_use]
pub fn labelled_samples(n: usize) -> Vec<TrainingSample> {
    (0..n)
        .map(|i| {
            let outcome = i % 2 == 0;
            let mut features = if outcome {
                strong_features()
            } else {
                weak_features()
            };
            #[allow(clippy::cast_precision_loss)]
            let jitter = (i % 5) as f64 * 0.01;
            features.technical_score = (features.technical_score + jitter).min(1.0);
            features.time_spent += jitter * 100.0;
            TrainingSample {
                features,
                outcome,
                actual_offer: outcome.then_some(240_000.0),
                notes: format!("sample {i}"),
                timestamp: Utc::now(),
            }
        })
        .collect()
}
