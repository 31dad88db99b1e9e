//! Offer-probability predictor.
//!
//! Below `min_training_samples` every prediction comes from the rule-based
//! scorer. Once enough samples exist a forest is fitted, and it is refitted
//! whenever a new sample or import arrives. A failed fit drops back to the
//! rules; a model that no longer matches the sample set is never used.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PredictionConfig;
use crate::error::{OfferError, Result};
use crate::utils::{ensure_dir, read_json_optional, remove_if_exists, write_json_atomic};

use super::encoding::FeatureEncoder;
use super::features::PredictionFeatures;
use super::forest::{ForestParams, RandomForest};
use super::rules::{RULE_INTERVAL, key_factors, recommendations, rule_score};
use super::samples::{Durability, TrainingSample, TrainingStore};

pub const SAMPLES_FILE: &str = "training_samples.json";
pub const MODEL_FILE: &str = "success_model.json";

/// Seed for the train/test split and the forest.
const TRAINING_SEED: u64 = 42;
const TEST_FRACTION: f64 = 0.2;
/// Sample count at which the model interval collapses to a point.
const FULL_CONFIDENCE_SAMPLES: f64 = 100.0;
const MAX_MODEL_INTERVAL: f64 = 0.2;
/// Minimum similarity score for a past sample to count as similar.
const MIN_SIMILARITY: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Untrained,
    Trained,
    Retraining,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Untrained => "untrained",
            Self::Trained => "trained",
            Self::Retraining => "retraining",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Rules,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarCase {
    pub outcome: bool,
    pub actual_offer: Option<f64>,
    pub similarity_score: u8,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub probability: f64,
    pub confidence_interval: (f64, f64),
    pub key_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub similar_cases: Vec<SimilarCase>,
    pub source: PredictionSource,
    pub predicted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: f64,
    pub model_durability: Durability,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub total: usize,
    pub durability: Durability,
    pub state: ModelState,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionStats {
    pub total_predictions: usize,
    pub avg_probability: Option<f64>,
    pub high_probability_count: usize,
    pub low_probability_count: usize,
    pub model_accuracy: Option<f64>,
    pub training_samples: usize,
    pub state: ModelState,
}

/// Fitted model plus everything needed to encode new input.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrainedModel {
    encoder: FeatureEncoder,
    forest: RandomForest,
    accuracy: f64,
    trained_at: DateTime<Utc>,
    training_samples: usize,
}

pub struct SuccessPredictor {
    config: PredictionConfig,
    store: TrainingStore,
    model_path: Option<PathBuf>,
    model: Option<TrainedModel>,
    state: ModelState,
    predictions: Vec<f64>,
}

impl SuccessPredictor {
    /// Load samples and model from `dir`. Never fails: unreadable files are
    /// logged and the predictor starts from what it could read.
    pub fn open(dir: &Path, config: PredictionConfig) -> Self {
        if let Err(err) = ensure_dir(dir) {
            warn!(dir = %dir.display(), error = %err, "prediction directory unavailable");
        }
        let store = TrainingStore::open(dir.join(SAMPLES_FILE));
        let model_path = dir.join(MODEL_FILE);
        let loaded = read_json_optional::<TrainedModel>(&model_path).and_then(|model| {
            if let Some(model) = &model {
                model.forest.validate()?;
            }
            Ok(model)
        });
        let model = match loaded {
            Ok(model) => model,
            Err(err) => {
                warn!(path = %model_path.display(), error = %err, "ignoring unreadable model");
                None
            }
        };

        let mut predictor = Self {
            config,
            store,
            model_path: Some(model_path),
            model: None,
            state: ModelState::Untrained,
            predictions: Vec::new(),
        };

        if predictor.has_enough_samples() {
            match model {
                Some(model) if model.training_samples == predictor.store.len() => {
                    predictor.model = Some(model);
                    predictor.state = ModelState::Trained;
                }
                _ => predictor.retrain_quietly(),
            }
        }

        info!(
            samples = predictor.store.len(),
            state = %predictor.state,
            "success predictor ready"
        );
        predictor
    }

    /// Predictor with no backing files.
    #[must_use]
    pub fn in_memory(config: PredictionConfig) -> Self {
        Self {
            config,
            store: TrainingStore::in_memory(),
            model_path: None,
            model: None,
            state: ModelState::Untrained,
            predictions: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> ModelState {
        self.state
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn samples(&self) -> &[TrainingSample] {
        self.store.samples()
    }

    #[must_use]
    pub fn model_accuracy(&self) -> Option<f64> {
        self.trained_model().map(|m| m.accuracy)
    }

    fn has_enough_samples(&self) -> bool {
        self.store.len() >= self.config.min_training_samples
    }

    fn trained_model(&self) -> Option<&TrainedModel> {
        match self.state {
            ModelState::Trained => self.model.as_ref(),
            ModelState::Untrained | ModelState::Retraining => None,
        }
    }

    pub fn predict(&mut self, features: &PredictionFeatures, include_similar: bool) -> PredictionResult {
        let (probability, confidence_interval, source) = match self.trained_model() {
            Some(model) => {
                let row = model.encoder.encode(features);
                let probability = model.forest.predict_proba(&row).clamp(0.0, 1.0);
                (
                    probability,
                    self.model_interval(probability),
                    PredictionSource::Model,
                )
            }
            None => {
                let probability = rule_score(features);
                (
                    probability,
                    interval(probability, RULE_INTERVAL),
                    PredictionSource::Rules,
                )
            }
        };

        let similar_cases = if include_similar {
            self.similar_cases(features)
        } else {
            Vec::new()
        };

        self.predictions.push(probability);
        debug!(probability, source = ?source, "prediction made");

        PredictionResult {
            probability,
            confidence_interval,
            key_factors: key_factors(features),
            recommendations: recommendations(features, probability),
            similar_cases,
            source,
            predicted_at: Utc::now(),
        }
    }

    fn model_interval(&self, probability: f64) -> (f64, f64) {
        #[allow(clippy::cast_precision_loss)]
        let coverage = (self.store.len() as f64 / FULL_CONFIDENCE_SAMPLES).min(1.0);
        interval(probability, MAX_MODEL_INTERVAL * (1.0 - coverage))
    }

    /// Past samples resembling `features`, oldest first within the window.
    #[must_use]
    pub fn similar_cases(&self, features: &PredictionFeatures) -> Vec<SimilarCase> {
        let samples = self.store.samples();
        let window = &samples[samples.len().saturating_sub(self.config.similar_case_window)..];

        window
            .iter()
            .filter_map(|sample| {
                let past = &sample.features;
                let score = u8::from(past.role_level == features.role_level)
                    + u8::from(past.company_size == features.company_size)
                    + u8::from(past.candidate_experience.abs_diff(features.candidate_experience) <= 1)
                    + u8::from((past.technical_score - features.technical_score).abs() <= 0.2);
                (score >= MIN_SIMILARITY).then(|| SimilarCase {
                    outcome: sample.outcome,
                    actual_offer: sample.actual_offer,
                    similarity_score: score,
                    notes: sample.notes.clone(),
                })
            })
            .take(self.config.similar_case_limit)
            .collect()
    }

    /// Record an outcome and refit if there are enough samples.
    pub fn add_training_sample(
        &mut self,
        features: PredictionFeatures,
        outcome: bool,
        actual_offer: Option<f64>,
        notes: impl Into<String>,
    ) -> Durability {
        let durability = self.store.push(TrainingSample {
            features,
            outcome,
            actual_offer,
            notes: notes.into(),
            timestamp: Utc::now(),
        });
        if self.has_enough_samples() {
            self.retrain_quietly();
        }
        durability
    }

    /// Fit now, reporting failure to the caller. The predictor is left on
    /// the rule-based scorer if the fit fails.
    pub fn train(&mut self) -> Result<TrainingReport> {
        if !self.has_enough_samples() {
            return Err(OfferError::TrainingFailed(format!(
                "need at least {} samples, have {}",
                self.config.min_training_samples,
                self.store.len()
            )));
        }
        self.fit().inspect_err(|_| self.revert_to_rules())
    }

    fn retrain_quietly(&mut self) {
        if let Err(err) = self.fit() {
            warn!(error = %err, samples = self.store.len(), "model training failed; using rule-based scorer");
            self.revert_to_rules();
        }
    }

    fn revert_to_rules(&mut self) {
        self.model = None;
        self.state = ModelState::Untrained;
    }

    fn fit(&mut self) -> Result<TrainingReport> {
        if self.state == ModelState::Trained {
            self.state = ModelState::Retraining;
        }

        let samples = self.store.samples();
        let labels: Vec<bool> = samples.iter().map(|s| s.outcome).collect();
        let (train_idx, test_idx) = stratified_split(&labels, TEST_FRACTION, TRAINING_SEED)?;

        let train_features: Vec<&PredictionFeatures> =
            train_idx.iter().map(|&i| &samples[i].features).collect();
        let encoder = FeatureEncoder::fit(&train_features);
        let train_rows: Vec<Vec<f64>> = train_features.iter().map(|f| encoder.encode(f)).collect();
        let train_labels: Vec<bool> = train_idx.iter().map(|&i| labels[i]).collect();

        let params = ForestParams {
            n_estimators: self.config.n_estimators,
            max_depth: self.config.max_depth,
            seed: TRAINING_SEED,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&train_rows, &train_labels, params)?;

        let correct = test_idx
            .iter()
            .filter(|&&i| forest.predict(&encoder.encode(&samples[i].features)) == labels[i])
            .count();
        #[allow(clippy::cast_precision_loss)]
        let accuracy = correct as f64 / test_idx.len() as f64;

        let model = TrainedModel {
            encoder,
            forest,
            accuracy,
            trained_at: Utc::now(),
            training_samples: samples.len(),
        };
        let model_durability = self.save_model(&model);

        info!(
            samples = samples.len(),
            train = train_idx.len(),
            test = test_idx.len(),
            accuracy,
            "model trained"
        );
        let report = TrainingReport {
            samples: samples.len(),
            train_size: train_idx.len(),
            test_size: test_idx.len(),
            accuracy,
            model_durability,
        };

        self.model = Some(model);
        self.state = ModelState::Trained;
        Ok(report)
    }

    fn save_model(&self, model: &TrainedModel) -> Durability {
        let Some(path) = &self.model_path else {
            return Durability::InMemoryOnly {
                reason: "no data directory".to_string(),
            };
        };
        match write_json_atomic(path, model) {
            Ok(()) => Durability::Persisted,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to persist model");
                Durability::InMemoryOnly {
                    reason: err.to_string(),
                }
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> PredictionStats {
        #[allow(clippy::cast_precision_loss)]
        let avg_probability = (!self.predictions.is_empty())
            .then(|| self.predictions.iter().sum::<f64>() / self.predictions.len() as f64);
        PredictionStats {
            total_predictions: self.predictions.len(),
            avg_probability,
            high_probability_count: self.predictions.iter().filter(|&&p| p >= 0.8).count(),
            low_probability_count: self.predictions.iter().filter(|&&p| p <= 0.3).count(),
            model_accuracy: self.model_accuracy(),
            training_samples: self.store.len(),
            state: self.state,
        }
    }

    /// Write all samples to `path`; returns how many were written.
    pub fn export_training_data(&self, path: &Path) -> Result<usize> {
        write_json_atomic(path, self.store.samples())?;
        info!(path = %path.display(), samples = self.store.len(), "exported training samples");
        Ok(self.store.len())
    }

    /// Append samples from a JSON file written by
    /// [`export_training_data`](Self::export_training_data).
    pub fn import_training_data(&mut self, path: &Path) -> Result<ImportReport> {
        let imported: Vec<TrainingSample> = read_json_optional(path)?
            .ok_or_else(|| OfferError::NotFound(format!("{} does not exist", path.display())))?;
        let count = imported.len();
        let durability = self.store.extend(imported);
        if self.has_enough_samples() {
            self.retrain_quietly();
        }
        info!(path = %path.display(), imported = count, total = self.store.len(), "imported training samples");
        Ok(ImportReport {
            imported: count,
            total: self.store.len(),
            durability,
            state: self.state,
        })
    }

    /// Forget the model, the samples and the prediction history, deleting
    /// their files.
    pub fn reset(&mut self) -> Result<()> {
        self.store.clear()?;
        if let Some(path) = &self.model_path {
            remove_if_exists(path)?;
        }
        self.revert_to_rules();
        self.predictions.clear();
        info!("predictor reset");
        Ok(())
    }
}

fn interval(probability: f64, half_width: f64) -> (f64, f64) {
    (
        (probability - half_width).max(0.0),
        (probability + half_width).min(1.0),
    )
}

/// Split indices into train and test sets, keeping class proportions.
///
/// Every class needs at least two members so both sets see it.
fn stratified_split(labels: &[bool], test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [false, true] {
        let mut members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        if members.len() < 2 {
            return Err(OfferError::TrainingFailed(format!(
                "outcome class {class} has {} sample(s); need at least 2",
                members.len()
            )));
        }
        members.shuffle(&mut rng);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let n_test = ((members.len() as f64 * test_fraction).round() as usize).clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}
