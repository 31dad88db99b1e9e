//! Offer-probability prediction from interview snapshots.
//!
//! This is a simulation harness: the forest learns from whatever outcomes
//! the user records and makes no claim of statistical validity.

pub mod encoding;
pub mod features;
pub mod forest;
pub mod predictor;
pub mod rules;
pub mod samples;

pub use features::PredictionFeatures;
pub use forest::{ForestParams, RandomForest};
pub use predictor::{
    ImportReport, ModelState, PredictionResult, PredictionSource, PredictionStats, SimilarCase,
    SuccessPredictor, TrainingReport,
};
pub use rules::rule_score;
pub use samples::{Durability, TrainingSample, TrainingStore};
