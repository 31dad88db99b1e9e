//! Turns [`PredictionFeatures`] into numeric rows for the forest.

use serde::{Deserialize, Serialize};

use super::features::{FEATURE_COUNT, PredictionFeatures};

/// Code assigned to a category the encoder never saw.
pub const UNSEEN_CATEGORY: f64 = -1.0;

/// Maps each category to its index in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = values.into_iter().map(str::to_string).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn transform(&self, value: &str) -> f64 {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map_or(UNSEEN_CATEGORY, |idx| idx as f64)
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Zero-mean, unit-variance scaling per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on rows of equal width. Constant columns get scale 1.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        #[allow(clippy::cast_precision_loss)]
        let n = rows.len().max(1) as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }

        let mut scale = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2) / n;
            }
        }
        for s in &mut scale {
            *s = s.sqrt();
            if *s < f64::EPSILON {
                *s = 1.0;
            }
        }

        Self { mean, scale }
    }

    pub fn transform_in_place(&self, row: &mut [f64]) {
        for ((v, m), s) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
            *v = (*v - m) / s;
        }
    }
}

/// Label encoders for the categorical columns plus a scaler for the numeric
/// ones, fitted together on a training set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    categorical: Vec<LabelEncoder>,
    scaler: StandardScaler,
}

impl FeatureEncoder {
    #[must_use]
    pub fn fit(samples: &[&PredictionFeatures]) -> Self {
        let categorical = (0..3)
            .map(|col| LabelEncoder::fit(samples.iter().map(|f| f.categorical_values()[col])))
            .collect();
        let numeric: Vec<Vec<f64>> = samples.iter().map(|f| f.numeric_values().to_vec()).collect();
        Self {
            categorical,
            scaler: StandardScaler::fit(&numeric),
        }
    }

    /// Encoded row: categorical codes first, then scaled numerics.
    #[must_use]
    pub fn encode(&self, features: &PredictionFeatures) -> Vec<f64> {
        let mut row = Vec::with_capacity(FEATURE_COUNT);
        for (encoder, value) in self.categorical.iter().zip(features.categorical_values()) {
            row.push(encoder.transform(value));
        }
        let mut numeric = features.numeric_values();
        self.scaler.transform_in_place(&mut numeric);
        row.extend_from_slice(&numeric);
        row
    }
}
