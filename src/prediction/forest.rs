//! Random forest of CART trees for binary classification.
//!
//! Trees use weighted Gini impurity with balanced class weights, a bootstrap
//! sample each, and `sqrt(n_features)` candidate features per split. Tree
//! `i` is seeded with `seed + i`, so a fit is reproducible regardless of how
//! rayon schedules the trees.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{OfferError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        /// Weighted share of the positive class.
        positive: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    #[must_use]
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { positive } => return *positive,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row.get(*feature).copied().unwrap_or(0.0) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Check the node graph of a tree read from disk. Children must come
    /// after their parent and inside the node list, which rules out both
    /// out-of-range indices and cycles.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(OfferError::Serialization("tree has no nodes".to_string()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { positive } => {
                    if !(0.0..=1.0).contains(&positive) {
                        return Err(OfferError::Serialization(format!(
                            "node {idx}: leaf probability {positive} outside [0, 1]"
                        )));
                    }
                }
                Node::Split { left, right, threshold, .. } => {
                    let valid = |child: usize| child > idx && child < self.nodes.len();
                    if !valid(left) || !valid(right) {
                        return Err(OfferError::Serialization(format!(
                            "node {idx}: children {left}/{right} out of order or range"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(OfferError::Serialization(format!("node {idx}: NaN threshold")));
                    }
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Training view shared by every tree.
struct TrainingSet<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [bool],
    class_weight: [f64; 2],
    n_features: usize,
}

impl TrainingSet<'_> {
    fn weight(&self, idx: usize) -> f64 {
        self.class_weight[usize::from(self.labels[idx])]
    }

    /// `(total weight, positive weight)` of a sample set.
    fn weights(&self, samples: &[usize]) -> (f64, f64) {
        samples.iter().fold((0.0, 0.0), |(total, pos), &i| {
            let w = self.weight(i);
            (total + w, if self.labels[i] { pos + w } else { pos })
        })
    }
}

fn gini(total: f64, positive: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = positive / total;
    2.0 * p * (1.0 - p)
}

struct TreeBuilder<'a> {
    data: &'a TrainingSet<'a>,
    params: ForestParams,
    max_features: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(mut self, samples: Vec<usize>) -> DecisionTree {
        self.grow(samples, 0);
        DecisionTree { nodes: self.nodes }
    }

    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let (total, positive) = self.data.weights(&samples);
        let leaf = Node::Leaf {
            positive: if total > 0.0 { positive / total } else { 0.5 },
        };
        let pure = positive <= 0.0 || positive >= total;

        let split = if depth >= self.params.max_depth
            || samples.len() < self.params.min_samples_split
            || pure
        {
            None
        } else {
            self.best_split(&samples, total, positive)
        };

        let Some((feature, threshold)) = split else {
            self.nodes.push(leaf);
            return self.nodes.len() - 1;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.data.rows[i][feature] <= threshold);

        let idx = self.nodes.len();
        self.nodes.push(leaf);
        let left = self.grow(left_samples, depth + 1);
        let right = self.grow(right_samples, depth + 1);
        self.nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&mut self, samples: &[usize], total: f64, positive: f64) -> Option<(usize, f64)> {
        let parent = gini(total, positive);
        let features = index::sample(&mut self.rng, self.data.n_features, self.max_features);

        let mut best: Option<(usize, f64, f64)> = None;
        let mut order = samples.to_vec();

        for feature in features.iter() {
            let rows = self.data.rows;
            order.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

            let mut left_total = 0.0;
            let mut left_pos = 0.0;
            for window in 0..order.len().saturating_sub(1) {
                let i = order[window];
                let w = self.data.weight(i);
                left_total += w;
                if self.data.labels[i] {
                    left_pos += w;
                }

                let here = rows[i][feature];
                let next = rows[order[window + 1]][feature];
                if next <= here {
                    continue;
                }

                let right_total = total - left_total;
                let right_pos = positive - left_pos;
                let impurity = (left_total * gini(left_total, left_pos)
                    + right_total * gini(right_total, right_pos))
                    / total;
                let gain = parent - impurity;
                if gain > 1e-12 && best.is_none_or(|(_, _, g)| gain > g) {
                    best = Some((feature, f64::midpoint(here, next), gain));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit on encoded rows. Both classes must be present.
    pub fn fit(rows: &[Vec<f64>], labels: &[bool], params: ForestParams) -> Result<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(OfferError::TrainingFailed(format!(
                "{} rows for {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let n_features = rows[0].len();
        if n_features == 0 || rows.iter().any(|row| row.len() != n_features) {
            return Err(OfferError::TrainingFailed("ragged feature rows".to_string()));
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(OfferError::TrainingFailed("non-finite feature value".to_string()));
        }

        let positives = labels.iter().filter(|&&l| l).count();
        let negatives = labels.len() - positives;
        if positives == 0 || negatives == 0 {
            return Err(OfferError::TrainingFailed(
                "training data holds a single outcome class".to_string(),
            ));
        }

        #[allow(clippy::cast_precision_loss)]
        let class_weight = {
            let n = labels.len() as f64;
            [n / (2.0 * negatives as f64), n / (2.0 * positives as f64)]
        };
        let data = TrainingSet {
            rows,
            labels,
            class_weight,
            n_features,
        };
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let max_features = ((n_features as f64).sqrt() as usize).clamp(1, n_features);

        let trees = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let bootstrap: Vec<usize> =
                    (0..rows.len()).map(|_| rng.random_range(0..rows.len())).collect();
                TreeBuilder {
                    data: &data,
                    params,
                    max_features,
                    rng,
                    nodes: Vec::new(),
                }
                .build(bootstrap)
            })
            .collect();

        Ok(Self { params, trees })
    }

    /// Mean positive-class probability across trees.
    #[must_use]
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.trees.len() as f64;
        self.trees.iter().map(|t| t.predict_proba(row)).sum::<f64>() / n
    }

    #[must_use]
    pub fn predict(&self, row: &[f64]) -> bool {
        self.predict_proba(row) >= 0.5
    }

    /// Validate every tree; see [`DecisionTree::validate`].
    pub fn validate(&self) -> Result<()> {
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|err| OfferError::Serialization(format!("tree {i}: {err}")))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    #[must_use]
    pub const fn params(&self) -> ForestParams {
        self.params
    }
}
