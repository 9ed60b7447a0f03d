//! Random forest classifier over the per-point feature vector.
//!
//! Each tree is grown on a bootstrap sample of the training rows, choosing
//! splits by Gini impurity over a random subset of features at every node.
//! Trees are grown in parallel with rayon; prediction averages the leaf class
//! probabilities of all trees and picks the most probable class, ties going
//! to the lowest class id.

pub mod sampling;
pub mod tree;

use constants::class::{CLASS_COUNT, ClassLabel};
use constants::classification::{FEATURE_COUNT, FOREST_SETTINGS};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use sampling::{BootstrapSampler, tree_seeds};
use serde::{Deserialize, Serialize};
use tree::{ClassProba, DecisionTree, GrowParams};

pub use tree::FeatureRow;

/// Forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features considered per split; `None` uses floor(sqrt(feature count)).
    pub max_features: Option<usize>,
    /// Rows drawn per tree; `None` draws as many as the training set holds.
    pub max_samples: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: FOREST_SETTINGS.n_trees,
            max_depth: FOREST_SETTINGS.max_depth,
            min_samples_split: FOREST_SETTINGS.min_samples_split,
            max_features: None,
            max_samples: None,
            seed: FOREST_SETTINGS.seed,
        }
    }
}

impl ForestParams {
    pub fn effective_max_features(&self) -> usize {
        self.max_features
            .unwrap_or_else(|| (FEATURE_COUNT as f64).sqrt().floor() as usize)
            .clamp(1, FEATURE_COUNT)
    }

    fn grow_params(&self) -> GrowParams {
        GrowParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: self.effective_max_features(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit on `features` with class ids in `labels`; both must be non-empty
    /// and equally long, and every label below `CLASS_COUNT`.
    pub fn fit(features: &[FeatureRow], labels: &[u8], params: &ForestParams) -> Self {
        debug_assert_eq!(features.len(), labels.len());
        debug_assert!(labels.iter().all(|&l| (l as usize) < CLASS_COUNT));

        let sampler = BootstrapSampler::new(features.len() as u32, params.max_samples);
        let grow = params.grow_params();

        let trees = tree_seeds(params.seed, params.n_trees)
            .into_par_iter()
            .map(|tree_seed| {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(tree_seed);
                let rows = sampler.sample(&mut rng);
                DecisionTree::grow(features, labels, rows, &grow, &mut rng)
            })
            .collect();

        Self { trees }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn total_nodes(&self) -> usize {
        self.trees.iter().map(DecisionTree::node_count).sum()
    }

    pub fn predict_proba(&self, row: &FeatureRow) -> ClassProba {
        let mut sum = [0.0f32; CLASS_COUNT];
        for tree in &self.trees {
            for (s, p) in sum.iter_mut().zip(tree.predict_proba(row)) {
                *s += p;
            }
        }
        let n = self.trees.len().max(1) as f32;
        sum.map(|s| s / n)
    }

    /// Most probable class for `row`.
    pub fn predict(&self, row: &FeatureRow) -> ClassLabel {
        let proba = self.predict_proba(row);
        let mut best = ClassLabel::ALL[0];
        for class in ClassLabel::ALL.into_iter().skip(1) {
            if proba[class.index()] > proba[best.index()] {
                best = class;
            }
        }
        best
    }

    /// Predict many rows in parallel; output order matches input order.
    pub fn predict_many(&self, rows: &[FeatureRow]) -> Vec<ClassLabel> {
        rows.par_iter().map(|row| self.predict(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three well separated blobs, one per class, along features 2 and 3.
    fn blobs(n_per_class: usize) -> (Vec<FeatureRow>, Vec<u8>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for class in 0..CLASS_COUNT {
            for i in 0..n_per_class {
                let jitter = (i % 7) as f64 * 0.1;
                features.push([
                    i as f64,
                    (i * 3 % 11) as f64,
                    class as f64 * 10.0 + jitter,
                    class as f64 * 1_000.0 + jitter,
                    500.0,
                    500.0,
                ]);
                labels.push(class as u8);
            }
        }
        (features, labels)
    }

    fn small_params(seed: u64) -> ForestParams {
        ForestParams {
            n_trees: 12,
            max_depth: 8,
            min_samples_split: 2,
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn default_max_features_is_sqrt() {
        assert_eq!(ForestParams::default().effective_max_features(), 2);
        let all = ForestParams {
            max_features: Some(6),
            ..Default::default()
        };
        assert_eq!(all.effective_max_features(), 6);
    }

    #[test]
    fn fits_separable_classes() {
        let (features, labels) = blobs(40);
        let forest = RandomForest::fit(&features, &labels, &small_params(42));
        assert_eq!(forest.n_trees(), 12);

        let predicted = forest.predict_many(&features);
        let expected: Vec<ClassLabel> = labels
            .iter()
            .map(|&l| ClassLabel::ALL[l as usize])
            .collect();
        assert_eq!(predicted, expected);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let (features, labels) = blobs(30);
        let a = RandomForest::fit(&features, &labels, &small_params(7));
        let b = RandomForest::fit(&features, &labels, &small_params(7));
        assert_eq!(a, b);
        assert_eq!(a.predict_many(&features), b.predict_many(&features));
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (features, labels) = blobs(20);
        let forest = RandomForest::fit(&features, &labels, &small_params(1));
        let proba = forest.predict_proba(&features[5]);
        assert!((proba.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn tied_votes_go_to_lowest_class() {
        let (features, labels) = blobs(5);
        let empty = RandomForest::fit(
            &features,
            &labels,
            &ForestParams {
                n_trees: 0,
                ..small_params(3)
            },
        );
        assert_eq!(empty.predict_proba(&features[0]), [0.0; CLASS_COUNT]);
        assert_eq!(empty.predict(&features[0]), ClassLabel::Tree);
    }

    #[test]
    fn single_class_training_predicts_that_class() {
        let features = vec![[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]; 8];
        let labels = vec![1u8; 8];
        let forest = RandomForest::fit(&features, &labels, &small_params(0));
        assert_eq!(forest.predict(&[0.0; FEATURE_COUNT]), ClassLabel::Building);
    }
}
