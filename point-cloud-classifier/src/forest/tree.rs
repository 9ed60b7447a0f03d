//! CART classification tree with Gini splits.

use super::sampling::shuffled_features;
use constants::class::CLASS_COUNT;
use constants::classification::FEATURE_COUNT;
use rand_xoshiro::Xoshiro256PlusPlus;

pub type FeatureRow = [f64; FEATURE_COUNT];
pub type ClassProba = [f32; CLASS_COUNT];

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: u8,
        threshold: f64,
        left: u32,
        right: u32,
    },
    Leaf {
        proba: ClassProba,
    },
}

/// Limits applied while growing one tree.
#[derive(Debug, Clone, Copy)]
pub struct GrowParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features: usize,
}

/// Fitted tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

struct PendingNode {
    id: usize,
    rows: Vec<u32>,
    depth: usize,
}

impl DecisionTree {
    /// Grow a tree over `rows` (indices into `features`/`labels`, duplicates allowed).
    pub fn grow(
        features: &[FeatureRow],
        labels: &[u8],
        rows: Vec<u32>,
        params: &GrowParams,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Self {
        let mut nodes = vec![Node::Leaf {
            proba: [0.0; CLASS_COUNT],
        }];
        let mut stack = vec![PendingNode {
            id: 0,
            rows,
            depth: 0,
        }];

        while let Some(pending) = stack.pop() {
            let counts = class_counts(labels, &pending.rows);
            let n = pending.rows.len();
            let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

            let split = if pure || pending.depth >= params.max_depth || n < params.min_samples_split {
                None
            } else {
                find_split(features, labels, &pending.rows, &counts, params, rng)
            };

            let Some(split) = split else {
                nodes[pending.id] = Node::Leaf {
                    proba: leaf_proba(&counts, n),
                };
                continue;
            };

            let (left_rows, right_rows): (Vec<u32>, Vec<u32>) = pending
                .rows
                .iter()
                .partition(|&&r| features[r as usize][split.feature] <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf {
                proba: [0.0; CLASS_COUNT],
            });
            nodes.push(Node::Leaf {
                proba: [0.0; CLASS_COUNT],
            });
            nodes[pending.id] = Node::Split {
                feature: split.feature as u8,
                threshold: split.threshold,
                left: left as u32,
                right: right as u32,
            };

            stack.push(PendingNode {
                id: right,
                rows: right_rows,
                depth: pending.depth + 1,
            });
            stack.push(PendingNode {
                id: left,
                rows: left_rows,
                depth: pending.depth + 1,
            });
        }

        Self { nodes }
    }

    /// Class probabilities of the leaf reached by `row`.
    pub fn predict_proba(&self, row: &FeatureRow) -> &ClassProba {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature as usize] <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + walk(nodes, *left as usize).max(walk(nodes, *right as usize))
                }
            }
        }
        walk(&self.nodes, 0)
    }
}

fn class_counts(labels: &[u8], rows: &[u32]) -> [u64; CLASS_COUNT] {
    let mut counts = [0u64; CLASS_COUNT];
    for &r in rows {
        counts[labels[r as usize] as usize] += 1;
    }
    counts
}

fn leaf_proba(counts: &[u64; CLASS_COUNT], n: usize) -> ClassProba {
    let mut proba = [0.0f32; CLASS_COUNT];
    if n > 0 {
        for (p, &c) in proba.iter_mut().zip(counts) {
            *p = c as f32 / n as f32;
        }
    }
    proba
}

/// Sum over both children of `sum(count^2) / size`; maximising it minimises
/// the weighted Gini impurity of the split.
fn gini_score(left: &[u64; CLASS_COUNT], nl: u64, right: &[u64; CLASS_COUNT], nr: u64) -> f64 {
    let side = |counts: &[u64; CLASS_COUNT], n: u64| {
        counts.iter().map(|&c| (c * c) as f64).sum::<f64>() / n as f64
    };
    side(left, nl) + side(right, nr)
}

/// Best split over a random feature order. At least `max_features` features
/// are examined; more are tried while none has produced a valid split.
fn find_split(
    features: &[FeatureRow],
    labels: &[u8],
    rows: &[u32],
    counts: &[u64; CLASS_COUNT],
    params: &GrowParams,
    rng: &mut Xoshiro256PlusPlus,
) -> Option<SplitCandidate> {
    let mut best: Option<SplitCandidate> = None;
    let mut pairs: Vec<(f64, u8)> = Vec::with_capacity(rows.len());

    for (visited, feature) in shuffled_features(FEATURE_COUNT, rng).into_iter().enumerate() {
        if visited >= params.max_features && best.is_some() {
            break;
        }

        pairs.clear();
        pairs.extend(
            rows.iter()
                .map(|&r| (features[r as usize][feature], labels[r as usize])),
        );
        pairs.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        if let Some(candidate) = best_split_on_sorted(&pairs, counts, feature) {
            if best.is_none_or(|b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
    }
    best
}

fn best_split_on_sorted(
    pairs: &[(f64, u8)],
    counts: &[u64; CLASS_COUNT],
    feature: usize,
) -> Option<SplitCandidate> {
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as u64;
    let mut left = [0u64; CLASS_COUNT];
    let mut best: Option<SplitCandidate> = None;

    for pos in 0..pairs.len() - 1 {
        left[pairs[pos].1 as usize] += 1;
        let (value, next) = (pairs[pos].0, pairs[pos + 1].0);
        if value >= next {
            continue;
        }

        let nl = pos as u64 + 1;
        let mut right = *counts;
        for (r, l) in right.iter_mut().zip(&left) {
            *r -= l;
        }
        let score = gini_score(&left, nl, &right, n - nl);

        if best.is_none_or(|b| score > b.score) {
            let mid = value + (next - value) / 2.0;
            let threshold = if mid < next { mid } else { value };
            best = Some(SplitCandidate {
                feature,
                threshold,
                score,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn row(values: &[f64]) -> FeatureRow {
        let mut r = [0.0; FEATURE_COUNT];
        r[..values.len()].copy_from_slice(values);
        r
    }

    fn params() -> GrowParams {
        GrowParams {
            max_depth: 10,
            min_samples_split: 2,
            max_features: FEATURE_COUNT,
        }
    }

    #[test]
    fn separable_feature_yields_single_split() {
        let features: Vec<FeatureRow> = (0..10).map(|i| row(&[0.0, 0.0, i as f64])).collect();
        let labels: Vec<u8> = (0..10).map(|i| if i < 5 { 1 } else { 0 }).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let tree = DecisionTree::grow(&features, &labels, (0..10).collect(), &params(), &mut rng);

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_proba(&row(&[0.0, 0.0, 4.4])), &[0.0, 1.0, 0.0]);
        assert_eq!(tree.predict_proba(&row(&[0.0, 0.0, 4.6])), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn pure_node_is_a_leaf() {
        let features: Vec<FeatureRow> = (0..4).map(|i| row(&[i as f64])).collect();
        let labels = vec![2u8; 4];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let tree = DecisionTree::grow(&features, &labels, (0..4).collect(), &params(), &mut rng);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba(&row(&[100.0])), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn max_depth_limits_growth() {
        let features: Vec<FeatureRow> = (0..64).map(|i| row(&[i as f64])).collect();
        let labels: Vec<u8> = (0..64).map(|i| (i % 3) as u8).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let shallow = GrowParams {
            max_depth: 2,
            ..params()
        };
        let tree = DecisionTree::grow(&features, &labels, (0..64).collect(), &shallow, &mut rng);
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn constant_features_cannot_split() {
        let features = vec![row(&[1.0, 1.0]); 6];
        let labels = vec![0u8, 1, 0, 1, 2, 2];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let tree = DecisionTree::grow(&features, &labels, (0..6).collect(), &params(), &mut rng);
        assert_eq!(tree.node_count(), 1);
        let proba = tree.predict_proba(&row(&[1.0, 1.0]));
        assert!((proba.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }
}
