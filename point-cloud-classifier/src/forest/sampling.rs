//! Row and feature sampling for forest training.
//!
//! Every tree draws from its own generator, seeded from a master generator in
//! tree order, so a fixed seed reproduces the forest no matter how trees are
//! scheduled across threads.

use rand::SeedableRng;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Derive one seed per tree from the forest seed.
pub fn tree_seeds(seed: u64, n_trees: usize) -> Vec<u64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..n_trees).map(|_| rng.next_u64()).collect()
}

/// Draws a bootstrap sample (with replacement) of row indices.
#[derive(Debug, Clone)]
pub struct BootstrapSampler {
    num_rows: u32,
    sample_size: usize,
}

impl BootstrapSampler {
    /// `max_samples` caps the draw; `None` draws as many rows as the dataset has.
    pub fn new(num_rows: u32, max_samples: Option<usize>) -> Self {
        let sample_size = max_samples
            .map_or(num_rows as usize, |m| m.min(num_rows as usize))
            .max(1);
        Self {
            num_rows,
            sample_size,
        }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn sample(&self, rng: &mut Xoshiro256PlusPlus) -> Vec<u32> {
        (0..self.sample_size)
            .map(|_| rng.gen_range(0..self.num_rows))
            .collect()
    }
}

/// Visit order of candidate features at one node.
pub fn shuffled_features(num_features: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let mut features: Vec<usize> = (0..num_features).collect();
    features.shuffle(rng);
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_seeds_are_reproducible() {
        assert_eq!(tree_seeds(42, 8), tree_seeds(42, 8));
        assert_ne!(tree_seeds(42, 8), tree_seeds(43, 8));
    }

    #[test]
    fn bootstrap_sample_stays_in_range() {
        let sampler = BootstrapSampler::new(50, None);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let rows = sampler.sample(&mut rng);
        assert_eq!(rows.len(), 50);
        assert!(rows.iter().all(|&r| r < 50));
    }

    #[test]
    fn max_samples_caps_the_draw() {
        assert_eq!(BootstrapSampler::new(1_000, Some(64)).sample_size(), 64);
        assert_eq!(BootstrapSampler::new(10, Some(64)).sample_size(), 10);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut features = shuffled_features(6, &mut rng);
        features.sort_unstable();
        assert_eq!(features, vec![0, 1, 2, 3, 4, 5]);
    }
}
