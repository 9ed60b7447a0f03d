//! Heuristic labelling of the seed chunk, used once to synthesize a training set.
use crate::source::{PointRecord, PointTable};
use crate::stats::ClassCounts;
use constants::class::ClassLabel;
use constants::classification::{
    ELEVATION_PERCENTILE, POOL_BLUE_MIN, POOL_GREEN_MIN, POOL_RED_MAX,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("seed chunk has no points; cannot synthesize training labels")]
pub struct EmptySeedError;

/// Colour and elevation cutoffs. Channel cutoffs assume 16-bit colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapRules {
    pub pool_red_max: u16,
    pub pool_green_min: u16,
    pub pool_blue_min: u16,
    pub elevation_percentile: f64,
}

impl Default for BootstrapRules {
    fn default() -> Self {
        Self {
            pool_red_max: POOL_RED_MAX,
            pool_green_min: POOL_GREEN_MIN,
            pool_blue_min: POOL_BLUE_MIN,
            elevation_percentile: ELEVATION_PERCENTILE,
        }
    }
}

impl BootstrapRules {
    pub fn is_pool(&self, point: &PointRecord) -> bool {
        point.red < self.pool_red_max
            && point.green > self.pool_green_min
            && point.blue > self.pool_blue_min
    }

    /// Pool takes precedence; otherwise points above the elevation split are trees.
    pub fn label_point(&self, point: &PointRecord, threshold_z: f64) -> ClassLabel {
        if self.is_pool(point) {
            ClassLabel::Pool
        } else if point.z > threshold_z {
            ClassLabel::Tree
        } else {
            ClassLabel::Building
        }
    }

    /// Label every row of the seed chunk.
    pub fn label_seed(&self, seed: &PointTable) -> Result<SeedLabels, EmptySeedError> {
        if seed.is_empty() {
            return Err(EmptySeedError);
        }

        let mut z = seed.z_values();
        let threshold_z = percentile(&mut z, self.elevation_percentile);

        let labels: Vec<ClassLabel> = seed
            .rows()
            .iter()
            .map(|point| self.label_point(point, threshold_z))
            .collect();
        let distribution = ClassCounts::from_labels(&labels);

        log::info!(
            "Bootstrap labels over {} seed points (z split {:.3}): {}",
            labels.len(),
            threshold_z,
            distribution
        );

        Ok(SeedLabels {
            labels,
            threshold_z,
            distribution,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SeedLabels {
    pub labels: Vec<ClassLabel>,
    pub threshold_z: f64,
    pub distribution: ClassCounts,
}

/// Percentile with linear interpolation between the closest ranks.
/// `values` is reordered in place and must not be empty.
pub fn percentile(values: &mut [f64], p: f64) -> f64 {
    values.sort_unstable_by(f64::total_cmp);

    let rank = (p / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn point(z: f64, r: u16, g: u16, b: u16) -> PointRecord {
        PointRecord::new(0.0, 0.0, z, r, g, b)
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        assert_abs_diff_eq!(percentile(&mut v, 80.0), 4.2, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&mut v, 0.0), 1.0);
        assert_abs_diff_eq!(percentile(&mut v, 100.0), 5.0);
        assert_abs_diff_eq!(percentile(&mut [7.0], 80.0), 7.0);
    }

    #[test]
    fn pool_rule_dominates_elevation() {
        let rules = BootstrapRules::default();
        let high_pool = point(1_000.0, 100, 30_000, 30_000);
        assert_eq!(rules.label_point(&high_pool, 0.0), ClassLabel::Pool);
        assert_eq!(rules.label_point(&high_pool, 5_000.0), ClassLabel::Pool);
    }

    #[test]
    fn pool_cutoffs_are_strict() {
        let rules = BootstrapRules::default();
        assert!(!rules.is_pool(&point(0.0, 18_000, 30_000, 30_000)));
        assert!(!rules.is_pool(&point(0.0, 0, 20_000, 30_000)));
        assert!(!rules.is_pool(&point(0.0, 0, 30_000, 20_000)));
        assert!(rules.is_pool(&point(0.0, 17_999, 20_001, 20_001)));
    }

    #[test]
    fn seed_split_by_elevation_percentile() {
        let rules = BootstrapRules::default();
        let seed: PointTable = (1..=10)
            .map(|z| point(z as f64, 40_000, 40_000, 40_000))
            .collect();
        let labelled = rules.label_seed(&seed).unwrap();

        // 80th percentile of 1..=10 is 8.2: only z = 9 and 10 are trees.
        assert_abs_diff_eq!(labelled.threshold_z, 8.2, epsilon = 1e-12);
        assert_eq!(labelled.distribution.get(ClassLabel::Tree), 2);
        assert_eq!(labelled.distribution.get(ClassLabel::Building), 8);
        assert_eq!(labelled.labels[9], ClassLabel::Tree);
        assert_eq!(labelled.labels[7], ClassLabel::Building);
    }

    #[test]
    fn labelling_is_deterministic() {
        let rules = BootstrapRules::default();
        let seed: PointTable = (0..200)
            .map(|i| point((i * 37 % 101) as f64, (i * 997 % 65_535) as u16, 25_000, 21_000))
            .collect();
        let a = rules.label_seed(&seed).unwrap();
        let b = rules.label_seed(&seed).unwrap();
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn empty_seed_is_an_error() {
        let rules = BootstrapRules::default();
        assert!(rules.label_seed(&PointTable::default()).is_err());
    }
}
