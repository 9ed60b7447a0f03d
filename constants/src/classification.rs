//! Default parameters for the bootstrap classification pipeline.

/// Points read, classified and written per chunk.
pub const DEFAULT_CHUNK_SIZE: u64 = 1_000_000;

/// Pool colour rule, 16-bit channel range: R below, G and B above.
pub const POOL_RED_MAX: u16 = 18_000;
pub const POOL_GREEN_MIN: u16 = 20_000;
pub const POOL_BLUE_MIN: u16 = 20_000;

/// Elevation percentile of the seed chunk splitting trees from buildings.
pub const ELEVATION_PERCENTILE: f64 = 80.0;

pub struct ForestSettings {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

pub const FOREST_SETTINGS: ForestSettings = ForestSettings {
    n_trees: 100,
    max_depth: 25,
    min_samples_split: 5,
    seed: 42,
};

/// Number of per-point features: X, Y, Z, R, G, B.
pub const FEATURE_COUNT: usize = 6;

/// LAS version and point format used for output artifacts.
pub const OUTPUT_LAS_VERSION: (u8, u8) = (1, 4);
pub const OUTPUT_POINT_FORMAT: u8 = 7;

/// File name of the run manifest written next to the artifacts.
pub const MANIFEST_FILE_NAME: &str = "classification_manifest.json";
