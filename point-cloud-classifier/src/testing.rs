//! Helpers shared by unit and integration tests.

use crate::source::PointRecord;

/// Coordinate tolerance after a LAS round trip at millimetre scale.
pub const COORDINATE_TOLERANCE: f64 = 1e-6;

/// Assert two point sequences match: colour exactly, coordinates within tolerance.
pub fn assert_same_points(actual: &[PointRecord], expected: &[PointRecord]) {
    assert_eq!(actual.len(), expected.len(), "point count differs");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(
            (a.red, a.green, a.blue),
            (e.red, e.green, e.blue),
            "colour differs at row {i}"
        );
        for (axis, (av, ev)) in [(a.x, e.x), (a.y, e.y), (a.z, e.z)].into_iter().enumerate() {
            assert!(
                (av - ev).abs() <= COORDINATE_TOLERANCE,
                "axis {axis} differs at row {i}: {av} vs {ev}"
            );
        }
    }
}

/// Deterministic scene: low grey roofs, tall green canopy, and cyan pools.
/// Every tenth point is pool coloured, every fourth of the rest is elevated.
pub fn synthetic_scene(n: usize) -> Vec<PointRecord> {
    (0..n)
        .map(|i| {
            let x = 1_000.0 + (i % 500) as f64 * 0.25;
            let y = 2_000.0 + (i / 500) as f64 * 0.25;
            if i % 10 == 0 {
                PointRecord::new(x, y, 1.0 + (i % 3) as f64 * 0.01, 5_000, 40_000, 45_000)
            } else if i % 4 == 0 {
                PointRecord::new(x, y, 25.0 + (i % 7) as f64, 12_000, 30_000, 9_000)
            } else {
                PointRecord::new(x, y, 3.0 + (i % 5) as f64 * 0.1, 30_000, 30_000, 30_000)
            }
        })
        .collect()
}
