//! Two-point measurement: straight-line distance and elevation difference.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub start: [f64; 3],
    pub end: [f64; 3],
    pub distance: f64,
    pub height_difference: f64,
}

impl Measurement {
    pub fn between(start: [f64; 3], end: [f64; 3]) -> Self {
        let [dx, dy, dz] = [end[0] - start[0], end[1] - start[1], end[2] - start[2]];
        Self {
            start,
            end,
            distance: (dx * dx + dy * dy + dz * dz).sqrt(),
            height_difference: dz.abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn distance_and_height_difference() {
        let m = Measurement::between([0.0, 0.0, 10.0], [3.0, 4.0, -2.0]);
        assert_abs_diff_eq!(m.distance, 13.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.height_difference, 12.0);
    }

    #[test]
    fn symmetric() {
        let a = [1.5, -2.0, 7.0];
        let b = [4.0, 8.0, 3.0];
        assert_eq!(
            Measurement::between(a, b).distance,
            Measurement::between(b, a).distance
        );
    }
}
