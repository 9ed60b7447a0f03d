//! Axis-aligned coordinate bounds of a set of points.
use crate::source::PointRecord;
use serde::{Deserialize, Serialize};

/// Per-axis `[x, y, z]` extremes; empty until the first point is added.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointCloudBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for PointCloudBounds {
    fn default() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }
}

impl PointCloudBounds {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a PointRecord>) -> Self {
        points.into_iter().fold(Self::default(), |mut bounds, p| {
            bounds.include([p.x, p.y, p.z]);
            bounds
        })
    }

    pub fn include(&mut self, position: [f64; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(position[axis]);
            self.max[axis] = self.max[axis].max(position[axis]);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_extremes() {
        let points = [
            PointRecord::new(1.0, 5.0, -2.0, 0, 0, 0),
            PointRecord::new(-3.0, 2.0, 4.0, 0, 0, 0),
        ];
        let bounds = PointCloudBounds::from_points(&points);
        assert_eq!(bounds.min, [-3.0, 2.0, -2.0]);
        assert_eq!(bounds.max, [1.0, 5.0, 4.0]);
        assert!(!bounds.is_empty());
    }

    #[test]
    fn no_points_is_empty() {
        let bounds = PointCloudBounds::from_points(&Vec::<PointRecord>::new());
        assert!(bounds.is_empty());
        assert_eq!(bounds, PointCloudBounds::default());
    }
}
