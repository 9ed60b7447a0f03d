//! Point source boundary: ordered, range-addressable access to position and colour.
use constants::classification::FEATURE_COUNT;
use las::{Reader, Transform, Vector};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: las::Error,
    },
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read points {start}..{end} from {name}: {source}")]
    Read {
        name: String,
        start: u64,
        end: u64,
        #[source]
        source: las::Error,
    },
    #[error("range {start}..{end} is outside {name} ({total} points)")]
    RangeOutOfBounds {
        name: String,
        start: u64,
        end: u64,
        total: u64,
    },
}

/// One sample: position plus 16-bit colour channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl PointRecord {
    pub fn new(x: f64, y: f64, z: f64, red: u16, green: u16, blue: u16) -> Self {
        Self {
            x,
            y,
            z,
            red,
            green,
            blue,
        }
    }

    /// Feature vector in X, Y, Z, R, G, B order.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.x,
            self.y,
            self.z,
            f64::from(self.red),
            f64::from(self.green),
            f64::from(self.blue),
        ]
    }

    fn from_las(point: &las::Point) -> Self {
        let (red, green, blue) = point
            .color
            .map(|c| (c.red, c.green, c.blue))
            .unwrap_or((0, 0, 0));
        Self::new(point.x, point.y, point.z, red, green, blue)
    }
}

/// Ordered rows of one contiguous range of a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointTable {
    rows: Vec<PointRecord>,
}

impl PointTable {
    pub fn new(rows: Vec<PointRecord>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[PointRecord] {
        &self.rows
    }

    pub fn features(&self, row: usize) -> [f64; FEATURE_COUNT] {
        self.rows[row].features()
    }

    pub fn z_values(&self) -> Vec<f64> {
        self.rows.iter().map(|p| p.z).collect()
    }

    pub fn into_rows(self) -> Vec<PointRecord> {
        self.rows
    }
}

impl FromIterator<PointRecord> for PointTable {
    fn from_iter<I: IntoIterator<Item = PointRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Random-access reader over the points of one file.
pub trait PointSource {
    /// Display name, also used as the artifact file stem.
    fn name(&self) -> &str;

    fn total_points(&self) -> u64;

    /// Reads `[start, end)` in index order.
    fn read_range(&mut self, start: u64, end: u64) -> Result<PointTable, SourceError>;

    /// Coordinate scale/offset of the underlying file, if it has one.
    fn transforms(&self) -> Option<Vector<Transform>> {
        None
    }
}

fn check_range(name: &str, start: u64, end: u64, total: u64) -> Result<(), SourceError> {
    if start > end || end > total {
        return Err(SourceError::RangeOutOfBounds {
            name: name.to_string(),
            start,
            end,
            total,
        });
    }
    Ok(())
}

/// LAS/LAZ backed point source.
pub struct LasPointSource {
    name: String,
    reader: Reader,
    total_points: u64,
    transforms: Vector<Transform>,
}

impl LasPointSource {
    /// Create LAS file reader for point cloud access.
    /// Handles both .las and .laz compressed formats.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = Reader::new(BufReader::new(file)).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let header = reader.header();
        let total_points = header.number_of_points();
        let transforms = header.transforms().clone();
        let name = path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        log::debug!(
            "Opened {} (LAS {}.{}, format {:?}, {} points)",
            path.display(),
            header.version().major,
            header.version().minor,
            header.point_format().to_u8(),
            total_points
        );

        Ok(Self {
            name,
            reader,
            total_points,
            transforms,
        })
    }

}

impl PointSource for LasPointSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn total_points(&self) -> u64 {
        self.total_points
    }

    fn read_range(&mut self, start: u64, end: u64) -> Result<PointTable, SourceError> {
        check_range(&self.name, start, end, self.total_points)?;
        let read_error = |source| SourceError::Read {
            name: self.name.clone(),
            start,
            end,
            source,
        };

        self.reader.seek(start).map_err(read_error)?;

        let mut rows = Vec::with_capacity((end - start) as usize);
        for point_result in self.reader.points().take((end - start) as usize) {
            let point = point_result.map_err(read_error)?;
            rows.push(PointRecord::from_las(&point));
        }
        Ok(PointTable::new(rows))
    }

    fn transforms(&self) -> Option<Vector<Transform>> {
        Some(self.transforms.clone())
    }
}

/// Point source over rows already held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    rows: Vec<PointRecord>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, rows: Vec<PointRecord>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

impl PointSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn total_points(&self) -> u64 {
        self.rows.len() as u64
    }

    fn read_range(&mut self, start: u64, end: u64) -> Result<PointTable, SourceError> {
        check_range(&self.name, start, end, self.total_points())?;
        Ok(PointTable::new(
            self.rows[start as usize..end as usize].to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<PointRecord> {
        (0..n)
            .map(|i| PointRecord::new(i as f64, 0.0, 0.0, i as u16, 0, 0))
            .collect()
    }

    #[test]
    fn memory_source_reads_requested_range_in_order() {
        let mut source = MemorySource::new("mem", rows(10));
        let table = source.read_range(3, 7).unwrap();
        let xs: Vec<f64> = table.rows().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn out_of_bounds_range_is_rejected() {
        let mut source = MemorySource::new("mem", rows(4));
        let err = source.read_range(2, 5).unwrap_err();
        assert!(matches!(err, SourceError::RangeOutOfBounds { total: 4, .. }));
    }

    #[test]
    fn features_follow_xyzrgb_order() {
        let p = PointRecord::new(1.5, 2.5, 3.5, 10, 20, 30);
        assert_eq!(p.features(), [1.5, 2.5, 3.5, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn missing_file_reports_open_error() {
        let err = LasPointSource::open(Path::new("/nonexistent/cloud.las")).err();
        assert!(matches!(err, Some(SourceError::Io { .. })));
    }
}
