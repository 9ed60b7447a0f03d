//! Partitioned output: one LAS artifact per non-empty (chunk, class) pair.
use crate::bounds::PointCloudBounds;
use crate::config::ConfigError;
use crate::source::{PointRecord, PointTable};
use crate::stats::ClassCounts;
use constants::class::ClassLabel;
use constants::classification::{OUTPUT_LAS_VERSION, OUTPUT_POINT_FORMAT};
use las::point::Format;
use las::{Builder, Color, Point, Transform, Vector, Writer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Coordinate resolution used when the source carries no transforms (millimetres).
const FALLBACK_SCALE: f64 = 0.001;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("chunk {chunk_index} has {points} points but {labels} labels")]
    LabelMismatch {
        chunk_index: usize,
        points: usize,
        labels: usize,
    },
    #[error("failed to write chunk {chunk_index} class {class} to {}: {source}", path.display())]
    Artifact {
        chunk_index: usize,
        class: ClassLabel,
        path: PathBuf,
        #[source]
        source: las::Error,
    },
    #[error("failed to move finished artifact into place at {}: {source}", path.display())]
    Commit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// LAS version and point format of written artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFormat {
    pub version_major: u8,
    pub version_minor: u8,
    pub point_format: u8,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            version_major: OUTPUT_LAS_VERSION.0,
            version_minor: OUTPUT_LAS_VERSION.1,
            point_format: OUTPUT_POINT_FORMAT,
        }
    }
}

impl OutputFormat {
    /// The format must carry RGB so colour survives the round trip.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version_major != 1 || self.version_minor > 4 {
            return Err(ConfigError::Invalid(format!(
                "unsupported LAS version {}.{}",
                self.version_major, self.version_minor
            )));
        }
        let format = Format::new(self.point_format)
            .map_err(|e| ConfigError::Invalid(format!("point format: {e}")))?;
        if !format.has_color {
            return Err(ConfigError::Invalid(format!(
                "point format {} has no RGB channels",
                self.point_format
            )));
        }
        if format.is_extended && self.version_minor < 4 {
            return Err(ConfigError::Invalid(format!(
                "point format {} requires LAS 1.4",
                self.point_format
            )));
        }
        Ok(())
    }
}

/// A chunk's points paired with one predicted label per row.
#[derive(Debug, Clone)]
pub struct ClassifiedChunk {
    points: PointTable,
    labels: Vec<ClassLabel>,
}

impl ClassifiedChunk {
    pub fn new(points: PointTable, labels: Vec<ClassLabel>) -> Self {
        Self { points, labels }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn class_counts(&self) -> ClassCounts {
        ClassCounts::from_labels(&self.labels)
    }

    /// Points carrying `class`, in chunk order.
    pub fn partition(&self, class: ClassLabel) -> Vec<PointRecord> {
        self.points
            .rows()
            .iter()
            .zip(&self.labels)
            .filter(|(_, l)| **l == class)
            .map(|(p, _)| *p)
            .collect()
    }
}

/// One written file.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub chunk_index: usize,
    pub class: ClassLabel,
    pub point_count: u64,
    pub bounds: PointCloudBounds,
}

pub struct PartitionWriter {
    output_dir: PathBuf,
    file_stem: String,
    format: OutputFormat,
    transforms: Option<Vector<Transform>>,
}

impl PartitionWriter {
    pub fn new(output_dir: &Path, file_stem: &str, format: OutputFormat) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            file_stem: file_stem.to_string(),
            format,
            transforms: None,
        }
    }

    /// Reuse the source file's scale and offset so coordinates round-trip exactly.
    pub fn with_transforms(mut self, transforms: Option<Vector<Transform>>) -> Self {
        self.transforms = transforms;
        self
    }

    /// `<output_dir>/<file_stem>_chunk_<index>_<class>.las`
    pub fn artifact_path(&self, chunk_index: usize, class: ClassLabel) -> PathBuf {
        self.output_dir.join(format!(
            "{}_chunk_{}_{}.las",
            self.file_stem,
            chunk_index,
            class.artifact_name()
        ))
    }

    /// Write one artifact per class present in `chunk`; empty classes are skipped.
    pub fn write(
        &self,
        chunk_index: usize,
        chunk: &ClassifiedChunk,
    ) -> Result<Vec<Artifact>, WriteError> {
        if chunk.points.len() != chunk.labels.len() {
            return Err(WriteError::LabelMismatch {
                chunk_index,
                points: chunk.points.len(),
                labels: chunk.labels.len(),
            });
        }

        fs::create_dir_all(&self.output_dir).map_err(|source| WriteError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let mut artifacts = Vec::new();
        for class in chunk.class_counts().present() {
            let points = chunk.partition(class);
            let path = self.artifact_path(chunk_index, class);
            let staging = staging_path(&path);

            // Only complete files ever appear under the artifact name.
            if let Err(source) = self.write_las(&staging, &points) {
                if staging.exists() {
                    if let Err(e) = fs::remove_file(&staging) {
                        log::warn!("Could not remove {}: {e}", staging.display());
                    }
                }
                return Err(WriteError::Artifact {
                    chunk_index,
                    class,
                    path,
                    source,
                });
            }
            fs::rename(&staging, &path).map_err(|source| WriteError::Commit {
                path: path.clone(),
                source,
            })?;

            log::debug!("Saved {} ({} points)", path.display(), points.len());
            artifacts.push(Artifact {
                path,
                chunk_index,
                class,
                point_count: points.len() as u64,
                bounds: PointCloudBounds::from_points(&points),
            });
        }
        Ok(artifacts)
    }

    fn write_las(&self, path: &Path, points: &[PointRecord]) -> Result<(), las::Error> {
        let format = Format::new(self.format.point_format)?;
        let (has_color, has_gps_time) = (format.has_color, format.has_gps_time);
        let mut builder = Builder::from((self.format.version_major, self.format.version_minor));
        builder.point_format = format;
        builder.transforms = self
            .transforms
            .clone()
            .unwrap_or_else(|| fallback_transforms(points));

        let mut writer = Writer::from_path(path, builder.into_header()?)?;
        for p in points {
            writer.write_point(Point {
                x: p.x,
                y: p.y,
                z: p.z,
                color: has_color.then(|| Color::new(p.red, p.green, p.blue)),
                gps_time: has_gps_time.then_some(0.0),
                ..Default::default()
            })?;
        }
        writer.close()
    }
}

/// `<artifact>.las.tmp`, next to the artifact it becomes.
fn staging_path(path: &Path) -> PathBuf {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    PathBuf::from(staging)
}

/// Millimetre scale anchored at the partition's minimum corner, keeping the
/// stored integers small for projected coordinates.
fn fallback_transforms(points: &[PointRecord]) -> Vector<Transform> {
    let bounds = PointCloudBounds::from_points(points);
    let axis = |min: f64| Transform {
        scale: FALLBACK_SCALE,
        offset: if min.is_finite() { min.floor() } else { 0.0 },
    };
    Vector {
        x: axis(bounds.min[0]),
        y: axis(bounds.min[1]),
        z: axis(bounds.min[2]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{LasPointSource, PointSource};
    use crate::testing::assert_same_points;
    use tempfile::tempdir;

    fn chunk() -> ClassifiedChunk {
        let points: PointTable = [
            PointRecord::new(500_000.125, 6_100_000.5, 12.25, 1, 2, 3),
            PointRecord::new(500_001.0, 6_100_001.0, 30.0, 65_535, 0, 40_000),
            PointRecord::new(500_002.5, 6_100_002.5, 13.0, 100, 200, 300),
        ]
        .into_iter()
        .collect();
        ClassifiedChunk::new(
            points,
            vec![ClassLabel::Building, ClassLabel::Tree, ClassLabel::Building],
        )
    }

    #[test]
    fn default_format_is_valid() {
        OutputFormat::default().validate().unwrap();
        let no_colour = OutputFormat {
            point_format: 1,
            ..Default::default()
        };
        assert!(no_colour.validate().is_err());
    }

    #[test]
    fn artifact_names_embed_stem_chunk_and_class() {
        let writer = PartitionWriter::new(Path::new("out"), "valley", OutputFormat::default());
        assert_eq!(
            writer.artifact_path(3, ClassLabel::Pool),
            Path::new("out").join("valley_chunk_3_pools.las")
        );
    }

    #[test]
    fn writes_only_present_classes_losslessly() {
        let dir = tempdir().unwrap();
        let writer = PartitionWriter::new(dir.path(), "tile", OutputFormat::default());
        let chunk = chunk();

        let artifacts = writer.write(4, &chunk).unwrap();
        let classes: Vec<ClassLabel> = artifacts.iter().map(|a| a.class).collect();
        assert_eq!(classes, vec![ClassLabel::Tree, ClassLabel::Building]);
        assert!(!writer.artifact_path(4, ClassLabel::Pool).exists());

        let total: u64 = artifacts.iter().map(|a| a.point_count).sum();
        assert_eq!(total, chunk.len() as u64);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), artifacts.len());

        for artifact in &artifacts {
            let mut source = LasPointSource::open(&artifact.path).unwrap();
            let n = source.total_points();
            let read = source.read_range(0, n).unwrap();
            assert_same_points(read.rows(), &chunk.partition(artifact.class));
        }
    }

    #[test]
    fn mismatched_labels_are_rejected() {
        let dir = tempdir().unwrap();
        let writer = PartitionWriter::new(dir.path(), "tile", OutputFormat::default());
        let bad = ClassifiedChunk::new(chunk().points, vec![ClassLabel::Tree]);
        assert!(matches!(
            writer.write(0, &bad),
            Err(WriteError::LabelMismatch { chunk_index: 0, .. })
        ));
    }

    #[test]
    fn failed_write_leaves_no_partial_artifact() {
        let dir = tempdir().unwrap();
        let mm = || Transform {
            scale: 0.001,
            offset: 0.0,
        };
        let writer = PartitionWriter::new(dir.path(), "tile", OutputFormat::default())
            .with_transforms(Some(Vector {
                x: mm(),
                y: mm(),
                z: mm(),
            }));
        // The second point does not fit in a 32-bit record at millimetre scale.
        let points: PointTable = [
            PointRecord::new(1.0, 1.0, 1.0, 0, 0, 0),
            PointRecord::new(1.0e12, 1.0, 1.0, 0, 0, 0),
        ]
        .into_iter()
        .collect();
        let chunk = ClassifiedChunk::new(points, vec![ClassLabel::Tree; 2]);

        let err = writer.write(0, &chunk).unwrap_err();
        assert!(matches!(
            err,
            WriteError::Artifact {
                chunk_index: 0,
                class: ClassLabel::Tree,
                ..
            }
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn staging_file_sits_next_to_artifact() {
        assert_eq!(
            staging_path(Path::new("out/tile_chunk_0_trees.las")),
            Path::new("out/tile_chunk_0_trees.las.tmp")
        );
    }
}
