//! Job controller: sequences files and chunks, trains once, reports progress
//! and honours cooperative stop requests at chunk boundaries.
use crate::bootstrap::BootstrapRules;
use crate::chunk::{ChunkRange, plan};
use crate::config::{ClassifierConfig, ConfigError};
use crate::error::{ClassifyError, JobError};
use crate::model::{ModelTrainer, TrainedModel};
use crate::source::{LasPointSource, PointSource, PointTable};
use crate::stats::ClassCounts;
use crate::writer::{Artifact, ClassifiedChunk, PartitionWriter};
use serde::Serialize;
use std::collections::HashSet;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Touchpoints towards the surrounding application. Called on the run's
/// thread between chunks, never mid-chunk.
pub trait JobObserver {
    /// Percentage of planned chunks processed, 0 to 100.
    fn on_progress(&mut self, percent: f64);
    fn on_status(&mut self, message: &str);
}

/// Observer forwarding everything to the log.
#[derive(Debug, Default)]
pub struct LogObserver;

impl JobObserver for LogObserver {
    fn on_progress(&mut self, percent: f64) {
        log::debug!("Progress {percent:.2}%");
    }

    fn on_status(&mut self, message: &str) {
        log::info!("{message}");
    }
}

/// Shared cooperative stop flag; checked before each chunk starts.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Whether the run's model has been fitted yet.
#[derive(Debug)]
pub enum Stage {
    Untrained,
    Trained(TrainedModel),
}

#[derive(Debug)]
pub enum JobState {
    Idle,
    Running(Stage),
    Completed,
    Stopped,
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Stopped | JobState::Failed(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Completed,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub name: String,
    /// Prefix of this file's artifact names, unique within the run.
    pub output_stem: String,
    pub total_points: u64,
    pub chunks: usize,
}

/// Seed chunk the model was fitted on and its bootstrap label distribution.
#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub file: String,
    pub points: u64,
    pub threshold_z: f64,
    pub distribution: ClassCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub chunks_processed: usize,
    pub chunks_total: usize,
    pub progress_percent: f64,
    pub files: Vec<FileSummary>,
    pub seed: Option<SeedSummary>,
    pub class_totals: ClassCounts,
    pub artifacts: Vec<Artifact>,
}

/// Monotonic chunk counter for one run.
#[derive(Debug, Clone, Copy)]
struct Progress {
    processed: usize,
    total: usize,
}

impl Progress {
    fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        }
    }
}

/// State of a single run; created by `JobController::run` and dropped with it.
struct ClassificationJob<'a> {
    state: JobState,
    progress: Progress,
    bootstrap: &'a BootstrapRules,
    trainer: ModelTrainer,
    seed: Option<SeedSummary>,
    class_totals: ClassCounts,
    artifacts: Vec<Artifact>,
    files: Vec<FileSummary>,
}

impl<'a> ClassificationJob<'a> {
    fn new(config: &'a ClassifierConfig, files: Vec<FileSummary>) -> Self {
        let total = files.iter().map(|f| f.chunks).sum();
        Self {
            state: JobState::Idle,
            progress: Progress {
                processed: 0,
                total,
            },
            bootstrap: &config.bootstrap,
            trainer: ModelTrainer::new(config.forest.clone()),
            seed: None,
            class_totals: ClassCounts::default(),
            artifacts: Vec::new(),
            files,
        }
    }

    /// Read, classify and write one chunk. The first chunk of the run is the
    /// seed: it is bootstrap-labelled and the model is fitted on it before it
    /// is classified like every other chunk.
    fn process_chunk(
        &mut self,
        source: &mut dyn PointSource,
        range: &ChunkRange,
        writer: &PartitionWriter,
        observer: &mut dyn JobObserver,
    ) -> Result<(), ClassifyError> {
        let points = source.read_range(range.start, range.end)?;
        log::debug!(
            "Read {} points for {} chunk {}",
            range.point_count(),
            source.name(),
            range.index
        );

        let labels = match &self.state {
            JobState::Running(Stage::Trained(model)) => model.predict(&points),
            JobState::Running(Stage::Untrained) => {
                let model = self.fit_seed(source.name(), &points, observer)?;
                let labels = model.predict(&points);
                self.state = JobState::Running(Stage::Trained(model));
                labels
            }
            _ => return Err(ClassifyError::NotRunning),
        };

        let chunk = ClassifiedChunk::new(points, labels);
        let artifacts = writer.write(range.index, &chunk)?;

        self.class_totals.merge(&chunk.class_counts());
        self.artifacts.extend(artifacts);
        self.progress.processed += 1;
        Ok(())
    }

    fn fit_seed(
        &mut self,
        file: &str,
        points: &PointTable,
        observer: &mut dyn JobObserver,
    ) -> Result<TrainedModel, ClassifyError> {
        observer.on_status(&format!(
            "Training model on the first chunk of {file} ({} points)...",
            points.len()
        ));

        let seed = self.bootstrap.label_seed(points)?;
        let model = self.trainer.fit(points, &seed.labels)?;

        self.seed = Some(SeedSummary {
            file: file.to_string(),
            points: points.len() as u64,
            threshold_z: seed.threshold_z,
            distribution: seed.distribution,
        });
        observer.on_status("Model trained successfully.");
        Ok(model)
    }

    fn summary(&self) -> RunSummary {
        let outcome = match self.state {
            JobState::Completed => RunOutcome::Completed,
            JobState::Stopped => RunOutcome::Stopped,
            _ => RunOutcome::Failed,
        };
        RunSummary {
            outcome,
            chunks_processed: self.progress.processed,
            chunks_total: self.progress.total,
            progress_percent: self.progress.percent(),
            files: self.files.clone(),
            seed: self.seed.clone(),
            class_totals: self.class_totals,
            artifacts: self.artifacts.clone(),
        }
    }
}

/// Owns the loaded file queue and runs classification jobs over it.
pub struct JobController {
    config: ClassifierConfig,
    chunk_size: NonZeroU64,
    sources: Vec<Box<dyn PointSource>>,
    stop: StopHandle,
}

impl JobController {
    pub fn new(config: ClassifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let chunk_size = config.chunk_size()?;
        Ok(Self {
            config,
            chunk_size,
            sources: Vec::new(),
            stop: StopHandle::default(),
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Open each file; unreadable files are reported and left out of the queue.
    /// Returns how many files were added.
    pub fn load_files(&mut self, paths: &[PathBuf], observer: &mut dyn JobObserver) -> usize {
        let mut loaded = 0;
        for path in paths {
            match LasPointSource::open(path) {
                Ok(source) => {
                    self.sources.push(Box::new(source));
                    loaded += 1;
                }
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    observer.on_status(&format!("Could not load {}: {}", display_name(path), e));
                }
            }
        }
        observer.on_status(&format!("{} point cloud file(s) loaded.", self.sources.len()));
        loaded
    }

    pub fn add_source(&mut self, source: Box<dyn PointSource>) {
        self.sources.push(source);
    }

    /// Drop a loaded file from the queue by name.
    pub fn remove_file(&mut self, name: &str) -> bool {
        let before = self.sources.len();
        self.sources.retain(|s| s.name() != name);
        self.sources.len() != before
    }

    pub fn loaded_files(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn is_loaded(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run one classification job over every loaded file, in load order.
    ///
    /// The model is fitted once, on the first chunk of the first non-empty
    /// file, and reused for every chunk. Artifacts written before a stop or a
    /// failure are left in place.
    pub fn run(&mut self, observer: &mut dyn JobObserver) -> Result<RunSummary, JobError> {
        if self.sources.is_empty() {
            observer.on_status("Load at least one point cloud file before classifying.");
            return Err(JobError::NothingLoaded);
        }
        self.stop.reset();

        let plans: Vec<Vec<ChunkRange>> = self
            .sources
            .iter()
            .map(|s| plan(s.total_points(), self.chunk_size))
            .collect();
        let stems = output_stems(self.sources.iter().map(|s| s.name()));
        let files: Vec<FileSummary> = self
            .sources
            .iter()
            .zip(&plans)
            .zip(&stems)
            .map(|((s, p), stem)| FileSummary {
                name: s.name().to_string(),
                output_stem: stem.clone(),
                total_points: s.total_points(),
                chunks: p.len(),
            })
            .collect();

        let mut job = ClassificationJob::new(&self.config, files);
        job.state = JobState::Running(Stage::Untrained);
        log::info!(
            "Starting classification of {} file(s), {} chunks of up to {} points",
            self.sources.len(),
            job.progress.total,
            self.chunk_size
        );

        let queue = self.sources.iter_mut().zip(&plans).zip(&stems);
        'files: for ((source, ranges), stem) in queue {
            let name = source.name().to_string();
            if ranges.is_empty() {
                observer.on_status(&format!("{name} has no points; skipping."));
                continue;
            }
            observer.on_status(&format!(
                "Classifying {name} in {} chunk(s)...",
                ranges.len()
            ));

            let writer = PartitionWriter::new(
                &self.config.output_dir,
                stem,
                self.config.output.clone(),
            )
            .with_transforms(source.transforms());

            for range in ranges {
                if self.stop.is_stop_requested() {
                    job.state = JobState::Stopped;
                    observer.on_status("Classification stopped by user.");
                    log::info!(
                        "Stopped before {name} chunk {} ({}/{} chunks done)",
                        range.index,
                        job.progress.processed,
                        job.progress.total
                    );
                    break 'files;
                }

                if let Err(source_err) =
                    job.process_chunk(source.as_mut(), range, &writer, observer)
                {
                    log::error!("{name} chunk {} failed: {source_err}", range.index);
                    observer.on_status(&format!("Error during classification: {source_err}"));
                    job.state = JobState::Failed(source_err.to_string());
                    return Err(JobError::Chunk {
                        file: name,
                        chunk_index: range.index,
                        source: source_err,
                        partial: Box::new(job.summary()),
                    });
                }

                let percent = job.progress.percent();
                observer.on_progress(percent);
                observer.on_status(&format!(
                    "Processing chunk {}/{} of {name} - {percent:.2}% complete.",
                    range.index + 1,
                    ranges.len()
                ));
            }
        }

        if !job.state.is_terminal() {
            job.state = JobState::Completed;
            if job.progress.total == 0 {
                observer.on_progress(100.0);
            }
            observer.on_status("Classification completed and saved.");
        }

        let summary = job.summary();
        log::info!(
            "Run {:?}: {}/{} chunks, {} artifacts ({})",
            summary.outcome,
            summary.chunks_processed,
            summary.chunks_total,
            summary.artifacts.len(),
            summary.class_totals
        );
        Ok(summary)
    }
}

/// Artifact name prefixes in load order. Files sharing a name, such as
/// `north/tile.las` and `south/tile.laz`, get `_2`, `_3`, ... appended so no
/// two files of a run write to the same paths.
fn output_stems<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let mut stem = name.to_string();
            let mut n = 1;
            while !taken.insert(stem.clone()) {
                n += 1;
                stem = format!("{name}_{n}");
            }
            stem
        })
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
