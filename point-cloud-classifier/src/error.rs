//! Errors raised while classifying chunks and running jobs.
use crate::bootstrap::EmptySeedError;
use crate::job::RunSummary;
use crate::model::TrainingError;
use crate::source::SourceError;
use crate::writer::WriteError;
use thiserror::Error;

/// Failure while processing a single chunk; fatal to the run.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    EmptySeed(#[from] EmptySeedError),
    #[error("training failed: {0}")]
    Training(#[from] TrainingError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("job is not running")]
    NotRunning,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("no point cloud files loaded; load at least one file before classifying")]
    NothingLoaded,
    #[error("classification failed on {file} chunk {chunk_index}: {source}")]
    Chunk {
        file: String,
        chunk_index: usize,
        #[source]
        source: ClassifyError,
        /// What the run produced before failing; its artifacts stay on disk.
        partial: Box<RunSummary>,
    },
}

impl JobError {
    pub fn partial_summary(&self) -> Option<&RunSummary> {
        match self {
            JobError::Chunk { partial, .. } => Some(partial),
            JobError::NothingLoaded => None,
        }
    }
}
