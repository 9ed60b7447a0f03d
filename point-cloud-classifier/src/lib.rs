//! Chunked, bootstrap-trained semantic classification of coloured point clouds.
//!
//! A run streams each input file in fixed-size chunks. The first chunk of the
//! run is labelled by colour and elevation heuristics, a random forest is fitted
//! on it once, and every chunk (the seed included) is then classified by that
//! model and written out as one LAS file per (chunk, class) pair.

pub mod bootstrap;
pub mod bounds;
pub mod chunk;
pub mod config;
pub mod error;
pub mod forest;
pub mod job;
pub mod manifest;
pub mod measure;
pub mod model;
pub mod progress;
pub mod source;
pub mod stats;
pub mod testing;
pub mod writer;

pub use config::ClassifierConfig;
pub use error::{ClassifyError, JobError};
pub use job::{JobController, JobObserver, RunOutcome, RunSummary, StopHandle};
pub use source::{LasPointSource, MemorySource, PointRecord, PointSource, PointTable};
