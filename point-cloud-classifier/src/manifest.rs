//! Run manifest written next to the classified artifacts.
use crate::config::ClassifierConfig;
use crate::job::RunSummary;
use constants::classification::MANIFEST_FILE_NAME;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a downstream consumer needs to find and interpret the artifacts
/// of one run, including partial runs that were stopped or failed.
#[derive(Serialize)]
pub struct RunManifest<'a> {
    pub generator: &'static str,
    pub version: &'static str,
    pub config: &'a ClassifierConfig,
    pub summary: &'a RunSummary,
}

impl<'a> RunManifest<'a> {
    pub fn new(config: &'a ClassifierConfig, summary: &'a RunSummary) -> Self {
        Self {
            generator: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            config,
            summary,
        }
    }

    /// Write the manifest as pretty JSON into `output_dir`.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
        fs::create_dir_all(output_dir)?;
        let manifest_path = output_dir.join(MANIFEST_FILE_NAME);
        let manifest_json = serde_json::to_string_pretty(self)?;
        fs::write(&manifest_path, manifest_json)?;

        log::info!("Generated run manifest: {}", manifest_path.display());
        self.print_summary();
        Ok(manifest_path)
    }

    fn print_summary(&self) {
        let summary = self.summary;
        log::info!("Manifest Summary:");
        log::info!(
            "  Chunks: {}/{} ({:?})",
            summary.chunks_processed,
            summary.chunks_total,
            summary.outcome
        );
        log::info!("  Artifacts: {}", summary.artifacts.len());
        log::info!("  Points per class: {}", summary.class_totals);
    }
}
