//! Point cloud classifier command line entry point
use clap::{Parser, Subcommand};
use point_cloud_classifier::manifest::RunManifest;
use point_cloud_classifier::measure::Measurement;
use point_cloud_classifier::progress::ProgressBarObserver;
use point_cloud_classifier::{ClassifierConfig, JobController, JobError};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "point-cloud-classifier", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify LAS/LAZ files into tree, building and pool layers.
    Classify(ClassifyArgs),
    /// Distance and elevation difference between two points.
    Measure {
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        from: Vec<f64>,
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        to: Vec<f64>,
    },
}

#[derive(clap::Args, Debug)]
struct ClassifyArgs {
    /// Input point cloud files, processed in the given order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Optional JSON config; flags below override its values.
    #[arg(long, env = "CLASSIFIER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Points per chunk.
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Random seed for forest training.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of trees in the forest.
    #[arg(long)]
    trees: Option<usize>,

    #[arg(long)]
    max_depth: Option<usize>,

    /// Cap on rows drawn per tree from the seed chunk.
    #[arg(long)]
    max_samples: Option<usize>,
}

impl ClassifyArgs {
    fn resolve_config(&self) -> Result<ClassifierConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => ClassifierConfig::from_file(path)?,
            None => ClassifierConfig::default(),
        };

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(seed) = self.seed {
            config.forest.seed = seed;
        }
        if let Some(trees) = self.trees {
            config.forest.n_trees = trees;
        }
        if let Some(max_depth) = self.max_depth {
            config.forest.max_depth = max_depth;
        }
        if self.max_samples.is_some() {
            config.forest.max_samples = self.max_samples;
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    match Cli::parse().command {
        Command::Classify(args) => classify(args),
        Command::Measure { from, to } => {
            let to_point = |v: Vec<f64>| -> Result<[f64; 3], Box<dyn std::error::Error>> {
                v.try_into()
                    .map_err(|v: Vec<f64>| format!("expected 3 coordinates, got {}", v.len()).into())
            };
            let m = Measurement::between(to_point(from)?, to_point(to)?);
            println!("Distance: {:.3}", m.distance);
            println!("Height difference: {:.3}", m.height_difference);
            Ok(())
        }
    }
}

fn classify(args: ClassifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.resolve_config()?;
    let mut controller = JobController::new(config)?;
    let mut observer = ProgressBarObserver::new();

    controller.load_files(&args.inputs, &mut observer);
    let result = controller.run(&mut observer);
    observer.finish();

    let output_dir = controller.config().output_dir.clone();
    match result {
        Ok(summary) => {
            RunManifest::new(controller.config(), &summary).write(&output_dir)?;
            println!(
                "{:?}: {}/{} chunks, {} artifacts in {}",
                summary.outcome,
                summary.chunks_processed,
                summary.chunks_total,
                summary.artifacts.len(),
                output_dir.display()
            );
            Ok(())
        }
        Err(err) => {
            if let Some(partial) = err.partial_summary() {
                RunManifest::new(controller.config(), partial).write(&output_dir)?;
            }
            if let JobError::Chunk { file, chunk_index, .. } = &err {
                eprintln!("Classification failed on {file} chunk {chunk_index}; earlier artifacts kept.");
            }
            Err(err.into())
        }
    }
}
