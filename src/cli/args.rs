//! Command line argument parsing for the knn-truth CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{DEFAULT_FILTER_ID_RATIO, DEFAULT_NEIGHBOR_COUNT, DEFAULT_QUEUE_CAPACITY};

/// knn-truth - exact nearest-neighbor ground truth for vector benchmarks
#[derive(Parser, Debug, Clone)]
#[command(name = "knn-truth")]
#[command(about = "Exact nearest-neighbor ground truth for vector search benchmarks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct KnnTruthArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format of the run summary
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl KnnTruthArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compute the exact nearest neighbors of every query
    #[command(name = "gen-neighbor")]
    GenNeighbor(GenNeighborArgs),

    /// Histogram of one field's values over the training shards
    Distribution(DistributionArgs),

    /// Add a random filter_id field to every training shard
    #[command(name = "add-field")]
    AddField(AddFieldArgs),

    /// Split one dataset file into .left and .right parts
    #[command(name = "split-dataset")]
    SplitDataset(SplitDatasetArgs),
}

/// Arguments for ground-truth generation
#[derive(Parser, Debug, Clone)]
pub struct GenNeighborArgs {
    /// Directory holding the training shards; its name selects the dataset schema
    #[arg(value_name = "DATASET_DIR")]
    pub dataset_dir: PathBuf,

    /// Query (test) dataset file
    #[arg(short = 't', long = "test-dataset", value_name = "FILE")]
    pub test_dataset: PathBuf,

    /// Embedding dimension
    #[arg(short = 'd', long)]
    pub dimension: usize,

    /// Number of nearest neighbors per query
    #[arg(short = 'k', long = "neighbor-num", default_value_t = DEFAULT_NEIGHBOR_COUNT)]
    pub neighbor_num: usize,

    /// Number of worker threads (default: number of CPUs)
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Filter predicate, format: field:type:value:op[,field:type:value:op]
    #[arg(long = "filter-field", default_value = "")]
    pub filter_field: String,

    /// Emit filter_vector_ids for every query
    #[arg(long)]
    pub enable_filter_vector_id: bool,

    /// Sampling ratio of the filter vector ids
    #[arg(long, default_value_t = DEFAULT_FILTER_ID_RATIO)]
    pub filter_vector_id_ratio: f64,

    /// Leave the true neighbors out of filter_vector_ids
    #[arg(long)]
    pub filter_vector_id_is_negation: bool,

    /// Seed of the filter id sampler
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum number of training records waiting for a worker
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Output file (default: <test-dataset>.neighbor)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for the field distribution
#[derive(Parser, Debug, Clone)]
pub struct DistributionArgs {
    /// Directory holding the training shards; its name selects the dataset schema
    #[arg(value_name = "DATASET_DIR")]
    pub dataset_dir: PathBuf,

    /// Field to count values of
    #[arg(long)]
    pub field: String,

    /// Output file (default: <dataset-dir>/distribution.json)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for adding the synthetic field
#[derive(Parser, Debug, Clone)]
pub struct AddFieldArgs {
    /// Directory holding the training shards
    #[arg(value_name = "DATASET_DIR")]
    pub dataset_dir: PathBuf,

    /// Number of shards processed at once (default: number of CPUs)
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,
}

/// Arguments for splitting a dataset file
#[derive(Parser, Debug, Clone)]
pub struct SplitDatasetArgs {
    /// Dataset file to split
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Number of records written to the .left part
    #[arg(long, default_value = "1000")]
    pub split_num: usize,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
