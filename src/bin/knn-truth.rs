//! knn-truth CLI binary.

use std::io::Write;
use std::process;

use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use knn_truth::cli::args::*;
use knn_truth::cli::commands::*;

fn main() {
    // Parse command line arguments using clap
    let args = KnnTruthArgs::parse();

    let log_level = match args.verbosity() {
        0 => LevelFilter::Error, // Quiet mode
        1 => LevelFilter::Info,  // Default, progress per shard
        2 => LevelFilter::Debug, // Verbose
        _ => LevelFilter::Trace, // Very verbose (3+)
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    // Execute the command
    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
