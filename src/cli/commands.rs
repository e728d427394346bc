//! Command implementations for the knn-truth CLI.

use std::path::Path;

use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::filter::FilterPredicate;
use crate::generator::GroundTruthGenerator;
use crate::identity::DatasetSchema;
use crate::tools;

/// Substring identifying training shards inside a dataset directory.
const TRAIN_FILE_MARKER: &str = "train";

/// Execute a CLI command.
pub fn execute_command(args: KnnTruthArgs) -> Result<()> {
    match &args.command {
        Command::GenNeighbor(gen_args) => gen_neighbor(gen_args.clone(), &args),
        Command::Distribution(dist_args) => distribution(dist_args.clone(), &args),
        Command::AddField(add_args) => add_field(add_args.clone(), &args),
        Command::SplitDataset(split_args) => split_dataset(split_args.clone(), &args),
    }
}

/// The dataset path decides the id convention; every command rejects an unknown one.
fn detect_schema(dataset_dir: &Path) -> Result<DatasetSchema> {
    DatasetSchema::detect(&dataset_dir.to_string_lossy())
}

/// Build the generator configuration from command line arguments.
pub fn build_generator_config(args: &GenNeighborArgs) -> Result<GeneratorConfig> {
    let schema = detect_schema(&args.dataset_dir)?;

    let mut config = GeneratorConfig::new(schema, args.dimension)
        .with_neighbor_count(args.neighbor_num)
        .with_queue_capacity(args.queue_capacity)
        .with_train_file_marker(TRAIN_FILE_MARKER)
        .with_filter(FilterPredicate::parse(&args.filter_field)?);

    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if args.enable_filter_vector_id {
        config = config.with_filter_ids(
            args.filter_vector_id_ratio,
            args.filter_vector_id_is_negation,
        );
    }
    if let Some(seed) = args.seed {
        config = config.with_filter_id_seed(seed);
    }

    config.validate()?;
    Ok(config)
}

/// Compute the ground truth of a query file.
fn gen_neighbor(args: GenNeighborArgs, cli_args: &KnnTruthArgs) -> Result<()> {
    let config = build_generator_config(&args)?;
    info!(
        "dataset: {} dimension: {} k: {} concurrency: {}",
        config.dataset, config.dimension, config.neighbor_count, config.concurrency
    );

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| GroundTruthGenerator::default_output_path(&args.test_dataset));

    let generator = GroundTruthGenerator::new(config)?;
    let stats = generator.generate_to_file(&args.test_dataset, &args.dataset_dir, &output_path)?;

    output_result(
        "Ground truth generated successfully",
        &GenNeighborResult {
            output_path: output_path.to_string_lossy().to_string(),
            stats,
        },
        cli_args,
    )
}

/// Write the value distribution of a field.
fn distribution(args: DistributionArgs, cli_args: &KnnTruthArgs) -> Result<()> {
    let schema = detect_schema(&args.dataset_dir)?;
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| args.dataset_dir.join("distribution.json"));

    let distinct_values = tools::write_field_distribution(
        schema,
        &args.dataset_dir,
        TRAIN_FILE_MARKER,
        &args.field,
        &output_path,
    )?;

    output_result(
        "Distribution written successfully",
        &DistributionResult {
            output_path: output_path.to_string_lossy().to_string(),
            field: args.field,
            distinct_values,
        },
        cli_args,
    )
}

/// Add the synthetic filter field to every training shard.
fn add_field(args: AddFieldArgs, cli_args: &KnnTruthArgs) -> Result<()> {
    detect_schema(&args.dataset_dir)?;

    let concurrency = args.concurrency.unwrap_or_else(num_cpus::get);
    let files_rewritten =
        tools::add_filter_field(&args.dataset_dir, TRAIN_FILE_MARKER, concurrency)?;

    output_result(
        "Synthetic field added successfully",
        &AddFieldResult {
            dataset_dir: args.dataset_dir.to_string_lossy().to_string(),
            files_rewritten,
        },
        cli_args,
    )
}

/// Split a dataset file in two.
fn split_dataset(args: SplitDatasetArgs, cli_args: &KnnTruthArgs) -> Result<()> {
    detect_schema(&args.file)?;

    let (left_count, right_count) = tools::split_dataset(&args.file, args.split_num)?;
    let file = args.file.to_string_lossy();

    output_result(
        "Dataset split successfully",
        &SplitDatasetResult {
            left_path: format!("{file}.left"),
            left_count,
            right_path: format!("{file}.right"),
            right_count,
        },
        cli_args,
    )
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::error::KnnTruthError;

    fn parse_gen_args(extra: &[&str]) -> GenNeighborArgs {
        let mut argv = vec!["knn-truth", "gen-neighbor"];
        argv.extend_from_slice(extra);
        match KnnTruthArgs::try_parse_from(argv).unwrap().command {
            Command::GenNeighbor(args) => args,
            _ => panic!("Expected GenNeighbor command"),
        }
    }

    #[test]
    fn test_build_generator_config() {
        let args = parse_gen_args(&[
            "/data/beir-bioasq",
            "-t",
            "/data/test.json",
            "-d",
            "4",
            "-c",
            "2",
            "--filter-field",
            "year:int:2019:gte",
            "--enable-filter-vector-id",
            "--filter-vector-id-ratio",
            "0.5",
            "--filter-vector-id-is-negation",
        ]);

        let config = build_generator_config(&args).unwrap();
        assert_eq!(config.dataset, DatasetSchema::BeirBioasq);
        assert_eq!(config.dimension, 4);
        assert_eq!(config.concurrency, 2);
        assert_eq!(
            config.filter.as_ref().map(|f| f.description()),
            Some("year:int:2019:gte")
        );
        assert!(config.filter_ids.enabled);
        assert_eq!(config.filter_ids.ratio, 0.5);
        assert!(config.filter_ids.negation);
    }

    #[test]
    fn test_unknown_dataset_is_rejected() {
        let args = parse_gen_args(&["/data/laion", "-t", "/data/test.json", "-d", "4"]);
        assert!(matches!(
            build_generator_config(&args),
            Err(KnnTruthError::UnknownDataset(_))
        ));
    }

    #[test]
    fn test_bad_filter_is_rejected() {
        let args = parse_gen_args(&[
            "/data/wikipedia",
            "-t",
            "/data/test.json",
            "-d",
            "4",
            "--filter-field",
            "year:int",
        ]);
        assert!(matches!(
            build_generator_config(&args),
            Err(KnnTruthError::Filter(_))
        ));
    }

    #[test]
    fn test_tools_reject_unknown_dataset() {
        for argv in [
            vec!["knn-truth", "add-field", "/data/laion"],
            vec!["knn-truth", "split-dataset", "/data/laion/base.json"],
            vec!["knn-truth", "distribution", "/data/laion", "--field", "lang"],
        ] {
            let args = KnnTruthArgs::try_parse_from(argv).unwrap();
            assert!(matches!(
                execute_command(args),
                Err(KnnTruthError::UnknownDataset(_))
            ));
        }
    }
}
