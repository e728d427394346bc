//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{KnnTruthArgs, OutputFormat};
use crate::error::Result;
use crate::generator::GenerationStats;

/// Result structure for ground-truth generation.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenNeighborResult {
    pub output_path: String,
    #[serde(flatten)]
    pub stats: GenerationStats,
}

/// Result structure for the field distribution.
#[derive(Debug, Serialize, Deserialize)]
pub struct DistributionResult {
    pub output_path: String,
    pub field: String,
    pub distinct_values: usize,
}

/// Result structure for the synthetic field rewrite.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddFieldResult {
    pub dataset_dir: String,
    pub files_rewritten: usize,
}

/// Result structure for dataset splitting.
#[derive(Debug, Serialize, Deserialize)]
pub struct SplitDatasetResult {
    pub left_path: String,
    pub left_count: usize,
    pub right_path: String,
    pub right_count: usize,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &KnnTruthArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &KnnTruthArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    for line in human_lines(&value) {
        println!("{line}");
    }
    Ok(())
}

/// Render a result as `key: value` lines.
fn human_lines(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Object(obj) => obj
            .iter()
            .map(|(key, val)| format!("{}: {}", humanize_key(key), format_value(val)))
            .collect(),
        _ => vec![format_value(value)],
    }
}

/// Turn `snake_case` keys into `Snake case` labels.
fn humanize_key(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &KnnTruthArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "null".to_string(),
    }
}
