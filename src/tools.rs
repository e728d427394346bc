//! Auxiliary dataset transforms used when preparing filtered benchmarks.
//!
//! - [`field_distribution`]: histogram of a field's values over the training set
//! - [`add_filter_field`]: rewrite every training shard with a random `filter_id`
//! - [`split_dataset`]: split one file into `.left` and `.right` parts

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{error, info};
use rand::Rng;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dataset;
use crate::error::{KnnTruthError, Result};
use crate::identity::DatasetSchema;

/// Name of the synthetic field written by [`add_filter_field`].
pub const SYNTHETIC_FIELD: &str = "filter_id";

/// Inclusive range of the synthetic field values.
pub const SYNTHETIC_RANGE: (i64, i64) = (1, 100_000_000);

/// One distinct value of a field and the vectors carrying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub value: String,
    pub vector_ids: Vec<i64>,
    /// Share of the records carrying the field, in percent.
    pub rate: f32,
}

impl DistributionEntry {
    /// Render as `{<field>: value, "rate": .., "vector_ids": [..]}`.
    ///
    /// Values made only of digits are written as integers.
    pub fn to_json(&self, field: &str) -> Value {
        let mut object = Map::new();
        let value = if !self.value.is_empty() && self.value.bytes().all(|b| b.is_ascii_digit()) {
            self.value
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(self.value.clone()))
        } else {
            Value::from(self.value.clone())
        };
        object.insert(field.to_string(), value);
        object.insert("rate".to_string(), Value::from(self.rate));
        object.insert("vector_ids".to_string(), Value::from(self.vector_ids.clone()));
        Value::Object(object)
    }
}

/// Count how often each value of `field` occurs across the training shards.
///
/// Entries are ordered by descending frequency, then by value. Shards that
/// cannot be parsed are logged and skipped.
pub fn field_distribution(
    schema: DatasetSchema,
    train_dir: &Path,
    marker: &str,
    field: &str,
) -> Result<Vec<DistributionEntry>> {
    let shards = dataset::list_shards(train_dir, marker)?;

    let mut total_count: u64 = 0;
    let mut reverse_index: HashMap<String, Vec<i64>> = HashMap::new();
    for shard in &shards {
        let items = match dataset::read_json_array(shard) {
            Ok(items) => items,
            Err(e) => {
                error!("parse json file {} failed, error: {}", shard.display(), e);
                continue;
            }
        };
        info!("train file: {} count: {}", shard.display(), items.len());

        for item in &items {
            let Some(object) = item.as_object() else {
                continue;
            };
            let Some(raw) = object.get(field) else {
                continue;
            };

            total_count += 1;
            let id = schema.resolve_id(object)?;
            let value = match raw {
                Value::String(s) => s.clone(),
                Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
                _ => String::new(),
            };
            reverse_index.entry(value).or_default().push(id);
        }
    }

    let mut entries: Vec<DistributionEntry> = reverse_index
        .into_iter()
        .map(|(value, vector_ids)| DistributionEntry {
            rate: vector_ids.len() as f32 / total_count as f32 * 100.0,
            value,
            vector_ids,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.vector_ids
            .len()
            .cmp(&a.vector_ids.len())
            .then_with(|| a.value.cmp(&b.value))
    });

    Ok(entries)
}

/// Write the distribution of `field` to `output_path` as a JSON array.
pub fn write_field_distribution(
    schema: DatasetSchema,
    train_dir: &Path,
    marker: &str,
    field: &str,
    output_path: &Path,
) -> Result<usize> {
    let entries = field_distribution(schema, train_dir, marker, field)?;
    let values: Vec<Value> = entries.iter().map(|e| e.to_json(field)).collect();
    dataset::write_json_array(output_path, &values)?;
    Ok(entries.len())
}

/// Path of the rewritten copy of a shard.
pub fn extended_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".extend");
    PathBuf::from(name)
}

fn add_field_to_file(path: &Path) -> Result<usize> {
    let items = dataset::read_json_array(path)?;
    info!("filepath: {} count: {}", path.display(), items.len());

    let mut rng = rand::rng();
    let mut extended = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(mut object) = item else {
            extended.push(item);
            continue;
        };
        let filter_id = rng.random_range(SYNTHETIC_RANGE.0..=SYNTHETIC_RANGE.1);
        object.insert(SYNTHETIC_FIELD.to_string(), Value::from(filter_id));
        extended.push(Value::Object(object));
    }

    dataset::write_json_array(&extended_path(path), &extended)?;
    Ok(extended.len())
}

/// Add a random `filter_id` to every record of every shard, writing `<shard>.extend`.
///
/// Shards are processed in parallel by `concurrency` threads. Returns the
/// number of shards rewritten; unreadable shards are logged and skipped.
pub fn add_filter_field(dataset_dir: &Path, marker: &str, concurrency: usize) -> Result<usize> {
    let shards = dataset::list_shards(dataset_dir, marker)?;
    if shards.is_empty() {
        return Ok(0);
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .thread_name(|i| format!("add-field-{i}"))
        .build()
        .map_err(|e| KnnTruthError::internal(format!("Failed to create thread pool: {e}")))?;

    let rewritten = pool.install(|| {
        shards
            .par_iter()
            .filter(|shard| match add_field_to_file(shard) {
                Ok(_) => true,
                Err(e) => {
                    error!("add field to {} failed, error: {}", shard.display(), e);
                    false
                }
            })
            .count()
    });

    Ok(rewritten)
}

/// Split a JSON array file into `<file>.left` (first `split_num` records) and `<file>.right`.
///
/// Returns the number of records written to each side.
pub fn split_dataset(path: &Path, split_num: usize) -> Result<(usize, usize)> {
    let mut left = dataset::read_json_array(path)?;
    info!("filepath: {} count: {}", path.display(), left.len());

    let right = left.split_off(split_num.min(left.len()));

    let mut left_path = path.as_os_str().to_owned();
    left_path.push(".left");
    let mut right_path = path.as_os_str().to_owned();
    right_path.push(".right");

    dataset::write_json_array(Path::new(&left_path), &left)?;
    dataset::write_json_array(Path::new(&right_path), &right)?;

    Ok((left.len(), right.len()))
}
