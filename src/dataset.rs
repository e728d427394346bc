//! Reading query and training files.
//!
//! Every dataset file is a JSON array of objects. Each object carries an id
//! field whose name depends on the [`DatasetSchema`] and an `emb` array of
//! floats.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde_json::{Map, Value};

use crate::collector::BoundedTopK;
use crate::error::{KnnTruthError, Result};
use crate::identity::DatasetSchema;

/// Name of the embedding field.
pub const EMBEDDING_FIELD: &str = "emb";

/// A query vector and the collector gathering its nearest neighbors.
#[derive(Debug)]
pub struct QueryEntry {
    pub id: i64,
    pub embedding: Vec<f32>,
    pub collector: BoundedTopK,
}

impl QueryEntry {
    pub fn new(id: i64, embedding: Vec<f32>, k: usize) -> Self {
        QueryEntry {
            id,
            embedding,
            collector: BoundedTopK::new(k),
        }
    }
}

/// One training vector on its way to a worker.
#[derive(Debug, Clone)]
pub struct TrainRecord {
    pub id: i64,
    pub embedding: Vec<f32>,
    pub raw_fields: Map<String, Value>,
}

/// Parsed query file: the original objects plus one entry per object.
#[derive(Debug)]
pub struct QuerySet {
    pub documents: Vec<Value>,
    pub entries: Vec<QueryEntry>,
}

impl QuerySet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read a whole file as a JSON array.
pub fn read_json_array(path: &Path) -> Result<Vec<Value>> {
    let reader = BufReader::new(File::open(path)?);
    match serde_json::from_reader(reader)? {
        Value::Array(items) => Ok(items),
        _ => Err(KnnTruthError::invalid_format(format!(
            "{} is not a JSON array",
            path.display()
        ))),
    }
}

/// Write a JSON array to `path`, replacing any existing file.
pub fn write_json_array(path: &Path, items: &[Value]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, items)?;
    writer.flush()?;
    Ok(())
}

/// Extract the embedding of a record.
///
/// Returns `Ok(None)` when the record has no `emb` array.
pub fn parse_embedding(record: &Map<String, Value>, dimension: usize) -> Result<Option<Vec<f32>>> {
    let Some(Value::Array(values)) = record.get(EMBEDDING_FIELD) else {
        return Ok(None);
    };

    let mut embedding = Vec::with_capacity(values.len());
    for value in values {
        let component = value.as_f64().ok_or_else(|| {
            KnnTruthError::invalid_format(format!("embedding component {value} is not a number"))
        })?;
        embedding.push(component as f32);
    }

    if embedding.len() != dimension {
        return Err(KnnTruthError::dimension_mismatch(dimension, embedding.len()));
    }

    Ok(Some(embedding))
}

/// Build a training record from a shard entry.
///
/// Entries without an `emb` key yield `Ok(None)` before the id is looked at.
/// Otherwise the id is resolved first, so an unresolvable id is an error even
/// when `emb` turns out not to be an array. A wrong dimension is an error.
pub fn parse_train_record(
    item: Value,
    schema: DatasetSchema,
    dimension: usize,
) -> Result<Option<TrainRecord>> {
    let Value::Object(raw_fields) = item else {
        return Err(KnnTruthError::invalid_format("training entry is not an object"));
    };
    if !raw_fields.contains_key(EMBEDDING_FIELD) {
        return Ok(None);
    }

    let id = schema.resolve_id(&raw_fields)?;
    let Some(embedding) = parse_embedding(&raw_fields, dimension)? else {
        return Ok(None);
    };

    Ok(Some(TrainRecord {
        id,
        embedding,
        raw_fields,
    }))
}

/// Load the query file and create one collector of capacity `k` per query.
pub fn load_queries(
    path: &Path,
    schema: DatasetSchema,
    dimension: usize,
    k: usize,
) -> Result<QuerySet> {
    let documents = read_json_array(path)?;
    let mut entries = Vec::with_capacity(documents.len());

    for (position, document) in documents.iter().enumerate() {
        let object = document.as_object().ok_or_else(|| {
            KnnTruthError::invalid_format(format!("query {position} is not an object"))
        })?;
        let id = schema.resolve_id(object)?;
        // A query without an embedding cannot be answered
        let embedding = parse_embedding(object, dimension)?
            .ok_or_else(|| KnnTruthError::dimension_mismatch(dimension, 0))?;
        entries.push(QueryEntry::new(id, embedding, k));
    }

    info!("test data count: {}", entries.len());

    Ok(QuerySet { documents, entries })
}

/// List the files of `dir` whose name contains `marker`, sorted by name.
pub fn list_shards(dir: &Path, marker: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        // Follows symlinks
        if !entry.path().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().contains(marker) {
            paths.push(entry.path());
        }
    }
    paths.sort();

    info!("file count: {}", paths.len());

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::collector::NeighborCollector;

    #[test]
    fn test_parse_train_record() {
        let item = json!({"id": 5, "emb": [1.0, 2.0], "lang": "en"});
        let record = parse_train_record(item, DatasetSchema::Wikipedia, 2)
            .unwrap()
            .unwrap();

        assert_eq!(record.id, 5);
        assert_eq!(record.embedding, vec![1.0, 2.0]);
        assert_eq!(record.raw_fields["lang"], "en");
    }

    #[test]
    fn test_record_without_embedding_is_skipped() {
        let skipped = parse_train_record(json!({"id": 5}), DatasetSchema::Wikipedia, 2).unwrap();
        assert!(skipped.is_none());

        let not_array =
            parse_train_record(json!({"id": 5, "emb": "x"}), DatasetSchema::Wikipedia, 2).unwrap();
        assert!(not_array.is_none());
    }

    #[test]
    fn test_unresolved_id_is_fatal() {
        let result = parse_train_record(json!({"emb": [1.0, 2.0]}), DatasetSchema::Wikipedia, 2);
        assert!(matches!(result, Err(KnnTruthError::InvalidFormat(_))));

        let not_array = parse_train_record(json!({"emb": "x"}), DatasetSchema::Wikipedia, 2);
        assert!(matches!(not_array, Err(KnnTruthError::InvalidFormat(_))));
    }

    #[test]
    fn test_header_entry_without_embedding_is_skipped() {
        let header = parse_train_record(json!({"title": "header"}), DatasetSchema::Wikipedia, 2);
        assert!(header.unwrap().is_none());
    }

    #[test]
    fn test_wrong_dimension_is_fatal() {
        let result = parse_train_record(
            json!({"id": 5, "emb": [1.0, 2.0, 3.0]}),
            DatasetSchema::Wikipedia,
            2,
        );
        assert!(matches!(
            result,
            Err(KnnTruthError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_load_queries_and_list_shards() {
        let dir = TempDir::new().unwrap();
        let query_path = dir.path().join("test.json");
        fs::write(
            &query_path,
            json!([{"id": 1, "emb": [0.0, 1.0]}, {"id": 2, "emb": [1.0, 0.0]}]).to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("train_b.json"), "[]").unwrap();
        fs::write(dir.path().join("train_a.json"), "[]").unwrap();

        let queries = load_queries(&query_path, DatasetSchema::Wikipedia, 2, 10).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries.entries[1].id, 2);
        assert_eq!(queries.entries[0].collector.capacity(), 10);

        let shards = list_shards(dir.path(), "train").unwrap();
        let names: Vec<_> = shards
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["train_a.json", "train_b.json"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_shards_follows_symlinks() {
        let store = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        let target = store.path().join("part.json");
        fs::write(&target, "[]").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("train_linked.json")).unwrap();
        fs::create_dir(dir.path().join("train_dir")).unwrap();

        let shards = list_shards(dir.path(), "train").unwrap();
        assert_eq!(shards, vec![dir.path().join("train_linked.json")]);
    }
}
