//! Brute-force ground-truth generation.
//!
//! A single producer walks the training shards, resolves ids, samples filter
//! ids and applies the filter predicate. Every eligible record is moved into
//! the [`TaskDispatcher`], whose workers compare it with every query and offer
//! the result to that query's collector. When the producer is done the
//! dispatcher is joined and the [`ResultAssembler`] writes the output.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::assembler::ResultAssembler;
use crate::collector::{Neighbor, NeighborCollector};
use crate::config::GeneratorConfig;
use crate::dataset::{self, QueryEntry, TrainRecord};
use crate::dispatcher::TaskDispatcher;
use crate::distance::l2_squared_unchecked;
use crate::error::Result;
use crate::sampler::{FilterIdSampler, FilterIdSet};

/// Summary of one ground-truth run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Number of queries answered.
    pub query_count: usize,

    /// Training shard files found.
    pub shard_count: usize,

    /// Shards that could not be read or parsed.
    pub skipped_shards: usize,

    /// Training records that reached the filter predicate.
    pub total_count: u64,

    /// Records excluded by the filter predicate.
    pub filter_count: u64,

    /// Records compared against the queries.
    pub dispatched_count: u64,

    /// Size of the sampled filter-id set.
    pub filter_id_count: usize,

    /// Wall-clock time of the run.
    pub duration_ms: u64,
}

impl GenerationStats {
    /// Percentage of records removed by the filter predicate.
    pub fn filter_ratio(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.filter_count as f64 * 100.0 / self.total_count as f64
        }
    }
}

/// Neighbor lists of one finished run, before they are written anywhere.
#[derive(Debug)]
pub struct GroundTruth {
    pub documents: Vec<serde_json::Value>,
    pub stats: GenerationStats,
}

/// Computes exact nearest neighbors for a query file over a training directory.
#[derive(Debug)]
pub struct GroundTruthGenerator {
    config: GeneratorConfig,
}

impl GroundTruthGenerator {
    /// Create a generator; fails on an invalid configuration.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Default output location: the query file with `.neighbor` appended.
    pub fn default_output_path(query_path: &Path) -> PathBuf {
        let mut name = query_path.as_os_str().to_owned();
        name.push(".neighbor");
        PathBuf::from(name)
    }

    /// Run and write the annotated query documents to `output_path`.
    pub fn generate_to_file(
        &self,
        query_path: &Path,
        train_dir: &Path,
        output_path: &Path,
    ) -> Result<GenerationStats> {
        let truth = self.generate(query_path, train_dir)?;
        dataset::write_json_array(output_path, &truth.documents)?;
        info!("ground truth written to {}", output_path.display());
        Ok(truth.stats)
    }

    /// Run and return the annotated query documents.
    pub fn generate(&self, query_path: &Path, train_dir: &Path) -> Result<GroundTruth> {
        let start = Instant::now();
        let config = &self.config;

        let queries = dataset::load_queries(
            query_path,
            config.dataset,
            config.dimension,
            config.neighbor_count,
        )?;
        let documents = queries.documents;
        let entries = Arc::new(queries.entries);

        let shards = dataset::list_shards(train_dir, &config.train_file_marker)?;
        let (mut stats, filter_ids) = self.scan_training_set(&shards, Arc::clone(&entries))?;

        stats.query_count = entries.len();
        stats.shard_count = shards.len();
        stats.filter_id_count = filter_ids.as_ref().map(|ids| ids.len()).unwrap_or(0);
        info!(
            "total_count: {} filter_count: {} ratio: {:.2}% filter_vector_ids size: {}",
            stats.total_count,
            stats.filter_count,
            stats.filter_ratio(),
            stats.filter_id_count
        );

        let mut assembler = ResultAssembler::new();
        if let Some(filter) = &config.filter {
            assembler = assembler.with_filter_description(filter.description());
        }
        if let Some(ids) = &filter_ids {
            assembler = assembler.with_filter_ids(ids, config.filter_ids.negation);
        }
        let documents = assembler.assemble(documents, &entries)?;

        stats.duration_ms = start.elapsed().as_millis() as u64;
        Ok(GroundTruth { documents, stats })
    }

    /// Producer pass over every shard; returns once all dispatched work has finished.
    fn scan_training_set(
        &self,
        shards: &[PathBuf],
        entries: Arc<Vec<QueryEntry>>,
    ) -> Result<(GenerationStats, Option<FilterIdSet>)> {
        let config = &self.config;
        let mut stats = GenerationStats::default();

        let mut sampler = config.filter_ids.enabled.then(|| match config.filter_ids.seed {
            Some(seed) => FilterIdSampler::with_seed(config.filter_ids.ratio, seed),
            None => FilterIdSampler::new(config.filter_ids.ratio),
        });

        let dispatcher = TaskDispatcher::new(
            config.concurrency,
            config.queue_capacity,
            move |record: TrainRecord| offer_to_all(&entries, &record),
        )?;
        info!(
            "workers: {} queue capacity: {}",
            dispatcher.worker_count(),
            dispatcher.queue_capacity()
        );

        for shard in shards {
            let items = match dataset::read_json_array(shard) {
                Ok(items) => items,
                Err(e) => {
                    error!("parse json file {} failed, error: {}", shard.display(), e);
                    stats.skipped_shards += 1;
                    continue;
                }
            };
            info!("train file: {} count: {}", shard.display(), items.len());

            for item in items {
                let Some(record) =
                    dataset::parse_train_record(item, config.dataset, config.dimension)?
                else {
                    continue;
                };

                if let Some(sampler) = sampler.as_mut() {
                    sampler.maybe_take(record.id);
                }

                stats.total_count += 1;
                if let Some(filter) = &config.filter {
                    if filter.excludes(&record.raw_fields) {
                        stats.filter_count += 1;
                        continue;
                    }
                }

                dispatcher.submit(record)?;
            }
        }

        let dispatcher_stats = dispatcher.join()?;
        stats.dispatched_count = dispatcher_stats.tasks_completed;

        Ok((stats, sampler.map(FilterIdSampler::finish)))
    }
}

/// Compare one training record with every query.
fn offer_to_all(entries: &[QueryEntry], record: &TrainRecord) {
    for entry in entries {
        // Dimensions were validated when both sides were loaded
        let distance = l2_squared_unchecked(&entry.embedding, &record.embedding);
        entry.collector.offer(Neighbor::new(record.id, distance));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_to_all_reaches_every_query() {
        let entries = vec![
            QueryEntry::new(1, vec![0.0, 0.0], 1),
            QueryEntry::new(2, vec![3.0, 4.0], 1),
        ];
        let record = TrainRecord {
            id: 9,
            embedding: vec![3.0, 0.0],
            raw_fields: serde_json::Map::new(),
        };

        offer_to_all(&entries, &record);

        assert_eq!(entries[0].collector.drain_sorted(), vec![Neighbor::new(9, 9.0)]);
        assert_eq!(entries[1].collector.drain_sorted(), vec![Neighbor::new(9, 16.0)]);
    }

    #[test]
    fn test_default_output_path() {
        let path = GroundTruthGenerator::default_output_path(Path::new("/data/test.json"));
        assert_eq!(path, PathBuf::from("/data/test.json.neighbor"));
    }

    #[test]
    fn test_filter_ratio() {
        let stats = GenerationStats {
            total_count: 200,
            filter_count: 50,
            ..Default::default()
        };
        assert_eq!(stats.filter_ratio(), 25.0);
        assert_eq!(GenerationStats::default().filter_ratio(), 0.0);
    }
}
