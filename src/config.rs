//! Configuration for ground-truth generation.

use serde::{Deserialize, Serialize};

use crate::error::{KnnTruthError, Result};
use crate::filter::FilterPredicate;
use crate::identity::DatasetSchema;

/// Default number of neighbors kept per query.
pub const DEFAULT_NEIGHBOR_COUNT: usize = 100;

/// Default number of training records allowed to wait for a worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default probability of sampling a training id into the filter-id set.
pub const DEFAULT_FILTER_ID_RATIO: f64 = 0.1;

/// Settings of the filter-id sampling feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterIdConfig {
    /// Whether `filter_vector_ids` is produced at all.
    pub enabled: bool,

    /// Sampling probability per training record.
    pub ratio: f64,

    /// Leave the true neighbors out of each query's filter-id list.
    pub negation: bool,

    /// Fixed RNG seed; the OS seeds the sampler when unset.
    pub seed: Option<u64>,
}

impl Default for FilterIdConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ratio: DEFAULT_FILTER_ID_RATIO,
            negation: false,
            seed: None,
        }
    }
}

/// Configuration of one ground-truth run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Id convention of the dataset.
    pub dataset: DatasetSchema,

    /// Required length of every embedding.
    pub dimension: usize,

    /// Number of worker threads computing distances.
    pub concurrency: usize,

    /// Number of nearest neighbors kept per query.
    pub neighbor_count: usize,

    /// Predicate deciding which training records take part.
    pub filter: Option<FilterPredicate>,

    /// Filter-id sampling settings.
    pub filter_ids: FilterIdConfig,

    /// Maximum number of training records queued for the workers.
    pub queue_capacity: usize,

    /// Substring identifying training shard files in the training directory.
    pub train_file_marker: String,
}

impl GeneratorConfig {
    /// Create a configuration with defaults for everything but the dataset and dimension.
    pub fn new(dataset: DatasetSchema, dimension: usize) -> Self {
        Self {
            dataset,
            dimension,
            concurrency: num_cpus::get(),
            neighbor_count: DEFAULT_NEIGHBOR_COUNT,
            filter: None,
            filter_ids: FilterIdConfig::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            train_file_marker: "train".to_string(),
        }
    }

    /// Set the number of worker threads.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the number of neighbors kept per query.
    pub fn with_neighbor_count(mut self, k: usize) -> Self {
        self.neighbor_count = k;
        self
    }

    /// Set the filter predicate; an empty predicate clears it.
    pub fn with_filter(mut self, filter: FilterPredicate) -> Self {
        self.filter = if filter.is_empty() { None } else { Some(filter) };
        self
    }

    /// Enable filter-id sampling.
    pub fn with_filter_ids(mut self, ratio: f64, negation: bool) -> Self {
        self.filter_ids.enabled = true;
        self.filter_ids.ratio = ratio;
        self.filter_ids.negation = negation;
        self
    }

    /// Seed the filter-id sampler.
    pub fn with_filter_id_seed(mut self, seed: u64) -> Self {
        self.filter_ids.seed = Some(seed);
        self
    }

    /// Set the queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the substring identifying training shards.
    pub fn with_train_file_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.train_file_marker = marker.into();
        self
    }

    /// Check the configuration before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(KnnTruthError::config("dimension must be positive"));
        }
        if self.concurrency == 0 {
            return Err(KnnTruthError::config("concurrency must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(KnnTruthError::config("queue capacity must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.filter_ids.ratio) {
            return Err(KnnTruthError::config(format!(
                "filter id ratio {} is outside [0, 1]",
                self.filter_ids.ratio
            )));
        }
        Ok(())
    }
}
