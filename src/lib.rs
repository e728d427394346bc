//! # knn-truth
//!
//! Exact nearest-neighbor ground truth for vector search benchmarks.
//!
//! ## Features
//!
//! - Brute-force squared-L2 top-K per query over file-sharded training sets
//! - Concurrent distance evaluation with a bounded task queue
//! - Record-level filter predicates for filtered-search ground truth
//! - Filter-id sampling for id-filter benchmarks
//! - Dataset helpers: field distribution, synthetic fields, dataset splitting

pub mod assembler;
pub mod cli;
pub mod collector;
pub mod config;
pub mod dataset;
pub mod dispatcher;
pub mod distance;
pub mod error;
pub mod filter;
pub mod generator;
pub mod identity;
pub mod sampler;
pub mod tools;

pub mod prelude {
    pub use crate::collector::{BoundedTopK, Neighbor, NeighborCollector};
    pub use crate::config::GeneratorConfig;
    pub use crate::error::{KnnTruthError, Result};
    pub use crate::filter::FilterPredicate;
    pub use crate::generator::{GenerationStats, GroundTruthGenerator};
    pub use crate::identity::DatasetSchema;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
