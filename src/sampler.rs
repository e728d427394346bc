//! Bernoulli sampling of training ids for filtered-search benchmarks.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Ordered set of sampled vector ids.
pub type FilterIdSet = BTreeSet<i64>;

/// Samples each offered id independently with probability `ratio`.
///
/// Owned by the producer thread; the finished set is read only.
#[derive(Debug)]
pub struct FilterIdSampler {
    ratio: f64,
    rng: StdRng,
    ids: FilterIdSet,
}

impl FilterIdSampler {
    /// Create a sampler seeded from the operating system.
    pub fn new(ratio: f64) -> Self {
        Self::with_rng(ratio, StdRng::from_os_rng())
    }

    /// Create a sampler with a fixed seed.
    pub fn with_seed(ratio: f64, seed: u64) -> Self {
        Self::with_rng(ratio, StdRng::seed_from_u64(seed))
    }

    fn with_rng(ratio: f64, rng: StdRng) -> Self {
        FilterIdSampler {
            ratio,
            rng,
            ids: FilterIdSet::new(),
        }
    }

    /// Draw once for `id`; returns true when it was taken.
    pub fn maybe_take(&mut self, id: i64) -> bool {
        let draw: f64 = self.rng.random();
        // `random` draws from [0, 1), so a ratio of 0 never takes
        let taken = self.ratio > 0.0 && draw <= self.ratio;
        if taken {
            self.ids.insert(id);
        }
        taken
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Consume the sampler and return the sampled set.
    pub fn finish(self) -> FilterIdSet {
        self.ids
    }
}
