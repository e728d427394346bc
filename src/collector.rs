//! Bounded top-K collection of nearest neighbors.
//!
//! Each query owns one collector. Workers offer candidates concurrently, so a
//! collector serializes its own mutations behind a per-collector lock; two
//! different queries never contend with each other.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A training vector together with its distance to a query.
///
/// Neighbors order by ascending distance; equal distances order by ascending
/// id so that the retained set does not depend on arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: i64,
    pub distance: f32,
}

impl Neighbor {
    pub fn new(id: i64, distance: f32) -> Self {
        Neighbor { id, distance }
    }

    /// Total order used for ranking.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Heap entry; the greatest entry is the worst kept neighbor.
#[derive(Debug, Clone, Copy)]
struct Ranked(Neighbor);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}

/// Trait for collecting the closest neighbors of a single query.
///
/// Implementations must be safe to call from many threads at once.
pub trait NeighborCollector: Send + Sync + Debug {
    /// Offer a candidate; it is kept only if it ranks among the best `capacity`.
    fn offer(&self, neighbor: Neighbor);

    /// Remove every kept neighbor and return them closest first.
    fn drain_sorted(&self) -> Vec<Neighbor>;

    /// Number of neighbors currently kept.
    fn len(&self) -> usize;

    /// Check if nothing is kept.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of neighbors kept.
    fn capacity(&self) -> usize;
}

/// Max-heap backed collector keeping the `k` closest neighbors.
#[derive(Debug)]
pub struct BoundedTopK {
    k: usize,
    heap: Mutex<BinaryHeap<Ranked>>,
}

impl BoundedTopK {
    /// Create a collector keeping at most `k` neighbors.
    pub fn new(k: usize) -> Self {
        BoundedTopK {
            k,
            heap: Mutex::new(BinaryHeap::with_capacity(k.min(4096))),
        }
    }

    /// Distance of the worst kept neighbor, if any.
    pub fn worst_distance(&self) -> Option<f32> {
        self.heap.lock().peek().map(|r| r.0.distance)
    }
}

impl NeighborCollector for BoundedTopK {
    fn offer(&self, neighbor: Neighbor) {
        if self.k == 0 {
            return;
        }

        let candidate = Ranked(neighbor);
        let mut heap = self.heap.lock();

        if heap.len() < self.k {
            heap.push(candidate);
            return;
        }

        // Replace the worst kept neighbor only on a strict improvement
        if let Some(mut worst) = heap.peek_mut() {
            if candidate < *worst {
                *worst = candidate;
            }
        }
    }

    fn drain_sorted(&self) -> Vec<Neighbor> {
        let heap = std::mem::take(&mut *self.heap.lock());
        heap.into_sorted_vec().into_iter().map(|r| r.0).collect()
    }

    fn len(&self) -> usize {
        self.heap.lock().len()
    }

    fn capacity(&self) -> usize {
        self.k
    }
}
