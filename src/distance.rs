//! Squared Euclidean distance, the only metric ground truth is computed with.

use wide::f32x8;

use crate::error::{KnnTruthError, Result};

/// Squared L2 distance between two vectors of equal length.
///
/// Returns [`KnnTruthError::DimensionMismatch`] when the lengths differ.
pub fn l2_squared(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(KnnTruthError::dimension_mismatch(a.len(), b.len()));
    }

    Ok(l2_squared_unchecked(a, b))
}

/// Squared L2 distance without the length check.
///
/// Callers must have validated that `a` and `b` share a dimension; extra
/// trailing components of the longer slice are ignored.
#[inline]
pub fn l2_squared_unchecked(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    // Fall back to scalar for short vectors
    if len < 8 {
        return scalar_l2_squared(a, b);
    }

    let mut acc = f32x8::splat(0.0);
    let a_chunks = a.chunks_exact(8);
    let b_chunks = b.chunks_exact(8);
    let a_rem = a_chunks.remainder();
    let b_rem = b_chunks.remainder();

    for (ca, cb) in a_chunks.zip(b_chunks) {
        let mut lane_a = [0.0f32; 8];
        let mut lane_b = [0.0f32; 8];
        lane_a.copy_from_slice(ca);
        lane_b.copy_from_slice(cb);
        let diff = f32x8::new(lane_a) - f32x8::new(lane_b);
        acc = acc + diff * diff;
    }

    acc.reduce_add() + scalar_l2_squared(a_rem, b_rem)
}

fn scalar_l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
