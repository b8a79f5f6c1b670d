//! Index-range partitioning across workers.

use std::ops::Range;

/// Splits the index range `[0, len)` into `workers` contiguous ranges.
///
/// Range sizes differ by at most one; the remainder is spread across the
/// first ranges. The union of the ranges is exactly `[0, len)` and they are
/// pairwise disjoint. When `workers > len` the trailing ranges are empty;
/// an empty range is a legitimate zero-work assignment and the worker that
/// receives it still signals completion.
///
/// # Panics
/// Panics if `workers` is zero. Callers validate the worker count before
/// partitioning.
pub fn split_indices(len: usize, workers: usize) -> Vec<Range<usize>> {
    assert!(workers > 0, "cannot partition across zero workers");

    let base = len / workers;
    let extra = len % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for w in 0..workers {
        let size = base + usize::from(w < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}
