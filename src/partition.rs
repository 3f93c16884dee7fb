//! Balanced contiguous partitioning.
//!
//! `M` items split into `N` buckets as contiguous, order-preserving slices.
//! The first `M % N` buckets hold `M / N + 1` items and the rest hold `M / N`,
//! so bucket sizes differ by at most one and concatenating the buckets in
//! index order reproduces the input.

use indexmap::IndexMap;

use crate::data::{BucketContents, FileEntry};
use crate::errors::ScheduleError;
use crate::types::GroupKey;

/// Bucket sizes for `total` items over `buckets` buckets (remainder front-loaded).
///
/// `buckets == 0` yields no sizes.
pub fn bucket_sizes(total: usize, buckets: usize) -> Vec<usize> {
    if buckets == 0 {
        return Vec::new();
    }
    let step = total / buckets;
    let remainder = total % buckets;
    (0..buckets)
        .map(|idx| if idx < remainder { step + 1 } else { step })
        .collect()
}

/// Split `items` into `buckets` contiguous slices of balanced size.
///
/// Fails when `buckets` is zero or exceeds `items.len()`.
pub fn partition<T>(items: &[T], buckets: usize) -> Result<Vec<&[T]>, ScheduleError> {
    if buckets == 0 {
        return Err(ScheduleError::Configuration(
            "total buckets must be greater than zero".to_string(),
        ));
    }
    if buckets > items.len() {
        return Err(ScheduleError::InsufficientItems {
            found: items.len(),
            buckets,
        });
    }
    let mut slices = Vec::with_capacity(buckets);
    let mut start = 0;
    for size in bucket_sizes(items.len(), buckets) {
        let end = start + size;
        slices.push(&items[start..end]);
        start = end;
    }
    Ok(slices)
}

/// Partition files directly (flat mode).
pub fn partition_files(
    files: &[FileEntry],
    buckets: usize,
) -> Result<Vec<BucketContents>, ScheduleError> {
    Ok(partition(files, buckets)?
        .into_iter()
        .map(BucketContents::flat)
        .collect())
}

/// Partition group keys so every file of a group lands in the same bucket.
///
/// Balance is over keys, not files.
pub fn partition_groups(
    groups: &IndexMap<GroupKey, Vec<FileEntry>>,
    buckets: usize,
) -> Result<Vec<BucketContents>, ScheduleError> {
    let keys: Vec<&GroupKey> = groups.keys().collect();
    Ok(partition(&keys, buckets)?
        .into_iter()
        .map(|slice| {
            BucketContents::grouped(slice.iter().map(|key| (*key, &groups[*key])))
        })
        .collect())
}
