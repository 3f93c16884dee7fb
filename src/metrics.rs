use crate::data::BucketContents;

/// Size spread across schedule buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketStats {
    /// Number of buckets.
    pub buckets: usize,
    /// Partitioned items across all buckets (files, or group keys when grouped).
    pub total_items: usize,
    /// Files across all buckets.
    pub total_files: usize,
    /// Items in the smallest bucket.
    pub min_items: usize,
    /// Items in the largest bucket.
    pub max_items: usize,
    /// Files in the smallest bucket.
    pub min_files: usize,
    /// Files in the largest bucket.
    pub max_files: usize,
}

impl BucketStats {
    /// Difference between the largest and smallest bucket, in partitioned items.
    pub fn item_spread(&self) -> usize {
        self.max_items - self.min_items
    }

    /// Difference between the largest and smallest bucket, in files.
    pub fn file_spread(&self) -> usize {
        self.max_files - self.min_files
    }
}

/// Compute size statistics; `None` for an empty bucket list.
///
/// Items are files in flat buckets and group keys in grouped buckets.
pub fn bucket_stats(buckets: &[BucketContents]) -> Option<BucketStats> {
    if buckets.is_empty() {
        return None;
    }
    let items: Vec<usize> = buckets.iter().map(BucketContents::item_count).collect();
    let files: Vec<usize> = buckets.iter().map(BucketContents::file_count).collect();
    Some(BucketStats {
        buckets: buckets.len(),
        total_items: items.iter().sum(),
        total_files: files.iter().sum(),
        min_items: items.iter().copied().min().unwrap_or(0),
        max_items: items.iter().copied().max().unwrap_or(0),
        min_files: files.iter().copied().min().unwrap_or(0),
        max_files: files.iter().copied().max().unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn stats_track_items_and_files_separately() {
        let mut grouped = IndexMap::new();
        grouped.insert(
            "X".to_string(),
            vec!["/a.fna".to_string(), "/b.fna".to_string()],
        );
        let buckets = vec![
            BucketContents::Grouped(grouped),
            BucketContents::Grouped(IndexMap::from([(
                "Y".to_string(),
                vec!["/c.fna".to_string()],
            )])),
        ];
        let stats = bucket_stats(&buckets).unwrap();
        assert_eq!(stats.buckets, 2);
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.item_spread(), 0);
        assert_eq!(stats.file_spread(), 1);
    }

    #[test]
    fn empty_bucket_list_has_no_stats() {
        assert!(bucket_stats(&[]).is_none());
    }
}
