//! Stable grouping of data rows by normalized key.

use std::collections::HashMap;

use tracing::info;

use crate::spec::{
    EnumPartitionStrategy, Row, SpecPartition, SpecPartitionGroup, SpecSplitOptions,
};
use crate::util::{derive_row_key, uniq};

/// Distinct normalized keys of column `col_idx` (0-based), in first-appearance order.
pub fn derive_partition_keys(rows: &[Row], col_idx: usize, empty_key: &str) -> Vec<String> {
    let l_keys: Vec<String> = rows
        .iter()
        .map(|row| derive_row_key(row, col_idx, empty_key))
        .collect();
    uniq(&l_keys)
}

/// Group rows by filtering the full row set once per key in `keys`.
///
/// O(K x N). Keys keep the order given; rows keep source order.
pub fn partition_rows_filter_per_key(
    rows: &[Row],
    col_idx: usize,
    keys: &[String],
    empty_key: &str,
) -> SpecPartition {
    let groups = keys
        .iter()
        .map(|key| SpecPartitionGroup {
            key: key.clone(),
            rows: rows
                .iter()
                .filter(|row| derive_row_key(row, col_idx, empty_key) == *key)
                .cloned()
                .collect(),
        })
        .collect();
    SpecPartition { groups }
}

/// Group rows in one pass into an insertion-ordered map.
pub fn partition_rows_single_pass(rows: &[Row], col_idx: usize, empty_key: &str) -> SpecPartition {
    let mut dict_idx_by_key: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<SpecPartitionGroup> = Vec::new();

    for row in rows {
        let key = derive_row_key(row, col_idx, empty_key);
        let n_idx_group = *dict_idx_by_key.entry(key.clone()).or_insert_with(|| {
            groups.push(SpecPartitionGroup {
                key,
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[n_idx_group].rows.push(row.clone());
    }

    SpecPartition { groups }
}

/// Partition `rows` on 1-based `key_column` using `options.strategy`.
pub fn partition_rows(rows: &[Row], key_column: usize, options: &SpecSplitOptions) -> SpecPartition {
    let col_idx = key_column.saturating_sub(1);
    let partition = match options.strategy {
        EnumPartitionStrategy::SinglePass => {
            partition_rows_single_pass(rows, col_idx, &options.empty_key)
        }
        EnumPartitionStrategy::FilterPerKey => {
            let l_keys = derive_partition_keys(rows, col_idx, &options.empty_key);
            partition_rows_filter_per_key(rows, col_idx, &l_keys, &options.empty_key)
        }
    };
    info!("Found {} distinct split keys.", partition.len());
    partition
}
