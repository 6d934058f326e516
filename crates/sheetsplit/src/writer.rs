//! Per-key container materialization.
//!
//! Every destination container is rewritten as `[header, ...rows]`. Each
//! mutation is followed by [`HostStore::synchronize`] so that a store which
//! lags behind in-memory writes cannot interleave or drop rows.

use tracing::info;

use crate::host::HostStore;
use crate::spec::{ContainerId, EnumCellValue, Row, SpecContainerWrite, SpecPartition, SplitError};

/// Write every partition group into a container named after its key.
///
/// Returns one entry per container written, in partition order. A failure
/// stops the run; containers already written stay as they are.
pub fn write_partitions<S: HostStore + ?Sized>(
    store: &mut S,
    header: &[EnumCellValue],
    partition: &SpecPartition,
    empty_key: &str,
) -> Result<Vec<SpecContainerWrite>, SplitError> {
    let mut l_written = Vec::with_capacity(partition.len());
    for group in &partition.groups {
        if group.key == empty_key && group.rows.is_empty() {
            continue;
        }
        l_written.push(write_container(store, &group.key, header, &group.rows)?);
    }
    Ok(l_written)
}

/// Create-or-replace one container and fill it with header plus rows.
pub fn write_container<S: HostStore + ?Sized>(
    store: &mut S,
    name: &str,
    header: &[EnumCellValue],
    rows: &[Row],
) -> Result<SpecContainerWrite, SplitError> {
    let id_existing = store.find_container_by_name(name)?;
    if let Some(id) = id_existing {
        info!("Sheet {name:?} exists; replacing its contents.");
        store.clear_container(id)?;
        store.synchronize()?;
    }

    let id = match id_existing {
        Some(id) => id,
        None => store.create_container(name)?,
    };

    info!("Writing {} rows to sheet {name:?}.", rows.len());
    append_and_synchronize(store, id, header)?;
    for row in rows {
        append_and_synchronize(store, id, row)?;
    }

    Ok(SpecContainerWrite {
        name: name.to_string(),
        n_rows: rows.len(),
        if_replaced: id_existing.is_some(),
    })
}

fn append_and_synchronize<S: HostStore + ?Sized>(
    store: &mut S,
    id: ContainerId,
    row: &[EnumCellValue],
) -> Result<(), SplitError> {
    store.append_row(id, row)?;
    store.synchronize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EnumStoreEvent, MemoryWorkbook};
    use crate::spec::SpecPartitionGroup;

    fn derive_row(cells: &[&str]) -> Row {
        cells.iter().map(|c| EnumCellValue::from(*c)).collect()
    }

    fn derive_store() -> MemoryWorkbook {
        MemoryWorkbook::from_grid("Data", vec![derive_row(&["Name", "Region"])])
    }

    #[test]
    fn write_creates_container_with_header_then_rows() {
        let mut store = derive_store();
        let header = derive_row(&["Name", "Region"]);
        let rows = vec![derive_row(&["A", "East"]), derive_row(&["C", "East"])];

        let written = write_container(&mut store, "East", &header, &rows).unwrap();
        assert_eq!(written.n_rows, 2);
        assert!(!written.if_replaced);
        assert_eq!(
            store.sheet_rows("East").unwrap(),
            &[header, rows[0].clone(), rows[1].clone()]
        );
    }

    #[test]
    fn write_synchronizes_after_every_append() {
        let mut store = derive_store();
        let header = derive_row(&["Name", "Region"]);
        let rows = vec![derive_row(&["A", "East"]), derive_row(&["C", "East"])];
        write_container(&mut store, "East", &header, &rows).unwrap();

        let journal = store.journal();
        let l_mutations: Vec<&EnumStoreEvent> = journal
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    EnumStoreEvent::AppendRow { .. } | EnumStoreEvent::Synchronize
                )
            })
            .collect();
        assert_eq!(l_mutations.len(), 6);
        for pair in l_mutations.chunks(2) {
            assert!(matches!(pair[0], EnumStoreEvent::AppendRow { .. }));
            assert!(matches!(pair[1], EnumStoreEvent::Synchronize));
        }
    }

    #[test]
    fn write_replaces_existing_container_after_synchronized_clear() {
        let mut store = derive_store();
        store.insert_sheet(
            "East",
            vec![
                derive_row(&["old", "header", "wide"]),
                derive_row(&["stale", "East"]),
                derive_row(&["stale", "East"]),
            ],
        );
        let header = derive_row(&["Name", "Region"]);
        let rows = vec![derive_row(&["A", "East"])];

        let written = write_container(&mut store, "East", &header, &rows).unwrap();
        assert!(written.if_replaced);
        assert_eq!(store.sheet_rows("East").unwrap(), &[header, rows[0].clone()]);

        let journal = store.journal();
        let n_idx_clear = journal
            .iter()
            .position(|event| matches!(event, EnumStoreEvent::ClearContainer { .. }))
            .unwrap();
        assert!(matches!(journal[n_idx_clear + 1], EnumStoreEvent::Synchronize));
        assert!(
            !journal
                .iter()
                .any(|event| matches!(event, EnumStoreEvent::CreateContainer { .. }))
        );
    }

    #[test]
    fn write_partitions_skips_empty_sentinel_group() {
        let mut store = derive_store();
        let header = derive_row(&["Name", "Region"]);
        let partition = SpecPartition {
            groups: vec![
                SpecPartitionGroup {
                    key: "empty".to_string(),
                    rows: vec![],
                },
                SpecPartitionGroup {
                    key: "East".to_string(),
                    rows: vec![derive_row(&["A", "East"])],
                },
            ],
        };

        let written = write_partitions(&mut store, &header, &partition, "empty").unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].name, "East");
        assert!(store.sheet_rows("empty").is_none());
    }

    #[test]
    fn write_partitions_keeps_non_sentinel_empty_group() {
        let mut store = derive_store();
        let header = derive_row(&["Name", "Region"]);
        let partition = SpecPartition {
            groups: vec![SpecPartitionGroup {
                key: "West".to_string(),
                rows: vec![],
            }],
        };

        write_partitions(&mut store, &header, &partition, "empty").unwrap();
        assert_eq!(store.sheet_rows("West").unwrap(), &[header]);
    }
}
