//! Header and data-block extraction from the active dataset.

use tracing::info;

use crate::conf::N_ROW_HEADER;
use crate::host::HostStore;
use crate::spec::{EnumCellValue, Row, SpecDatasetInfo, SpecExtractedData, SplitError};
use crate::util::validate_key_column;

/// Read dataset extents and check `key_column` against them.
///
/// No rows are read; an out-of-range column aborts before any cell access.
pub fn read_validated_dataset_info<S: HostStore + ?Sized>(
    store: &S,
    key_column: i64,
) -> Result<(SpecDatasetInfo, usize), SplitError> {
    let info = store.get_active_dataset()?;
    info!(
        "Active sheet {:?} is {} rows x {} columns.",
        info.name, info.n_rows, info.n_cols
    );
    let n_key_column = validate_key_column(key_column, info.n_cols)?;
    Ok((info, n_key_column))
}

/// Read row 1 across all columns.
pub fn read_header<S: HostStore + ?Sized>(
    store: &S,
    info: &SpecDatasetInfo,
) -> Result<Row, SplitError> {
    info!("Reading header row.");
    let l_rows = store.read_range(N_ROW_HEADER, 1, N_ROW_HEADER, info.n_cols)?;
    let header = l_rows.into_iter().next().unwrap_or_default();
    Ok(derive_fixed_width_row(header, info.n_cols))
}

/// Read rows `2..=n_rows` across all columns; empty when the sheet is header-only.
pub fn read_data_rows<S: HostStore + ?Sized>(
    store: &S,
    info: &SpecDatasetInfo,
) -> Result<Vec<Row>, SplitError> {
    let n_rows_data = info.n_rows.saturating_sub(N_ROW_HEADER);
    if n_rows_data == 0 {
        info!("No data rows below the header.");
        return Ok(vec![]);
    }

    let l_rows = store.read_range(N_ROW_HEADER + 1, 1, n_rows_data, info.n_cols)?;
    info!("Read {} data rows.", l_rows.len());
    Ok(l_rows
        .into_iter()
        .map(|row| derive_fixed_width_row(row, info.n_cols))
        .collect())
}

/// Validate bounds, then read header and data block in one call.
pub fn extract_dataset<S: HostStore + ?Sized>(
    store: &S,
    key_column: i64,
) -> Result<(SpecDatasetInfo, usize, SpecExtractedData), SplitError> {
    let (info, n_key_column) = read_validated_dataset_info(store, key_column)?;
    let header = read_header(store, &info)?;
    let rows = read_data_rows(store, &info)?;
    Ok((info, n_key_column, SpecExtractedData { header, rows }))
}

fn derive_fixed_width_row(mut row: Row, n_cols: usize) -> Row {
    row.resize(n_cols, EnumCellValue::None);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EnumStoreEvent, MemoryWorkbook};

    fn derive_grid(rows: &[&[&str]]) -> Vec<Row> {
        rows.iter()
            .map(|row| row.iter().map(|c| EnumCellValue::from(*c)).collect())
            .collect()
    }

    #[test]
    fn extract_splits_header_from_data() {
        let store = MemoryWorkbook::from_grid(
            "Sheet1",
            derive_grid(&[&["Name", "Region"], &["A", "East"], &["B", "West"]]),
        );

        let (info, n_key_column, data) = extract_dataset(&store, 2).unwrap();
        assert_eq!(info.n_rows, 3);
        assert_eq!(n_key_column, 2);
        assert_eq!(data.header, vec!["Name".into(), "Region".into()]);
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[1], vec![EnumCellValue::from("B"), "West".into()]);
    }

    #[test]
    fn extract_header_only_sheet_yields_no_rows() {
        let store = MemoryWorkbook::from_grid("Sheet1", derive_grid(&[&["Name", "Region"]]));

        let (_, _, data) = extract_dataset(&store, 1).unwrap();
        assert_eq!(data.header.len(), 2);
        assert!(data.rows.is_empty());
        let n_reads = store
            .journal()
            .iter()
            .filter(|event| matches!(event, EnumStoreEvent::ReadRange { .. }))
            .count();
        assert_eq!(n_reads, 1);
    }

    #[test]
    fn extract_out_of_range_reads_nothing() {
        let store = MemoryWorkbook::from_grid(
            "Sheet1",
            derive_grid(&[&["Name", "Region"], &["A", "East"]]),
        );

        let err = extract_dataset(&store, 3).unwrap_err();
        assert!(matches!(err, SplitError::OutOfRange { key_column: 3, n_cols: 2 }));
        assert!(
            !store
                .journal()
                .iter()
                .any(|event| matches!(event, EnumStoreEvent::ReadRange { .. }))
        );
    }

    #[test]
    fn extract_pads_ragged_rows_to_dataset_width() {
        let store = MemoryWorkbook::from_grid(
            "Sheet1",
            vec![
                vec!["Name".into(), "Region".into(), "Note".into()],
                vec!["A".into()],
            ],
        );

        let (_, _, data) = extract_dataset(&store, 1).unwrap();
        assert_eq!(
            data.rows[0],
            vec!["A".into(), EnumCellValue::None, EnumCellValue::None]
        );
    }
}
