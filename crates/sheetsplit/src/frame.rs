//! Polars `DataFrame` -> row grid adapter.

use std::io::Cursor;

use polars::prelude::{AnyValue, DataFrame, IpcReader, SerReader};

use crate::spec::{EnumCellValue, HostError, Row};

/// Grid with column names as row 1 followed by every frame row.
pub fn derive_grid_from_dataframe(df: &DataFrame) -> Result<Vec<Row>, HostError> {
    let header: Row = df
        .get_column_names_str()
        .into_iter()
        .map(EnumCellValue::from)
        .collect();

    let l_cols = df.get_columns();
    let mut l_grid = Vec::with_capacity(df.height() + 1);
    l_grid.push(header);
    for n_idx_row in 0..df.height() {
        let mut row = Vec::with_capacity(l_cols.len());
        for col in l_cols {
            row.push(derive_cell_value_from_any_value(col.get(n_idx_row)?));
        }
        l_grid.push(row);
    }
    Ok(l_grid)
}

/// Decode a Polars IPC payload.
pub fn derive_dataframe_from_ipc_bytes(v_ipc_df: &[u8]) -> Result<DataFrame, HostError> {
    Ok(IpcReader::new(Cursor::new(v_ipc_df)).finish()?)
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Bool(val),
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::{Column, IpcWriter, SerWriter};

    use super::*;

    fn derive_df() -> DataFrame {
        DataFrame::new(vec![
            Column::new("Name".into(), ["A", "B"]),
            Column::new("Region".into(), [Some("East"), None]),
            Column::new("Qty".into(), [3i64, 4]),
            Column::new("Done".into(), [true, false]),
        ])
        .unwrap()
    }

    #[test]
    fn grid_has_header_then_typed_cells() {
        let l_grid = derive_grid_from_dataframe(&derive_df()).unwrap();

        assert_eq!(l_grid.len(), 3);
        assert_eq!(
            l_grid[0],
            vec!["Name".into(), "Region".into(), "Qty".into(), "Done".into()]
        );
        assert_eq!(
            l_grid[2],
            vec![
                EnumCellValue::from("B"),
                EnumCellValue::None,
                EnumCellValue::Number(4.0),
                EnumCellValue::Bool(false)
            ]
        );
    }

    #[test]
    fn ipc_payload_decodes() {
        let mut df = derive_df();
        let mut v_buf = Vec::new();
        IpcWriter::new(&mut v_buf).finish(&mut df).unwrap();

        let df_back = derive_dataframe_from_ipc_bytes(&v_buf).unwrap();
        assert_eq!(df_back.shape(), (2, 4));
    }

    #[test]
    fn ipc_garbage_is_a_host_error() {
        assert!(matches!(
            derive_dataframe_from_ipc_bytes(b"not ipc"),
            Err(HostError::Frame(_))
        ));
    }
}
