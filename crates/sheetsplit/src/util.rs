//! Stateless helper utilities shared by the split pipeline and stores.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::{EnumCellValue, Row, SplitError};

////////////////////////////////////////////////////////////////////////////////
// #region Dedup

/// Return distinct elements of `values` in first-occurrence order.
///
/// Equality is value equality; callers normalize keys before calling so that
/// e.g. `3` and `"3"` collapse into one entry.
pub fn uniq<T: PartialEq + Clone>(values: &[T]) -> Vec<T> {
    let mut l_distinct: Vec<T> = Vec::new();
    for value in values {
        if !l_distinct.contains(value) {
            l_distinct.push(value.clone());
        }
    }
    l_distinct
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region KeyNormalization

/// Normalize a key cell to text, substituting `empty_key` for blanks.
pub fn derive_normalized_key(value: &EnumCellValue, empty_key: &str) -> String {
    if value.is_blank() {
        return empty_key.to_string();
    }
    value.to_string()
}

/// Normalized key of `row` at 0-based `col_idx`; short rows read as blank.
pub fn derive_row_key(row: &[EnumCellValue], col_idx: usize, empty_key: &str) -> String {
    match row.get(col_idx) {
        Some(value) => derive_normalized_key(value, empty_key),
        None => empty_key.to_string(),
    }
}

/// Calendar date-time of an Excel serial, rounded to the second.
///
/// Uses the 1899-12-30 epoch, so serials before 1900-03-01 are one day off
/// from what Excel displays.
pub fn derive_datetime_from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let n_secs = (serial * 86_400.0).round();
    if n_secs.abs() >= i64::MAX as f64 {
        return None;
    }
    let dt_epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    dt_epoch.checked_add_signed(TimeDelta::try_seconds(n_secs as i64)?)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region KeyColumnInput

/// Parse prompt text into an integral column number.
///
/// Non-numeric, non-finite and fractional input is [`SplitError::InvalidInput`].
/// The result is not bounds-checked; see [`validate_key_column`].
pub fn parse_key_column_input(text: &str) -> Result<i64, SplitError> {
    let c_text = text.trim();
    let err_invalid = || SplitError::InvalidInput {
        input: text.to_string(),
    };

    if let Ok(n_col) = c_text.parse::<i64>() {
        return Ok(n_col);
    }

    let n_value = c_text.parse::<f64>().map_err(|_| err_invalid())?;
    if !n_value.is_finite() || n_value.fract() != 0.0 {
        return Err(err_invalid());
    }
    if n_value < i64::MIN as f64 || n_value > i64::MAX as f64 {
        return Err(err_invalid());
    }
    Ok(n_value as i64)
}

/// Check `1 <= key_column <= n_cols` and return it as `usize`.
pub fn validate_key_column(key_column: i64, n_cols: usize) -> Result<usize, SplitError> {
    let err_range = || SplitError::OutOfRange { key_column, n_cols };
    let n_col = usize::try_from(key_column).map_err(|_| err_range())?;
    if n_col == 0 || n_col > n_cols {
        return Err(err_range());
    }
    Ok(n_col)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region GridAccess

/// Last used row and column (1-based) of a grid; blank cells do not count.
pub fn derive_grid_extents(rows: &[Row]) -> (usize, usize) {
    let n_rows = rows
        .iter()
        .rposition(|row| row.iter().any(|cell| !cell.is_blank()))
        .map_or(0, |idx| idx + 1);
    let n_cols = rows
        .iter()
        .filter_map(|row| row.iter().rposition(|cell| !cell.is_blank()))
        .map(|idx| idx + 1)
        .max()
        .unwrap_or(0);
    (n_rows, n_cols)
}

/// Copy a 1-based rectangular block; cells outside the grid read as blank.
///
/// Caller guarantees `row_start >= 1` and `col_start >= 1`.
pub fn select_grid_block(
    rows: &[Row],
    row_start: usize,
    col_start: usize,
    n_rows: usize,
    n_cols: usize,
) -> Vec<Row> {
    (row_start - 1..row_start - 1 + n_rows)
        .map(|row_idx| {
            (col_start - 1..col_start - 1 + n_cols)
                .map(|col_idx| {
                    rows.get(row_idx)
                        .and_then(|row| row.get(col_idx))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    // Cut before trimming so the cut cannot expose a boundary apostrophe.
    let c_name: String = c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect();
    let c_name = c_name.trim_matches(|c: char| c.is_whitespace() || c == '\'');
    if c_name.is_empty() {
        return "Sheet".to_string();
    }
    c_name.to_string()
}

/// Excel compares sheet names case-insensitively.
pub fn is_same_sheet_name(lhs: &str, rhs: &str) -> bool {
    lhs.to_lowercase() == rhs.to_lowercase()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniq_keeps_first_occurrence_order() {
        let values = ["b", "a", "b", "c", "a"];
        assert_eq!(uniq(&values), vec!["b", "a", "c"]);
        assert!(uniq::<String>(&[]).is_empty());
    }

    #[test]
    fn uniq_compares_by_value_not_identity() {
        let values = vec!["East".to_string(), "East".to_string()];
        assert_eq!(uniq(&values), vec!["East".to_string()]);
    }

    #[test]
    fn normalized_key_maps_blanks_to_sentinel() {
        assert_eq!(derive_normalized_key(&EnumCellValue::None, "empty"), "empty");
        assert_eq!(derive_normalized_key(&"".into(), "empty"), "empty");
        assert_eq!(derive_normalized_key(&"East".into(), "empty"), "East");
        assert_eq!(derive_normalized_key(&EnumCellValue::Number(3.0), "empty"), "3");
        assert_eq!(derive_normalized_key(&EnumCellValue::Number(0.0), "empty"), "0");
    }

    #[test]
    fn excel_serial_converts_to_calendar_datetime() {
        let dt = derive_datetime_from_excel_serial(45306.25).unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 06:00:00");
        assert!(derive_datetime_from_excel_serial(f64::NAN).is_none());
        assert!(derive_datetime_from_excel_serial(1e300).is_none());
        assert_eq!(
            derive_normalized_key(&EnumCellValue::DateTime(45306.0), "empty"),
            "2024-01-15"
        );
    }

    #[test]
    fn row_key_treats_missing_cells_as_blank() {
        let row = vec![EnumCellValue::from("A")];
        assert_eq!(derive_row_key(&row, 0, "empty"), "A");
        assert_eq!(derive_row_key(&row, 3, "empty"), "empty");
    }

    #[test]
    fn parse_key_column_accepts_integral_numbers() {
        assert_eq!(parse_key_column_input("2").unwrap(), 2);
        assert_eq!(parse_key_column_input("  3 ").unwrap(), 3);
        assert_eq!(parse_key_column_input("4.0").unwrap(), 4);
        assert_eq!(parse_key_column_input("0").unwrap(), 0);
        assert_eq!(parse_key_column_input("-1").unwrap(), -1);
    }

    #[test]
    fn parse_key_column_rejects_non_numeric_input() {
        for c_input in ["", "  ", "abc", "2.5", "NaN", "inf", "1e400"] {
            assert!(
                matches!(
                    parse_key_column_input(c_input),
                    Err(SplitError::InvalidInput { .. })
                ),
                "input {c_input:?} should be rejected"
            );
        }
    }

    #[test]
    fn validate_key_column_enforces_bounds() {
        assert_eq!(validate_key_column(1, 2).unwrap(), 1);
        assert_eq!(validate_key_column(2, 2).unwrap(), 2);
        for n_col in [0, -3, 3] {
            assert!(matches!(
                validate_key_column(n_col, 2),
                Err(SplitError::OutOfRange { n_cols: 2, .. })
            ));
        }
    }

    #[test]
    fn sanitize_sheet_name_replaces_illegal_chars_and_truncates() {
        assert_eq!(sanitize_sheet_name("2024/01", "_"), "2024_01");
        assert_eq!(sanitize_sheet_name("  ", "_"), "Sheet");
        assert_eq!(sanitize_sheet_name("'quoted'", "_"), "quoted");
        let c_long = "x".repeat(40);
        assert_eq!(
            sanitize_sheet_name(&c_long, "_").chars().count(),
            N_LEN_EXCEL_SHEET_NAME_MAX
        );
    }

    #[test]
    fn sanitize_sheet_name_never_ends_with_apostrophe_after_truncation() {
        let c_key = format!("{}'tail", "x".repeat(30));
        let c_name = sanitize_sheet_name(&c_key, "_");
        assert_eq!(c_name, "x".repeat(30));
        assert!(!c_name.ends_with('\''));

        let c_key = format!("{}' ' rest", "y".repeat(28));
        let c_name = sanitize_sheet_name(&c_key, "_");
        assert_eq!(c_name, "y".repeat(28));
        assert_eq!(sanitize_sheet_name(&"'".repeat(40), "_"), "Sheet");
    }

    #[test]
    fn sheet_names_compare_case_insensitively() {
        assert!(is_same_sheet_name("East", "EAST"));
        assert!(!is_same_sheet_name("East", "West"));
    }
}
