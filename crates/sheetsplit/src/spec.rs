//! Shared split models, options, reports and errors.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::NaiveTime;
use thiserror::Error;

use crate::conf::{
    C_EMPTY_KEY_SENTINEL, C_NUM_FORMAT_DATE, C_NUM_FORMAT_DATETIME, derive_default_header_format,
};
use crate::util::derive_datetime_from_excel_serial;

////////////////////////////////////////////////////////////////////////////////
// #region CellsAndRows

/// One cell value as read from or written to a store.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Bool(bool),
    /// Date or date-time as an Excel serial number (days since 1899-12-30).
    DateTime(f64),
}

impl EnumCellValue {
    /// Whether the cell normalizes to zero-length text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.is_empty(),
            Self::Number(_) | Self::Bool(_) | Self::DateTime(_) => false,
        }
    }
}

impl fmt::Display for EnumCellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::DateTime(serial) => match derive_datetime_from_excel_serial(*serial) {
                Some(dt) if dt.time() == NaiveTime::MIN => write!(f, "{}", dt.format("%Y-%m-%d")),
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
                None => write!(f, "{serial}"),
            },
        }
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One row of cells.
pub type Row = Vec<EnumCellValue>;

/// Extents of the active dataset, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDatasetInfo {
    /// Sheet name of the dataset.
    pub name: String,
    /// Last used row (1-based), header included.
    pub n_rows: usize,
    /// Last used column (1-based).
    pub n_cols: usize,
}

/// Header and data block read from the active dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecExtractedData {
    /// Row 1, all columns.
    pub header: Row,
    /// Rows 2..=n_rows, all columns.
    pub rows: Vec<Row>,
}

/// Opaque handle to a named container inside a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub usize);

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Partition

/// Rows sharing one normalized key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecPartitionGroup {
    /// Normalized key (sentinel-substituted).
    pub key: String,
    /// Rows in source order.
    pub rows: Vec<Row>,
}

/// Key -> rows mapping, ordered by first appearance of each key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecPartition {
    pub groups: Vec<SpecPartitionGroup>,
}

impl SpecPartition {
    /// Keys in first-appearance order.
    pub fn keys(&self) -> Vec<&str> {
        self.groups.iter().map(|group| group.key.as_str()).collect()
    }

    /// Rows for `key`, if the key is present.
    pub fn get(&self, key: &str) -> Option<&[Row]> {
        self.groups
            .iter()
            .find(|group| group.key == key)
            .map(|group| group.rows.as_slice())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total row count across all groups.
    pub fn n_rows(&self) -> usize {
        self.groups.iter().map(|group| group.rows.len()).sum()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Grouping algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumPartitionStrategy {
    /// Classify every row once into an insertion-ordered map.
    #[default]
    SinglePass,
    /// Deduplicate keys first, then filter all rows once per key.
    FilterPerKey,
}

/// Options for one split run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSplitOptions {
    /// Label used for blank key values.
    pub empty_key: String,
    /// Grouping algorithm.
    pub strategy: EnumPartitionStrategy,
}

impl Default for SpecSplitOptions {
    fn default() -> Self {
        Self {
            empty_key: C_EMPTY_KEY_SENTINEL.to_string(),
            strategy: EnumPartitionStrategy::SinglePass,
        }
    }
}

/// Header cell format applied when persisting xlsx sheets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Bold style.
    pub bold: Option<bool>,
    /// Horizontal alignment.
    pub align: Option<String>,
}

/// Options for [`crate::xlsx::XlsxWorkbook`] persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxStoreOptions {
    /// Format for row 1 of every sheet; `None` writes it unformatted.
    pub fmt_header: Option<SpecCellFormat>,
    /// Freeze the header row.
    pub if_freeze_header: bool,
    /// Autofit column widths on save.
    pub if_autofit: bool,
    /// Number format for whole-day date cells.
    pub num_format_date: String,
    /// Number format for date cells carrying a time of day.
    pub num_format_datetime: String,
}

impl Default for SpecXlsxStoreOptions {
    fn default() -> Self {
        Self {
            fmt_header: Some(derive_default_header_format()),
            if_freeze_header: true,
            if_autofit: true,
            num_format_date: C_NUM_FORMAT_DATE.to_string(),
            num_format_datetime: C_NUM_FORMAT_DATETIME.to_string(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// One destination container written by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecContainerWrite {
    /// Container name (the normalized key).
    pub name: String,
    /// Data rows written, header excluded.
    pub n_rows: usize,
    /// Whether the container existed and was cleared first.
    pub if_replaced: bool,
}

/// Per-run report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSplitReport {
    /// Source dataset name.
    pub source: String,
    /// 1-based key column.
    pub key_column: usize,
    /// Data rows read, header excluded.
    pub n_rows_data: usize,
    /// Containers in write order.
    pub containers: Vec<SpecContainerWrite>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecSplitReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Number of containers created by this run.
    pub fn created_count(&self) -> usize {
        self.containers.iter().filter(|c| !c.if_replaced).count()
    }

    /// Number of pre-existing containers replaced by this run.
    pub fn replaced_count(&self) -> usize {
        self.containers.iter().filter(|c| c.if_replaced).count()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_rows".to_string(), self.n_rows_data as u64);
        dict_counts.insert("cnt_containers".to_string(), self.containers.len() as u64);
        dict_counts.insert("cnt_created".to_string(), self.created_count() as u64);
        dict_counts.insert("cnt_replaced".to_string(), self.replaced_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warnings.len() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} source={:?} key_column={} rows={} containers={} created={} replaced={} warnings={}",
            self.source,
            self.key_column,
            dict_counts["cnt_rows"],
            dict_counts["cnt_containers"],
            dict_counts["cnt_created"],
            dict_counts["cnt_replaced"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for SpecSplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[SPLIT]"))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Failures raised by a [`crate::host::HostStore`] implementation.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read workbook: {0}")]
    XlsxRead(#[from] calamine::Error),

    #[error("xlsx write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to convert DataFrame: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    #[error("Workbook has no sheets: {}", .0.display())]
    NoSheets(PathBuf),

    #[error("Sheet not found: {0:?}")]
    SheetNotFound(String),

    #[error(
        "Range out of bounds: start=({row_start}, {col_start}) size={n_rows}x{n_cols} on sheet {sheet:?}"
    )]
    InvalidRange {
        sheet: String,
        row_start: usize,
        col_start: usize,
        n_rows: usize,
        n_cols: usize,
    },

    #[error("Unknown container handle: {0:?}")]
    UnknownContainer(crate::spec::ContainerId),

    #[error("Container {name:?} already exists")]
    ContainerExists { name: String },

    #[error("Keys {key:?} and {existing:?} both map to sheet name {sheet_name:?}")]
    ContainerNameCollision {
        key: String,
        existing: String,
        sheet_name: String,
    },

    #[error("Sheet {sheet:?} would exceed the Excel row limit ({n_rows} rows)")]
    RowLimitExceeded { sheet: String, n_rows: usize },

    #[error("Row for sheet {sheet:?} exceeds the Excel column limit ({n_cols} columns)")]
    ColumnLimitExceeded { sheet: String, n_cols: usize },

    #[error("Workbook already closed")]
    Closed,
}

/// Top-level split failure.
#[derive(Debug, Error)]
pub enum SplitError {
    /// User dismissed a prompt or confirmation.
    #[error("Cancelled by user")]
    UserCancelled,

    /// Key-column input is not an integral number.
    #[error("Key column is not a number: {input:?}")]
    InvalidInput { input: String },

    /// Key-column number is outside `1..=n_cols`.
    #[error("Key column {key_column} is outside 1..={n_cols}")]
    OutOfRange { key_column: i64, n_cols: usize },

    /// Storage collaborator failed; the run stops where it was.
    #[error(transparent)]
    HostFailure(#[from] HostError),
}

impl SplitError {
    /// Validation/cancel errors that are reported through a notice dialog.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::HostFailure(_))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
