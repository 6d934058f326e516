//! XLSX-file backed store.
//!
//! The workbook is read eagerly with calamine and buffered in memory; every
//! mutation is applied in place, so [`HostStore::synchronize`] only marks a
//! write barrier. The file is rewritten with rust_xlsxwriter on
//! [`XlsxWorkbook::close`]. Cell styling of the input file is not carried over.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};
use tracing::{debug, info};

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::host::HostStore;
use crate::spec::{
    ContainerId, EnumCellValue, HostError, Row, SpecCellFormat, SpecDatasetInfo,
    SpecXlsxStoreOptions,
};
use crate::util::{
    derive_grid_extents, is_same_sheet_name, sanitize_sheet_name, select_grid_block,
};

#[derive(Debug, Clone)]
struct SpecXlsxSheet {
    name: String,
    rows: Vec<Row>,
}

/// Workbook loaded from / persisted to an `.xlsx` file.
#[derive(Debug)]
pub struct XlsxWorkbook {
    path_file_out: PathBuf,
    sheets: Vec<SpecXlsxSheet>,
    n_idx_active: usize,
    dict_key_by_sheet: RefCell<HashMap<String, String>>,
    options: SpecXlsxStoreOptions,
    n_barriers: usize,
    if_closed: bool,
}

impl XlsxWorkbook {
    /// Load every sheet of `path_file_in`.
    ///
    /// `sheet_name` selects the active sheet (case-insensitive); the first
    /// sheet is active when it is `None`. Output defaults to the input path.
    pub fn open(
        path_file_in: impl AsRef<Path>,
        sheet_name: Option<&str>,
        options: SpecXlsxStoreOptions,
    ) -> Result<Self, HostError> {
        let path_file_in = path_file_in.as_ref();
        let mut workbook = open_workbook_auto(path_file_in)?;

        let mut sheets = Vec::new();
        for c_name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&c_name)?;
            let mut rows: Vec<Row> = Vec::new();
            if let Some((n_row_end, n_col_end)) = range.end() {
                for n_row in 0..=n_row_end {
                    let row = (0..=n_col_end)
                        .map(|n_col| {
                            range
                                .get_value((n_row, n_col))
                                .map(derive_cell_value_from_data)
                                .unwrap_or_default()
                        })
                        .collect();
                    rows.push(row);
                }
            }
            debug!("Loaded sheet {c_name:?} with {} rows.", rows.len());
            sheets.push(SpecXlsxSheet { name: c_name, rows });
        }

        if sheets.is_empty() {
            return Err(HostError::NoSheets(path_file_in.to_path_buf()));
        }

        let n_idx_active = match sheet_name {
            Some(c_name) => sheets
                .iter()
                .position(|sheet| is_same_sheet_name(&sheet.name, c_name))
                .ok_or_else(|| HostError::SheetNotFound(c_name.to_string()))?,
            None => 0,
        };

        Ok(Self {
            path_file_out: path_file_in.to_path_buf(),
            sheets,
            n_idx_active,
            dict_key_by_sheet: RefCell::new(HashMap::new()),
            options,
            n_barriers: 0,
            if_closed: false,
        })
    }

    /// Workbook with a single active sheet built from `rows`.
    pub fn from_grid(
        path_file_out: impl AsRef<Path>,
        sheet_name: &str,
        rows: Vec<Row>,
        options: SpecXlsxStoreOptions,
    ) -> Self {
        Self {
            path_file_out: path_file_out.as_ref().to_path_buf(),
            sheets: vec![SpecXlsxSheet {
                name: sanitize_sheet_name(sheet_name, "_"),
                rows,
            }],
            n_idx_active: 0,
            dict_key_by_sheet: RefCell::new(HashMap::new()),
            options,
            n_barriers: 0,
            if_closed: false,
        }
    }

    /// Redirect [`Self::close`] output.
    pub fn set_file_out(&mut self, path_file_out: impl AsRef<Path>) {
        self.path_file_out = path_file_out.as_ref().to_path_buf();
    }

    /// Output file path as string.
    pub fn file_out(&self) -> String {
        self.path_file_out.to_string_lossy().to_string()
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }

    /// Buffered rows of sheet `name` (case-insensitive).
    pub fn sheet_rows(&self, name: &str) -> Option<&[Row]> {
        self.sheets
            .iter()
            .find(|sheet| is_same_sheet_name(&sheet.name, name))
            .map(|sheet| sheet.rows.as_slice())
    }

    /// Number of write barriers passed so far.
    pub fn barrier_count(&self) -> usize {
        self.n_barriers
    }

    /// Persist the workbook to the output path. Idempotent.
    pub fn close(&mut self) -> Result<(), HostError> {
        if self.if_closed {
            return Ok(());
        }
        self.save(&self.path_file_out)?;
        self.if_closed = true;
        Ok(())
    }

    /// Write every buffered sheet to `path_file_out`.
    pub fn save(&self, path_file_out: &Path) -> Result<(), HostError> {
        let mut workbook = Workbook::new();
        let fmt_header = self.options.fmt_header.as_ref().map(derive_rust_xlsx_format);

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            write_sheet_rows(worksheet, &sheet.rows, fmt_header.as_ref(), &self.options)?;
            if self.options.if_freeze_header && !sheet.rows.is_empty() {
                worksheet.set_freeze_panes(1, 0)?;
            }
            if self.options.if_autofit {
                worksheet.autofit();
            }
        }

        workbook.save(path_file_out)?;
        info!(
            "Saved {} sheets to {}.",
            self.sheets.len(),
            path_file_out.display()
        );
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), HostError> {
        if self.if_closed {
            return Err(HostError::Closed);
        }
        Ok(())
    }

    fn sheet(&self, id: ContainerId) -> Result<&SpecXlsxSheet, HostError> {
        self.sheets.get(id.0).ok_or(HostError::UnknownContainer(id))
    }

    fn sheet_mut(&mut self, id: ContainerId) -> Result<&mut SpecXlsxSheet, HostError> {
        self.sheets.get_mut(id.0).ok_or(HostError::UnknownContainer(id))
    }

    /// Bind `sheet_name` to container key `key` for this session.
    ///
    /// Two distinct keys landing on one sheet would merge their groups.
    fn claim_sheet_name(&self, key: &str, sheet_name: &str) -> Result<(), HostError> {
        let mut dict_key_by_sheet = self.dict_key_by_sheet.borrow_mut();
        let c_sheet_key = sheet_name.to_lowercase();
        match dict_key_by_sheet.get(&c_sheet_key) {
            Some(existing) if existing != key => Err(HostError::ContainerNameCollision {
                key: key.to_string(),
                existing: existing.clone(),
                sheet_name: sheet_name.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                dict_key_by_sheet.insert(c_sheet_key, key.to_string());
                Ok(())
            }
        }
    }
}

impl HostStore for XlsxWorkbook {
    fn get_active_dataset(&self) -> Result<SpecDatasetInfo, HostError> {
        let sheet = self.sheet(ContainerId(self.n_idx_active))?;
        let (n_rows, n_cols) = derive_grid_extents(&sheet.rows);
        Ok(SpecDatasetInfo {
            name: sheet.name.clone(),
            n_rows,
            n_cols,
        })
    }

    fn read_range(
        &self,
        row_start: usize,
        col_start: usize,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<Vec<Row>, HostError> {
        let sheet = self.sheet(ContainerId(self.n_idx_active))?;
        if row_start == 0
            || col_start == 0
            || n_rows == 0
            || n_cols == 0
            || row_start - 1 + n_rows > N_NROWS_EXCEL_MAX
            || col_start - 1 + n_cols > N_NCOLS_EXCEL_MAX
        {
            return Err(HostError::InvalidRange {
                sheet: sheet.name.clone(),
                row_start,
                col_start,
                n_rows,
                n_cols,
            });
        }
        Ok(select_grid_block(
            &sheet.rows,
            row_start,
            col_start,
            n_rows,
            n_cols,
        ))
    }

    fn find_container_by_name(&self, name: &str) -> Result<Option<ContainerId>, HostError> {
        let c_sheet_name = sanitize_sheet_name(name, "_");
        self.claim_sheet_name(name, &c_sheet_name)?;
        Ok(self
            .sheets
            .iter()
            .position(|sheet| is_same_sheet_name(&sheet.name, &c_sheet_name))
            .map(ContainerId))
    }

    fn create_container(&mut self, name: &str) -> Result<ContainerId, HostError> {
        self.ensure_open()?;
        let c_sheet_name = sanitize_sheet_name(name, "_");
        if self
            .sheets
            .iter()
            .any(|sheet| is_same_sheet_name(&sheet.name, &c_sheet_name))
        {
            return Err(HostError::ContainerExists { name: c_sheet_name });
        }
        self.claim_sheet_name(name, &c_sheet_name)?;
        if c_sheet_name != name {
            debug!("Key {name:?} stored as sheet {c_sheet_name:?}.");
        }
        self.sheets.push(SpecXlsxSheet {
            name: c_sheet_name,
            rows: Vec::new(),
        });
        Ok(ContainerId(self.sheets.len() - 1))
    }

    fn clear_container(&mut self, id: ContainerId) -> Result<(), HostError> {
        self.ensure_open()?;
        self.sheet_mut(id)?.rows.clear();
        Ok(())
    }

    fn append_row(&mut self, id: ContainerId, values: &[EnumCellValue]) -> Result<(), HostError> {
        self.ensure_open()?;
        let sheet = self.sheet_mut(id)?;
        if sheet.rows.len() >= N_NROWS_EXCEL_MAX {
            return Err(HostError::RowLimitExceeded {
                sheet: sheet.name.clone(),
                n_rows: sheet.rows.len() + 1,
            });
        }
        if values.len() > N_NCOLS_EXCEL_MAX {
            return Err(HostError::ColumnLimitExceeded {
                sheet: sheet.name.clone(),
                n_cols: values.len(),
            });
        }
        sheet.rows.push(values.to_vec());
        Ok(())
    }

    fn synchronize(&mut self) -> Result<(), HostError> {
        self.ensure_open()?;
        self.n_barriers += 1;
        Ok(())
    }
}

fn derive_cell_value_from_data(value: &Data) -> EnumCellValue {
    match value {
        Data::Empty => EnumCellValue::None,
        Data::String(val) => EnumCellValue::String(val.clone()),
        Data::Int(val) => EnumCellValue::Number(*val as f64),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::Bool(val) => EnumCellValue::Bool(*val),
        Data::DateTime(val) if val.is_duration() => EnumCellValue::Number(val.as_f64()),
        Data::DateTime(val) => EnumCellValue::DateTime(val.as_f64()),
        Data::DateTimeIso(val) | Data::DurationIso(val) => EnumCellValue::String(val.clone()),
        Data::Error(val) => EnumCellValue::String(val.to_string()),
    }
}

fn write_sheet_rows(
    worksheet: &mut Worksheet,
    rows: &[Row],
    fmt_header: Option<&Format>,
    options: &SpecXlsxStoreOptions,
) -> Result<(), HostError> {
    for (n_idx_row, row) in rows.iter().enumerate() {
        let fmt_row = if n_idx_row == 0 { fmt_header } else { None };
        for (n_idx_col, value) in row.iter().enumerate() {
            write_cell(
                worksheet,
                cast_row_num(n_idx_row)?,
                cast_col_num(n_idx_col)?,
                value,
                fmt_row,
                options,
            )?;
        }
    }
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    n_row: u32,
    n_col: u16,
    value: &EnumCellValue,
    format: Option<&Format>,
    options: &SpecXlsxStoreOptions,
) -> Result<(), HostError> {
    match (value, format) {
        (EnumCellValue::DateTime(val), _) => {
            let c_num_format = if val.fract() == 0.0 {
                &options.num_format_date
            } else {
                &options.num_format_datetime
            };
            let fmt_date = format
                .cloned()
                .unwrap_or_else(Format::new)
                .set_num_format(c_num_format);
            worksheet.write_number_with_format(n_row, n_col, *val, &fmt_date)?;
        }
        (EnumCellValue::None, Some(fmt)) => {
            worksheet.write_blank(n_row, n_col, fmt)?;
        }
        (EnumCellValue::None, None) => {}
        (EnumCellValue::String(val), Some(fmt)) => {
            worksheet.write_string_with_format(n_row, n_col, val, fmt)?;
        }
        (EnumCellValue::String(val), None) => {
            worksheet.write_string(n_row, n_col, val)?;
        }
        (EnumCellValue::Number(val), Some(fmt)) => {
            worksheet.write_number_with_format(n_row, n_col, *val, fmt)?;
        }
        (EnumCellValue::Number(val), None) => {
            worksheet.write_number(n_row, n_col, *val)?;
        }
        (EnumCellValue::Bool(val), Some(fmt)) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, fmt)?;
        }
        (EnumCellValue::Bool(val), None) => {
            worksheet.write_boolean(n_row, n_col, *val)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    format
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "center_across" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, HostError> {
    u32::try_from(value).map_err(|_| HostError::RowLimitExceeded {
        sheet: String::new(),
        n_rows: value,
    })
}

fn cast_col_num(value: usize) -> Result<u16, HostError> {
    u16::try_from(value).map_err(|_| HostError::ColumnLimitExceeded {
        sheet: String::new(),
        n_cols: value,
    })
}
