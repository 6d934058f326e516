//! In-memory host collaborators.
//!
//! [`MemoryWorkbook`] behaves like a host whose persistence lags behind its
//! mutation calls: `clear_container` and `append_row` are queued and only land
//! on [`HostStore::synchronize`]. An append picks its target row from the
//! persisted sheet at call time, so two appends without a synchronize in
//! between write the same row and the first one is lost.

use std::cell::RefCell;
use std::collections::VecDeque;

use polars::prelude::DataFrame;

use crate::frame::derive_grid_from_dataframe;
use crate::host::{HostStore, HostUi, SpecPromptResponse};
use crate::spec::{ContainerId, EnumCellValue, HostError, Row, SpecDatasetInfo};
use crate::util::{derive_grid_extents, select_grid_block};

////////////////////////////////////////////////////////////////////////////////
// #region Store

/// Store call recorded by [`MemoryWorkbook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumStoreEvent {
    GetActiveDataset,
    ReadRange {
        row_start: usize,
        col_start: usize,
        n_rows: usize,
        n_cols: usize,
    },
    FindContainer {
        name: String,
        if_found: bool,
    },
    CreateContainer {
        name: String,
    },
    ClearContainer {
        name: String,
    },
    AppendRow {
        name: String,
        /// 0-based row the append will land on.
        row_target: usize,
    },
    Synchronize,
}

#[derive(Debug, Clone)]
enum EnumPendingOp {
    Clear(ContainerId),
    WriteRow {
        id: ContainerId,
        row_idx: usize,
        values: Row,
    },
}

#[derive(Debug, Clone)]
struct SpecMemorySheet {
    name: String,
    rows: Vec<Row>,
}

/// Workbook held in memory with deferred persistence.
#[derive(Debug, Clone)]
pub struct MemoryWorkbook {
    sheets: Vec<SpecMemorySheet>,
    n_idx_active: usize,
    l_pending: Vec<EnumPendingOp>,
    l_journal: RefCell<Vec<EnumStoreEvent>>,
    n_appends_allowed: Option<usize>,
}

impl MemoryWorkbook {
    /// Workbook with one active sheet holding `rows` (row 1 is the header).
    pub fn from_grid(name: &str, rows: Vec<Row>) -> Self {
        Self {
            sheets: vec![SpecMemorySheet {
                name: name.to_string(),
                rows,
            }],
            n_idx_active: 0,
            l_pending: Vec::new(),
            l_journal: RefCell::new(Vec::new()),
            n_appends_allowed: None,
        }
    }

    /// Workbook whose active sheet is `df` with column names as header.
    pub fn from_dataframe(name: &str, df: &DataFrame) -> Result<Self, HostError> {
        Ok(Self::from_grid(name, derive_grid_from_dataframe(df)?))
    }

    /// Add or overwrite a persisted sheet without journaling.
    pub fn insert_sheet(&mut self, name: &str, rows: Vec<Row>) {
        match self.sheets.iter_mut().find(|sheet| sheet.name == name) {
            Some(sheet) => sheet.rows = rows,
            None => self.sheets.push(SpecMemorySheet {
                name: name.to_string(),
                rows,
            }),
        }
    }

    /// Make all appends after the first `n` fail with an I/O error.
    pub fn fail_appends_after(&mut self, n: usize) {
        self.n_appends_allowed = Some(n);
    }

    /// Persisted rows of sheet `name`.
    pub fn sheet_rows(&self, name: &str) -> Option<&[Row]> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name == name)
            .map(|sheet| sheet.rows.as_slice())
    }

    /// Sheet names in creation order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }

    /// Number of queued, not yet persisted mutations.
    pub fn pending_count(&self) -> usize {
        self.l_pending.len()
    }

    /// Snapshot of recorded store calls.
    pub fn journal(&self) -> Vec<EnumStoreEvent> {
        self.l_journal.borrow().clone()
    }

    fn record(&self, event: EnumStoreEvent) {
        self.l_journal.borrow_mut().push(event);
    }

    fn sheet(&self, id: ContainerId) -> Result<&SpecMemorySheet, HostError> {
        self.sheets.get(id.0).ok_or(HostError::UnknownContainer(id))
    }

    fn sheet_mut(&mut self, id: ContainerId) -> Result<&mut SpecMemorySheet, HostError> {
        self.sheets.get_mut(id.0).ok_or(HostError::UnknownContainer(id))
    }
}

impl HostStore for MemoryWorkbook {
    fn get_active_dataset(&self) -> Result<SpecDatasetInfo, HostError> {
        self.record(EnumStoreEvent::GetActiveDataset);
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
        self.record(EnumStoreEvent::ReadRange {
            row_start,
            col_start,
            n_rows,
            n_cols,
        });
        let sheet = self.sheet(ContainerId(self.n_idx_active))?;
        if row_start == 0 || col_start == 0 || n_rows == 0 || n_cols == 0 {
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
        let id = self
            .sheets
            .iter()
            .position(|sheet| sheet.name == name)
            .map(ContainerId);
        self.record(EnumStoreEvent::FindContainer {
            name: name.to_string(),
            if_found: id.is_some(),
        });
        Ok(id)
    }

    fn create_container(&mut self, name: &str) -> Result<ContainerId, HostError> {
        self.record(EnumStoreEvent::CreateContainer {
            name: name.to_string(),
        });
        if self.sheets.iter().any(|sheet| sheet.name == name) {
            return Err(HostError::ContainerExists {
                name: name.to_string(),
            });
        }
        self.sheets.push(SpecMemorySheet {
            name: name.to_string(),
            rows: Vec::new(),
        });
        Ok(ContainerId(self.sheets.len() - 1))
    }

    fn clear_container(&mut self, id: ContainerId) -> Result<(), HostError> {
        let name = self.sheet(id)?.name.clone();
        self.record(EnumStoreEvent::ClearContainer { name });
        self.l_pending.push(EnumPendingOp::Clear(id));
        Ok(())
    }

    fn append_row(&mut self, id: ContainerId, values: &[EnumCellValue]) -> Result<(), HostError> {
        if let Some(n_left) = self.n_appends_allowed.as_mut() {
            if *n_left == 0 {
                return Err(HostError::Io(std::io::Error::other(
                    "append rejected by host",
                )));
            }
            *n_left -= 1;
        }

        let sheet = self.sheet(id)?;
        let row_target = sheet.rows.len();
        self.record(EnumStoreEvent::AppendRow {
            name: sheet.name.clone(),
            row_target,
        });
        self.l_pending.push(EnumPendingOp::WriteRow {
            id,
            row_idx: row_target,
            values: values.to_vec(),
        });
        Ok(())
    }

    fn synchronize(&mut self) -> Result<(), HostError> {
        self.record(EnumStoreEvent::Synchronize);
        for op in std::mem::take(&mut self.l_pending) {
            match op {
                EnumPendingOp::Clear(id) => self.sheet_mut(id)?.rows.clear(),
                EnumPendingOp::WriteRow { id, row_idx, values } => {
                    let sheet = self.sheet_mut(id)?;
                    if sheet.rows.len() <= row_idx {
                        sheet.rows.resize(row_idx + 1, Vec::new());
                    }
                    sheet.rows[row_idx] = values;
                }
            }
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Dialogs

/// Dialog call recorded by [`ScriptedUi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumUiEvent {
    Prompt { title: String, message: String },
    Confirm { title: String, message: String },
    Alert { title: String, message: String },
}

/// [`HostUi`] answering from a queue of canned responses.
///
/// An exhausted queue answers as if the user pressed Cancel.
#[derive(Debug, Clone, Default)]
pub struct ScriptedUi {
    l_prompt_responses: VecDeque<SpecPromptResponse>,
    l_confirm_responses: VecDeque<bool>,
    l_events: Vec<EnumUiEvent>,
}

impl ScriptedUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a prompt answer of `text` with OK.
    pub fn with_prompt_text(mut self, text: &str) -> Self {
        self.l_prompt_responses.push_back(SpecPromptResponse {
            text: text.to_string(),
            if_cancelled: false,
        });
        self
    }

    /// Queue a dismissed prompt.
    pub fn with_prompt_cancelled(mut self) -> Self {
        self.l_prompt_responses.push_back(SpecPromptResponse {
            text: String::new(),
            if_cancelled: true,
        });
        self
    }

    /// Queue a confirmation answer.
    pub fn with_confirm(mut self, if_ok: bool) -> Self {
        self.l_confirm_responses.push_back(if_ok);
        self
    }

    pub fn events(&self) -> &[EnumUiEvent] {
        &self.l_events
    }

    /// `(title, message)` of every alert shown.
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.l_events
            .iter()
            .filter_map(|event| match event {
                EnumUiEvent::Alert { title, message } => Some((title.clone(), message.clone())),
                _ => None,
            })
            .collect()
    }
}

impl HostUi for ScriptedUi {
    fn prompt_for_number(&mut self, title: &str, message: &str) -> SpecPromptResponse {
        self.l_events.push(EnumUiEvent::Prompt {
            title: title.to_string(),
            message: message.to_string(),
        });
        self.l_prompt_responses
            .pop_front()
            .unwrap_or(SpecPromptResponse {
                text: String::new(),
                if_cancelled: true,
            })
    }

    fn confirm(&mut self, title: &str, message: &str) -> bool {
        self.l_events.push(EnumUiEvent::Confirm {
            title: title.to_string(),
            message: message.to_string(),
        });
        self.l_confirm_responses.pop_front().unwrap_or(false)
    }

    fn alert(&mut self, title: &str, message: &str) {
        self.l_events.push(EnumUiEvent::Alert {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_row(cells: &[&str]) -> Row {
        cells.iter().map(|c| EnumCellValue::from(*c)).collect()
    }

    #[test]
    fn unsynchronized_appends_overwrite_each_other() {
        let mut store = MemoryWorkbook::from_grid("Data", vec![]);
        let id = store.create_container("East").unwrap();

        store.append_row(id, &derive_row(&["first"])).unwrap();
        store.append_row(id, &derive_row(&["second"])).unwrap();
        assert_eq!(store.pending_count(), 2);
        assert!(store.sheet_rows("East").unwrap().is_empty());

        store.synchronize().unwrap();
        assert_eq!(store.sheet_rows("East").unwrap(), &[derive_row(&["second"])]);
    }

    #[test]
    fn synchronized_appends_are_kept_in_order() {
        let mut store = MemoryWorkbook::from_grid("Data", vec![]);
        let id = store.create_container("East").unwrap();

        for c_val in ["first", "second", "third"] {
            store.append_row(id, &derive_row(&[c_val])).unwrap();
            store.synchronize().unwrap();
        }
        assert_eq!(
            store.sheet_rows("East").unwrap(),
            &[
                derive_row(&["first"]),
                derive_row(&["second"]),
                derive_row(&["third"])
            ]
        );
    }

    #[test]
    fn append_before_synchronized_clear_leaves_a_gap() {
        let mut store = MemoryWorkbook::from_grid("Data", vec![]);
        store.insert_sheet("East", vec![derive_row(&["old"]), derive_row(&["old"])]);
        let id = store.find_container_by_name("East").unwrap().unwrap();

        store.clear_container(id).unwrap();
        store.append_row(id, &derive_row(&["new"])).unwrap();
        store.synchronize().unwrap();

        let rows = store.sheet_rows("East").unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_empty());
        assert_eq!(rows[2], derive_row(&["new"]));
    }

    #[test]
    fn dataset_extents_ignore_trailing_blanks() {
        let store = MemoryWorkbook::from_grid(
            "Data",
            vec![
                derive_row(&["Name", "Region", ""]),
                derive_row(&["A", "East"]),
                derive_row(&["", ""]),
            ],
        );

        let info = store.get_active_dataset().unwrap();
        assert_eq!(info.name, "Data");
        assert_eq!(info.n_rows, 2);
        assert_eq!(info.n_cols, 2);
    }

    #[test]
    fn read_range_rejects_zero_coordinates() {
        let store = MemoryWorkbook::from_grid("Data", vec![derive_row(&["Name"])]);
        assert!(matches!(
            store.read_range(0, 1, 1, 1),
            Err(HostError::InvalidRange { .. })
        ));
    }

    #[test]
    fn create_existing_container_fails() {
        let mut store = MemoryWorkbook::from_grid("Data", vec![]);
        store.create_container("East").unwrap();
        assert!(matches!(
            store.create_container("East"),
            Err(HostError::ContainerExists { .. })
        ));
    }

    #[test]
    fn dataframe_backed_workbook_splits_like_a_grid() {
        use polars::prelude::Column;

        use crate::runner::split_active_sheet;
        use crate::spec::SpecSplitOptions;

        let df = DataFrame::new(vec![
            Column::new("Name".into(), ["A", "B", "C"]),
            Column::new("Qty".into(), [3i64, 4, 3]),
        ])
        .unwrap();
        let mut store = MemoryWorkbook::from_dataframe("Data", &df).unwrap();

        let info = store.get_active_dataset().unwrap();
        assert_eq!((info.n_rows, info.n_cols), (4, 2));

        let report = split_active_sheet(&mut store, 2, &SpecSplitOptions::default()).unwrap();
        assert_eq!(report.containers.len(), 2);
        assert_eq!(
            store.sheet_rows("3").unwrap(),
            &[
                derive_row(&["Name", "Qty"]),
                vec!["A".into(), EnumCellValue::Number(3.0)],
                vec!["C".into(), EnumCellValue::Number(3.0)]
            ]
        );
    }

    #[test]
    fn scripted_ui_defaults_to_cancel() {
        let mut ui = ScriptedUi::new().with_prompt_text("2");
        assert_eq!(ui.prompt_for_number("t", "m").text, "2");
        assert!(ui.prompt_for_number("t", "m").if_cancelled);
        assert!(!ui.confirm("t", "m"));
        ui.alert("Stopped", "Cancelled.");
        assert_eq!(
            ui.alerts(),
            vec![("Stopped".to_string(), "Cancelled.".to_string())]
        );
        assert_eq!(ui.events().len(), 4);
    }
}
