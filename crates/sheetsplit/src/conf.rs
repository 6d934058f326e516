//! Split constants, dialog texts and default preset factories.

use crate::spec::{SpecCellFormat, SpecSplitOptions, SpecXlsxStoreOptions};

/// 1-based row number holding the header.
pub const N_ROW_HEADER: usize = 1;
/// Label substituted for blank key values.
pub const C_EMPTY_KEY_SENTINEL: &str = "empty";

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Number format written for date cells.
pub const C_NUM_FORMAT_DATE: &str = "yyyy-mm-dd";
/// Number format written for date cells with a time of day.
pub const C_NUM_FORMAT_DATETIME: &str = "yyyy-mm-dd hh:mm:ss";

////////////////////////////////////////////////////////////////////////////////
// #region DialogTexts

/// Menu item label registered by hosts that expose a menu.
pub const C_MENU_ITEM_LABEL: &str = "Split by key column";

pub const C_TITLE_CONFIRM: &str = "Confirm";
pub const C_TITLE_STOPPED: &str = "Stopped";
pub const C_TITLE_ERROR: &str = "Error";

pub const C_MSG_PROMPT_KEY_COLUMN: &str =
    "Which column number is the key? Column numbers start at 1.";
pub const C_MSG_CANCELLED: &str = "Cancelled.";
pub const C_MSG_NOT_A_NUMBER: &str = "Please enter a column number.";
pub const C_MSG_OUT_OF_RANGE: &str = "The column number is outside the sheet's columns.";

/// Confirmation text shown before splitting on column labelled `header_label`.
pub fn derive_confirm_message(header_label: &str) -> String {
    format!("Start splitting rows using the \"{header_label}\" column as the key.")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

/// Header cell preset applied to row 1 of every persisted sheet.
pub fn derive_default_header_format() -> SpecCellFormat {
    SpecCellFormat {
        bold: Some(true),
        align: Some("center".to_string()),
        ..Default::default()
    }
}

/// Build default split options.
pub fn derive_default_split_options() -> SpecSplitOptions {
    SpecSplitOptions::default()
}

/// Build default xlsx store options.
pub fn derive_default_xlsx_store_options() -> SpecXlsxStoreOptions {
    SpecXlsxStoreOptions::default()
}
