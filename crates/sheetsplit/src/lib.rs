//! `sheetsplit` v1:
//! Split the rows of a sheet into one sheet per distinct key-column value.
//!
//! Architecture:
//! - `conf`      : constants, dialog texts and default presets
//! - `spec`      : specs/models/options/errors
//! - `util`      : pure helper functions
//! - `host`      : dialog and store traits implemented by hosts
//! - `extract`   : header and data-block reads
//! - `partition` : key dedup and row grouping
//! - `writer`    : create-or-replace container writes
//! - `runner`    : interactive flow and direct pipeline entry points
//! - `memory`    : in-memory store and scripted dialogs
//! - `xlsx`      : `.xlsx` file store
//! - `frame`     : Polars `DataFrame` adapter
pub mod conf;
pub mod extract;
pub mod frame;
pub mod host;
pub mod memory;
pub mod partition;
pub mod runner;
pub mod spec;
pub mod util;
pub mod writer;
pub mod xlsx;

pub use conf::{C_EMPTY_KEY_SENTINEL, C_MENU_ITEM_LABEL, N_ROW_HEADER};
pub use host::{HostStore, HostUi, SpecPromptResponse};
pub use memory::{MemoryWorkbook, ScriptedUi};
pub use partition::partition_rows;
pub use runner::{run_split, split_active_sheet};
pub use spec::{
    ContainerId, EnumCellValue, EnumPartitionStrategy, HostError, Row, SpecCellFormat,
    SpecContainerWrite, SpecDatasetInfo, SpecPartition, SpecPartitionGroup, SpecSplitOptions,
    SpecSplitReport, SpecXlsxStoreOptions, SplitError,
};
pub use util::{parse_key_column_input, sanitize_sheet_name, uniq};
pub use xlsx::XlsxWorkbook;
