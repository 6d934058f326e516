//! Host collaborator seams: dialogs and the workbook-like store.

use crate::spec::{ContainerId, EnumCellValue, HostError, Row, SpecDatasetInfo};

/// Answer to a numeric prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecPromptResponse {
    /// Raw response text.
    pub text: String,
    /// Whether the user dismissed the prompt.
    pub if_cancelled: bool,
}

/// Dialog primitives offered by the host.
pub trait HostUi {
    /// Ask for a number; the text is returned unparsed.
    fn prompt_for_number(&mut self, title: &str, message: &str) -> SpecPromptResponse;

    /// Ask for OK/Cancel. Returns `true` on OK.
    fn confirm(&mut self, title: &str, message: &str) -> bool;

    /// Show a notice.
    fn alert(&mut self, title: &str, message: &str);
}

/// Workbook-like store holding the active dataset and named containers.
///
/// Coordinates are 1-based. Mutations may be buffered by the store until
/// [`HostStore::synchronize`] returns.
pub trait HostStore {
    /// Extents and name of the active dataset.
    fn get_active_dataset(&self) -> Result<SpecDatasetInfo, HostError>;

    /// Read a rectangular block of the active dataset.
    fn read_range(
        &self,
        row_start: usize,
        col_start: usize,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<Vec<Row>, HostError>;

    /// Look up a container by name.
    fn find_container_by_name(&self, name: &str) -> Result<Option<ContainerId>, HostError>;

    /// Create an empty container named `name`.
    fn create_container(&mut self, name: &str) -> Result<ContainerId, HostError>;

    /// Destroy every cell in the container.
    fn clear_container(&mut self, id: ContainerId) -> Result<(), HostError>;

    /// Append one row after the container's last used row.
    fn append_row(&mut self, id: ContainerId, values: &[EnumCellValue]) -> Result<(), HostError>;

    /// Block until every issued mutation is durably visible.
    fn synchronize(&mut self) -> Result<(), HostError>;
}
