//! Split entry points: the interactive menu flow and the direct pipeline.

use tracing::{info, warn};

use crate::conf::{
    C_MSG_CANCELLED, C_MSG_NOT_A_NUMBER, C_MSG_OUT_OF_RANGE, C_MSG_PROMPT_KEY_COLUMN,
    C_TITLE_CONFIRM, C_TITLE_ERROR, C_TITLE_STOPPED, derive_confirm_message,
};
use crate::extract::{extract_dataset, read_data_rows, read_header, read_validated_dataset_info};
use crate::host::{HostStore, HostUi};
use crate::partition::partition_rows;
use crate::spec::{
    EnumCellValue, Row, SpecDatasetInfo, SpecSplitOptions, SpecSplitReport, SplitError,
};
use crate::util::{is_same_sheet_name, parse_key_column_input};
use crate::writer::write_partitions;

/// Run the menu-triggered flow: prompt, validate, confirm, split.
///
/// Cancellations and validation failures are shown through `ui` before being
/// returned. [`SplitError::HostFailure`] is returned without a notice and may
/// leave the containers written so far in place.
pub fn run_split<U, S>(
    ui: &mut U,
    store: &mut S,
    options: &SpecSplitOptions,
) -> Result<SpecSplitReport, SplitError>
where
    U: HostUi + ?Sized,
    S: HostStore + ?Sized,
{
    run_split_inner(ui, store, options).inspect_err(|err| notify_error(ui, err))
}

/// Split the active dataset on 1-based `key_column` without any dialogs.
pub fn split_active_sheet<S: HostStore + ?Sized>(
    store: &mut S,
    key_column: i64,
    options: &SpecSplitOptions,
) -> Result<SpecSplitReport, SplitError> {
    let (info, n_key_column, data) = extract_dataset(store, key_column)?;
    materialize_partitions(store, &info, n_key_column, &data.header, &data.rows, options)
}

fn run_split_inner<U, S>(
    ui: &mut U,
    store: &mut S,
    options: &SpecSplitOptions,
) -> Result<SpecSplitReport, SplitError>
where
    U: HostUi + ?Sized,
    S: HostStore + ?Sized,
{
    let resp = ui.prompt_for_number(C_TITLE_CONFIRM, C_MSG_PROMPT_KEY_COLUMN);
    if resp.if_cancelled {
        return Err(SplitError::UserCancelled);
    }
    let key_column = parse_key_column_input(&resp.text)?;

    let (info, n_key_column) = read_validated_dataset_info(store, key_column)?;
    let header = read_header(store, &info)?;

    let c_label = header
        .get(n_key_column - 1)
        .map(ToString::to_string)
        .unwrap_or_default();
    if !ui.confirm(C_TITLE_CONFIRM, &derive_confirm_message(&c_label)) {
        return Err(SplitError::UserCancelled);
    }

    let rows = read_data_rows(store, &info)?;
    materialize_partitions(store, &info, n_key_column, &header, &rows, options)
}

fn materialize_partitions<S: HostStore + ?Sized>(
    store: &mut S,
    info: &SpecDatasetInfo,
    n_key_column: usize,
    header: &[EnumCellValue],
    rows: &[Row],
    options: &SpecSplitOptions,
) -> Result<SpecSplitReport, SplitError> {
    let partition = partition_rows(rows, n_key_column, options);

    let mut report = SpecSplitReport {
        source: info.name.clone(),
        key_column: n_key_column,
        n_rows_data: rows.len(),
        ..Default::default()
    };
    for c_key in partition.keys() {
        if is_same_sheet_name(c_key, &info.name) {
            let c_msg =
                format!("Key {c_key:?} names the source sheet; its contents were replaced.");
            warn!("{c_msg}");
            report.warn(c_msg);
        }
    }

    report.containers = write_partitions(store, header, &partition, &options.empty_key)?;
    info!("{report}");
    Ok(report)
}

fn notify_error<U: HostUi + ?Sized>(ui: &mut U, err: &SplitError) {
    match err {
        SplitError::UserCancelled => ui.alert(C_TITLE_STOPPED, C_MSG_CANCELLED),
        SplitError::InvalidInput { .. } => ui.alert(C_TITLE_ERROR, C_MSG_NOT_A_NUMBER),
        SplitError::OutOfRange { .. } => ui.alert(C_TITLE_ERROR, C_MSG_OUT_OF_RANGE),
        SplitError::HostFailure(_) => {}
    }
}
