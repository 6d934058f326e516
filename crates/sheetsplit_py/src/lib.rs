use std::collections::BTreeMap;
use std::path::PathBuf;

use pyo3::exceptions::{PyOSError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyList, PyTuple};
use sheetsplit::conf::derive_default_xlsx_store_options;
use sheetsplit::frame::{derive_dataframe_from_ipc_bytes, derive_grid_from_dataframe};
use sheetsplit::util::validate_key_column;
use sheetsplit::{
    EnumCellValue, EnumPartitionStrategy, Row, SpecSplitOptions, SpecSplitReport, SplitError,
    XlsxWorkbook, split_active_sheet,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "sheetsplit.split.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "SplitReport")]
#[derive(Debug, Clone)]
struct PySplitReport {
    inner: SpecSplitReport,
}

impl From<SpecSplitReport> for PySplitReport {
    fn from(report: SpecSplitReport) -> Self {
        Self { inner: report }
    }
}

#[pymethods]
impl PySplitReport {
    #[getter]
    fn source(&self) -> String {
        self.inner.source.clone()
    }

    #[getter]
    fn key_column(&self) -> usize {
        self.inner.key_column
    }

    #[getter]
    fn n_rows_data(&self) -> usize {
        self.inner.n_rows_data
    }

    /// `(name, n_rows, if_replaced)` per container, in write order.
    #[getter]
    fn containers(&self) -> Vec<(String, usize, bool)> {
        self.inner
            .containers
            .iter()
            .map(|container| (container.name.clone(), container.n_rows, container.if_replaced))
            .collect()
    }

    #[getter]
    fn warnings(&self) -> Vec<String> {
        self.inner.warnings.clone()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.inner.to_dict()
    }

    #[pyo3(signature = (prefix = "[SPLIT]"))]
    fn format(&self, prefix: &str) -> String {
        self.inner.format(prefix)
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

fn parse_rule_strategy(value: &str) -> PyResult<EnumPartitionStrategy> {
    match value {
        "single_pass" => Ok(EnumPartitionStrategy::SinglePass),
        "filter_per_key" => Ok(EnumPartitionStrategy::FilterPerKey),
        _ => Err(PyValueError::new_err(format!(
            "Invalid partition strategy: `{value}`. Expected one of: ['single_pass', 'filter_per_key']"
        ))),
    }
}

fn parse_cell_value(obj: &Bound<'_, PyAny>) -> PyResult<EnumCellValue> {
    if obj.is_none() {
        return Ok(EnumCellValue::None);
    }
    // bool is a subclass of int; check it first.
    if let Ok(val) = obj.downcast::<PyBool>() {
        return Ok(EnumCellValue::Bool(val.is_true()));
    }
    if let Ok(val) = obj.extract::<String>() {
        return Ok(EnumCellValue::String(val));
    }
    if let Ok(val) = obj.extract::<f64>() {
        return Ok(EnumCellValue::Number(val));
    }
    Err(PyTypeError::new_err(format!(
        "Cell values must be None, bool, int, float or str, got: {}",
        obj.get_type().name()?
    )))
}

fn parse_row(l_cells: &[Bound<'_, PyAny>]) -> PyResult<Row> {
    l_cells.iter().map(parse_cell_value).collect()
}

/// Integral numbers go back to Python as `int`, dates as ISO text.
fn create_cell_object(py: Python<'_>, value: &EnumCellValue) -> PyResult<PyObject> {
    let obj = match value {
        EnumCellValue::None => py.None(),
        EnumCellValue::String(val) => val.into_pyobject(py)?.into_any().unbind(),
        EnumCellValue::Bool(val) => PyBool::new(py, *val).to_owned().into_any().unbind(),
        EnumCellValue::Number(val)
            if val.fract() == 0.0 && val.abs() < i64::MAX as f64 =>
        {
            (*val as i64).into_pyobject(py)?.into_any().unbind()
        }
        EnumCellValue::Number(val) => val.into_pyobject(py)?.into_any().unbind(),
        EnumCellValue::DateTime(_) => value.to_string().into_pyobject(py)?.into_any().unbind(),
    };
    Ok(obj)
}

fn map_split_error(exception: SplitError) -> PyErr {
    match exception {
        SplitError::HostFailure(err) => PyOSError::new_err(err.to_string()),
        err => PyValueError::new_err(err.to_string()),
    }
}

fn derive_split_options(empty_key: String, rule_strategy: &str) -> PyResult<SpecSplitOptions> {
    Ok(SpecSplitOptions {
        empty_key,
        strategy: parse_rule_strategy(rule_strategy)?,
    })
}

#[pyfunction(name = "uniq")]
fn uniq_py(values: Vec<String>) -> Vec<String> {
    sheetsplit::uniq(&values)
}

#[pyfunction(name = "partition_rows")]
#[pyo3(signature = (
    header,
    rows,
    key_column,
    empty_key = "empty".to_string(),
    rule_strategy = "single_pass"
))]
fn partition_rows_py<'py>(
    py: Python<'py>,
    header: Vec<Bound<'py, PyAny>>,
    rows: Vec<Vec<Bound<'py, PyAny>>>,
    key_column: i64,
    empty_key: String,
    rule_strategy: &str,
) -> PyResult<Bound<'py, PyList>> {
    let spec_options = derive_split_options(empty_key, rule_strategy)?;
    let n_key_column = validate_key_column(key_column, header.len()).map_err(map_split_error)?;
    let l_rows = rows
        .iter()
        .map(|row| parse_row(row))
        .collect::<PyResult<Vec<Row>>>()?;

    let partition = sheetsplit::partition_rows(&l_rows, n_key_column, &spec_options);

    let mut l_groups = Vec::with_capacity(partition.len());
    for group in &partition.groups {
        let mut l_row_objs = Vec::with_capacity(group.rows.len());
        for row in &group.rows {
            let l_cells = row
                .iter()
                .map(|cell| create_cell_object(py, cell))
                .collect::<PyResult<Vec<_>>>()?;
            l_row_objs.push(PyList::new(py, l_cells)?);
        }
        let tup_group = PyTuple::new(
            py,
            [
                group.key.clone().into_pyobject(py)?.into_any(),
                PyList::new(py, l_row_objs)?.into_any(),
            ],
        )?;
        l_groups.push(tup_group);
    }
    PyList::new(py, l_groups)
}

#[pyfunction(name = "split_xlsx")]
#[pyo3(signature = (
    file_in,
    key_column,
    file_out = None,
    sheet_name = None,
    empty_key = "empty".to_string(),
    rule_strategy = "single_pass"
))]
fn split_xlsx_py(
    py: Python<'_>,
    file_in: String,
    key_column: i64,
    file_out: Option<String>,
    sheet_name: Option<String>,
    empty_key: String,
    rule_strategy: &str,
) -> PyResult<PySplitReport> {
    let spec_options = derive_split_options(empty_key, rule_strategy)?;

    let report = py.allow_threads(|| -> Result<SpecSplitReport, SplitError> {
        let mut store = XlsxWorkbook::open(
            PathBuf::from(&file_in),
            sheet_name.as_deref(),
            derive_default_xlsx_store_options(),
        )?;
        if let Some(c_file_out) = &file_out {
            store.set_file_out(c_file_out);
        }
        let report = split_active_sheet(&mut store, key_column, &spec_options)?;
        store.close()?;
        Ok(report)
    });
    let report = report.map_err(map_split_error)?;
    Ok(PySplitReport::from(report))
}

#[pyfunction(name = "split_ipc_to_xlsx")]
#[pyo3(signature = (
    ipc_bytes,
    file_out,
    key_column,
    sheet_name = "data".to_string(),
    empty_key = "empty".to_string(),
    rule_strategy = "single_pass"
))]
fn split_ipc_to_xlsx_py(
    py: Python<'_>,
    ipc_bytes: Vec<u8>,
    file_out: String,
    key_column: i64,
    sheet_name: String,
    empty_key: String,
    rule_strategy: &str,
) -> PyResult<PySplitReport> {
    let spec_options = derive_split_options(empty_key, rule_strategy)?;

    let report = py.allow_threads(|| -> Result<SpecSplitReport, SplitError> {
        let df = derive_dataframe_from_ipc_bytes(&ipc_bytes)?;
        let l_grid = derive_grid_from_dataframe(&df)?;
        let mut store = XlsxWorkbook::from_grid(
            PathBuf::from(&file_out),
            &sheet_name,
            l_grid,
            derive_default_xlsx_store_options(),
        );
        let report = split_active_sheet(&mut store, key_column, &spec_options)?;
        store.close()?;
        Ok(report)
    });
    let report = report.map_err(map_split_error)?;
    Ok(PySplitReport::from(report))
}

/// `(abi, contract, transport)` of this extension.
#[pyfunction]
fn bridge_contract() -> (u64, &'static str, &'static str) {
    (
        N_BRIDGE_ABI_VERSION,
        C_BRIDGE_CONTRACT_VERSION,
        C_BRIDGE_TRANSPORT,
    )
}

#[pymodule]
fn _sheetsplit_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PySplitReport>()?;
    module.add_function(wrap_pyfunction!(uniq_py, module)?)?;
    module.add_function(wrap_pyfunction!(partition_rows_py, module)?)?;
    module.add_function(wrap_pyfunction!(split_xlsx_py, module)?)?;
    module.add_function(wrap_pyfunction!(split_ipc_to_xlsx_py, module)?)?;
    module.add_function(wrap_pyfunction!(bridge_contract, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
