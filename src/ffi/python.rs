// In: src/ffi/python.rs

use std::path::PathBuf;

use arrow::pyarrow::PyArrowType;
use arrow::record_batch::RecordBatch;
use log::LevelFilter;
use pyo3::prelude::*;

use crate::filter::PostFilter;
use crate::ingest::{IngestOutcome, Ingester};
use crate::observability::{self, LogDiagnostics};

/// Runs one ingest pass with the GIL released.
fn ingest_detached(py: Python<'_>, path: PathBuf) -> PyResult<IngestOutcome> {
    let outcome = py.allow_threads(|| Ingester::default().ingest(&path, &mut LogDiagnostics))?;
    Ok(outcome)
}

//==================================================================================
// I. Loading
//==================================================================================

/// Loads a zstd-compressed NDJSON archive.
///
/// Returns `(pyarrow.RecordBatch, bad_lines)`. `columns` restricts and orders
/// the exported columns; unknown names become all-null columns.
#[pyfunction]
#[pyo3(name = "load_reddit_data", signature = (path, columns = None))]
pub fn load_reddit_data_py(
    py: Python<'_>,
    path: PathBuf,
    columns: Option<Vec<String>>,
) -> PyResult<(PyArrowType<RecordBatch>, usize)> {
    let outcome = ingest_detached(py, path)?;
    let selected: Option<Vec<&str>> = columns
        .as_ref()
        .map(|names| names.iter().map(String::as_str).collect());
    let batch = outcome.table.to_record_batch(selected.as_deref())?;
    Ok((PyArrowType(batch), outcome.bad_records))
}

//==================================================================================
// II. Filtering
//==================================================================================

/// Loads an archive and applies the dashboard's post filter in one call.
#[pyfunction]
#[pyo3(
    name = "filter_data",
    signature = (path, min_chars, keywords = None, start_year = None, end_year = None)
)]
pub fn filter_data_py(
    py: Python<'_>,
    path: PathBuf,
    min_chars: usize,
    keywords: Option<Vec<String>>,
    start_year: Option<i32>,
    end_year: Option<i32>,
) -> PyResult<PyArrowType<RecordBatch>> {
    let outcome = ingest_detached(py, path)?;

    let mut filter = PostFilter::new(min_chars).keywords(keywords.unwrap_or_default());
    if let Some(year) = start_year {
        filter = filter.start_year(year);
    }
    if let Some(year) = end_year {
        filter = filter.end_year(year);
    }
    let filtered = py.allow_threads(|| filter.apply(&outcome.table))?;
    Ok(PyArrowType(filtered.to_record_batch(None)?))
}

//==================================================================================
// III. Logging
//==================================================================================

/// Turns on info-level logging, to stderr or appended to `log_file`.
#[pyfunction]
#[pyo3(name = "enable_verbose_logging", signature = (log_file = None))]
pub fn enable_verbose_logging_py(log_file: Option<PathBuf>) {
    observability::init_logging(LevelFilter::Info, log_file.as_deref());
}
