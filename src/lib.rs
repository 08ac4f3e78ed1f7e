//! This file is the root of the `reddit_ingest` Rust crate.
//!
//! The crate turns a zstd-compressed, newline-delimited JSON archive of Reddit
//! posts into an ordered table in a single streaming pass:
//! 1.  [`decoder`] pulls bounded blocks from the zstd stream and yields
//!     complete UTF-8 text chunks.
//! 2.  [`ingest`] splits those chunks into records, parses each one and
//!     collects the survivors into a [`ResultTable`].
//! 3.  [`filter`] and [`table::arrow_impl`] prepare the table for analysis.
//!
//! With the `python` feature the crate also builds the `reddit_ingest`
//! Python extension module.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod config;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod kernels;
pub mod table;

#[cfg(feature = "python")]
mod ffi;

pub use config::IngestConfig;
pub use error::{DecodeError, IngestError, RecordError};
pub use filter::{FilterConfig, PostFilter};
pub use ingest::{ingest, read_lines, IngestOutcome, Ingester};
pub use observability::{CountingDiagnostics, Diagnostics, LogDiagnostics, NullDiagnostics};
pub use table::{ParsedPost, RecordPosition, ResultTable};

//==================================================================================
// 2. Python Module Definition
//==================================================================================
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The `reddit_ingest` Python module, containing all exposed Rust functions.
#[cfg(feature = "python")]
#[pymodule]
fn reddit_ingest(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(ffi::python::load_reddit_data_py, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::python::filter_data_py, m)?)?;

    // --- Expose version string as a module attribute ---
    m.add("__version__", VERSION)?;

    // --- Logging for hosts that want to see ingest progress ---
    m.add_function(wrap_pyfunction!(ffi::python::enable_verbose_logging_py, m)?)?;

    Ok(())
}
