// In: src/error.rs

//! This module defines the single, unified error type for the ingestion library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Two tiers exist:
//! - [`IngestError`] is fatal. It aborts an ingest call and is surfaced to the caller.
//! - [`RecordError`] describes one malformed line. It never escapes the ingester;
//!   it is counted and handed to the diagnostics sink instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    // =========================================================================
    // === Archive-Level Errors (fatal, abort the pass)
    // =========================================================================
    /// The archive could not be opened or read.
    #[error("I/O error on '{path}': {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error from the underlying I/O subsystem or the zstd stream itself
    /// (corrupt frame, truncated frame, window too large).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The decompressed bytes could not be turned into text.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    // =========================================================================
    // === Configuration & Consumer Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An error from the Serde JSON library, typically while loading a config file.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// An error originating from the Arrow library during table export.
    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// The keyword pattern of a post filter failed to compile.
    #[error("Filter pattern failed to compile: {0}")]
    Filter(#[from] regex::Error),
}

impl IngestError {
    /// Wraps an I/O error with the path of the archive it happened on.
    pub(crate) fn archive(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Archive {
            path: path.into(),
            source,
        }
    }
}

/// Failures of the UTF-8 decoding stage of the frame decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A character stayed incomplete after reading more than the retry ceiling.
    #[error("Unable to decode frame after reading {bytes_read} bytes (ceiling {ceiling})")]
    RetryCeilingExceeded { bytes_read: u64, ceiling: u64 },

    /// A byte sequence that can never become valid UTF-8, however much is appended.
    #[error("Invalid UTF-8 sequence at decompressed offset {offset}")]
    InvalidUtf8 { offset: u64 },

    /// The stream ended in the middle of a multi-byte character.
    #[error("Stream ended inside a multi-byte character ({pending} bytes pending)")]
    TruncatedCharacter { pending: usize },
}

/// Why a single record was rejected. Recovered locally and counted.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing timestamp field '{0}'")]
    MissingTimestamp(String),

    #[error("timestamp is not a valid epoch second: {0}")]
    InvalidTimestamp(String),
}

#[cfg(feature = "python")]
impl From<IngestError> for pyo3::PyErr {
    fn from(err: IngestError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
