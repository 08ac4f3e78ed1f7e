//! Observability and diagnostics for the ingestion pipeline.
//!
//! The core never relies on ambient logging state for its behaviour. Every
//! ingest call is handed a [`Diagnostics`] sink; the outcomes it reports are
//! also returned to the caller as plain counts. [`LogDiagnostics`] forwards to
//! the `log` facade for hosts that just want log lines, and [`init_logging`]
//! wires `env_logger` up for those hosts.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;

use log::LevelFilter;

use crate::error::RecordError;
use crate::table::RecordPosition;

/// Logs a structured key-value metric line at debug level, only in debug builds.
///
/// # Example
/// ```
/// use reddit_ingest::log_metric;
/// let blocks = 2;
/// log_metric!("event"="decode_chunk", "blocks"=&blocks);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            ::log::debug!("INGEST_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}

//==================================================================================
// I. The Diagnostics Contract
//==================================================================================

/// Totals for one completed ingest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub rows: usize,
    pub bad_records: usize,
    pub trailing_fragment_bytes: usize,
    pub bytes_decompressed: u64,
}

/// Receives the events of an ingest pass. Every hook has an empty default.
pub trait Diagnostics {
    fn on_start(&mut self, _source: &str) {}

    /// A raw block ended mid-character and another block is being read.
    fn on_decode_retry(&mut self, _pending_bytes: usize) {}

    fn on_bad_record(&mut self, _position: &RecordPosition, _error: &RecordError) {}

    /// Unterminated text left over at end of stream, dropped.
    fn on_trailing_fragment(&mut self, _bytes: usize) {}

    fn on_complete(&mut self, _summary: &IngestSummary) {}
}

//==================================================================================
// II. Provided Sinks
//==================================================================================

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn on_start(&mut self, source: &str) {
        log::info!("Loading data from: {}", source);
    }

    fn on_decode_retry(&mut self, pending_bytes: usize) {
        log::info!(
            "Decoding error with {} bytes, reading another chunk",
            pending_bytes
        );
    }

    fn on_bad_record(&mut self, position: &RecordPosition, error: &RecordError) {
        log::debug!("Skipping line {}: {}", position.line, error);
    }

    fn on_trailing_fragment(&mut self, bytes: usize) {
        log::warn!(
            "Dropping {} bytes of unterminated text at end of archive",
            bytes
        );
    }

    fn on_complete(&mut self, summary: &IngestSummary) {
        log::info!(
            "Data loading complete with {} rows and {} bad lines.",
            summary.rows,
            summary.bad_records
        );
    }
}

/// Tallies events. Handy for tests and for callers that aggregate over many archives.
///
/// `bad_lines` records the line number of every bad record, so it grows with
/// the number of failures. Meant for small or mostly clean inputs; use the
/// counters alone (or a custom sink) for badly corrupted archives.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CountingDiagnostics {
    pub decode_retries: usize,
    pub bad_records: usize,
    pub bad_lines: Vec<u64>,
    pub trailing_fragments: usize,
    pub completed: Option<IngestSummary>,
}

impl Diagnostics for CountingDiagnostics {
    fn on_decode_retry(&mut self, _pending_bytes: usize) {
        self.decode_retries += 1;
    }

    fn on_bad_record(&mut self, position: &RecordPosition, _error: &RecordError) {
        self.bad_records += 1;
        self.bad_lines.push(position.line);
    }

    fn on_trailing_fragment(&mut self, _bytes: usize) {
        self.trailing_fragments += 1;
    }

    fn on_complete(&mut self, summary: &IngestSummary) {
        self.completed = Some(*summary);
    }
}

//==================================================================================
// III. Logger Setup for Host Applications
//==================================================================================

static INIT_LOGGER: Once = Once::new();

/// Installs an `env_logger` once per process. Later calls are no-ops.
///
/// When `log_file` is given, output is appended to it; if it cannot be opened
/// the logger falls back to stderr.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) {
    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level);

        // Just the level and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(path) = log_file {
            match OpenOptions::new().append(true).create(true).open(path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                }
                Err(e) => eprintln!("Could not open log file {}: {}", path.display(), e),
            }
        }

        let _ = builder.try_init();
    });
}
