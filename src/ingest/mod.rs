// In: src/ingest/mod.rs

//! The record ingester: decoded chunks in, a [`ResultTable`] out.
//!
//! Records are newline-delimited and may straddle chunk boundaries, so the
//! [`LineSplitter`] keeps the unterminated tail of each chunk as carry-over
//! text and prepends it to the next one. Each complete line is parsed with
//! [`parse_record`]; failures are counted and reported, never raised.
//!
//! Decoder failures (`IngestError::Io`, `IngestError::Decode`) abort the pass
//! with no partial result.

use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::iter::FusedIterator;
use std::path::Path;

use crate::config::IngestConfig;
use crate::decoder::{produce_chunks, DecodedChunk, FrameChunks};
use crate::error::IngestError;
use crate::observability::{Diagnostics, IngestSummary, LogDiagnostics};
use crate::table::{RecordPosition, ResultTable};

mod record;

pub use record::parse_record;

//==================================================================================
// I. Line Splitting
//==================================================================================

/// Splits a sequence of text chunks into newline-terminated records.
#[derive(Debug, Default)]
pub struct LineSplitter {
    carry: String,
    line: u64,
    /// Decompressed offset where `carry` begins.
    record_start: u64,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk, calling `emit` for every record it completes.
    ///
    /// The record passed to `emit` excludes its trailing `'\n'`.
    pub fn push<F>(&mut self, chunk: &str, compressed_offset: u64, mut emit: F)
    where
        F: FnMut(&str, RecordPosition),
    {
        let mut rest = chunk;
        while let Some(idx) = rest.find('\n') {
            let (segment, tail) = (&rest[..idx], &rest[idx + 1..]);
            rest = tail;

            let record: &str = if self.carry.is_empty() {
                segment
            } else {
                self.carry.push_str(segment);
                &self.carry
            };
            self.line += 1;
            let end = self.record_start + record.len() as u64 + 1;
            emit(
                record,
                RecordPosition {
                    line: self.line,
                    decompressed_offset: end,
                    compressed_offset,
                },
            );
            self.record_start = end;
            self.carry.clear();
        }
        self.carry.push_str(rest);
    }

    /// Bytes of unterminated text currently held back.
    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }

    /// Lines emitted so far.
    pub fn lines(&self) -> u64 {
        self.line
    }

    /// Ends the stream. The unterminated remainder is dropped; its length is returned.
    pub fn finish(self) -> usize {
        self.carry.len()
    }
}

//==================================================================================
// II. Record Lines (a lazy view over the raw records)
//==================================================================================

/// A single record of decoded text paired with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLine {
    pub text: String,
    pub position: RecordPosition,
}

/// Iterator over the newline-delimited records of an archive.
///
/// Like the underlying [`FrameChunks`], it is a single forward pass and is
/// fused after the first error.
pub struct RecordLines<R: Read> {
    chunks: FrameChunks<R>,
    splitter: LineSplitter,
    ready: VecDeque<RecordLine>,
    finished: bool,
    trailing_fragment: Option<usize>,
}

impl<R: Read> RecordLines<R> {
    pub fn new(chunks: FrameChunks<R>) -> Self {
        Self {
            chunks,
            splitter: LineSplitter::new(),
            ready: VecDeque::new(),
            finished: false,
            trailing_fragment: None,
        }
    }

    /// Length of the dropped unterminated tail, once the stream has ended cleanly.
    pub fn trailing_fragment(&self) -> Option<usize> {
        self.trailing_fragment
    }

    fn absorb(&mut self, chunk: DecodedChunk) {
        let ready = &mut self.ready;
        self.splitter
            .push(&chunk.text, chunk.compressed_offset, |text, position| {
                ready.push_back(RecordLine {
                    text: text.to_string(),
                    position,
                })
            });
    }
}

/// Opens `path` and iterates over its records.
pub fn read_lines(
    path: impl AsRef<Path>,
    config: &IngestConfig,
) -> Result<RecordLines<File>, IngestError> {
    Ok(RecordLines::new(produce_chunks(path, config)?))
}

impl<R: Read> Iterator for RecordLines<R> {
    type Item = Result<RecordLine, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            if self.finished {
                return None;
            }
            match self.chunks.next() {
                Some(Ok(chunk)) => self.absorb(chunk),
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.finished = true;
                    self.trailing_fragment = Some(self.splitter.carry_len());
                    return None;
                }
            }
        }
    }
}

impl<R: Read> FusedIterator for RecordLines<R> {}

//==================================================================================
// III. The Ingester
//==================================================================================

/// Everything one ingest pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub table: ResultTable,
    /// Lines that failed to parse or lacked a usable timestamp.
    pub bad_records: usize,
    /// Bytes of unterminated text dropped at end of stream.
    pub trailing_fragment_bytes: usize,
    /// Total decompressed bytes decoded.
    pub bytes_decompressed: u64,
}

impl IngestOutcome {
    pub fn summary(&self) -> IngestSummary {
        IngestSummary {
            rows: self.table.len(),
            bad_records: self.bad_records,
            trailing_fragment_bytes: self.trailing_fragment_bytes,
            bytes_decompressed: self.bytes_decompressed,
        }
    }
}

/// Runs ingest passes with one validated configuration.
#[derive(Debug, Clone, Default)]
pub struct Ingester {
    config: IngestConfig,
}

impl Ingester {
    pub fn new(config: IngestConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Ingests the archive at `path`.
    pub fn ingest(
        &self,
        path: impl AsRef<Path>,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<IngestOutcome, IngestError> {
        let path = path.as_ref();
        diagnostics.on_start(&path.display().to_string());
        let chunks = produce_chunks(path, &self.config)?;
        self.run(chunks, diagnostics)
    }

    /// Ingests zstd-compressed bytes from any reader. `source` labels diagnostics.
    pub fn ingest_reader<R: Read>(
        &self,
        reader: R,
        source: &str,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<IngestOutcome, IngestError> {
        diagnostics.on_start(source);
        let chunks = FrameChunks::new(reader, &self.config)?;
        self.run(chunks, diagnostics)
    }

    fn run<R: Read>(
        &self,
        mut chunks: FrameChunks<R>,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<IngestOutcome, IngestError> {
        let mut table = ResultTable::new(self.config.datetime_field.clone());
        let mut bad_records = 0usize;
        let mut splitter = LineSplitter::new();

        for chunk in &mut chunks {
            let chunk = chunk?;
            for &pending in &chunk.retries {
                diagnostics.on_decode_retry(pending);
            }
            splitter.push(&chunk.text, chunk.compressed_offset, |line, position| {
                match parse_record(line, &self.config, position) {
                    Ok(post) => table.push(post),
                    Err(err) => {
                        bad_records += 1;
                        diagnostics.on_bad_record(&position, &err);
                    }
                }
            });
        }

        // TODO: decide whether an unterminated final record should be parsed
        // instead of dropped once we know if any dumps end without a newline.
        let trailing_fragment_bytes = splitter.finish();
        if trailing_fragment_bytes > 0 {
            diagnostics.on_trailing_fragment(trailing_fragment_bytes);
        }

        let outcome = IngestOutcome {
            table,
            bad_records,
            trailing_fragment_bytes,
            bytes_decompressed: chunks.decompressed_offset(),
        };
        diagnostics.on_complete(&outcome.summary());
        Ok(outcome)
    }
}

/// Ingests `path` with the default configuration, logging through `log`.
pub fn ingest(path: impl AsRef<Path>) -> Result<IngestOutcome, IngestError> {
    Ingester::default().ingest(path, &mut LogDiagnostics)
}
