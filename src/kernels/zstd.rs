//! This module contains the thin, panic-free wrappers around the `zstd` crate
//! used by the frame decoder.
//!
//! Archives are plain zstd streams: one or more concatenated frames of NDJSON,
//! with no length header of our own. Reading is always streaming; the whole
//! archive never has to fit in memory.

use std::io::{BufReader, Read, Write};

use zstd::stream::read::Decoder;
use zstd::stream::write::Encoder;

use crate::error::IngestError;

/// The streaming decompressor type produced by [`stream_decoder`].
pub type StreamDecoder<R> = Decoder<'static, BufReader<R>>;

//==================================================================================
// 1. Decompression
//==================================================================================

/// Wraps `reader` in a streaming zstd decoder that accepts windows of up to
/// `2^max_window_log` bytes. Archives built with `--long=31` need the full 31.
pub fn stream_decoder<R: Read>(
    reader: R,
    max_window_log: u32,
) -> Result<StreamDecoder<R>, IngestError> {
    let mut decoder = Decoder::new(reader)?;
    decoder.window_log_max(max_window_log)?;
    Ok(decoder)
}

//==================================================================================
// 2. Compression (archive construction for tests, benches and tooling)
//==================================================================================

/// Compresses `input_bytes` into a single zstd frame.
pub fn encode(input_bytes: &[u8], level: i32) -> Result<Vec<u8>, IngestError> {
    let mut output_buf = Vec::with_capacity(input_bytes.len() / 2);
    let mut encoder = Encoder::new(&mut output_buf, level)?;
    encoder.write_all(input_bytes)?;
    // `finish` is essential to finalize the Zstd frame.
    encoder.finish()?;
    Ok(output_buf)
}

/// Compresses each part into its own frame and concatenates the frames.
pub fn encode_frames(parts: &[&[u8]], level: i32) -> Result<Vec<u8>, IngestError> {
    let mut output_buf = Vec::new();
    for part in parts {
        output_buf.extend_from_slice(&encode(part, level)?);
    }
    Ok(output_buf)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
