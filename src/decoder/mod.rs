// In: src/decoder/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Frame Decoder
// ====================================================================================
//
// The decoder presents a zstd archive as a lazy sequence of valid UTF-8 chunks.
//
//   [File / any Read] -> [CountingReader] -> [zstd stream Decoder] -> read_block()
//         |
//         `-> utf8::assemble(): a block that ends mid-character is kept and the
//             next block is appended until the bytes decode, or until the retry
//             ceiling is hit.
//         |
//         `-> DecodedChunk { text, offsets, retries }
//
// The iterator owns the file handle and the decompressor. Both are dropped as
// soon as the stream ends or fails, or when the consumer drops the iterator.
// ====================================================================================

use std::fs::File;
use std::io::{self, Read};
use std::iter::FusedIterator;
use std::path::Path;

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::kernels::zstd::{stream_decoder, StreamDecoder};

mod utf8;

pub(crate) use utf8::Utf8Step;

//==================================================================================
// I. Data Contracts
//==================================================================================

/// Text recovered from a contiguous range of the decompressed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedChunk {
    pub text: String,
    /// Decompressed byte offset of the first byte of `text`.
    pub decompressed_offset: u64,
    /// Archive bytes consumed by the decompressor once this chunk was read.
    pub compressed_offset: u64,
    /// Size of the pending buffer each time a block ended mid-character.
    pub retries: Vec<usize>,
}

/// Counts the bytes pulled from the archive.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

//==================================================================================
// II. The Chunk Iterator
//==================================================================================

/// A single forward pass over an archive, yielding decoded text chunks.
pub struct FrameChunks<R: Read> {
    /// `None` once the stream has ended or failed.
    decoder: Option<StreamDecoder<CountingReader<R>>>,
    block_size: usize,
    retry_ceiling: u64,
    decompressed_offset: u64,
    compressed_offset: u64,
}

/// Opens `path` and returns the chunk iterator over its decompressed text.
pub fn produce_chunks(
    path: impl AsRef<Path>,
    config: &IngestConfig,
) -> Result<FrameChunks<File>, IngestError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IngestError::archive(path, e))?;
    FrameChunks::new(file, config)
}

impl<R: Read> FrameChunks<R> {
    /// Wraps any reader of zstd-compressed bytes.
    pub fn new(reader: R, config: &IngestConfig) -> Result<Self, IngestError> {
        config.validate()?;
        let counting = CountingReader {
            inner: reader,
            count: 0,
        };
        Ok(Self {
            decoder: Some(stream_decoder(counting, config.max_window_log)?),
            block_size: config.read_block_size,
            retry_ceiling: config.decode_retry_ceiling,
            decompressed_offset: 0,
            compressed_offset: 0,
        })
    }

    /// Decompressed bytes handed out so far.
    pub fn decompressed_offset(&self) -> u64 {
        self.decompressed_offset
    }

    /// Archive bytes consumed by the decompressor so far.
    pub fn compressed_offset(&self) -> u64 {
        self.compressed_offset
    }

    /// Appends up to one block of decompressed bytes to `buf`. Returns fewer
    /// than `block_size` bytes only at end of stream.
    fn read_block(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(0);
        };
        let n = decoder
            .by_ref()
            .take(self.block_size as u64)
            .read_to_end(buf)?;

        // Bytes still sitting in the BufReader have not been consumed yet.
        let buffered = decoder.get_ref();
        self.compressed_offset = buffered.get_ref().count - buffered.buffer().len() as u64;
        Ok(n)
    }

    fn next_chunk(&mut self) -> Result<Option<DecodedChunk>, IngestError> {
        let mut pending: Vec<u8> = Vec::new();
        let mut retries = Vec::new();
        loop {
            let read = self.read_block(&mut pending)?;
            match utf8::assemble(pending, read == 0, self.decompressed_offset, self.retry_ceiling)? {
                Utf8Step::End => return Ok(None),
                Utf8Step::Text(text) => {
                    let chunk = DecodedChunk {
                        decompressed_offset: self.decompressed_offset,
                        compressed_offset: self.compressed_offset,
                        text,
                        retries,
                    };
                    self.decompressed_offset += chunk.text.len() as u64;
                    log_metric!(
                        "event"="decode_chunk",
                        "bytes"=&chunk.text.len(),
                        "retries"=&chunk.retries.len()
                    );
                    return Ok(Some(chunk));
                }
                Utf8Step::Incomplete(bytes) => {
                    retries.push(bytes.len());
                    pending = bytes;
                }
            }
        }
    }
}

impl<R: Read> Iterator for FrameChunks<R> {
    type Item = Result<DecodedChunk, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.decoder.is_none() {
            return None;
        }
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.decoder = None;
                None
            }
            Err(e) => {
                self.decoder = None;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> FusedIterator for FrameChunks<R> {}

#[cfg(test)]
mod tests;
