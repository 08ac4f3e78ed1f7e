//! Turns accumulated raw blocks into text, or says why it cannot yet.

use crate::error::DecodeError;

/// Outcome of one decode attempt over the pending bytes.
#[derive(Debug, PartialEq, Eq)]
pub enum Utf8Step {
    /// The pending bytes are valid UTF-8.
    Text(String),
    /// The bytes end mid-character; read another block and try again.
    Incomplete(Vec<u8>),
    /// No pending bytes and the stream is exhausted.
    End,
}

/// Decodes `pending`, the bytes read since the last successful decode.
///
/// `at_end` is true when the last read returned no data. `base_offset` is the
/// decompressed offset of `pending[0]`, used for error reporting only.
pub(crate) fn assemble(
    pending: Vec<u8>,
    at_end: bool,
    base_offset: u64,
    ceiling: u64,
) -> Result<Utf8Step, DecodeError> {
    if pending.is_empty() {
        return Ok(Utf8Step::End);
    }

    let err = match String::from_utf8(pending) {
        Ok(text) => return Ok(Utf8Step::Text(text)),
        Err(err) => err,
    };

    let utf8 = err.utf8_error();
    if utf8.error_len().is_some() {
        // More input can never repair a sequence that is invalid mid-buffer.
        return Err(DecodeError::InvalidUtf8 {
            offset: base_offset + utf8.valid_up_to() as u64,
        });
    }

    let bytes = err.into_bytes();
    if at_end {
        return Err(DecodeError::TruncatedCharacter {
            pending: bytes.len() - utf8.valid_up_to(),
        });
    }
    if bytes.len() as u64 > ceiling {
        return Err(DecodeError::RetryCeilingExceeded {
            bytes_read: bytes.len() as u64,
            ceiling,
        });
    }
    Ok(Utf8Step::Incomplete(bytes))
}
