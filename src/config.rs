// In: src/config.rs

//! The single source of truth for ingestion configuration.
//!
//! `IngestConfig` is created once at the application boundary (e.g. from a
//! JSON file or Python keyword arguments) and then passed down by reference to
//! the decoder and the ingester. Every field has a serde default, so a partial
//! document such as `{"read_block_size": 65536}` is a valid config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

//==================================================================================
// I. Constants
//==================================================================================

/// Bytes requested from the decompressor per read (2^27).
pub const DEFAULT_READ_BLOCK_SIZE: usize = 1 << 27;
/// log2 of the largest zstd window the decoder accepts (2^31 bytes).
pub const DEFAULT_MAX_WINDOW_LOG: u32 = 31;
/// Bytes that may accumulate without a successful UTF-8 decode (2 * 2^29).
pub const DEFAULT_DECODE_RETRY_CEILING: u64 = (1 << 29) * 2;

/// Smallest window log zstd supports.
const MIN_WINDOW_LOG: u32 = 10;

//==================================================================================
// II. IngestConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct IngestConfig {
    /// The number of decompressed bytes pulled per read. Smaller values lower
    /// peak memory; the parsed result is identical for any value.
    #[serde(default = "default_read_block_size")]
    pub read_block_size: usize,

    /// Upper bound on the zstd window, as a power of two.
    #[serde(default = "default_max_window_log")]
    pub max_window_log: u32,

    /// Cumulative bytes read since the last successful decode before the
    /// decoder gives up with `DecodeError::RetryCeilingExceeded`.
    #[serde(default = "default_decode_retry_ceiling")]
    pub decode_retry_ceiling: u64,

    /// The numeric epoch-seconds field every post must carry.
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,

    /// Name of the derived UTC datetime column.
    #[serde(default = "default_datetime_field")]
    pub datetime_field: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            read_block_size: default_read_block_size(),
            max_window_log: default_max_window_log(),
            decode_retry_ceiling: default_decode_retry_ceiling(),
            timestamp_field: default_timestamp_field(),
            datetime_field: default_datetime_field(),
        }
    }
}

impl IngestConfig {
    /// Parses and validates a config from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, IngestError> {
        let config: IngestConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("cannot read config file '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Returns a copy with a different block size. Mostly useful in tests.
    pub fn with_read_block_size(mut self, read_block_size: usize) -> Self {
        self.read_block_size = read_block_size;
        self
    }

    pub fn with_decode_retry_ceiling(mut self, ceiling: u64) -> Self {
        self.decode_retry_ceiling = ceiling;
        self
    }

    /// Maximum zstd window in bytes.
    pub fn max_window_size(&self) -> u64 {
        1u64 << self.max_window_log
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.read_block_size == 0 {
            return Err(IngestError::Config(
                "read_block_size must be greater than zero".to_string(),
            ));
        }
        if !(MIN_WINDOW_LOG..=DEFAULT_MAX_WINDOW_LOG).contains(&self.max_window_log) {
            return Err(IngestError::Config(format!(
                "max_window_log must be in {}..={}, got {}",
                MIN_WINDOW_LOG, DEFAULT_MAX_WINDOW_LOG, self.max_window_log
            )));
        }
        if self.decode_retry_ceiling < self.read_block_size as u64 {
            return Err(IngestError::Config(format!(
                "decode_retry_ceiling ({}) must be at least read_block_size ({})",
                self.decode_retry_ceiling, self.read_block_size
            )));
        }
        if self.timestamp_field.is_empty() || self.datetime_field.is_empty() {
            return Err(IngestError::Config(
                "timestamp_field and datetime_field must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_read_block_size() -> usize {
    DEFAULT_READ_BLOCK_SIZE
}

fn default_max_window_log() -> u32 {
    DEFAULT_MAX_WINDOW_LOG
}

fn default_decode_retry_ceiling() -> u64 {
    DEFAULT_DECODE_RETRY_CEILING
}

fn default_timestamp_field() -> String {
    "created_utc".to_string()
}

fn default_datetime_field() -> String {
    "created_datetime".to_string()
}
