//! Low-level compression kernels. Only zstd is needed by the archive format.

pub mod zstd;
