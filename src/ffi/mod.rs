// In: src/ffi/mod.rs

//! The Python surface. Compiled only with the `python` feature.

pub mod python;
