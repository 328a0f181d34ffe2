//! Output writers.
//!
//! - [`ndjson`]: appends one JSON record per line to a single shared stream

pub mod ndjson;
