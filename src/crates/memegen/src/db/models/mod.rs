//! Database models
//!
//! Timestamps are stored as RFC 3339 strings with millisecond precision
//! (TEXT in SQLite), so lexical order matches chronological order.

pub mod generation;

pub use generation::{format_timestamp, GenerationRecord, NewGeneration};
