//! sqlfeed - read-only SQL execution with per-column formatting.
//!
//! Executes arbitrary SQL against PostgreSQL or SQLite and returns results
//! either as a bounded page with a total count, or as a lazy header-first
//! stream with formatter chains applied per column.

pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod query;
pub mod value;
