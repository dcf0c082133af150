//! Query execution for sqlfeed.
//!
//! Two modes share the same database client: a bounded page with a total
//! count, and a lazy header-first stream with per-column formatting.

pub mod executor;
pub mod stream;

pub use executor::{QueryExecutor, QueryResult};
pub use stream::QueryStream;
