//! Bounded query execution.
//!
//! Runs arbitrary read-only SQL as a bounded page: the query is wrapped once
//! to count its full result and once to fetch a capped number of rows. This
//! path is infallible by construction; any failure is folded into the
//! returned [`QueryResult`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::db::DatabaseClient;
use crate::error::Result;
use crate::query::QueryStream;

/// Executes read-only queries against a database client.
pub struct QueryExecutor<'a> {
    db: &'a dyn DatabaseClient,
    max_rows: u64,
}

impl<'a> QueryExecutor<'a> {
    /// Creates an executor with the given row ceiling for bounded queries.
    pub fn new(db: &'a dyn DatabaseClient, max_rows: u64) -> Self {
        Self { db, max_rows }
    }

    /// Runs a query as a bounded page with a total count.
    ///
    /// The requested limit is clamped to the executor's ceiling. Failures
    /// never escape: database errors are logged and folded into the returned
    /// result with `success: false`.
    pub async fn run_bounded(&self, sql: &str, limit: u64) -> QueryResult {
        match self.try_run_bounded(sql, limit).await {
            Ok(result) => result,
            Err(e) => {
                error!("query {sql:?} failed: {e}");
                QueryResult::failed(e.to_string())
            }
        }
    }

    async fn try_run_bounded(&self, sql: &str, limit: u64) -> Result<QueryResult> {
        let effective = limit.min(self.max_rows) as usize;

        let total = self
            .db
            .fetch_scalar(&format!("select count(1) from ({sql}) s"))
            .await?;

        let fetched = self
            .db
            .fetch_rows(
                &format!("select * from ({sql}) s limit {effective}"),
                effective,
            )
            .await?;

        // The limit clause already bounds the query; truncate again in case
        // a backend hands back more than asked.
        let rows: Vec<Vec<Value>> = fetched
            .into_iter()
            .take(effective)
            .map(|row| row.normalized().into_values())
            .collect();

        debug!("returning {} of {total} rows", rows.len());
        Ok(QueryResult::ok(total, rows))
    }

    /// Runs a query in streaming mode with per-column formatters.
    ///
    /// Unlike [`run_bounded`](Self::run_bounded), failures surface as a
    /// terminal stream error rather than being swallowed.
    pub fn stream<S: AsRef<str>>(&self, sql: &str, formatter_specs: &[S]) -> QueryStream {
        QueryStream::open(self.db, sql, formatter_specs)
    }
}

/// Outcome of a bounded query.
///
/// On success `total` holds the unbounded row count and `rows` the fetched
/// page; on failure only `error` is present. Absent fields are omitted from
/// the serialized form entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Vec<Value>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    /// Creates a successful result.
    pub fn ok(total: i64, rows: Vec<Vec<Value>>) -> Self {
        Self {
            success: true,
            total: Some(total),
            rows: Some(rows),
            error: None,
        }
    }

    /// Creates a failed result carrying the error text.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            total: None,
            rows: None,
            error: Some(error.into()),
        }
    }
}
