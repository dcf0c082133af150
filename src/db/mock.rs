//! Mock database clients for testing.
//!
//! `MockClient` plays back canned rows regardless of the SQL it receives and
//! records every executed query so tests can assert on the generated SQL.
//! `FailingClient` fails every operation with a fixed message.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::db::{DatabaseClient, RowStream};
use crate::error::{Result, SqlfeedError};
use crate::value::{column_names, ColumnNames, RawRow, RawValue};

/// A mock database client that returns predefined rows.
pub struct MockClient {
    columns: ColumnNames,
    rows: Vec<Vec<RawValue>>,
    scalar: i64,
    executed: Mutex<Vec<String>>,
}

impl MockClient {
    /// Creates a mock whose queries all return the given rows. Scalar
    /// queries report the row count.
    pub fn new<I>(columns: I, rows: Vec<Vec<RawValue>>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let scalar = rows.len() as i64;
        Self {
            columns: column_names(columns),
            rows,
            scalar,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Overrides the value scalar queries return.
    pub fn with_scalar(mut self, scalar: i64) -> Self {
        self.scalar = scalar;
        self
    }

    /// The queries executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn record(&self, sql: &str) {
        self.executed.lock().unwrap().push(sql.to_string());
    }

    fn raw_rows(&self) -> Vec<RawRow> {
        self.rows
            .iter()
            .map(|values| RawRow::new(self.columns.clone(), values.clone()))
            .collect()
    }
}

#[async_trait]
impl DatabaseClient for MockClient {
    async fn fetch_scalar(&self, sql: &str) -> Result<i64> {
        self.record(sql);
        Ok(self.scalar)
    }

    async fn fetch_rows(&self, sql: &str, max_rows: usize) -> Result<Vec<RawRow>> {
        self.record(sql);
        let mut rows = self.raw_rows();
        rows.truncate(max_rows);
        Ok(rows)
    }

    fn stream_rows(&self, sql: &str) -> RowStream {
        self.record(sql);
        let rows = self.raw_rows();
        let (tx, rx) = RowStream::channel();
        let worker = tokio::spawn(async move {
            for row in rows {
                if tx.send(Ok(row)).await.is_err() {
                    return;
                }
            }
        });
        RowStream::new(rx, worker)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A client whose every operation fails with the configured message.
pub struct FailingClient {
    message: String,
}

impl FailingClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn error(&self) -> SqlfeedError {
        SqlfeedError::query(self.message.clone())
    }
}

#[async_trait]
impl DatabaseClient for FailingClient {
    async fn fetch_scalar(&self, _sql: &str) -> Result<i64> {
        Err(self.error())
    }

    async fn fetch_rows(&self, _sql: &str, _max_rows: usize) -> Result<Vec<RawRow>> {
        Err(self.error())
    }

    fn stream_rows(&self, _sql: &str) -> RowStream {
        let error = self.error();
        let (tx, rx) = RowStream::channel();
        let worker = tokio::spawn(async move {
            let _ = tx.send(Err(error)).await;
        });
        RowStream::new(rx, worker)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
