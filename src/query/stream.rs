//! Streaming query execution.
//!
//! A [`QueryStream`] yields the output header row first, then one formatted
//! row per result row, fetching incrementally from the database. The
//! sequence is single-pass: once a row has been yielded it is gone, and
//! after a failure the stream yields that error and ends.
//!
//! Dropping the stream mid-way aborts the backend worker, which releases
//! the connection it was holding.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde_json::Value;
use tracing::{debug, error};

use crate::db::{DatabaseClient, RowStream};
use crate::error::Result;
use crate::format::{compile, CompiledColumn};

/// Lazily formatted rows for one streaming query.
pub struct QueryStream {
    sql: String,
    rows: RowStream,
    columns: Vec<CompiledColumn>,
    header_sent: bool,
    done: bool,
}

impl QueryStream {
    /// Compiles the formatter specs and opens a streaming cursor.
    ///
    /// Specs are compiled before any row arrives, so every yielded row has
    /// one value per spec, in spec order.
    pub(crate) fn open<S: AsRef<str>>(
        db: &dyn DatabaseClient,
        sql: &str,
        formatter_specs: &[S],
    ) -> Self {
        let columns = compile(formatter_specs);
        debug!("streaming {sql:?}");
        Self {
            sql: sql.to_string(),
            rows: db.stream_rows(sql),
            columns,
            header_sent: false,
            done: false,
        }
    }

    /// The output headers, in spec order.
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header()).collect()
    }
}

impl Stream for QueryStream {
    type Item = Result<Vec<Value>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        if !this.header_sent {
            this.header_sent = true;
            let headers = this
                .columns
                .iter()
                .map(|c| Value::String(c.header().to_string()))
                .collect();
            return Poll::Ready(Some(Ok(headers)));
        }

        match Pin::new(&mut this.rows).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Some(Ok(raw))) => {
                let row = raw.normalized();
                let mut formatted = Vec::with_capacity(this.columns.len());
                for column in &this.columns {
                    match column.apply(&row) {
                        Ok(value) => formatted.push(value),
                        Err(e) => {
                            error!("formatting a row of {:?} failed: {e}", this.sql);
                            this.done = true;
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
                Poll::Ready(Some(Ok(formatted)))
            }
        }
    }
}
