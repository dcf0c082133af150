//! SQLite database client implementation.
//!
//! Mirrors the PostgreSQL client over a sqlx SQLite pool. SQLite types are
//! dynamic, so values are decoded from each cell's runtime type rather than
//! the declared column type.

use async_trait::async_trait;
use futures::StreamExt;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo, ValueRef};
use tracing::{debug, error};

use crate::db::{map_sqlx_error, DatabaseClient, RowStream, POOL_MAX_CONNECTIONS};
use crate::error::{Result, SqlfeedError};
use crate::value::{ColumnNames, RawRow, RawValue};

/// SQLite database client over a lazily connected pool.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Builds the pool without opening the database; the first query does.
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .connect_lazy(url)
            .map_err(|e| SqlfeedError::config(format!("invalid sqlite connection string: {e}")))?;
        Ok(Self { pool })
    }

    /// Creates a client from an existing connection pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn fetch_scalar(&self, sql: &str) -> Result<i64> {
        debug!("executing {sql:?}");
        let value: i64 = sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(value)
    }

    async fn fetch_rows(&self, sql: &str, max_rows: usize) -> Result<Vec<RawRow>> {
        debug!("executing {sql:?}");
        let mut cursor = sqlx::query(sql).fetch(&self.pool);
        let mut columns = None;
        let mut rows = Vec::new();

        while rows.len() < max_rows {
            match cursor.next().await {
                Some(Ok(row)) => rows.push(convert_row(&row, &mut columns)),
                Some(Err(e)) => return Err(map_sqlx_error(e)),
                None => break,
            }
        }

        Ok(rows)
    }

    fn stream_rows(&self, sql: &str) -> RowStream {
        let pool = self.pool.clone();
        let sql = sql.to_string();
        let (tx, rx) = RowStream::channel();

        let worker = tokio::spawn(async move {
            debug!("executing {sql:?}");
            let mut cursor = sqlx::query(&sql).fetch(&pool);
            let mut columns = None;

            while let Some(fetched) = cursor.next().await {
                let item = match fetched {
                    Ok(row) => Ok(convert_row(&row, &mut columns)),
                    Err(e) => {
                        error!("query {sql:?} failed: {e}");
                        Err(map_sqlx_error(e))
                    }
                };
                let stop = item.is_err();
                if tx.send(item).await.is_err() {
                    // Consumer dropped the stream; stop fetching.
                    return;
                }
                if stop {
                    return;
                }
            }
        });

        RowStream::new(rx, worker)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx SqliteRow to a RawRow, building the shared column-name
/// list on the first row of a result set.
fn convert_row(row: &SqliteRow, columns: &mut Option<ColumnNames>) -> RawRow {
    let names = columns
        .get_or_insert_with(|| {
            row.columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect::<Vec<_>>()
                .into()
        })
        .clone();

    let values = (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect();

    RawRow::new(names, values)
}

/// Converts a single column value using the cell's runtime type. Dates and
/// times ride through as the text SQLite stores them in.
fn convert_value(row: &SqliteRow, index: usize) -> RawValue {
    let Ok(value) = row.try_get_raw(index) else {
        return RawValue::Null;
    };
    if value.is_null() {
        return RawValue::Null;
    }

    let info = value.type_info();
    match info.name() {
        "INTEGER" => get::<i64>(row, index).map(RawValue::Int),
        "REAL" => get::<f64>(row, index).map(RawValue::Float),
        "BLOB" => get::<Vec<u8>>(row, index).map(RawValue::Bytes),
        _ => get::<String>(row, index).map(RawValue::Text),
    }
    .unwrap_or(RawValue::Null)
}

/// Decodes a nullable column, treating both NULL and decode failures as
/// absent.
fn get<'r, T>(row: &'r SqliteRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}
