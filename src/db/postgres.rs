//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient`
//! trait for PostgreSQL databases using sqlx.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::StreamExt;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use tracing::{debug, error};

use crate::db::{map_sqlx_error, DatabaseClient, RowStream, POOL_MAX_CONNECTIONS};
use crate::error::{Result, SqlfeedError};
use crate::value::{ColumnNames, RawRow, RawValue};

/// How long an acquire may wait on an exhausted pool before failing.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL database client over a lazily connected pool.
#[derive(Debug, Clone)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Builds the pool without opening a connection; the first query does.
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy(url)
            .map_err(|e| {
                SqlfeedError::config(format!("invalid postgres connection string: {e}"))
            })?;
        Ok(Self { pool })
    }

    /// Creates a client from an existing connection pool.
    ///
    /// This is primarily useful for testing.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
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

/// Converts a sqlx PgRow to a RawRow, building the shared column-name list
/// on the first row of a result set.
fn convert_row(row: &PgRow, columns: &mut Option<ColumnNames>) -> RawRow {
    let names = columns
        .get_or_insert_with(|| {
            row.columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect::<Vec<_>>()
                .into()
        })
        .clone();

    let values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect();

    RawRow::new(names, values)
}

/// Converts a single column value from a PgRow to a RawValue based on the
/// column's type name. Types without a dedicated mapping fall back to text.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> RawValue {
    match type_name {
        "BOOL" => get::<bool>(row, index).map(RawValue::Bool),

        "INT2" => get::<i16>(row, index).map(|v| RawValue::Int(v as i64)),
        "INT4" => get::<i32>(row, index).map(|v| RawValue::Int(v as i64)),
        "INT8" => get::<i64>(row, index).map(RawValue::Int),

        "FLOAT4" => get::<f32>(row, index).map(|v| RawValue::Float(v as f64)),
        "FLOAT8" => get::<f64>(row, index).map(RawValue::Float),
        "NUMERIC" => get::<Decimal>(row, index).map(RawValue::Decimal),

        "DATE" => get::<NaiveDate>(row, index).map(RawValue::Date),
        "TIMESTAMP" => get::<NaiveDateTime>(row, index).map(RawValue::Timestamp),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index).map(RawValue::TimestampTz),
        "TIME" => get::<NaiveTime>(row, index)
            .map(|t| RawValue::Text(t.format("%H:%M:%S%.f").to_string())),

        "JSON" | "JSONB" => get::<serde_json::Value>(row, index).map(RawValue::Json),

        "BYTEA" => get::<Vec<u8>>(row, index).map(RawValue::Bytes),

        "TEXT[]" | "VARCHAR[]" | "NAME[]" => get::<Vec<String>>(row, index)
            .map(|v| RawValue::Array(v.into_iter().map(RawValue::Text).collect())),
        "INT2[]" => get::<Vec<i16>>(row, index)
            .map(|v| RawValue::Array(v.into_iter().map(|i| RawValue::Int(i as i64)).collect())),
        "INT4[]" => get::<Vec<i32>>(row, index)
            .map(|v| RawValue::Array(v.into_iter().map(|i| RawValue::Int(i as i64)).collect())),
        "INT8[]" => get::<Vec<i64>>(row, index)
            .map(|v| RawValue::Array(v.into_iter().map(RawValue::Int).collect())),
        "FLOAT8[]" => get::<Vec<f64>>(row, index)
            .map(|v| RawValue::Array(v.into_iter().map(RawValue::Float).collect())),
        "NUMERIC[]" => get::<Vec<Decimal>>(row, index)
            .map(|v| RawValue::Array(v.into_iter().map(RawValue::Decimal).collect())),

        // Everything else (text types, uuid, intervals, enums) as string.
        _ => get::<String>(row, index).map(RawValue::Text),
    }
    .unwrap_or(RawValue::Null)
}

/// Decodes a nullable column, treating both NULL and decode failures as
/// absent.
fn get<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}
