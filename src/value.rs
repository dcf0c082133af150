//! Engine-native values and row normalization.
//!
//! Backends decode every cell into a [`RawValue`]. Normalization turns raw
//! values into transport-ready JSON: decimals become floats, dates and
//! timestamps become ISO-8601 strings, containers are normalized recursively
//! with element and key order preserved, and everything else passes through.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};

/// Column names shared by every row of one result set.
pub type ColumnNames = Arc<[String]>;

/// Builds a shared column-name list from anything iterable.
pub fn column_names<I>(names: I) -> ColumnNames
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    names
        .into_iter()
        .map(Into::into)
        .collect::<Vec<String>>()
        .into()
}

/// A single value as decoded from a database engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawValue {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Arbitrary-precision numeric value.
    Decimal(Decimal),

    /// Calendar date without a time component.
    Date(NaiveDate),

    /// Timestamp without time zone.
    Timestamp(NaiveDateTime),

    /// Timestamp with time zone, kept in UTC.
    TimestampTz(DateTime<Utc>),

    /// Text/string value.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// Engine array value.
    Array(Vec<RawValue>),

    /// Engine map/record value, in insertion order.
    Map(Vec<(String, RawValue)>),

    /// Value that already arrived as JSON (e.g. a jsonb column).
    Json(Value),
}

impl RawValue {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

// Conversion implementations for common types, mainly for fixtures.
impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::Int(v as i64)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Int(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl From<Decimal> for RawValue {
    fn from(v: Decimal) -> Self {
        RawValue::Decimal(v)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(v: NaiveDate) -> Self {
        RawValue::Date(v)
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(v: Vec<u8>) -> Self {
        RawValue::Bytes(v)
    }
}

impl<T> From<Option<T>> for RawValue
where
    T: Into<RawValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => RawValue::Null,
        }
    }
}

/// Converts a raw value into transport-ready JSON.
///
/// Floats that JSON cannot represent (NaN, infinities) become null, as do
/// decimals outside the f64 range. Binary data is base64-encoded.
pub fn normalize(value: RawValue) -> Value {
    match value {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(b),
        RawValue::Int(i) => Value::Number(i.into()),
        RawValue::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        RawValue::Decimal(d) => d
            .to_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        RawValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        RawValue::Timestamp(ts) => Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        RawValue::TimestampTz(ts) => Value::String(ts.to_rfc3339()),
        RawValue::Text(s) => Value::String(s),
        RawValue::Bytes(b) => Value::String(BASE64.encode(b)),
        RawValue::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        RawValue::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, entry) in entries {
                map.insert(key, normalize(entry));
            }
            Value::Object(map)
        }
        RawValue::Json(v) => v,
    }
}

/// One result row as decoded from the engine, keyed by shared column names.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    columns: ColumnNames,
    values: Vec<RawValue>,
}

impl RawRow {
    /// Creates a row from shared column names and the matching values.
    pub fn new(columns: ColumnNames, values: Vec<RawValue>) -> Self {
        Self { columns, values }
    }

    /// The column names of this row's result set.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Normalizes every value in the row.
    pub fn normalized(self) -> NormalizedRow {
        NormalizedRow {
            columns: self.columns,
            values: self.values.into_iter().map(normalize).collect(),
        }
    }
}

/// A row whose values have been normalized to JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    columns: ColumnNames,
    values: Vec<Value>,
}

impl NormalizedRow {
    /// Looks up a value by column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|column| column == name)
            .map(|index| &self.values[index])
    }

    /// The column names of this row's result set.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the row, returning its values in column order.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
