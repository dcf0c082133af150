//! Error types for sqlfeed.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for sqlfeed operations.
#[derive(Error, Debug)]
pub enum SqlfeedError {
    /// Database connection errors (host unreachable, auth failed, pool
    /// exhausted, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, missing columns, decode
    /// failures, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors (invalid connection string, unsupported engine,
    /// etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SqlfeedError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using SqlfeedError.
pub type Result<T> = std::result::Result<T, SqlfeedError>;
