//! Per-column output formatting.
//!
//! A formatter spec is a column name with optional trailing `:modifier`
//! tokens, e.g. `amount:number` or `tags:comma-separated`. Compiling a spec
//! strips the modifiers off the name and builds the transform chain to run
//! against each row; the stripped name doubles as the output header and as
//! the key used to read the value from the row.
//!
//! Modifiers compose right to left around the base value: in
//! `total:number:yesno` the value is stringified first and the result fed to
//! the yes/no transform. Unknown modifiers stringify, so a misspelled spec
//! degrades to text output rather than failing the query.

use serde_json::Value;

use crate::error::{Result, SqlfeedError};
use crate::value::NormalizedRow;

/// A single value transformation in a formatter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Renders the value as plain text (`number` and any unknown modifier).
    Stringify,
    /// `yesno`: "Yes" for truthy values, "No" otherwise.
    YesNo,
    /// `comma-separated`: joins a non-empty array with commas; anything else
    /// becomes null.
    CommaJoin,
}

impl Transform {
    fn for_token(token: &str) -> Self {
        match token {
            "yesno" => Self::YesNo,
            "comma-separated" => Self::CommaJoin,
            _ => Self::Stringify,
        }
    }

    fn apply(self, value: Value) -> Value {
        match self {
            Self::Stringify => Value::String(stringify(&value)),
            Self::YesNo => {
                let answer = if is_truthy(&value) { "Yes" } else { "No" };
                Value::String(answer.to_string())
            }
            Self::CommaJoin => match value {
                Value::Array(items) if !items.is_empty() => {
                    let joined = items.iter().map(stringify).collect::<Vec<_>>().join(",");
                    Value::String(joined)
                }
                _ => Value::Null,
            },
        }
    }
}

/// One output column: the stripped header name plus its transform chain.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledColumn {
    header: String,
    chain: Vec<Transform>,
}

impl CompiledColumn {
    /// The output header, i.e. the spec with its modifiers stripped.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Reads this column from a row and folds the transform chain over it.
    ///
    /// Fails only when the row has no column matching the header.
    pub fn apply(&self, row: &NormalizedRow) -> Result<Value> {
        let base = row.get(&self.header).cloned().ok_or_else(|| {
            SqlfeedError::query(format!("column '{}' not present in result", self.header))
        })?;
        Ok(self
            .chain
            .iter()
            .fold(base, |value, transform| transform.apply(value)))
    }
}

/// Compiles formatter specs into output columns, one per spec, in order.
pub fn compile<S: AsRef<str>>(specs: &[S]) -> Vec<CompiledColumn> {
    specs.iter().map(|spec| compile_one(spec.as_ref())).collect()
}

fn compile_one(spec: &str) -> CompiledColumn {
    let (header, tokens) = strip_modifiers(spec);
    // Tokens come off the spec outermost first; the chain runs innermost
    // first, so it is built in reverse.
    let chain = tokens
        .iter()
        .rev()
        .map(|token| Transform::for_token(token))
        .collect();
    CompiledColumn {
        header: header.to_string(),
        chain,
    }
}

/// Splits a spec into its base name and trailing modifier tokens, stripping
/// repeatedly from the right. Returned tokens are ordered outermost first.
fn strip_modifiers(spec: &str) -> (&str, Vec<&str>) {
    let mut rest = spec;
    let mut tokens = Vec::new();
    while let Some((head, token)) = split_trailing_token(rest) {
        tokens.push(token);
        rest = head;
    }
    (rest, tokens)
}

/// Matches a trailing `:token` and returns the remainder and the token.
/// Anything containing a byte outside the token alphabet is not a modifier.
fn split_trailing_token(s: &str) -> Option<(&str, &str)> {
    let colon = s.rfind(':')?;
    let token = &s[colon + 1..];
    if token.is_empty() || !token.bytes().all(is_token_byte) {
        return None;
    }
    Some((&s[..colon], token))
}

/// Modifier tokens are lowercase letters, digits, hyphen, underscore, and
/// parentheses.
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'_' | b'(' | b')')
}

/// Truthiness over JSON values: null, false, zero, and empty strings,
/// arrays, and objects are falsy; everything else is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
    }
}

/// Renders a JSON value as plain text: strings unquoted, null empty,
/// containers as compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        container => container.to_string(),
    }
}
