//! Typed cell values and their SQL literal form.
//!
//! [`Value`] is what a row source hands the builder for each cell. Rendering
//! never fails: anything without a dedicated literal form falls through to a
//! quoted, escaped string.
//!
//! # Example
//! ```
//! use sheetsql::Value;
//!
//! assert_eq!(Value::Int(5).to_literal(), "5");
//! assert_eq!(Value::from("O'Brien").to_literal(), r"'O\'Brien'");
//! assert_eq!(Value::Null.to_literal(), "NULL");
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// NaN is treated as null.
    Float(f64),
    /// Timestamp without zone, rendered to second precision.
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    /// `true` for [`Value::Null`] and for a NaN float.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Render the value as a SQL literal.
    pub fn to_literal(&self) -> String {
        let mut out = String::new();
        self.write_literal(&mut out);
        out
    }

    /// Append the SQL literal for this value to `out`.
    pub fn write_literal(&self, out: &mut String) {
        match self {
            Value::Null => out.push_str("NULL"),
            Value::Float(f) if f.is_nan() => out.push_str("NULL"),
            Value::DateTime(dt) => {
                out.push('\'');
                let _ = write!(out, "{}", dt.format(DATETIME_FORMAT));
                out.push('\'');
            }
            Value::Date(d) => {
                out.push('\'');
                let _ = write!(out, "{}", d.format(DATE_FORMAT));
                out.push('\'');
            }
            Value::Bool(b) => out.push(if *b { '1' } else { '0' }),
            Value::Int(i) => {
                let _ = write!(out, "{i}");
            }
            Value::Float(f) if f.is_finite() => {
                let _ = write!(out, "{f}");
            }
            // inf / -inf have no numeric literal; fall back to string text.
            Value::Float(f) => write_string_literal(out, &f.to_string()),
            Value::Text(s) => write_string_literal(out, s),
        }
    }

    /// Whether the string literal for this value contains backslash escapes.
    pub(crate) fn needs_escape(&self) -> bool {
        match self {
            Value::Text(s) => s.contains(['\\', '\'']),
            _ => false,
        }
    }
}

/// Quote `s` as a string literal, escaping `\` then `'` with a backslash.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    write_string_literal(&mut out, s);
    out
}

fn write_string_literal(out: &mut String, s: &str) {
    out.reserve(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or_else(|| Value::Text(n.to_string()), Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s),
            // Nested structures keep their JSON text.
            other => Value::Text(other.to_string()),
        }
    }
}
