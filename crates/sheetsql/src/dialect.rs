//! Target SQL dialects.
//!
//! A [`Dialect`] decides how identifiers are quoted and how an UPSERT refers
//! to the incoming value of a column on conflict.
//!
//! - MySQL: identifiers in backticks (`` ` `` escaped as ``` `` ```), conflict
//!   clause `ON DUPLICATE KEY UPDATE col = VALUES(col)`
//! - PostgreSQL: identifiers in double quotes (`"` escaped as `""`), conflict
//!   clause `ON CONFLICT (keys) DO UPDATE SET col = EXCLUDED.col`

use crate::error::{SqlGenError, SqlGenResult};
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Quote an identifier with backticks, doubling embedded backticks.
///
/// No validation is done on length or characters.
pub fn quote_ident(name: &str) -> String {
    Dialect::MySql80.quote_ident(name)
}

/// SQL dialect variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    MySql57,
    #[default]
    MySql80,
    Postgres,
}

impl Dialect {
    /// Tag used in configuration files.
    pub fn tag(&self) -> &'static str {
        match self {
            Dialect::MySql57 => "mysql57",
            Dialect::MySql80 => "mysql80",
            Dialect::Postgres => "postgres",
        }
    }

    pub fn is_mysql(&self) -> bool {
        matches!(self, Dialect::MySql57 | Dialect::MySql80)
    }

    fn quote_char(&self) -> char {
        if self.is_mysql() { '`' } else { '"' }
    }

    /// Quote a table or column identifier.
    pub fn quote_ident(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        self.write_ident(&mut out, name);
        out
    }

    pub(crate) fn write_ident(&self, out: &mut String, name: &str) {
        let q = self.quote_char();
        out.push(q);
        for ch in name.chars() {
            if ch == q {
                out.push(q);
                out.push(q);
            } else {
                out.push(ch);
            }
        }
        out.push(q);
    }

    /// Append the literal for `value`.
    ///
    /// PostgreSQL only honours backslash escapes inside `E'...'` strings, so
    /// escaped text gets the prefix there.
    pub(crate) fn write_literal(&self, out: &mut String, value: &Value) {
        if *self == Dialect::Postgres && value.needs_escape() {
            out.push('E');
        }
        value.write_literal(out);
    }

    /// Render the literal for `value` in this dialect.
    pub fn literal(&self, value: &Value) -> String {
        let mut out = String::new();
        self.write_literal(&mut out, value);
        out
    }

    /// Expression that reads the value proposed for insertion of `column`
    /// (already mapped, unquoted).
    pub(crate) fn write_incoming_ref(&self, out: &mut String, column: &str) {
        match self {
            Dialect::MySql57 | Dialect::MySql80 => {
                out.push_str("VALUES(");
                self.write_ident(out, column);
                out.push(')');
            }
            Dialect::Postgres => {
                out.push_str("EXCLUDED.");
                self.write_ident(out, column);
            }
        }
    }

    /// Keyword sequence that opens the conflict-update clause.
    pub(crate) fn write_conflict_prefix(&self, out: &mut String, key_columns: &[String]) {
        match self {
            Dialect::MySql57 | Dialect::MySql80 => out.push_str(" ON DUPLICATE KEY UPDATE "),
            Dialect::Postgres => {
                out.push_str(" ON CONFLICT (");
                for (i, key) in key_columns.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_ident(out, key);
                }
                out.push_str(") DO UPDATE SET ");
            }
        }
    }
}

impl FromStr for Dialect {
    type Err = SqlGenError;

    fn from_str(s: &str) -> SqlGenResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql57" | "mysql5.7" => Ok(Dialect::MySql57),
            "mysql80" | "mysql8.0" | "mysql" => Ok(Dialect::MySql80),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            other => Err(SqlGenError::configuration(format!(
                "unsupported dialect: {other} (expected mysql57, mysql80 or postgres)"
            ))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
