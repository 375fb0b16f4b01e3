//! Generation policy: which statement shape to build and how nulls behave.

use crate::dialect::Dialect;
use crate::error::{SqlGenError, SqlGenResult};
use std::fmt;
use std::str::FromStr;

/// Statement shape produced for each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementKind {
    #[default]
    Update,
    Insert,
    Upsert,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Update => "UPDATE",
            StatementKind::Insert => "INSERT",
            StatementKind::Upsert => "UPSERT",
        }
    }
}

impl FromStr for StatementKind {
    type Err = SqlGenError;

    fn from_str(s: &str) -> SqlGenResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UPDATE" => Ok(StatementKind::Update),
            "INSERT" => Ok(StatementKind::Insert),
            "UPSERT" => Ok(StatementKind::Upsert),
            other => Err(SqlGenError::configuration(format!(
                "unsupported statement kind: {other} (expected UPDATE, INSERT or UPSERT)"
            ))),
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable options for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub kind: StatementKind,
    /// Leave null cells out of UPDATE SET lists and UPSERT conflict clauses.
    pub skip_nulls_in_set: bool,
    pub dialect: Dialect,
    /// Columns to update. `None` means every non-key column.
    pub update_columns: Option<Vec<String>>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            kind: StatementKind::Update,
            skip_nulls_in_set: true,
            dialect: Dialect::default(),
            update_columns: None,
        }
    }
}

impl Policy {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn update() -> Self {
        Self::new(StatementKind::Update)
    }

    pub fn insert() -> Self {
        Self::new(StatementKind::Insert)
    }

    pub fn upsert() -> Self {
        Self::new(StatementKind::Upsert)
    }

    pub fn skip_nulls(mut self, skip: bool) -> Self {
        self.skip_nulls_in_set = skip;
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Restrict updated columns. An empty list is the same as no restriction.
    pub fn update_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.update_columns = (!columns.is_empty()).then_some(columns);
        self
    }
}
