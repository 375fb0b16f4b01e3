//! Per-row statement builder.
//!
//! Building happens in two steps:
//!
//! 1. [`StatementBuilder::prepare`] checks the configuration against the
//!    source column set and resolves the column lists for the chosen
//!    statement shape. Every configuration, schema and alias-collision error
//!    surfaces here, before any row is touched.
//! 2. [`StatementPlan::render`] turns one row into at most one statement.
//!
//! ```ignore
//! use sheetsql::{Policy, Row, StatementBuilder};
//!
//! let plan = StatementBuilder::new("t", ["id"])
//!     .policy(Policy::update())
//!     .prepare(&["id", "name", "note"])?;
//!
//! let row = Row::new().with("id", 5).with("name", "O'Brien");
//! assert_eq!(
//!     plan.render(1, &row)?.as_deref(),
//!     Some(r"UPDATE `t` SET `name` = 'O\'Brien' WHERE `id` = 5;")
//! );
//! # Ok::<(), sheetsql::SqlGenError>(())
//! ```

mod insert;
mod update;

use crate::alias::AliasMap;
use crate::error::{SqlGenError, SqlGenResult};
use crate::policy::{Policy, StatementKind};
use crate::row::Row;
use crate::value::Value;
use tracing::{debug, warn};

static NULL: Value = Value::Null;

/// Statement builder configuration: target table, keys, aliases and policy.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    table: String,
    primary_keys: Vec<String>,
    aliases: AliasMap,
    policy: Policy,
}

/// A source column together with its destination name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlannedColumn {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone)]
enum Shape {
    Update {
        set: Vec<PlannedColumn>,
    },
    Insert {
        columns: Vec<PlannedColumn>,
    },
    Upsert {
        columns: Vec<PlannedColumn>,
        conflict: Vec<PlannedColumn>,
    },
}

/// A validated builder, ready to render rows.
#[derive(Debug, Clone)]
pub struct StatementPlan {
    quoted_table: String,
    keys: Vec<PlannedColumn>,
    shape: Shape,
    policy: Policy,
}

impl StatementBuilder {
    pub fn new<I, S>(table: impl Into<String>, primary_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            primary_keys: primary_keys.into_iter().map(Into::into).collect(),
            aliases: AliasMap::default(),
            policy: Policy::default(),
        }
    }

    pub fn aliases(mut self, aliases: AliasMap) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn kind(&self) -> StatementKind {
        self.policy.kind
    }

    /// Validate against the source column order and resolve column lists.
    pub fn prepare<S: AsRef<str>>(&self, columns: &[S]) -> SqlGenResult<StatementPlan> {
        let columns: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
        self.validate(&columns)?;

        let keys = self.plan_columns(self.primary_keys.iter().map(String::as_str));
        let shape = match self.policy.kind {
            StatementKind::Update => {
                let set = self.plan_checked(self.update_set_columns(&columns))?;
                Shape::Update { set }
            }
            StatementKind::Insert => {
                let columns = self.plan_checked(self.insert_columns(&columns))?;
                Shape::Insert { columns }
            }
            StatementKind::Upsert => {
                let insert_columns = self.plan_checked(self.insert_columns(&columns))?;
                let conflict = self.plan_columns(self.conflict_columns(&columns));
                Shape::Upsert {
                    columns: insert_columns,
                    conflict,
                }
            }
        };

        debug!(
            target: "sheetsql",
            table = %self.table,
            kind = %self.policy.kind,
            dialect = %self.policy.dialect,
            keys = keys.len(),
            "prepared statement plan"
        );

        Ok(StatementPlan {
            quoted_table: self.policy.dialect.quote_ident(&self.table),
            keys,
            shape,
            policy: self.policy.clone(),
        })
    }

    fn validate(&self, columns: &[&str]) -> SqlGenResult<()> {
        if self.table.trim().is_empty() {
            return Err(SqlGenError::configuration("table name must not be empty"));
        }
        if self.primary_keys.is_empty() {
            return Err(SqlGenError::configuration(
                "at least one primary key column is required",
            ));
        }
        for (i, key) in self.primary_keys.iter().enumerate() {
            if self.primary_keys[..i].contains(key) {
                return Err(SqlGenError::configuration(format!(
                    "duplicate primary key column: {key}"
                )));
            }
        }

        let missing: Vec<String> = self
            .primary_keys
            .iter()
            .filter(|k| !columns.contains(&k.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(SqlGenError::SchemaMismatch { missing });
        }

        if let Some(explicit) = &self.policy.update_columns {
            for c in explicit.iter().filter(|c| !columns.contains(&c.as_str())) {
                warn!(target: "sheetsql", column = %c, "update column not present in source columns");
            }
        }
        Ok(())
    }

    fn is_key(&self, column: &str) -> bool {
        self.primary_keys.iter().any(|k| k == column)
    }

    /// UPDATE SET candidates: the explicit list, else every column; keys excluded.
    fn update_set_columns<'a>(&'a self, columns: &[&'a str]) -> Vec<&'a str> {
        match &self.policy.update_columns {
            Some(explicit) => explicit
                .iter()
                .map(String::as_str)
                .filter(|c| !self.is_key(c))
                .collect(),
            None => columns.iter().copied().filter(|c| !self.is_key(c)).collect(),
        }
    }

    /// INSERT column list. With explicit update columns: the keys first,
    /// then the update columns, each group in source column order.
    fn insert_columns<'a>(&self, columns: &[&'a str]) -> Vec<&'a str> {
        let Some(explicit) = &self.policy.update_columns else {
            return columns.to_vec();
        };

        let mut out: Vec<&'a str> = Vec::with_capacity(columns.len());
        let keys = columns.iter().copied().filter(|c| self.is_key(c));
        let updates = columns
            .iter()
            .copied()
            .filter(|c| explicit.iter().any(|u| u == c));
        for c in keys.chain(updates) {
            if !out.contains(&c) {
                out.push(c);
            }
        }
        out
    }

    /// UPSERT conflict-update candidates: the explicit list, else every
    /// column; keys excluded.
    fn conflict_columns<'a>(&'a self, columns: &[&'a str]) -> Vec<&'a str> {
        self.update_set_columns(columns)
    }

    fn plan_columns<'a>(&self, sources: impl IntoIterator<Item = &'a str>) -> Vec<PlannedColumn> {
        sources
            .into_iter()
            .map(|source| PlannedColumn {
                source: source.to_string(),
                target: self.aliases.map(source).to_string(),
            })
            .collect()
    }

    fn plan_checked(&self, sources: Vec<&str>) -> SqlGenResult<Vec<PlannedColumn>> {
        let targets = self.aliases.map_all_unique(&sources)?;
        Ok(sources
            .into_iter()
            .zip(targets)
            .map(|(source, target)| PlannedColumn {
                source: source.to_string(),
                target,
            })
            .collect())
    }
}

impl StatementPlan {
    pub fn kind(&self) -> StatementKind {
        self.policy.kind
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Render the statement for one row.
    ///
    /// `row_number` only labels errors. Returns `Ok(None)` when the row has
    /// nothing to update. A primary key missing from the row is an error.
    pub fn render(&self, row_number: usize, row: &Row) -> SqlGenResult<Option<String>> {
        match &self.shape {
            Shape::Update { set } => update::render(self, set, row_number, row),
            Shape::Insert { columns } => {
                insert::render_insert(self, columns, row_number, row).map(Some)
            }
            Shape::Upsert { columns, conflict } => {
                insert::render_upsert(self, columns, conflict, row_number, row).map(Some)
            }
        }
    }

    /// Destination column names of the INSERT column list, or of the UPDATE
    /// SET candidates.
    pub fn target_columns(&self) -> Vec<&str> {
        let cols = match &self.shape {
            Shape::Update { set } => set,
            Shape::Insert { columns } | Shape::Upsert { columns, .. } => columns,
        };
        cols.iter().map(|c| c.target.as_str()).collect()
    }

    fn key_value<'r>(&self, key: &PlannedColumn, row_number: usize, row: &'r Row) -> SqlGenResult<&'r Value> {
        row.get(&key.source)
            .ok_or_else(|| SqlGenError::row_field(row_number, &key.source))
    }

    /// Append `col = value AND ...` for every primary key.
    fn write_key_conditions(&self, out: &mut String, row_number: usize, row: &Row) -> SqlGenResult<()> {
        let dialect = self.policy.dialect;
        for (i, key) in self.keys.iter().enumerate() {
            let value = self.key_value(key, row_number, row)?;
            if i > 0 {
                out.push_str(" AND ");
            }
            dialect.write_ident(out, &key.target);
            out.push_str(" = ");
            dialect.write_literal(out, value);
        }
        Ok(())
    }

    /// Cell for a non-key column; absent cells read as null.
    fn cell<'r>(row: &'r Row, column: &PlannedColumn) -> &'r Value {
        row.get(&column.source).unwrap_or(&NULL)
    }

    /// Whether a cell is left out of SET / conflict-update lists.
    fn skips(&self, value: &Value) -> bool {
        self.policy.skip_nulls_in_set && value.is_null()
    }
}
