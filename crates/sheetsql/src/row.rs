//! Rows of named cells, and the column order they were read in.

use crate::value::Value;

/// One source row: an ordered mapping from column name to [`Value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell, replacing an existing cell with the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((column, value)),
        }
        self
    }

    /// Builder-style [`Row::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Rows together with their declared column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row given positionally, in column order.
    ///
    /// Missing trailing cells are left out of the row; extra cells are dropped.
    pub fn push_values(&mut self, values: impl IntoIterator<Item = Value>) -> &mut Self {
        let row = self
            .columns
            .iter()
            .zip(values)
            .map(|(c, v)| (c.clone(), v))
            .collect();
        self.rows.push(row);
        self
    }

    pub fn push_row(&mut self, row: Row) -> &mut Self {
        self.rows.push(row);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
