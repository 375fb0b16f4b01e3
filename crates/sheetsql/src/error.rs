//! Error types for sheetsql

use thiserror::Error;

/// Result type alias for sheetsql operations
pub type SqlGenResult<T> = Result<T, SqlGenError>;

/// Error types for statement generation.
///
/// Configuration, schema and duplicate-column errors are raised before the
/// first row is looked at. Row errors abort the run at the offending row.
#[derive(Debug, Error)]
pub enum SqlGenError {
    /// Invalid table name, primary keys, statement kind, dialect or alias spec
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Declared primary keys missing from the source column set
    #[error("Primary key columns missing from source columns: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    /// Several source columns map to the same destination column
    #[error("Duplicate destination columns after aliasing: {}; rename the aliases to avoid the collision", .names.join(", "))]
    DuplicateColumn { names: Vec<String> },

    /// A primary key column has no entry in a row
    #[error("Row {row}: primary key column '{column}' is missing")]
    RowField { row: usize, column: String },

    /// Writing to the output sink failed
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

impl SqlGenError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a row field error for a specific row and column
    pub fn row_field(row: usize, column: impl Into<String>) -> Self {
        Self::RowField {
            row,
            column: column.into(),
        }
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a schema mismatch error
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::SchemaMismatch { .. })
    }

    /// Check if this is a duplicate column error
    pub fn is_duplicate_column(&self) -> bool {
        matches!(self, Self::DuplicateColumn { .. })
    }

    /// Check if this is a row field error
    pub fn is_row_field(&self) -> bool {
        matches!(self, Self::RowField { .. })
    }
}
