//! # sheetsql
//!
//! Turn spreadsheet-like rows into UPDATE / INSERT / UPSERT statements.
//!
//! ## Features
//!
//! - **Typed cells**: null, bool, integer, float, date, date-time and text,
//!   each rendered as an escaped SQL literal
//! - **Column aliases**: rename source columns to destination columns, with
//!   collisions rejected up front
//! - **Null policy**: leave null cells out of SET lists and conflict clauses
//! - **Dialects**: MySQL (`ON DUPLICATE KEY UPDATE`) and PostgreSQL
//!   (`ON CONFLICT ... DO UPDATE`)
//! - **Fail fast**: configuration problems are reported before any row is
//!   rendered; a row without its primary key stops the run
//!
//! ## Example
//!
//! ```ignore
//! use sheetsql::{AliasMap, Policy, Sheet, StatementBuilder, Value};
//!
//! let mut sheet = Sheet::new(vec!["id".into(), "nm".into()]);
//! sheet.push_values([Value::Int(1), Value::from("alice")]);
//!
//! let aliases: AliasMap = [("nm", "name")].into_iter().collect();
//! let plan = StatementBuilder::new("users", ["id"])
//!     .aliases(aliases)
//!     .policy(Policy::upsert())
//!     .prepare(&sheet.columns)?;
//!
//! let stmts = sheetsql::generate_statements(&plan, &sheet.rows)?;
//! // INSERT INTO `users` (`id`, `name`) VALUES (1, 'alice')
//! //   ON DUPLICATE KEY UPDATE `name` = VALUES(`name`);
//! ```

pub mod alias;
pub mod builder;
pub mod dialect;
pub mod error;
pub mod generate;
pub mod policy;
pub mod row;
pub mod value;

pub use alias::{AliasMap, ensure_unique};
pub use builder::{StatementBuilder, StatementPlan};
pub use dialect::{Dialect, quote_ident};
pub use error::{SqlGenError, SqlGenResult};
pub use generate::{
    DEFAULT_FLUSH_EVERY, GenerateSummary, generate_sheet, generate_statements, write_statements,
};
pub use policy::{Policy, StatementKind};
pub use row::{Row, Sheet};
pub use value::{Value, escape_string};
