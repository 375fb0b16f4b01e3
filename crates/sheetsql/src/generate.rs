//! Drive a [`StatementPlan`] over a row sequence.
//!
//! Rows are rendered strictly in input order and statements come out in the
//! same order. The first error stops the run; callers must treat anything
//! already written to the sink as invalid.

use crate::builder::{StatementBuilder, StatementPlan};
use crate::error::SqlGenResult;
use crate::row::{Row, Sheet};
use std::io::Write;
use tracing::{debug, info, trace};

/// Default number of statements buffered before writing to the sink.
pub const DEFAULT_FLUSH_EVERY: usize = 1000;

/// Counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    /// Rows read.
    pub rows: usize,
    /// Statements produced.
    pub written: usize,
    /// Rows that produced no statement.
    pub skipped: usize,
}

/// Render every row into a statement list.
pub fn generate_statements<'a, I>(plan: &StatementPlan, rows: I) -> SqlGenResult<Vec<String>>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut out = Vec::new();
    for (idx, row) in rows.into_iter().enumerate() {
        match plan.render(idx + 1, row)? {
            Some(sql) => out.push(sql),
            None => debug!(target: "sheetsql", row = idx + 1, "row has nothing to update, skipped"),
        }
    }
    Ok(out)
}

/// Prepare a plan for `sheet` and render all of its rows.
pub fn generate_sheet(builder: &StatementBuilder, sheet: &Sheet) -> SqlGenResult<Vec<String>> {
    let plan = builder.prepare(&sheet.columns)?;
    generate_statements(&plan, &sheet.rows)
}

/// Render rows and write one newline-terminated statement per line.
///
/// Statements are buffered and written every `flush_every` statements
/// (`0` is treated as `1`).
pub fn write_statements<'a, I, W>(
    plan: &StatementPlan,
    rows: I,
    out: &mut W,
    flush_every: usize,
) -> SqlGenResult<GenerateSummary>
where
    I: IntoIterator<Item = &'a Row>,
    W: Write + ?Sized,
{
    let flush_every = flush_every.max(1);
    let mut summary = GenerateSummary::default();
    let mut buffer = String::new();
    let mut pending = 0usize;

    for (idx, row) in rows.into_iter().enumerate() {
        summary.rows += 1;
        let Some(sql) = plan.render(idx + 1, row)? else {
            summary.skipped += 1;
            debug!(target: "sheetsql", row = idx + 1, "row has nothing to update, skipped");
            continue;
        };
        trace!(target: "sheetsql", row = idx + 1, sql = %sql, "statement");
        buffer.push_str(&sql);
        buffer.push('\n');
        pending += 1;
        summary.written += 1;

        if pending >= flush_every {
            out.write_all(buffer.as_bytes())?;
            buffer.clear();
            pending = 0;
        }
    }

    if !buffer.is_empty() {
        out.write_all(buffer.as_bytes())?;
    }
    out.flush()?;

    info!(
        target: "sheetsql",
        kind = %plan.kind(),
        rows = summary.rows,
        written = summary.written,
        skipped = summary.skipped,
        "generation finished"
    );
    Ok(summary)
}
