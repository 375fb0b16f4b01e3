use super::{PlannedColumn, StatementPlan};
use crate::error::SqlGenResult;
use crate::row::Row;

/// `INSERT INTO t (...) VALUES (...);`. Null cells are always written.
pub(super) fn render_insert(
    plan: &StatementPlan,
    columns: &[PlannedColumn],
    row_number: usize,
    row: &Row,
) -> SqlGenResult<String> {
    let mut sql = String::new();
    write_insert(plan, columns, row_number, row, &mut sql)?;
    sql.push(';');
    Ok(sql)
}

/// INSERT with a conflict-update clause.
///
/// Degrades to a plain INSERT when every conflict column is skipped.
pub(super) fn render_upsert(
    plan: &StatementPlan,
    columns: &[PlannedColumn],
    conflict: &[PlannedColumn],
    row_number: usize,
    row: &Row,
) -> SqlGenResult<String> {
    let dialect = plan.policy.dialect;

    let mut sql = String::new();
    write_insert(plan, columns, row_number, row, &mut sql)?;

    let mut assignments = String::new();
    for column in conflict {
        if plan.skips(StatementPlan::cell(row, column)) {
            continue;
        }
        if !assignments.is_empty() {
            assignments.push_str(", ");
        }
        dialect.write_ident(&mut assignments, &column.target);
        assignments.push_str(" = ");
        dialect.write_incoming_ref(&mut assignments, &column.target);
    }

    if !assignments.is_empty() {
        let keys: Vec<String> = plan.keys.iter().map(|k| k.target.clone()).collect();
        dialect.write_conflict_prefix(&mut sql, &keys);
        sql.push_str(&assignments);
    }
    sql.push(';');
    Ok(sql)
}

fn write_insert(
    plan: &StatementPlan,
    columns: &[PlannedColumn],
    row_number: usize,
    row: &Row,
    out: &mut String,
) -> SqlGenResult<()> {
    let dialect = plan.policy.dialect;
    for key in &plan.keys {
        plan.key_value(key, row_number, row)?;
    }

    out.push_str("INSERT INTO ");
    out.push_str(&plan.quoted_table);
    out.push_str(" (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        dialect.write_ident(out, &column.target);
    }
    out.push_str(") VALUES (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        dialect.write_literal(out, StatementPlan::cell(row, column));
    }
    out.push(')');
    Ok(())
}
