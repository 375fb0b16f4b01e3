use super::{PlannedColumn, StatementPlan};
use crate::error::SqlGenResult;
use crate::row::Row;

/// `UPDATE t SET ... WHERE ...;`, or `None` when nothing is left to set.
pub(super) fn render(
    plan: &StatementPlan,
    set: &[PlannedColumn],
    row_number: usize,
    row: &Row,
) -> SqlGenResult<Option<String>> {
    let dialect = plan.policy.dialect;

    // Keys first: a missing key is fatal even for a row with nothing to set.
    let mut conditions = String::new();
    plan.write_key_conditions(&mut conditions, row_number, row)?;

    let mut assignments = String::new();
    for column in set {
        let value = StatementPlan::cell(row, column);
        if plan.skips(value) {
            continue;
        }
        if !assignments.is_empty() {
            assignments.push_str(", ");
        }
        dialect.write_ident(&mut assignments, &column.target);
        assignments.push_str(" = ");
        dialect.write_literal(&mut assignments, value);
    }

    if assignments.is_empty() {
        return Ok(None);
    }

    let mut sql = String::with_capacity(
        plan.quoted_table.len() + assignments.len() + conditions.len() + 22,
    );
    sql.push_str("UPDATE ");
    sql.push_str(&plan.quoted_table);
    sql.push_str(" SET ");
    sql.push_str(&assignments);
    sql.push_str(" WHERE ");
    sql.push_str(&conditions);
    sql.push(';');
    Ok(Some(sql))
}
