//! Render an UPSERT script for a small in-memory sheet.
//!
//! Run with: `cargo run -p sheetsql --example upsert`

use sheetsql::{AliasMap, Dialect, Policy, Sheet, StatementBuilder, Value, write_statements};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut sheet = Sheet::new(vec!["id".into(), "nm".into(), "email".into()]);
    sheet
        .push_values([Value::Int(1), Value::from("alice"), Value::from("a@example.com")])
        .push_values([Value::Int(2), Value::from("O'Brien"), Value::Null]);

    let aliases: AliasMap = [("nm", "name")].into_iter().collect();

    for dialect in [Dialect::MySql80, Dialect::Postgres] {
        println!("-- {dialect}");
        let plan = StatementBuilder::new("users", ["id"])
            .aliases(aliases.clone())
            .policy(Policy::upsert().dialect(dialect))
            .prepare(&sheet.columns)?;
        write_statements(&plan, &sheet.rows, &mut std::io::stdout().lock(), 100)?;
    }
    Ok(())
}
