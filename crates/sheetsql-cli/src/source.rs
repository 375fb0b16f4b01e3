//! Row sources: spreadsheets, CSV and JSON files turned into a [`Sheet`].

use anyhow::Context;
use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use sheetsql::{Row, Sheet, Value};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Spreadsheet,
    Csv,
    Json,
}

impl InputFormat {
    /// Use `explicit` when given (other than `auto`), else the file extension.
    pub fn detect(path: &Path, explicit: Option<&str>) -> anyhow::Result<Self> {
        if let Some(name) = explicit {
            match name.trim().to_ascii_lowercase().as_str() {
                "auto" => {}
                "spreadsheet" | "excel" | "xlsx" | "xls" | "ods" => return Ok(Self::Spreadsheet),
                "csv" => return Ok(Self::Csv),
                "json" => return Ok(Self::Json),
                other => anyhow::bail!("unsupported input format: {other}"),
            }
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Ok(Self::Spreadsheet),
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => anyhow::bail!(
                "cannot infer input format from {}; pass --format",
                path.display()
            ),
        }
    }
}

/// Sheet selector: a zero-based position or a sheet name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    Index(usize),
    Name(String),
}

impl SheetRef {
    /// All-digit input is an index; anything else is a name.
    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<usize>() {
            Ok(i) => SheetRef::Index(i),
            Err(_) => SheetRef::Name(s.to_string()),
        }
    }
}

/// Read all rows of `path`.
pub fn read_sheet(
    path: &Path,
    format: InputFormat,
    sheet: Option<&SheetRef>,
) -> anyhow::Result<Sheet> {
    let sheet = match format {
        InputFormat::Spreadsheet => read_spreadsheet(path, sheet)?,
        InputFormat::Csv => read_csv(path)?,
        InputFormat::Json => read_json(path)?,
    };
    tracing::debug!(
        path = %path.display(),
        columns = sheet.columns.len(),
        rows = sheet.rows.len(),
        "read input"
    );
    Ok(sheet)
}

/// Sheet names of a workbook, in workbook order.
pub fn list_sheets(path: &Path) -> anyhow::Result<Vec<String>> {
    let workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;
    Ok(workbook.sheet_names())
}

/// Column names only, without converting any data rows.
pub fn read_columns(
    path: &Path,
    format: InputFormat,
    sheet: Option<&SheetRef>,
) -> anyhow::Result<Vec<String>> {
    match format {
        InputFormat::Spreadsheet => {
            let range = open_range(path, sheet)?;
            Ok(range.rows().next().map(header_names).unwrap_or_default())
        }
        InputFormat::Csv => {
            let mut reader = csv::Reader::from_path(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let headers = reader
                .headers()
                .with_context(|| format!("failed to read CSV header of {}", path.display()))?;
            Ok(dedupe_headers(headers.iter().map(str::to_string).collect()))
        }
        InputFormat::Json => Ok(read_json(path)?.columns),
    }
}

// ── Spreadsheets ────────────────────────────────────────────────────────────

fn open_range(path: &Path, sheet: Option<&SheetRef>) -> anyhow::Result<Range<Data>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;
    let names = workbook.sheet_names();

    let name = match sheet.unwrap_or(&SheetRef::Index(0)) {
        SheetRef::Index(i) => names
            .get(*i)
            .cloned()
            .with_context(|| format!("sheet index {i} out of range ({} sheets)", names.len()))?,
        SheetRef::Name(n) => {
            if !names.iter().any(|s| s == n) {
                anyhow::bail!(
                    "sheet '{n}' not found; available sheets: {}",
                    names.join(", ")
                );
            }
            n.clone()
        }
    };

    workbook
        .worksheet_range(&name)
        .with_context(|| format!("failed to read sheet '{name}'"))
}

fn read_spreadsheet(path: &Path, sheet: Option<&SheetRef>) -> anyhow::Result<Sheet> {
    let range = open_range(path, sheet)?;
    let mut rows = range.rows();

    let Some(header) = rows.next() else {
        return Ok(Sheet::default());
    };
    let mut out = Sheet::new(header_names(header));

    for cells in rows {
        // Trailing blank rows inside the used range carry no data.
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        out.push_values(cells.iter().map(cell_value));
    }
    Ok(out)
}

fn header_names(cells: &[Data]) -> Vec<String> {
    let names = cells
        .iter()
        .enumerate()
        .map(|(i, c)| match c {
            Data::Empty => format!("Unnamed: {i}"),
            Data::String(s) => s.trim().to_string(),
            other => other.to_string(),
        })
        .collect();
    dedupe_headers(names)
}

/// Rename repeated header names to `name.1`, `name.2`, ...
fn dedupe_headers(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let count = seen.entry(name.clone()).or_default();
        if *count == 0 {
            out.push(name);
        } else {
            out.push(format!("{name}.{count}"));
        }
        *count += 1;
    }
    out
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => float_value(*f),
        Data::String(s) => Value::Text(s.clone()),
        Data::DateTime(dt) => dt.as_datetime().map_or(Value::Null, Value::DateTime),
        Data::DateTimeIso(s) => parse_iso(s),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Whole floats become integers; spreadsheets store every number as a float.
fn float_value(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Value::Int(f as i64)
    } else {
        Value::Float(f)
    }
}

fn parse_iso(s: &str) -> Value {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Value::DateTime(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Value::Date(d);
    }
    Value::Text(s.to_string())
}

// ── CSV ─────────────────────────────────────────────────────────────────────

/// Narrowest type every non-empty cell of a column parses as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ColumnType {
    Bool,
    Int,
    Float,
    Text,
}

fn cell_type(s: &str) -> ColumnType {
    if parse_csv_bool(s).is_some() {
        ColumnType::Bool
    } else if s.parse::<i64>().is_ok() {
        ColumnType::Int
    } else if s.parse::<f64>().is_ok_and(f64::is_finite) {
        ColumnType::Float
    } else {
        ColumnType::Text
    }
}

fn merge_types(a: ColumnType, b: ColumnType) -> ColumnType {
    match (a, b) {
        (x, y) if x == y => x,
        // Bool only mixes with itself.
        (ColumnType::Bool, _) | (_, ColumnType::Bool) => ColumnType::Text,
        (x, y) => x.max(y),
    }
}

fn parse_csv_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn typed_cell(s: &str, ty: ColumnType) -> Value {
    if s.is_empty() {
        return Value::Null;
    }
    match ty {
        ColumnType::Bool => parse_csv_bool(s).map_or_else(|| Value::from(s), Value::Bool),
        ColumnType::Int => s.parse().map_or_else(|_| Value::from(s), Value::Int),
        ColumnType::Float => s.parse().map_or_else(|_| Value::from(s), Value::Float),
        ColumnType::Text => Value::from(s),
    }
}

fn read_csv(path: &Path) -> anyhow::Result<Sheet> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let columns = dedupe_headers(
        reader
            .headers()
            .with_context(|| format!("failed to read CSV header of {}", path.display()))?
            .iter()
            .map(str::to_string)
            .collect(),
    );

    let mut records = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("failed to read CSV record {} of {}", idx + 1, path.display()))?;
        records.push(record);
    }

    let mut types: Vec<Option<ColumnType>> = vec![None; columns.len()];
    for record in &records {
        for (slot, field) in types.iter_mut().zip(record.iter()) {
            if field.is_empty() {
                continue;
            }
            let ty = cell_type(field);
            *slot = Some(slot.map_or(ty, |prev| merge_types(prev, ty)));
        }
    }

    let mut sheet = Sheet::new(columns);
    for record in &records {
        let values = record
            .iter()
            .zip(&types)
            .map(|(field, ty)| typed_cell(field, ty.unwrap_or(ColumnType::Text)));
        sheet.push_values(values);
    }
    Ok(sheet)
}

// ── JSON ────────────────────────────────────────────────────────────────────

/// An array of objects; columns in first-seen key order.
fn read_json(path: &Path) -> anyhow::Result<Sheet> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_json_rows(&raw).with_context(|| format!("invalid JSON rows in {}", path.display()))
}

fn parse_json_rows(raw: &str) -> anyhow::Result<Sheet> {
    let objects: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("expected an array of objects: {e}"))?;

    let mut columns: Vec<String> = Vec::new();
    for obj in &objects {
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut sheet = Sheet::new(columns);
    for obj in objects {
        let row: Row = obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
        sheet.push_row(row);
    }
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn detect_format() {
        let p = Path::new("book.XLSX");
        assert_eq!(InputFormat::detect(p, None).unwrap(), InputFormat::Spreadsheet);
        assert_eq!(
            InputFormat::detect(Path::new("a.txt"), Some("csv")).unwrap(),
            InputFormat::Csv
        );
        assert_eq!(
            InputFormat::detect(Path::new("a.json"), Some("auto")).unwrap(),
            InputFormat::Json
        );
        assert!(InputFormat::detect(Path::new("a.txt"), None).is_err());
        assert!(InputFormat::detect(p, Some("parquet")).is_err());
    }

    #[test]
    fn sheet_ref_parse() {
        assert_eq!(SheetRef::parse("2"), SheetRef::Index(2));
        assert_eq!(SheetRef::parse("Sheet 2"), SheetRef::Name("Sheet 2".into()));
    }

    #[test]
    fn csv_infers_column_types() {
        let f = write_temp(
            ".csv",
            "id,price,flag,code,note\n1,2.5,true,007,hello\n2,3,FALSE,x1,\n",
        );
        let sheet = read_sheet(f.path(), InputFormat::Csv, None).unwrap();

        assert_eq!(sheet.columns, vec!["id", "price", "flag", "code", "note"]);
        let first = &sheet.rows[0];
        assert_eq!(first.get("id"), Some(&Value::Int(1)));
        assert_eq!(first.get("price"), Some(&Value::Float(2.5)));
        assert_eq!(first.get("flag"), Some(&Value::Bool(true)));
        assert_eq!(first.get("code"), Some(&Value::from("007")));

        let second = &sheet.rows[1];
        assert_eq!(second.get("price"), Some(&Value::Float(3.0)));
        assert_eq!(second.get("flag"), Some(&Value::Bool(false)));
        assert_eq!(second.get("note"), Some(&Value::Null));
    }

    #[test]
    fn csv_duplicate_headers_are_renamed() {
        let f = write_temp(".csv", "a,a,b\n1,2,3\n");
        let cols = read_columns(f.path(), InputFormat::Csv, None).unwrap();
        assert_eq!(cols, vec!["a", "a.1", "b"]);
    }

    #[test]
    fn json_rows_keep_key_order() {
        let sheet = parse_json_rows(
            r#"[{"id": 1, "name": "O'Brien", "note": null}, {"id": 2, "extra": true}]"#,
        )
        .unwrap();

        assert_eq!(sheet.columns, vec!["id", "name", "note", "extra"]);
        assert_eq!(sheet.rows[0].get("note"), Some(&Value::Null));
        assert!(!sheet.rows[1].contains("name"));
    }

    #[test]
    fn json_rejects_non_array() {
        assert!(parse_json_rows(r#"{"id": 1}"#).is_err());
    }

    #[test]
    fn spreadsheet_cells() {
        assert_eq!(cell_value(&Data::Float(5.0)), Value::Int(5));
        assert_eq!(cell_value(&Data::Float(5.5)), Value::Float(5.5));
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(
            cell_value(&Data::DateTimeIso("2024-02-03".into())),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 3).unwrap())
        );
        assert_eq!(
            header_names(&[Data::String(" id ".into()), Data::Empty, Data::Int(7)]),
            vec!["id", "Unnamed: 1", "7"]
        );
    }

    // Two sheets: "Items" (header, two rows, a blank row, one more row)
    // and "Prices".
    fn workbook() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/inventory.xlsx")
    }

    #[test]
    fn workbook_sheet_names() {
        assert_eq!(list_sheets(&workbook()).unwrap(), vec!["Items", "Prices"]);
    }

    #[test]
    fn workbook_first_sheet_by_default() {
        let sheet = read_sheet(&workbook(), InputFormat::Spreadsheet, None).unwrap();

        assert_eq!(sheet.columns, vec!["sku", "name", "qty", "price", "received"]);
        // The blank row is dropped; the header is not a data row.
        assert_eq!(sheet.rows.len(), 3);

        let first = &sheet.rows[0];
        assert_eq!(first.get("sku"), Some(&Value::from("A-1")));
        assert_eq!(first.get("qty"), Some(&Value::Int(10)));
        assert_eq!(first.get("price"), Some(&Value::Float(2.5)));
        assert_eq!(
            first.get("received"),
            Some(&Value::DateTime(
                NaiveDate::from_ymd_opt(2023, 3, 15)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            ))
        );

        let second = &sheet.rows[1];
        assert_eq!(second.get("name"), Some(&Value::Null));
        assert_eq!(second.get("qty"), Some(&Value::Int(0)));

        let third = &sheet.rows[2];
        assert_eq!(third.get("sku"), Some(&Value::from("C-3")));
        assert_eq!(third.get("name"), Some(&Value::from("O'Brien")));
        assert_eq!(third.get("price"), Some(&Value::Int(3)));
    }

    #[test]
    fn workbook_sheet_by_name_or_index() {
        let by_name = read_sheet(
            &workbook(),
            InputFormat::Spreadsheet,
            Some(&SheetRef::Name("Prices".into())),
        )
        .unwrap();
        let by_index =
            read_sheet(&workbook(), InputFormat::Spreadsheet, Some(&SheetRef::Index(1))).unwrap();

        assert_eq!(by_name, by_index);
        assert_eq!(by_name.columns, vec!["sku", "price"]);
        assert_eq!(by_name.rows[0].get("price"), Some(&Value::Float(2.75)));
    }

    #[test]
    fn workbook_columns() {
        let cols = read_columns(&workbook(), InputFormat::Spreadsheet, None).unwrap();
        assert_eq!(cols, vec!["sku", "name", "qty", "price", "received"]);

        let cols = read_columns(
            &workbook(),
            InputFormat::Spreadsheet,
            Some(&SheetRef::parse("1")),
        )
        .unwrap();
        assert_eq!(cols, vec!["sku", "price"]);
    }

    #[test]
    fn workbook_unknown_sheet() {
        let err = read_sheet(&workbook(), InputFormat::Spreadsheet, Some(&SheetRef::Index(2)))
            .unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");

        let err = read_columns(
            &workbook(),
            InputFormat::Spreadsheet,
            Some(&SheetRef::Name("Stock".into())),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "sheet 'Stock' not found; available sheets: Items, Prices"
        );
    }
}
