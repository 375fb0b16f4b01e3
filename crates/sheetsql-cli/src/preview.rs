use crate::cli::PreviewArgs;
use crate::source::{self, InputFormat, SheetRef};

pub fn run(args: PreviewArgs) -> anyhow::Result<()> {
    for line in preview_lines(&args)? {
        println!("{line}");
    }
    Ok(())
}

/// Sheet names for a workbook without `--sheet`; column names otherwise.
fn preview_lines(args: &PreviewArgs) -> anyhow::Result<Vec<String>> {
    let format = InputFormat::detect(&args.input, args.format.as_deref())?;
    let sheet = args.sheet.as_deref().map(SheetRef::parse);

    match (format, &sheet) {
        (InputFormat::Spreadsheet, None) => source::list_sheets(&args.input),
        _ => source::read_columns(&args.input, format, sheet.as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_csv_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.csv");
        std::fs::write(&path, "sku,qty,sku\nA,1,B\n").unwrap();

        let lines = preview_lines(&PreviewArgs {
            input: path,
            sheet: None,
            format: None,
        })
        .unwrap();
        assert_eq!(lines, vec!["sku", "qty", "sku.1"]);
    }

    #[test]
    fn missing_workbook_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = preview_lines(&PreviewArgs {
            input: dir.path().join("nope.xlsx"),
            sheet: None,
            format: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("failed to open workbook"));
    }
}
