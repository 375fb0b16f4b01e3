use crate::cli::InitArgs;
use std::path::Path;

const TEMPLATE: &str = r#"
version = "1"

table = "users"
primary_keys = ["id"]

# UPDATE | INSERT | UPSERT
stmt = "UPDATE"
# mysql57 | mysql80 | postgres
dialect = "mysql80"
skip_nulls_in_set = true
# Empty means every non-key column.
update_columns = []

[aliases]
# "source column" = "table column"
# "User Name" = "name"

[input]
path = "${SHEETSQL_INPUT:-rows.xlsx}"
sheet = 0 # name or zero-based index
format = "auto" # auto | spreadsheet | csv | json

[output]
# path = "update_users.sql"
flush_every = 1000
"#;

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    write_template(&args.config)?;
    println!("wrote {}", args.config.display());
    Ok(())
}

fn write_template(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("refusing to overwrite existing file: {}", path.display());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("failed to create directory {}: {e}", parent.display())
            })?;
        }
    }

    std::fs::write(path, TEMPLATE.trim_start_matches('\n'))
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;

    #[test]
    fn template_parses_as_config() {
        let file: ConfigFile = toml::from_str(TEMPLATE).unwrap();
        assert_eq!(file.table.as_deref(), Some("users"));
        assert_eq!(file.primary_keys, vec!["id"]);
        assert_eq!(file.output.flush_every, Some(1000));
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("sheetsql.toml");

        write_template(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("version"));

        let err = write_template(&path).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));
    }
}
