use crate::cli::{DEFAULT_CONFIG, GenArgs};
use crate::source::{InputFormat, SheetRef};
use serde::Deserialize;
use sheetsql::{AliasMap, DEFAULT_FLUSH_EVERY, Dialect, Policy, StatementBuilder, StatementKind};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub config_dir: PathBuf,
    pub file: ConfigFile,
}

impl ProjectConfig {
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let config_dir = config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let raw = std::fs::read_to_string(config_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read config file {}: {e}",
                config_path.display()
            )
        })?;

        let mut file: ConfigFile = toml::from_str(&raw).map_err(|e| {
            anyhow::anyhow!(
                "failed to parse config file {}: {e}",
                config_path.display()
            )
        })?;

        file.expand_env()?;
        file.validate()?;

        Ok(Self { config_dir, file })
    }

    pub fn resolve_path(&self, p: impl AsRef<Path>) -> PathBuf {
        let p = p.as_ref();
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.config_dir.join(p)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub version: Option<String>,

    pub table: Option<String>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub update_columns: Vec<String>,
    pub stmt: Option<String>,
    pub dialect: Option<String>,
    pub skip_nulls_in_set: Option<bool>,

    #[serde(default)]
    pub aliases: AliasMap,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    pub path: Option<String>,
    pub sheet: Option<SheetRef>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub path: Option<String>,
    pub flush_every: Option<usize>,
}

impl ConfigFile {
    fn expand_env(&mut self) -> anyhow::Result<()> {
        if let Some(table) = self.table.as_mut() {
            *table = expand_env_vars(table)?;
        }
        if let Some(path) = self.input.path.as_mut() {
            *path = expand_env_vars(path)?;
        }
        if let Some(path) = self.output.path.as_mut() {
            *path = expand_env_vars(path)?;
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if let Some(version) = &self.version {
            if version.trim() != "1" {
                anyhow::bail!("unsupported config version: {version}");
            }
        }
        if let Some(table) = &self.table {
            if table.trim().is_empty() {
                anyhow::bail!("table must not be empty");
            }
        }
        if self.primary_keys.iter().any(|k| k.trim().is_empty()) {
            anyhow::bail!("primary_keys must not contain empty names");
        }
        if self.output.flush_every == Some(0) {
            anyhow::bail!("output.flush_every must be at least 1");
        }
        Ok(())
    }
}

/// Everything `gen` needs, after merging the config file with flags.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub table: String,
    pub primary_keys: Vec<String>,
    pub aliases: AliasMap,
    pub policy: Policy,
    pub input: PathBuf,
    pub sheet: Option<SheetRef>,
    pub format: InputFormat,
    /// `None` means stdout.
    pub output: Option<PathBuf>,
    pub flush_every: usize,
}

impl RunSettings {
    /// Merge `args` over the config file.
    ///
    /// Without `--config`, `sheetsql.toml` is read when present and flags
    /// alone are fine otherwise. An explicit `--config` must exist.
    pub fn resolve(args: &GenArgs) -> anyhow::Result<Self> {
        let project = match &args.config {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("config file not found: {}", path.display());
                }
                Some(ProjectConfig::load(path)?)
            }
            None => {
                let default = Path::new(DEFAULT_CONFIG);
                if default.exists() {
                    Some(ProjectConfig::load(default)?)
                } else {
                    None
                }
            }
        };
        Self::merge(project.as_ref(), args)
    }

    pub fn merge(project: Option<&ProjectConfig>, args: &GenArgs) -> anyhow::Result<Self> {
        let empty = ConfigFile::default();
        let file = project.map_or(&empty, |p| &p.file);
        let resolve = |p: &str| match project {
            Some(project) => project.resolve_path(p),
            None => PathBuf::from(p),
        };

        let Some(table) = args.table.clone().or_else(|| file.table.clone()) else {
            anyhow::bail!("missing table: set `table` in the config file or pass --table");
        };
        let table = table.trim().to_string();
        if table.is_empty() {
            anyhow::bail!("table must not be empty");
        }

        let primary_keys = args
            .primary_keys
            .clone()
            .unwrap_or_else(|| file.primary_keys.clone());
        if primary_keys.is_empty() {
            anyhow::bail!(
                "missing primary keys: set `primary_keys` in the config file or pass --primary-keys"
            );
        }

        let kind: StatementKind = match args.stmt.as_deref().or(file.stmt.as_deref()) {
            Some(s) => s.parse()?,
            None => StatementKind::default(),
        };
        let dialect: Dialect = match args.dialect.as_deref().or(file.dialect.as_deref()) {
            Some(s) => s.parse()?,
            None => Dialect::default(),
        };
        let skip_nulls = args
            .skip_nulls
            .or(file.skip_nulls_in_set)
            .unwrap_or(true);
        let update_columns = args
            .update_columns
            .clone()
            .unwrap_or_else(|| file.update_columns.clone());

        let aliases = match &args.aliases_json {
            Some(json) => AliasMap::from_json(json)?,
            None => file.aliases.clone(),
        };

        let input = match (&args.input, &file.input.path) {
            (Some(p), _) => p.clone(),
            (None, Some(p)) => resolve(p),
            (None, None) => {
                anyhow::bail!("missing input: set `input.path` in the config file or pass --input")
            }
        };
        let sheet = match &args.sheet {
            Some(s) => Some(SheetRef::parse(s)),
            None => file.input.sheet.clone(),
        };
        let format = InputFormat::detect(
            &input,
            args.format.as_deref().or(file.input.format.as_deref()),
        )?;

        let output = if args.stdout {
            None
        } else {
            Some(match (&args.out, &file.output.path) {
                (Some(p), _) => p.clone(),
                (None, Some(p)) => resolve(p),
                (None, None) => default_output_name(kind, &table),
            })
        };

        Ok(Self {
            table,
            primary_keys,
            aliases,
            policy: Policy::new(kind)
                .skip_nulls(skip_nulls)
                .dialect(dialect)
                .update_columns(update_columns),
            input,
            sheet,
            format,
            output,
            flush_every: args
                .flush_every
                .or(file.output.flush_every)
                .unwrap_or(DEFAULT_FLUSH_EVERY),
        })
    }

    pub fn builder(&self) -> StatementBuilder {
        StatementBuilder::new(self.table.clone(), self.primary_keys.iter().cloned())
            .aliases(self.aliases.clone())
            .policy(self.policy.clone())
    }
}

/// `<stmt>_<table>.sql`, e.g. `upsert_users.sql`.
pub fn default_output_name(kind: StatementKind, table: &str) -> PathBuf {
    let safe: String = table
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    PathBuf::from(format!(
        "{}_{}.sql",
        kind.as_str().to_ascii_lowercase(),
        safe
    ))
}

/// Replace `${VAR}` and `${VAR:-fallback}` references with their values.
fn expand_env_vars(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            anyhow::bail!("unterminated env var reference: ${{{after}");
        };

        let reference = &after[..end];
        let (key, fallback) = match reference.split_once(":-") {
            Some((key, fallback)) => (key, Some(fallback)),
            None => (reference, None),
        };
        if key.is_empty() {
            anyhow::bail!("invalid env var reference: ${{{reference}}}");
        }

        match (std::env::var(key), fallback) {
            (Ok(v), _) => out.push_str(&v),
            (Err(_), Some(fallback)) => out.push_str(fallback),
            (Err(_), None) => {
                anyhow::bail!("missing env var for config expansion: {key}")
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(toml_src: &str) -> ProjectConfig {
        let mut file: ConfigFile = toml::from_str(toml_src).unwrap();
        file.expand_env().unwrap();
        file.validate().unwrap();
        ProjectConfig {
            config_dir: PathBuf::from("/work"),
            file,
        }
    }

    const SAMPLE: &str = r#"
version = "1"
table = "dw_tables"
primary_keys = ["原始表名", "核验表名"]
stmt = "upsert"
dialect = "mysql57"
skip_nulls_in_set = false

[aliases]
"原始表名" = "src_table"

[input]
path = "data/list.xlsx"
sheet = 1

[output]
path = "out/upsert.sql"
flush_every = 500
"#;

    #[test]
    fn merge_config_only() {
        let p = project(SAMPLE);
        let s = RunSettings::merge(Some(&p), &GenArgs::default()).unwrap();

        assert_eq!(s.table, "dw_tables");
        assert_eq!(s.primary_keys, vec!["原始表名", "核验表名"]);
        assert_eq!(s.policy.kind, StatementKind::Upsert);
        assert_eq!(s.policy.dialect, Dialect::MySql57);
        assert!(!s.policy.skip_nulls_in_set);
        assert_eq!(s.aliases.map("原始表名"), "src_table");
        assert_eq!(s.input, PathBuf::from("/work/data/list.xlsx"));
        assert_eq!(s.sheet, Some(SheetRef::Index(1)));
        assert_eq!(s.format, InputFormat::Spreadsheet);
        assert_eq!(s.output, Some(PathBuf::from("/work/out/upsert.sql")));
        assert_eq!(s.flush_every, 500);
    }

    #[test]
    fn flags_override_config() {
        let p = project(SAMPLE);
        let args = GenArgs {
            table: Some("other".into()),
            stmt: Some("UPDATE".into()),
            input: Some(PathBuf::from("rows.csv")),
            sheet: Some("Sheet1".into()),
            aliases_json: Some("{}".into()),
            stdout: true,
            ..GenArgs::default()
        };
        let s = RunSettings::merge(Some(&p), &args).unwrap();

        assert_eq!(s.table, "other");
        assert_eq!(s.policy.kind, StatementKind::Update);
        assert_eq!(s.input, PathBuf::from("rows.csv"));
        assert_eq!(s.format, InputFormat::Csv);
        assert_eq!(s.sheet, Some(SheetRef::Name("Sheet1".into())));
        assert!(s.aliases.is_empty());
        assert_eq!(s.output, None);
    }

    #[test]
    fn flags_without_config() {
        let args = GenArgs {
            table: Some("users".into()),
            primary_keys: Some(vec!["id".into()]),
            input: Some(PathBuf::from("rows.json")),
            stmt: Some("insert".into()),
            ..GenArgs::default()
        };
        let s = RunSettings::merge(None, &args).unwrap();

        assert_eq!(s.format, InputFormat::Json);
        assert_eq!(s.policy.dialect, Dialect::MySql80);
        assert!(s.policy.skip_nulls_in_set);
        assert_eq!(s.output, Some(PathBuf::from("insert_users.sql")));
        assert_eq!(s.flush_every, DEFAULT_FLUSH_EVERY);
    }

    #[test]
    fn missing_required_values() {
        let err = RunSettings::merge(None, &GenArgs::default()).unwrap_err();
        assert!(err.to_string().contains("missing table"));

        let args = GenArgs {
            table: Some("t".into()),
            ..GenArgs::default()
        };
        let err = RunSettings::merge(None, &args).unwrap_err();
        assert!(err.to_string().contains("missing primary keys"));
    }

    #[test]
    fn invalid_kind_and_aliases() {
        let base = GenArgs {
            table: Some("t".into()),
            primary_keys: Some(vec!["id".into()]),
            input: Some(PathBuf::from("rows.csv")),
            ..GenArgs::default()
        };

        let args = GenArgs {
            stmt: Some("MERGE".into()),
            ..base.clone()
        };
        assert!(RunSettings::merge(None, &args).is_err());

        let args = GenArgs {
            aliases_json: Some("[1]".into()),
            ..base
        };
        let err = RunSettings::merge(None, &args).unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn rejects_bad_version_and_unknown_keys() {
        let file: ConfigFile = toml::from_str("version = \"2\"").unwrap();
        assert!(file.validate().is_err());
        assert!(toml::from_str::<ConfigFile>("tabel = \"t\"").is_err());
    }

    #[test]
    fn expand_env_reference() {
        // SAFETY: test-only variable name, not read concurrently elsewhere.
        unsafe { std::env::set_var("SHEETSQL_TEST_TABLE", "from_env") };
        assert_eq!(
            expand_env_vars("${SHEETSQL_TEST_TABLE}_v2").unwrap(),
            "from_env_v2"
        );
        assert_eq!(
            expand_env_vars("${SHEETSQL_TEST_TABLE:-unused}/${SHEETSQL_TEST_UNSET:-rows.csv}")
                .unwrap(),
            "from_env/rows.csv"
        );
        assert_eq!(expand_env_vars("no refs, $5").unwrap(), "no refs, $5");
        assert!(expand_env_vars("${UNTERMINATED").is_err());
        assert!(expand_env_vars("${}").is_err());
        assert!(expand_env_vars("${:-x}").is_err());
        assert!(expand_env_vars("${SHEETSQL_TEST_UNSET}").is_err());
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let args = GenArgs {
            config: Some(missing.clone()),
            table: Some("t".into()),
            primary_keys: Some(vec!["id".into()]),
            input: Some(PathBuf::from("rows.csv")),
            ..GenArgs::default()
        };

        let err = RunSettings::resolve(&args).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("config file not found: {}", missing.display())
        );
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let args = GenArgs {
            config: Some(path),
            ..GenArgs::default()
        };
        let s = RunSettings::resolve(&args).unwrap();
        assert_eq!(s.table, "dw_tables");
        assert_eq!(s.input, dir.path().join("data/list.xlsx"));
    }

    #[test]
    fn default_output_name_sanitizes() {
        assert_eq!(
            default_output_name(StatementKind::Update, "db/t"),
            PathBuf::from("update_db_t.sql")
        );
    }
}
