use std::path::PathBuf;

pub const DEFAULT_CONFIG: &str = "sheetsql.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Gen,
    Preview,
    Init,
}

#[derive(Debug, Clone)]
pub struct Cli {
    pub verbose: bool,
    pub command: Command,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Gen(GenArgs),
    Preview(PreviewArgs),
    Init(InitArgs),
}

/// Flags for `sheetsql gen`. Every `Some` overrides the config file.
#[derive(Debug, Clone, Default)]
pub struct GenArgs {
    /// `None` means `sheetsql.toml` when it exists.
    pub config: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub sheet: Option<String>,
    pub format: Option<String>,
    pub out: Option<PathBuf>,
    pub stdout: bool,
    pub table: Option<String>,
    pub primary_keys: Option<Vec<String>>,
    pub update_columns: Option<Vec<String>>,
    pub stmt: Option<String>,
    pub dialect: Option<String>,
    pub skip_nulls: Option<bool>,
    pub aliases_json: Option<String>,
    pub flush_every: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PreviewArgs {
    pub input: PathBuf,
    pub sheet: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InitArgs {
    pub config: PathBuf,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Cli> {
    let mut verbose = false;
    let mut it = args.iter().skip(1).map(|s| s.as_str());

    let mut first = it.next();
    while let Some("-v" | "--verbose") = first {
        verbose = true;
        first = it.next();
    }

    let command = match first {
        None | Some("-h" | "--help" | "help") => Command::Help(HelpTopic::Root),
        Some("gen") => parse_gen(it, &mut verbose)?,
        Some("preview") => parse_preview(it, &mut verbose)?,
        Some("init") => parse_init(it, &mut verbose)?,
        Some(other) => anyhow::bail!("unknown command: {other}"),
    };

    Ok(Cli { verbose, command })
}

/// Split `--flag=value` into its parts.
fn split_flag(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((name, value)) if name.starts_with("--") => (name, Some(value)),
        _ => (token, None),
    }
}

/// Value of a flag, either inline (`--flag=v`) or the next token.
fn flag_value<'a>(
    name: &str,
    inline: Option<&'a str>,
    it: &mut impl Iterator<Item = &'a str>,
) -> anyhow::Result<&'a str> {
    if let Some(v) = inline {
        return Ok(v);
    }
    let Some(v) = it.next() else {
        anyhow::bail!("{name} requires a value");
    };
    Ok(v)
}

fn no_value(name: &str, inline: Option<&str>) -> anyhow::Result<()> {
    if inline.is_some() {
        anyhow::bail!("{name} does not take a value");
    }
    Ok(())
}

pub fn split_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn parse_bool(v: &str) -> anyhow::Result<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected true or false, got: {other}"),
    }
}

fn parse_gen<'a>(
    mut it: impl Iterator<Item = &'a str>,
    verbose: &mut bool,
) -> anyhow::Result<Command> {
    let mut args = GenArgs::default();

    while let Some(token) = it.next() {
        let (name, inline) = split_flag(token);
        match name {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Gen)),
            "-v" | "--verbose" => {
                no_value(name, inline)?;
                *verbose = true;
            }
            "--config" => args.config = Some(PathBuf::from(flag_value(name, inline, &mut it)?)),
            "--input" | "-i" => args.input = Some(PathBuf::from(flag_value(name, inline, &mut it)?)),
            "--sheet" => args.sheet = Some(flag_value(name, inline, &mut it)?.to_string()),
            "--format" => args.format = Some(flag_value(name, inline, &mut it)?.to_string()),
            "--out" | "-o" => args.out = Some(PathBuf::from(flag_value(name, inline, &mut it)?)),
            "--stdout" => {
                no_value(name, inline)?;
                args.stdout = true;
            }
            "--table" => args.table = Some(flag_value(name, inline, &mut it)?.to_string()),
            "--primary-keys" => {
                let parsed = split_csv(flag_value(name, inline, &mut it)?);
                if parsed.is_empty() {
                    anyhow::bail!("--primary-keys must not be empty");
                }
                args.primary_keys = Some(parsed);
            }
            "--update-columns" => {
                args.update_columns = Some(split_csv(flag_value(name, inline, &mut it)?));
            }
            "--stmt" => args.stmt = Some(flag_value(name, inline, &mut it)?.to_string()),
            "--dialect" => args.dialect = Some(flag_value(name, inline, &mut it)?.to_string()),
            "--skip-nulls" => {
                args.skip_nulls = Some(parse_bool(flag_value(name, inline, &mut it)?)?);
            }
            "--aliases-json" => {
                args.aliases_json = Some(flag_value(name, inline, &mut it)?.to_string());
            }
            "--flush-every" => {
                let v = flag_value(name, inline, &mut it)?;
                let n: usize = v
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--flush-every expects a positive integer, got: {v}"))?;
                if n == 0 {
                    anyhow::bail!("--flush-every must be at least 1");
                }
                args.flush_every = Some(n);
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    if args.stdout && args.out.is_some() {
        anyhow::bail!("--stdout and --out cannot be used together");
    }

    Ok(Command::Gen(args))
}

fn parse_preview<'a>(
    mut it: impl Iterator<Item = &'a str>,
    verbose: &mut bool,
) -> anyhow::Result<Command> {
    let mut input: Option<PathBuf> = None;
    let mut sheet: Option<String> = None;
    let mut format: Option<String> = None;

    while let Some(token) = it.next() {
        let (name, inline) = split_flag(token);
        match name {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Preview)),
            "-v" | "--verbose" => {
                no_value(name, inline)?;
                *verbose = true;
            }
            "--input" | "-i" => input = Some(PathBuf::from(flag_value(name, inline, &mut it)?)),
            "--sheet" => sheet = Some(flag_value(name, inline, &mut it)?.to_string()),
            "--format" => format = Some(flag_value(name, inline, &mut it)?.to_string()),
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => {
                if input.is_some() {
                    anyhow::bail!("unexpected argument: {other}");
                }
                input = Some(PathBuf::from(other));
            }
        }
    }

    let Some(input) = input else {
        anyhow::bail!("missing input file: expected `sheetsql preview <FILE>`");
    };

    Ok(Command::Preview(PreviewArgs {
        input,
        sheet,
        format,
    }))
}

fn parse_init<'a>(
    mut it: impl Iterator<Item = &'a str>,
    verbose: &mut bool,
) -> anyhow::Result<Command> {
    let mut config = PathBuf::from(DEFAULT_CONFIG);

    while let Some(token) = it.next() {
        let (name, inline) = split_flag(token);
        match name {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Init)),
            "-v" | "--verbose" => {
                no_value(name, inline)?;
                *verbose = true;
            }
            "--config" => config = PathBuf::from(flag_value(name, inline, &mut it)?),
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Init(InitArgs { config }))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
sheetsql - generate UPDATE / INSERT / UPSERT scripts from spreadsheet rows

USAGE:
  sheetsql <COMMAND> [OPTIONS]

COMMANDS:
  gen           Generate a SQL script from an input file
  preview       List sheet names, or the columns of a sheet
  init          Write a template config file

GLOBAL OPTIONS:
  -v, --verbose         Debug logging (RUST_LOG overrides)

Run `sheetsql <command> --help` for more."
            );
        }
        HelpTopic::Gen => {
            println!(
                "\
USAGE:
  sheetsql gen [OPTIONS]

NOTES:
  Options override values from the config file. Without a config file,
  --input, --table and --primary-keys are required.

OPTIONS:
  --config <FILE>           Config file path (default: sheetsql.toml)
  -i, --input <FILE>        Input file (.xlsx/.xls/.ods/.csv/.json)
  --sheet <NAME|INDEX>      Sheet name or zero-based index (default: 0)
  --format <FORMAT>         auto | spreadsheet | csv | json (default: auto)
  -o, --out <FILE>          Output file (default: <stmt>_<table>.sql)
  --stdout                  Print statements instead of writing a file
  --table <NAME>            Target table
  --primary-keys <CSV>      Primary key columns
  --update-columns <CSV>    Columns to update (default: all non-key columns)
  --stmt <KIND>             UPDATE | INSERT | UPSERT (default: UPDATE)
  --dialect <DIALECT>       mysql57 | mysql80 | postgres (default: mysql80)
  --skip-nulls <BOOL>       Leave null cells out of SET lists (default: true)
  --aliases-json <JSON>     Column aliases, e.g. '{{\"src\": \"dest\"}}'
  --flush-every <N>         Statements buffered per write (default: 1000)
  -h, --help                Print help"
            );
        }
        HelpTopic::Preview => {
            println!(
                "\
USAGE:
  sheetsql preview <FILE> [OPTIONS]

NOTES:
  Without --sheet, spreadsheets list their sheet names.
  CSV and JSON inputs always list their columns.

OPTIONS:
  --sheet <NAME|INDEX>      List the columns of this sheet
  --format <FORMAT>         auto | spreadsheet | csv | json (default: auto)
  -h, --help                Print help"
            );
        }
        HelpTopic::Init => {
            println!(
                "\
USAGE:
  sheetsql init [OPTIONS]

OPTIONS:
  --config <FILE>       Output config path (default: sheetsql.toml)
  -h, --help            Print help"
            );
        }
    }
}
