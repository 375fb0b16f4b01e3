mod cli;
mod config;
mod generate_cmd;
mod init;
mod preview;
mod source;
mod write;

use tracing_subscriber::EnvFilter;

pub fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cli = cli::parse_args(&args)?;
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    match cli.command {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Gen(args) => generate_cmd::run(args),
        cli::Command::Preview(args) => preview::run(args),
        cli::Command::Init(args) => init::run(args),
    }
}

/// Log to stderr so `--stdout` output stays clean. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: bool) {
    let default = if verbose { "sheetsql=debug,sheetsql_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
