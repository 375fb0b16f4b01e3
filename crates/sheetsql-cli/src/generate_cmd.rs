use crate::cli::GenArgs;
use crate::config::RunSettings;
use crate::source;
use crate::write::write_atomic;
use anyhow::Context;
use std::io::Write;

pub fn run(args: GenArgs) -> anyhow::Result<()> {
    let settings = RunSettings::resolve(&args)?;
    let sheet = source::read_sheet(&settings.input, settings.format, settings.sheet.as_ref())?;

    // Configuration problems surface here, before anything is written.
    let plan = settings
        .builder()
        .prepare(&sheet.columns)
        .with_context(|| format!("cannot generate statements for {}", settings.input.display()))?;

    match &settings.output {
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            sheetsql::write_statements(&plan, &sheet.rows, &mut lock, settings.flush_every)?;
            lock.flush()?;
        }
        Some(path) => {
            let summary = write_atomic(path, |w| {
                sheetsql::write_statements(&plan, &sheet.rows, w, settings.flush_every)
            })?;
            println!(
                "wrote {} {} statements to {} ({} rows skipped)",
                summary.written,
                plan.kind(),
                path.display(),
                summary.skipped
            );
        }
    }
    Ok(())
}
