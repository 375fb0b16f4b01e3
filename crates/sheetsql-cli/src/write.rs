use sheetsql::{GenerateSummary, SqlGenResult};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Stream statements into `path` through a sibling temp file.
///
/// `emit` writes into the temp file; it is renamed over `path` only when
/// `emit` succeeds, so a failed run never leaves a partial script behind.
pub fn write_atomic(
    path: &Path,
    emit: impl FnOnce(&mut BufWriter<File>) -> SqlGenResult<GenerateSummary>,
) -> anyhow::Result<GenerateSummary> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("failed to create directory {}: {e}", parent.display())
            })?;
        }
    }

    let tmp = tmp_path(path);
    let file = File::create(&tmp)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", tmp.display()))?;
    let mut writer = BufWriter::new(file);

    let summary = match emit(&mut writer) {
        Ok(summary) => summary,
        Err(e) => {
            drop(writer);
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
    };
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to write {}: {}", tmp.display(), e.error()))?;

    std::fs::rename(&tmp, path).map_err(|e| {
        anyhow::anyhow!(
            "failed to rename {} -> {}: {e}",
            tmp.display(),
            path.display()
        )
    })?;
    Ok(summary)
}

fn tmp_path(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => path.with_extension(format!("{ext}.tmp")),
        None => path.with_extension("tmp"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsql::SqlGenError;
    use std::io::Write;

    #[test]
    fn tmp_path_keeps_extension() {
        assert_eq!(tmp_path(Path::new("out/a.sql")), PathBuf::from("out/a.sql.tmp"));
        assert_eq!(tmp_path(Path::new("script")), PathBuf::from("script.tmp"));
    }

    #[test]
    fn success_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.sql");

        let summary = write_atomic(&path, |w| {
            w.write_all(b"SELECT 1;\n")?;
            Ok(GenerateSummary {
                rows: 1,
                written: 1,
                skipped: 0,
            })
        })
        .unwrap();

        assert_eq!(summary.written, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "SELECT 1;\n");
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sql");

        let err = write_atomic(&path, |w| {
            w.write_all(b"partial")?;
            Err(SqlGenError::row_field(2, "id"))
        })
        .unwrap_err();

        assert!(err.to_string().contains("Row 2"));
        assert!(!path.exists());
        assert!(!tmp_path(&path).exists());
    }
}
