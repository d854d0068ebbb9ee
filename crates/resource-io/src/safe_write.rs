use std::io::Write;
use std::path::{Path, PathBuf};

use resource_core::{ResourceError, ResourceResult};

/// Write `content` to `path` atomically: write to `path.tmp`, back up any
/// existing `path` to `path.bak`, rename the temp file into place, then
/// drop the backup. On any failure the temp file is removed and the
/// original error is surfaced — `path` itself is left exactly as it was
/// found (either the old content, intact).
pub fn safe_write(path: &Path, content: &[u8]) -> ResourceResult<()> {
    let tmp_path = sibling_with_suffix(path, "tmp");
    let bak_path = sibling_with_suffix(path, "bak");

    let result = write_then_swap(path, &tmp_path, &bak_path, content);
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

fn write_then_swap(
    path: &Path,
    tmp_path: &Path,
    bak_path: &Path,
    content: &[u8],
) -> ResourceResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| ResourceError::io(parent, err))?;
    }

    let mut tmp_file = std::fs::File::create(tmp_path).map_err(|err| ResourceError::io(tmp_path, err))?;
    tmp_file.write_all(content).map_err(|err| ResourceError::io(tmp_path, err))?;
    tmp_file.sync_all().map_err(|err| ResourceError::io(tmp_path, err))?;
    drop(tmp_file);

    let had_existing = path.exists();
    if had_existing {
        std::fs::copy(path, bak_path).map_err(|err| ResourceError::io(bak_path, err))?;
    }

    std::fs::rename(tmp_path, path).map_err(|err| {
        ResourceError::WriteConflict(format!(
            "rename {} -> {} failed: {err}",
            tmp_path.display(),
            path.display()
        ))
    })?;

    if had_existing {
        let _ = std::fs::remove_file(bak_path);
    }

    Ok(())
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// One step of a [`transaction`]: a fallible action plus the rollback to
/// run if a later step in the same transaction fails. A step with no
/// rollback is not an error — it simply contributes nothing to unwinding,
/// logged as a warn-only no-op rather than silently skipped.
pub struct TransactionStep<'a> {
    /// Human-readable label used in rollback-failure log lines.
    pub label: &'a str,
    /// The action to run.
    pub run: Box<dyn FnOnce() -> ResourceResult<()> + 'a>,
    /// The action to undo it, run only if a later step fails.
    pub rollback: Option<Box<dyn FnOnce() + 'a>>,
}

/// Run `steps` in order. If a step fails, the rollbacks of every
/// already-succeeded step run in reverse order before the error is
/// returned; the failing step's own rollback (it never registered as
/// succeeded) does not run. A rollback that itself panics-free-errors is
/// logged and the unwind continues — one failed rollback must not abort
/// the rest. Returns `Ok(())` (the final step's result) only if every step
/// succeeded.
pub fn transaction(steps: Vec<TransactionStep<'_>>) -> ResourceResult<()> {
    let mut completed: Vec<(&str, Option<Box<dyn FnOnce()>>)> = Vec::new();

    for step in steps {
        match (step.run)() {
            Ok(()) => {
                if step.rollback.is_none() {
                    tracing::warn!(step = step.label, "transaction step has no rollback registered");
                }
                completed.push((step.label, step.rollback));
            }
            Err(err) => {
                for (label, rollback) in completed.into_iter().rev() {
                    match rollback {
                        Some(rollback) => rollback(),
                        None => tracing::warn!(step = label, "no rollback to run for this step"),
                    }
                }
                return Err(err);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_new_file_with_no_prior_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        safe_write(&path, b"version: 1").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "version: 1");
        assert!(!sibling_with_suffix(&path, "tmp").exists());
        assert!(!sibling_with_suffix(&path, "bak").exists());
    }

    #[test]
    fn overwrite_leaves_new_content_and_no_leftover_bak() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        safe_write(&path, b"version: 1").unwrap();
        safe_write(&path, b"version: 2").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "version: 2");
        assert!(!sibling_with_suffix(&path, "bak").exists());
    }

    #[test]
    fn failed_rename_leaves_tmp_removed_and_original_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        safe_write(&path, b"version: 1").unwrap();

        // Replace the target with a directory so the rename step fails.
        let doomed = dir.path().join("doomed.yaml");
        std::fs::create_dir(&doomed).unwrap();
        let result = safe_write(&doomed, b"version: 2");
        assert!(result.is_err());
        assert!(!sibling_with_suffix(&doomed, "tmp").exists());
    }

    #[test]
    fn transaction_rolls_back_completed_steps_in_reverse_order_on_failure() {
        let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::<&'static str>::new()));
        let order_a = order.clone();
        let order_b = order.clone();

        let steps = vec![
            TransactionStep {
                label: "a",
                run: Box::new(|| Ok(())),
                rollback: Some(Box::new(move || order_a.lock().unwrap().push("rollback-a"))),
            },
            TransactionStep {
                label: "b",
                run: Box::new(|| Ok(())),
                rollback: Some(Box::new(move || order_b.lock().unwrap().push("rollback-b"))),
            },
            TransactionStep {
                label: "c",
                run: Box::new(|| Err(ResourceError::WriteConflict("boom".to_string()))),
                rollback: None,
            },
        ];

        let result = transaction(steps);
        assert!(result.is_err());
        assert_eq!(*order.lock().unwrap(), vec!["rollback-b", "rollback-a"]);
    }

    #[test]
    fn transaction_succeeds_when_every_step_succeeds() {
        let steps = vec![TransactionStep {
            label: "only",
            run: Box::new(|| Ok(())),
            rollback: Some(Box::new(|| {})),
        }];
        assert!(transaction(steps).is_ok());
    }
}
