use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use fs2::FileExt;

use crate::error::MigrateError;
use crate::hash::source_fingerprint;

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

const TEMP_MARKER: &str = ".testmigrate-tmp-";

#[derive(Debug)]
pub(crate) struct RewriteLock {
    _file: File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AtomicWritePhase {
    TempWritten,
    TempSynced,
    Renamed,
}

pub(crate) fn acquire_rewrite_lock(path: &Path) -> Result<RewriteLock, MigrateError> {
    let file = OpenOptions::new()
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .map_err(|error| MigrateError::io(path, error))?;

    file.try_lock_exclusive().map_err(|error| {
        if error.kind() == std::io::ErrorKind::WouldBlock {
            MigrateError::ResourceBusy {
                path: path.display().to_string(),
            }
        } else {
            MigrateError::io(path, error)
        }
    })?;

    Ok(RewriteLock { _file: file })
}

/// Replaces `path` with `contents` under an exclusive lock, provided the file still hashes to
/// `expected_fingerprint`.
pub(crate) fn commit_rewrite(
    path: &Path,
    contents: &str,
    expected_fingerprint: &str,
) -> Result<(), MigrateError> {
    let _lock = acquire_rewrite_lock(path)?;
    verify_fingerprint(path, expected_fingerprint)?;
    write_text_atomically_with_hook(path, contents, Some(expected_fingerprint), |_| Ok(()))
}

fn verify_fingerprint(path: &Path, expected: &str) -> Result<(), MigrateError> {
    let current = fs::read_to_string(path).map_err(|error| MigrateError::io(path, error))?;
    let actual = source_fingerprint(&current);
    if actual != expected {
        return Err(MigrateError::PreconditionFailed {
            expected_hash: expected.to_string(),
            actual_hash: actual,
        });
    }
    Ok(())
}

pub(crate) fn write_text_atomically_with_hook<F>(
    path: &Path,
    contents: &str,
    expected_fingerprint: Option<&str>,
    mut phase_hook: F,
) -> Result<(), MigrateError>
where
    F: FnMut(AtomicWritePhase) -> std::io::Result<()>,
{
    let target_permissions = fs::metadata(path)
        .map_err(|error| MigrateError::io(path, error))?
        .permissions();
    let (temp_path, mut temp_file) = create_temp_file_adjacent(path)?;

    let result = (|| {
        temp_file
            .write_all(contents.as_bytes())
            .map_err(|error| MigrateError::io(&temp_path, error))?;
        phase_hook(AtomicWritePhase::TempWritten).map_err(|error| MigrateError::io(path, error))?;

        temp_file
            .sync_all()
            .map_err(|error| MigrateError::io(&temp_path, error))?;
        phase_hook(AtomicWritePhase::TempSynced).map_err(|error| MigrateError::io(path, error))?;

        if let Some(expected) = expected_fingerprint {
            verify_fingerprint(path, expected)?;
        }

        fs::set_permissions(&temp_path, target_permissions.clone())
            .map_err(|error| MigrateError::io(&temp_path, error))?;
        drop(temp_file);

        fs::rename(&temp_path, path).map_err(|error| MigrateError::io(path, error))?;
        phase_hook(AtomicWritePhase::Renamed).map_err(|error| MigrateError::io(path, error))?;

        sync_parent_directory(path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn create_temp_file_adjacent(path: &Path) -> Result<(PathBuf, File), MigrateError> {
    let parent = resolve_parent_directory(path);
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("testmigrate-target");

    for _ in 0..64 {
        let counter = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_nanos());
        let temp_path = parent.join(format!(".{file_name}{TEMP_MARKER}{nanos}-{counter}"));

        match OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
        {
            Ok(file) => return Ok((temp_path, file)),
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(error) => return Err(MigrateError::io(&temp_path, error)),
        }
    }

    Err(MigrateError::InvalidRequest {
        message: format!(
            "Failed to allocate an adjacent temporary file for '{}'",
            path.display()
        ),
    })
}

fn resolve_parent_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn sync_parent_directory(path: &Path) -> Result<(), MigrateError> {
    #[cfg(unix)]
    {
        let parent = resolve_parent_directory(path);
        let directory_handle =
            File::open(&parent).map_err(|error| MigrateError::io(&parent, error))?;
        directory_handle
            .sync_all()
            .map_err(|error| MigrateError::io(&parent, error))
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::tempdir;

    use super::{
        AtomicWritePhase, TEMP_MARKER, acquire_rewrite_lock, commit_rewrite,
        write_text_atomically_with_hook,
    };
    use crate::error::MigrateError;
    use crate::hash::source_fingerprint;

    fn temp_entries(directory: &Path) -> Vec<String> {
        std::fs::read_dir(directory)
            .expect("directory should be readable")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.contains(TEMP_MARKER))
            .collect()
    }

    #[test]
    fn commit_replaces_contents_and_leaves_no_temp_files() {
        let directory = tempdir().expect("tempdir should be created");
        let file_path = directory.path().join("FooTest.java");
        std::fs::write(&file_path, "class FooTest {}").expect("fixture write should succeed");

        commit_rewrite(
            &file_path,
            "class FooTest { }",
            &source_fingerprint("class FooTest {}"),
        )
        .expect("commit should succeed");

        let actual = std::fs::read_to_string(&file_path).expect("target should be readable");
        assert_eq!(actual, "class FooTest { }");
        assert!(temp_entries(directory.path()).is_empty());
    }

    #[test]
    fn commit_rejects_stale_source() {
        let directory = tempdir().expect("tempdir should be created");
        let file_path = directory.path().join("FooTest.java");
        std::fs::write(&file_path, "class FooTest { int edited; }")
            .expect("fixture write should succeed");

        let error = commit_rewrite(
            &file_path,
            "class FooTest { }",
            &source_fingerprint("class FooTest {}"),
        )
        .expect_err("stale fingerprint should be rejected");
        assert!(matches!(error, MigrateError::PreconditionFailed { .. }));

        let actual = std::fs::read_to_string(&file_path).expect("target should be readable");
        assert_eq!(actual, "class FooTest { int edited; }");
    }

    #[test]
    fn failure_before_rename_preserves_original_contents() {
        let directory = tempdir().expect("tempdir should be created");
        let file_path = directory.path().join("FooTest.java");
        std::fs::write(&file_path, "stable content").expect("fixture write should succeed");

        let error = write_text_atomically_with_hook(&file_path, "new content", None, |phase| {
            if phase == AtomicWritePhase::TempSynced {
                Err(std::io::Error::other("injected atomic-write failure"))
            } else {
                Ok(())
            }
        })
        .expect_err("injected failure should surface");
        assert!(error.to_string().contains("injected atomic-write failure"));

        let actual = std::fs::read_to_string(&file_path).expect("target should remain readable");
        assert_eq!(actual, "stable content");
        assert!(temp_entries(directory.path()).is_empty());
    }

    #[test]
    fn lock_rejects_second_holder_until_released() {
        let directory = tempdir().expect("tempdir should be created");
        let file_path = directory.path().join("FooTest.java");
        std::fs::write(&file_path, "class FooTest {}").expect("fixture write should succeed");

        let first_lock = acquire_rewrite_lock(&file_path).expect("first lock should succeed");
        match acquire_rewrite_lock(&file_path) {
            Err(MigrateError::ResourceBusy { path }) => {
                assert_eq!(path, file_path.display().to_string());
            }
            Err(other) => panic!("unexpected lock error variant: {other}"),
            Ok(_) => panic!("second lock should fail while first lock is held"),
        }

        drop(first_lock);
        assert!(
            acquire_rewrite_lock(&file_path).is_ok(),
            "lock should be acquirable after previous holder is dropped"
        );
    }
}
