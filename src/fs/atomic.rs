//! Atomic filesystem operations.
//!
//! All atomic writes follow this pattern:
//! 1. Write content to a temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename the temporary file over the target
//!
//! Source and destination must be on the same filesystem for the rename to be
//! atomic, which holds because the temporary file lives next to the target.
//! On crash, a temporary file named `.{filename}.{pid}.tmp` may remain.

use crate::error::{MediaTaskError, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file, creating parent directories as needed.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, |file| file.write_all(content))?;
    atomic_replace(&temp_path, path)
}

/// Atomically copy `source` to `target`, creating parent directories as needed.
///
/// Returns the number of bytes copied.
pub fn atomic_copy<P: AsRef<Path>, Q: AsRef<Path>>(source: P, target: Q) -> Result<u64> {
    let source = source.as_ref();
    let target = target.as_ref();

    let mut reader = File::open(source).map_err(|e| {
        MediaTaskError::ExportFailed(format!(
            "failed to open source file '{}': {}",
            source.display(),
            e
        ))
    })?;

    ensure_parent(target)?;
    let temp_path = generate_temp_path(target)?;

    let mut copied = 0;
    write_and_sync(&temp_path, |file| {
        copied = io::copy(&mut reader, file)?;
        Ok(())
    })?;
    atomic_replace(&temp_path, target)?;

    Ok(copied)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            MediaTaskError::ExportFailed(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }
    Ok(())
}

/// Temporary file path in the same directory as the target.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            MediaTaskError::ExportFailed(format!("invalid file path '{}'", target.display()))
        })?;

    Ok(parent.join(format!(".{}.{}.tmp", filename, std::process::id())))
}

/// Create `path`, fill it with `fill`, and sync it to disk.
fn write_and_sync<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut file = File::create(path).map_err(|e| {
        MediaTaskError::ExportFailed(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let written = fill(&mut file).and_then(|()| file.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(path);
        return Err(MediaTaskError::ExportFailed(format!(
            "failed to write temporary file '{}': {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

fn atomic_replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        MediaTaskError::ExportFailed(format!(
            "failed to move file into place at '{}': {}",
            target.display(),
            e
        ))
    })?;

    sync_parent_dir(target);
    Ok(())
}

/// Persist the directory entry for `target`.
#[cfg(unix)]
fn sync_parent_dir(target: &Path) {
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_target: &Path) {}
