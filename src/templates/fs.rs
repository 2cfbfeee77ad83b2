// Filesystem helpers for installed templates.
// Sync timestamp markers, filtered recursive copy, and forced recursive delete.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};

use super::paths::{GIT_DIR, SYNC_MARKER};

/// File names never copied into an installed template.
pub const EXCLUDED_FILES: &[&str] = &[
    ".gitattributes",
    ".gitignore",
    SYNC_MARKER,
    "README.md",
    "readme.md",
];

/// Write a timestamp marker atomically via a temp file.
pub fn write_timestamp(path: &Path, timestamp: DateTime<Utc>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(timestamp.to_rfc3339().as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Read a timestamp marker.
///
/// Returns `None` when the file is missing, does not parse, or holds the
/// zero/epoch sentinel.
pub fn read_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let contents = fs::read_to_string(path).ok()?;
    parse_timestamp(contents.trim()).filter(|ts| ts.timestamp() > 0)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Recursively copy `source` into `dest`, skipping `.git` and [`EXCLUDED_FILES`].
///
/// Directories are only created when they receive a file. Returns the number
/// of files copied.
pub fn copy_filtered(source: &Path, dest: &Path) -> io::Result<u64> {
    let mut copied = 0;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let name = entry.file_name();
        if name == GIT_DIR {
            continue;
        }

        let from = entry.path();
        let to = dest.join(&name);
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copied += copy_filtered(&from, &to)?;
            continue;
        }
        if EXCLUDED_FILES.iter().any(|excluded| name == *excluded) {
            continue;
        }
        // Links are copied as the file they point at; anything else is left out.
        if file_type.is_symlink() && !fs::metadata(&from).is_ok_and(|meta| meta.is_file()) {
            log::warn!("Skipping link {} (not a regular file)", from.display());
            continue;
        }

        fs::create_dir_all(dest)?;
        fs::copy(&from, &to)?;
        copied += 1;
    }

    Ok(copied)
}

/// Remove a directory tree, clearing read-only attributes if plain removal fails.
pub fn force_remove_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }

    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) => {
            log::debug!(
                "Plain removal of {} failed ({}), clearing attributes",
                path.display(),
                err
            );
            remove_tree_forced(path)
        }
    }
}

/// Post-order removal: children first, then the directory itself.
fn remove_tree_forced(dir: &Path) -> io::Result<()> {
    make_writable(dir)?;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            remove_tree_forced(&path)?;
        } else {
            make_writable(&path)?;
            fs::remove_file(&path)?;
        }
    }

    fs::remove_dir(dir)
}

#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) -> io::Result<()> {
    let mut permissions = fs::symlink_metadata(path)?.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}
