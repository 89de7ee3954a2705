//! Rotation side-effects: alias maintenance and age-based purge.
//!
//! A rotation pass runs when a writer first switches to a new filename. It is
//! entirely best-effort; every outcome other than "purge scheduled" comes back
//! as a [`RotateError`] for the caller to log and ignore.
//!
//! # Pass outline
//!
//! 1. Exclusively create `<filename>_lock`. If it exists, skip the pass.
//! 2. Point the alias at `<filename>`: stage a symlink at `<filename>_symlink`
//!    and rename it over the alias, so the alias never disappears.
//! 3. With a retention window configured, glob for every file the pattern
//!    could have produced and collect those last modified before
//!    `now - max_age`.
//! 4. Hand the expired files to a detached [`purge`](crate::purge) thread and
//!    remove the marker.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, FixedOffset};

use crate::error::RotateError;
use crate::lock::{LOCK_SUFFIX, RotationLock, with_suffix};
use crate::purge;

/// Suffix of the staging path used while swapping the alias.
pub const STAGING_SUFFIX: &str = "_symlink";

/// Retention and alias policy shared by every rotation pass of one sink.
#[derive(Debug, Clone)]
pub struct Rotator {
    glob_pattern: String,
    link_name: Option<PathBuf>,
    max_age: Option<Duration>,
}

impl Rotator {
    /// A zero `max_age` is treated the same as `None`: purge disabled.
    #[must_use]
    pub fn new(
        glob_pattern: impl Into<String>,
        link_name: Option<PathBuf>,
        max_age: Option<Duration>,
    ) -> Self {
        Self {
            glob_pattern: glob_pattern.into(),
            link_name,
            max_age: max_age.filter(|age| !age.is_zero()),
        }
    }

    #[must_use]
    pub fn glob_pattern(&self) -> &str {
        &self.glob_pattern
    }

    #[must_use]
    pub fn link_name(&self) -> Option<&Path> {
        self.link_name.as_deref()
    }

    #[must_use]
    pub const fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Run one rotation pass for `filename` at instant `now`.
    ///
    /// Returns the number of files handed to the background purge.
    ///
    /// # Errors
    ///
    /// - [`RotateError::LockUnavailable`] / [`RotateError::Lock`]: nothing was done.
    /// - [`RotateError::Alias`]: the alias could not be updated; no purge ran.
    /// - [`RotateError::PurgeDisabled`] / [`RotateError::NothingToPurge`]: the
    ///   alias (if any) was updated, nothing was deleted.
    /// - [`RotateError::Glob`] / [`RotateError::SpawnPurge`]: enumeration or
    ///   the purge thread failed.
    pub fn rotate(&self, filename: &Path, now: &DateTime<FixedOffset>) -> Result<usize, RotateError> {
        let lock = RotationLock::try_acquire(filename)?;

        if let Some(link) = &self.link_name {
            update_alias(filename, link)?;
        }

        let Some(max_age) = self.max_age else {
            return Err(RotateError::PurgeDisabled);
        };

        let Some(cutoff) = SystemTime::from(*now).checked_sub(max_age) else {
            return Err(RotateError::NothingToPurge);
        };

        let mut keep = vec![filename];
        keep.extend(self.link_name.as_deref());
        let expired = collect_expired(&self.glob_pattern, cutoff, &keep)?;
        if expired.is_empty() {
            return Err(RotateError::NothingToPurge);
        }

        let scheduled = expired.len();
        purge::spawn(expired).map_err(RotateError::SpawnPurge)?;
        lock.release();
        Ok(scheduled)
    }
}

/// Point `link` at `filename` without ever leaving `link` missing.
///
/// # Errors
///
/// Returns [`RotateError::Alias`] if the staging symlink cannot be created or
/// renamed into place.
pub fn update_alias(filename: &Path, link: &Path) -> Result<(), RotateError> {
    let alias_err = |source: io::Error| RotateError::Alias {
        link: link.to_path_buf(),
        source,
    };

    let staging = with_suffix(filename, STAGING_SUFFIX);
    let target = link_target(filename, link);

    // Leftover from a pass that died between symlink and rename. Safe to
    // remove: the caller holds the rotation lock for this filename.
    match fs::remove_file(&staging) {
        Ok(()) => tracing::debug!(path = %staging.display(), "removed stale alias staging link"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(alias_err(err)),
    }

    symlink(&target, &staging).map_err(alias_err)?;
    if let Err(err) = fs::rename(&staging, link) {
        let _ = fs::remove_file(&staging);
        return Err(alias_err(err));
    }
    Ok(())
}

/// Every path matching `glob_pattern` last modified strictly before `cutoff`.
///
/// Lock markers, staging links, any path in `keep` (the file being rotated
/// into and the alias), non-files and entries whose metadata cannot be read
/// are skipped. `keep` is compared after making both sides absolute, so
/// `./logs/app.log` and `logs/app.log` are the same file.
///
/// # Errors
///
/// Returns [`RotateError::Glob`] if `glob_pattern` is not a valid glob.
pub fn collect_expired(
    glob_pattern: &str,
    cutoff: SystemTime,
    keep: &[&Path],
) -> Result<Vec<PathBuf>, RotateError> {
    let keep: Vec<PathBuf> = keep.iter().map(|path| absolute_or_same(path)).collect();
    let mut expired = Vec::new();
    for entry in glob::glob(glob_pattern)? {
        let Ok(path) = entry else {
            continue;
        };
        if has_reserved_suffix(&path) || keep.contains(&absolute_or_same(&path)) {
            continue;
        }

        let Ok(meta) = fs::metadata(&path) else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let Ok(modified) = meta.modified() else {
            continue;
        };
        if modified >= cutoff {
            continue;
        }
        expired.push(path);
    }
    Ok(expired)
}

fn absolute_or_same(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn has_reserved_suffix(path: &Path) -> bool {
    let raw = path.as_os_str().as_encoded_bytes();
    raw.ends_with(LOCK_SUFFIX.as_bytes()) || raw.ends_with(STAGING_SUFFIX.as_bytes())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Link contents for an alias: the bare file name when the alias sits next
/// to the file, otherwise an absolute path.
fn link_target(filename: &Path, link: &Path) -> PathBuf {
    if parent_dir(filename) == parent_dir(link) {
        if let Some(name) = filename.file_name() {
            return PathBuf::from(name);
        }
    }
    absolute_or_same(filename)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
