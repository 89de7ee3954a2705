use crate::error::RotateError;
use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

/// Suffix of the marker file guarding rotation of `<filename>`.
pub const LOCK_SUFFIX: &str = "_lock";

/// Append a literal suffix to a path without touching its extension.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Cross-process rotation lock backed by an exclusively created marker file.
///
/// Acquisition never waits: if the marker already exists another actor is
/// rotating (or crashed while rotating) and the caller skips its rotation
/// pass. The marker is removed when the guard is released or dropped.
#[derive(Debug)]
pub struct RotationLock {
    file: Option<File>,
    path: PathBuf,
}

impl RotationLock {
    /// Marker path for a rotated file.
    #[must_use]
    pub fn marker_path(filename: &Path) -> PathBuf {
        with_suffix(filename, LOCK_SUFFIX)
    }

    /// Try to create the marker for `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`RotateError::LockUnavailable`] if the marker already exists,
    /// or [`RotateError::Lock`] if it could not be created for another reason.
    pub fn try_acquire(filename: &Path) -> Result<Self, RotateError> {
        let path = Self::marker_path(filename);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => Ok(Self {
                file: Some(file),
                path,
            }),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(RotateError::LockUnavailable { path })
            }
            Err(source) => Err(RotateError::Lock { path, source }),
        }
    }

    /// Remove the marker now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }

    /// Location of the `<filename>_lock` marker this guard created.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RotationLock {
    fn drop(&mut self) {
        drop(self.file.take());
        if let Err(err) = fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %err, "failed to remove rotation lock marker");
        }
    }
}
