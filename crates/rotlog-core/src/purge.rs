//! Background deletion of expired rotated files.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

/// Delete `paths` on a detached worker thread.
///
/// Each deletion is independent: a failure is logged and the batch moves on.
/// The returned handle resolves to the number of files actually removed; the
/// sink drops it, tests may join it.
///
/// # Errors
///
/// Returns the spawn error if the OS refuses to start the thread.
pub fn spawn(paths: Vec<PathBuf>) -> io::Result<JoinHandle<usize>> {
    thread::Builder::new()
        .name("rotlog-purge".to_string())
        .spawn(move || remove_all(&paths))
}

fn remove_all(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "purged expired file");
                removed += 1;
            }
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "failed to purge file");
            }
        }
    }
    removed
}
