//! The rotating file sink.
//!
//! [`RotatingFile`] is an append-only destination whose backing file changes
//! as the clock crosses rotation windows. Callers only ever write bytes; the
//! sink resolves the filename for "now", opens or reuses the handle, and on
//! the first sighting of a new filename runs a best-effort rotation pass
//! (alias update + purge).
//!
//! # Invariants
//!
//! - At most one file handle is held at a time; switching files closes the
//!   previous handle.
//! - `current_file_name()` only ever returns a name that has been written to.
//! - Rotation failures never surface from [`RotatingFile::write`]. They are
//!   logged and, if installed, reported to a [`RotationHandler`].

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::clock::{Clock, SystemClock};
use crate::error::{RotateError, SinkError};
use crate::pattern;
use crate::rotate::Rotator;

/// Rotation period used when none is configured.
pub const DEFAULT_ROTATION_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

// ---------------------------------------------------------------------------
// Rotation events
// ---------------------------------------------------------------------------

/// The sink switched its output to a new file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRotated {
    /// The file written before the switch; `None` on the first write.
    pub previous: Option<PathBuf>,
    /// The file now receiving writes.
    pub current: PathBuf,
}

/// Observer for rotation activity.
///
/// Callbacks run on the writing thread after the sink's lock is released, so
/// they may call back into the sink.
pub trait RotationHandler: Send + Sync {
    /// Called whenever writes move to a different file.
    fn on_rotated(&self, _event: &FileRotated) {}

    /// Called when a rotation pass stopped early or had nothing to do.
    fn on_rotation_skipped(&self, _filename: &Path, _err: &RotateError) {}
}

impl<F> RotationHandler for F
where
    F: Fn(&FileRotated) + Send + Sync,
{
    fn on_rotated(&self, event: &FileRotated) {
        self(event);
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Options for [`RotatingFile`].
pub struct RotatingFileBuilder {
    pattern: String,
    clock: Arc<dyn Clock>,
    link_name: Option<PathBuf>,
    max_age: Option<Duration>,
    rotation_period: Duration,
    handler: Option<Arc<dyn RotationHandler>>,
}

impl RotatingFileBuilder {
    fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            clock: Arc::new(SystemClock),
            link_name: None,
            max_age: None,
            rotation_period: DEFAULT_ROTATION_PERIOD,
            handler: None,
        }
    }

    /// Time source. Defaults to local wall-clock time.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Path of a symlink kept pointing at the active file.
    #[must_use]
    pub fn link_name(mut self, link: impl Into<PathBuf>) -> Self {
        self.link_name = Some(link.into());
        self
    }

    /// Delete rotated files last modified longer ago than `age`. Zero
    /// disables the purge.
    #[must_use]
    pub const fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    /// Length of a rotation window. Must be non-zero.
    #[must_use]
    pub const fn rotation_period(mut self, period: Duration) -> Self {
        self.rotation_period = period;
        self
    }

    #[must_use]
    pub fn handler(mut self, handler: impl RotationHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Validate the options and create the sink. No file is touched until the
    /// first write.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::InvalidConfig`] for a zero rotation period.
    pub fn build(self) -> Result<RotatingFile, SinkError> {
        if self.rotation_period.is_zero() {
            return Err(SinkError::InvalidConfig(
                "rotation period must be greater than zero".to_string(),
            ));
        }

        let glob_pattern = pattern::derive_glob(&self.pattern);
        Ok(RotatingFile {
            rotator: Rotator::new(glob_pattern, self.link_name, self.max_age),
            pattern: self.pattern,
            rotation_period: self.rotation_period,
            clock: self.clock,
            handler: self.handler,
            state: RwLock::new(State::default()),
        })
    }
}

impl fmt::Debug for RotatingFileBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingFileBuilder")
            .field("pattern", &self.pattern)
            .field("link_name", &self.link_name)
            .field("max_age", &self.max_age)
            .field("rotation_period", &self.rotation_period)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// RotatingFile
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct State {
    current_filename: String,
    handle: Option<File>,
}

/// Append-only file destination that rotates on time windows.
pub struct RotatingFile {
    pattern: String,
    rotation_period: Duration,
    rotator: Rotator,
    clock: Arc<dyn Clock>,
    handler: Option<Arc<dyn RotationHandler>>,
    state: RwLock<State>,
}

impl RotatingFile {
    /// Sink with default options: local clock, daily rotation, no alias, no
    /// purge.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self {
            rotator: Rotator::new(pattern::derive_glob(&pattern), None, None),
            pattern,
            rotation_period: DEFAULT_ROTATION_PERIOD,
            clock: Arc::new(SystemClock),
            handler: None,
            state: RwLock::new(State::default()),
        }
    }

    #[must_use]
    pub fn builder(pattern: impl Into<String>) -> RotatingFileBuilder {
        RotatingFileBuilder::new(pattern)
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Glob derived from the pattern, fixed for the life of the sink.
    #[must_use]
    pub fn glob_pattern(&self) -> &str {
        self.rotator.glob_pattern()
    }

    #[must_use]
    pub const fn rotation_period(&self) -> Duration {
        self.rotation_period
    }

    #[must_use]
    pub fn link_name(&self) -> Option<&Path> {
        self.rotator.link_name()
    }

    /// Retention window, `None` when purging is disabled.
    #[must_use]
    pub const fn max_age(&self) -> Option<Duration> {
        self.rotator.max_age()
    }

    /// Append `buf` to the file for the current rotation window.
    ///
    /// Returns the number of bytes written, which is `buf.len()` on success.
    ///
    /// # Errors
    ///
    /// - [`SinkError::Format`] if the pattern cannot be rendered.
    /// - [`SinkError::Open`] if the target file cannot be opened; the sink's
    ///   state is left untouched.
    /// - [`SinkError::Write`] if the bytes could not all be written; its
    ///   `written` field counts the bytes that reached the file first.
    pub fn write(&self, buf: &[u8]) -> Result<usize, SinkError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let now = self.clock.now();
        let filename = pattern::resolve(&now, self.rotation_period, &self.pattern)?;

        if filename == state.current_filename {
            if let Some(handle) = state.handle.as_mut() {
                return write_counted(handle, buf);
            }
        }

        let path = Path::new(&filename);
        let is_new = self.is_new(path);
        let mut handle = open_append(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let skipped = if is_new {
            self.run_rotation(path, &now)
        } else {
            None
        };

        let written = write_counted(&mut handle, buf);

        // Replacing the handle drops (closes) the previous one.
        state.handle = Some(handle);
        let previous = std::mem::replace(&mut state.current_filename, filename.clone());
        drop(state);

        if let Some(handler) = &self.handler {
            if let Some(err) = &skipped {
                handler.on_rotation_skipped(Path::new(&filename), err);
            }
            if previous != filename {
                handler.on_rotated(&FileRotated {
                    previous: (!previous.is_empty()).then(|| PathBuf::from(previous)),
                    current: PathBuf::from(filename),
                });
            }
        }

        written
    }

    /// Flush the held handle, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Write`] if the flush fails.
    pub fn flush(&self) -> Result<(), SinkError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.handle.as_mut() {
            Some(handle) => handle
                .flush()
                .map_err(|source| SinkError::Write { written: 0, source }),
            None => Ok(()),
        }
    }

    /// Name of the file most recently written to, or an empty string before
    /// the first write.
    #[must_use]
    pub fn current_file_name(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current_filename
            .clone()
    }

    /// Release the held file handle. Safe to call more than once; a later
    /// write reopens the current file.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` mirrors `write`.
    pub fn close(&self) -> Result<(), SinkError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        drop(state.handle.take());
        Ok(())
    }

    /// Whether `path` is being seen for the first time.
    ///
    /// An existing file together with a live alias means another writer (or an
    /// earlier run of this one) already rotated into it.
    fn is_new(&self, path: &Path) -> bool {
        if fs::metadata(path).is_err() {
            return true;
        }
        match self.rotator.link_name() {
            Some(link) => fs::metadata(link).is_err(),
            None => true,
        }
    }

    fn run_rotation(&self, path: &Path, now: &DateTime<FixedOffset>) -> Option<RotateError> {
        match self.rotator.rotate(path, now) {
            Ok(scheduled) => {
                tracing::debug!(file = %path.display(), scheduled, "rotated, purge scheduled");
                None
            }
            Err(err) if err.is_inert() || err.is_skipped() => {
                tracing::debug!(file = %path.display(), reason = %err, "rotation pass had no purge");
                Some(err)
            }
            Err(err) => {
                tracing::warn!(file = %path.display(), error = %err, "rotation pass failed");
                Some(err)
            }
        }
    }
}

/// Write all of `buf`, keeping count of what got through if a write fails.
fn write_counted(out: &mut impl IoWrite, buf: &[u8]) -> Result<usize, SinkError> {
    let mut written = 0;
    while written < buf.len() {
        match out.write(&buf[written..]) {
            Ok(0) => {
                return Err(SinkError::Write {
                    written,
                    source: io::ErrorKind::WriteZero.into(),
                });
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(source) => return Err(SinkError::Write { written, source }),
        }
    }
    Ok(written)
}

fn open_append(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(path)
}

impl fmt::Debug for RotatingFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingFile")
            .field("pattern", &self.pattern)
            .field("rotation_period", &self.rotation_period)
            .field("rotator", &self.rotator)
            .field("current_filename", &self.current_file_name())
            .finish_non_exhaustive()
    }
}

impl io::Write for &RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingFile::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingFile::flush(self).map_err(io::Error::from)
    }
}

impl io::Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Self::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Self::flush(self).map_err(io::Error::from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::lock::RotationLock;
    use std::sync::Mutex;
    use std::thread;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).expect("valid timestamp")
    }

    fn hourly(tmp: &TempDir, clock: &Arc<ManualClock>) -> RotatingFileBuilder {
        let pattern = tmp.path().join("app-%Y%m%d%H.log");
        RotatingFile::builder(pattern.to_string_lossy())
            .clock(clock.clone())
            .rotation_period(HOUR)
    }

    fn files_in(tmp: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(tmp.path())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[derive(Default)]
    struct Recorder {
        rotated: Mutex<Vec<FileRotated>>,
        skipped: Mutex<Vec<String>>,
    }

    struct Tap(Arc<Recorder>);

    impl RotationHandler for Tap {
        fn on_rotated(&self, event: &FileRotated) {
            self.0.rotated.lock().expect("lock").push(event.clone());
        }

        fn on_rotation_skipped(&self, _filename: &Path, err: &RotateError) {
            self.0.skipped.lock().expect("lock").push(err.code().code().to_string());
        }
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn defaults() {
        let sink = RotatingFile::new("/var/log/app.%Y%m%d.log");
        assert_eq!(sink.rotation_period(), DEFAULT_ROTATION_PERIOD);
        assert_eq!(sink.glob_pattern(), "/var/log/app.*.log");
        assert_eq!(sink.link_name(), None);
        assert_eq!(sink.max_age(), None);
        assert_eq!(sink.current_file_name(), "");
    }

    #[test]
    fn zero_rotation_period_is_rejected() {
        let err = RotatingFile::builder("app.%Y.log")
            .rotation_period(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, SinkError::InvalidConfig(_)));
    }

    #[test]
    fn builder_carries_options() {
        let sink = RotatingFile::builder("app.%Y.log")
            .link_name("current.log")
            .max_age(7 * 24 * HOUR)
            .rotation_period(HOUR)
            .build()
            .expect("build");
        assert_eq!(sink.link_name(), Some(Path::new("current.log")));
        assert_eq!(sink.max_age(), Some(7 * 24 * HOUR));
        assert_eq!(sink.rotation_period(), HOUR);
        assert_eq!(sink.pattern(), "app.%Y.log");
    }

    // -----------------------------------------------------------------------
    // Write
    // -----------------------------------------------------------------------

    #[test]
    fn writes_within_window_share_one_file() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        let sink = hourly(&tmp, &clock).build().expect("build");

        for i in 0..5 {
            assert_eq!(sink.write(format!("line {i}\n").as_bytes()).expect("write"), 7);
            clock.advance(Duration::from_secs(60));
        }

        assert_eq!(files_in(&tmp), vec!["app-2024010100.log"]);
        let content = fs::read_to_string(tmp.path().join("app-2024010100.log")).expect("read");
        assert_eq!(content.lines().count(), 5);
    }

    #[test]
    fn crossing_window_switches_file() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        let sink = hourly(&tmp, &clock).build().expect("build");

        sink.write(b"first\n").expect("write");
        clock.set(at("2024-01-01T00:45:00Z"));
        sink.write(b"second\n").expect("write");
        clock.set(at("2024-01-01T01:05:00Z"));
        sink.write(b"third\n").expect("write");

        assert_eq!(files_in(&tmp), vec!["app-2024010100.log", "app-2024010101.log"]);
        assert_eq!(
            fs::read_to_string(tmp.path().join("app-2024010100.log")).expect("read"),
            "first\nsecond\n"
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("app-2024010101.log")).expect("read"),
            "third\n"
        );
        assert!(sink.current_file_name().ends_with("app-2024010101.log"));
    }

    #[test]
    fn alias_follows_active_file() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        let link = tmp.path().join("current.log");
        let sink = hourly(&tmp, &clock).link_name(&link).build().expect("build");

        sink.write(b"a\n").expect("write");
        assert_eq!(fs::read_link(&link).expect("readlink"), PathBuf::from("app-2024010100.log"));

        clock.set(at("2024-01-01T01:05:00Z"));
        sink.write(b"b\n").expect("write");
        assert_eq!(fs::read_link(&link).expect("readlink"), PathBuf::from("app-2024010101.log"));
        assert_eq!(fs::read_to_string(&link).expect("read through alias"), "b\n");
    }

    #[test]
    fn handler_sees_each_switch_once() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        let recorder = Arc::new(Recorder::default());
        let sink = hourly(&tmp, &clock)
            .handler(Tap(Arc::clone(&recorder)))
            .build()
            .expect("build");

        sink.write(b"a\n").expect("write");
        sink.write(b"b\n").expect("write");
        clock.set(at("2024-01-01T01:05:00Z"));
        sink.write(b"c\n").expect("write");

        let rotated = recorder.rotated.lock().expect("lock").clone();
        assert_eq!(rotated.len(), 2);
        assert_eq!(rotated[0].previous, None);
        assert!(rotated[0].current.ends_with("app-2024010100.log"));
        assert_eq!(rotated[1].previous.as_deref(), Some(rotated[0].current.as_path()));
        assert!(rotated[1].current.ends_with("app-2024010101.log"));

        // No max_age: both rotation passes were inert.
        assert_eq!(*recorder.skipped.lock().expect("lock"), vec!["E5001", "E5001"]);
    }

    #[test]
    fn closure_handler_is_accepted() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let sink = hourly(&tmp, &clock)
            .handler(move |_: &FileRotated| *counter.lock().expect("lock") += 1)
            .build()
            .expect("build");

        sink.write(b"a\n").expect("write");
        assert_eq!(*seen.lock().expect("lock"), 1);
    }

    #[test]
    fn format_error_is_returned_without_state_change() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        let sink = RotatingFile::builder(tmp.path().join("app-%Q.log").to_string_lossy())
            .clock(clock)
            .build()
            .expect("build");

        let err = sink.write(b"x").unwrap_err();
        assert!(matches!(err, SinkError::Format(_)));
        assert_eq!(sink.current_file_name(), "");
        assert!(files_in(&tmp).is_empty());
    }

    #[test]
    fn open_error_leaves_previous_handle_in_place() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        // Hour 01 lives in a directory that does not exist.
        let pattern = tmp.path().join("%H").join("app.log");
        fs::create_dir(tmp.path().join("00")).expect("mkdir");
        let sink = RotatingFile::builder(pattern.to_string_lossy())
            .clock(clock.clone())
            .rotation_period(HOUR)
            .build()
            .expect("build");

        sink.write(b"ok\n").expect("write");
        clock.set(at("2024-01-01T01:05:00Z"));
        let err = sink.write(b"lost\n").unwrap_err();
        assert!(matches!(err, SinkError::Open { .. }));
        assert!(sink.current_file_name().ends_with("00/app.log"));

        // Back in the old window the held handle is reused.
        clock.set(at("2024-01-01T00:50:00Z"));
        sink.write(b"again\n").expect("write");
        assert_eq!(
            fs::read_to_string(tmp.path().join("00").join("app.log")).expect("read"),
            "ok\nagain\n"
        );
    }

    #[test]
    fn contended_rotation_still_writes() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        let link = tmp.path().join("current.log");
        let recorder = Arc::new(Recorder::default());
        let sink = hourly(&tmp, &clock)
            .link_name(&link)
            .handler(Tap(Arc::clone(&recorder)))
            .build()
            .expect("build");

        let target = tmp.path().join("app-2024010100.log");
        let _other = RotationLock::try_acquire(&target).expect("other process lock");

        assert_eq!(sink.write(b"payload\n").expect("write"), 8);
        assert_eq!(fs::read_to_string(&target).expect("read"), "payload\n");
        assert!(link.symlink_metadata().is_err());
        assert_eq!(*recorder.skipped.lock().expect("lock"), vec!["E4001"]);
    }

    #[test]
    fn existing_file_with_live_alias_is_not_rotated_again() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        let link = tmp.path().join("current.log");
        let target = tmp.path().join("app-2024010100.log");
        fs::write(&target, b"earlier run\n").expect("write");
        crate::rotate::update_alias(&target, &link).expect("alias");

        let recorder = Arc::new(Recorder::default());
        let sink = hourly(&tmp, &clock)
            .link_name(&link)
            .handler(Tap(Arc::clone(&recorder)))
            .build()
            .expect("build");
        // A held marker would show up as E4001 if a pass were attempted.
        let _marker = RotationLock::try_acquire(&target).expect("marker");

        sink.write(b"restarted\n").expect("write");

        assert!(recorder.skipped.lock().expect("lock").is_empty());
        assert_eq!(
            fs::read_to_string(&target).expect("read"),
            "earlier run\nrestarted\n"
        );
    }

    #[test]
    fn close_is_idempotent_and_write_reopens() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        let sink = hourly(&tmp, &clock).build().expect("build");

        sink.close().expect("close before any write");
        sink.write(b"a\n").expect("write");
        sink.close().expect("close");
        sink.close().expect("close again");
        sink.write(b"b\n").expect("write after close");

        assert_eq!(
            fs::read_to_string(tmp.path().join("app-2024010100.log")).expect("read"),
            "a\nb\n"
        );
    }

    #[test]
    fn io_write_impls_delegate() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        let mut sink = hourly(&tmp, &clock).build().expect("build");

        writeln!(&sink, "shared {}", 1).expect("write via &");
        writeln!(sink, "owned {}", 2).expect("write via owned");
        io::Write::flush(&mut sink).expect("flush");

        assert_eq!(
            fs::read_to_string(tmp.path().join("app-2024010100.log")).expect("read"),
            "shared 1\nowned 2\n"
        );
    }

    /// Accepts `room` bytes, then fails every write.
    struct Choked {
        accepted: Vec<u8>,
        room: usize,
    }

    impl io::Write for Choked {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.room == 0 {
                return Err(io::Error::other("device full"));
            }
            let n = buf.len().min(self.room);
            self.accepted.extend_from_slice(&buf[..n]);
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_reports_bytes_that_got_through() {
        let mut out = Choked {
            accepted: Vec::new(),
            room: 4,
        };

        let err = write_counted(&mut out, b"abcdefgh").unwrap_err();

        assert!(matches!(err, SinkError::Write { written: 4, .. }));
        assert_eq!(out.accepted, b"abcd");
    }

    #[test]
    fn complete_write_returns_full_length() {
        let mut out = Choked {
            accepted: Vec::new(),
            room: 100,
        };
        assert_eq!(write_counted(&mut out, b"abcdefgh").expect("write"), 8);
    }

    #[test]
    fn concurrent_writers_never_interleave_lines() {
        let tmp = TempDir::new().expect("tempdir");
        let clock = Arc::new(ManualClock::new(at("2024-01-01T00:30:00Z")));
        let sink = Arc::new(hourly(&tmp, &clock).build().expect("build"));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..50 {
                        sink.write(format!("thread-{t} line-{i}\n").as_bytes())
                            .expect("write");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }

        let content = fs::read_to_string(tmp.path().join("app-2024010100.log")).expect("read");
        assert_eq!(content.lines().count(), 200);
        assert!(content.lines().all(|l| l.starts_with("thread-") && l.contains(" line-")));
    }
}
