//! rotlog-core library.
//!
//! A time-based rotating file sink: writes go to a file named by rendering a
//! strftime pattern against the start of the current rotation window. On the
//! first write into a new window the sink optionally repoints a symlink alias
//! at the new file and deletes rotated files older than a retention window.
//!
//! ```no_run
//! use std::time::Duration;
//! use rotlog_core::RotatingFile;
//!
//! # fn main() -> Result<(), rotlog_core::SinkError> {
//! let sink = RotatingFile::builder("/var/log/app-%Y%m%d%H.log")
//!     .link_name("/var/log/app.log")
//!     .rotation_period(Duration::from_secs(3600))
//!     .max_age(Duration::from_secs(7 * 24 * 3600))
//!     .build()?;
//! sink.write(b"hello\n")?;
//! sink.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Conventions
//!
//! - **Errors**: [`SinkError`] for anything a caller of `write` must see,
//!   [`RotateError`] for the advisory outcome of a rotation pass, and
//!   `anyhow::Result` at the config-file boundary.
//! - **Logging**: `tracing` macros only; the library never installs a
//!   subscriber.

pub mod clock;
pub mod config;
pub mod error;
pub mod lock;
pub mod pattern;
pub mod purge;
pub mod rotate;
pub mod sink;

pub use clock::{Clock, ManualClock, SystemClock, UtcClock};
pub use config::{ClockKind, SinkConfig};
pub use error::{ErrorCode, FormatError, RotateError, SinkError};
pub use sink::{FileRotated, RotatingFile, RotatingFileBuilder, RotationHandler};
