use std::fmt;
use std::io;
use std::path::PathBuf;

/// Machine-readable error codes for log shippers and supervisors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidConfig,
    ConfigParseError,
    PatternFormatFailed,
    FileOpenFailed,
    FileWriteFailed,
    RotationLockContention,
    RotationLockFailed,
    AliasUpdateFailed,
    PurgeDisabled,
    NothingToPurge,
    PurgeEnumerationFailed,
    PurgeSpawnFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidConfig => "E1001",
            Self::ConfigParseError => "E1002",
            Self::PatternFormatFailed => "E2001",
            Self::FileOpenFailed => "E3001",
            Self::FileWriteFailed => "E3002",
            Self::RotationLockContention => "E4001",
            Self::RotationLockFailed => "E4002",
            Self::AliasUpdateFailed => "E4003",
            Self::PurgeDisabled => "E5001",
            Self::NothingToPurge => "E5002",
            Self::PurgeEnumerationFailed => "E5003",
            Self::PurgeSpawnFailed => "E5004",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidConfig => "Invalid sink configuration",
            Self::ConfigParseError => "Config file parse error",
            Self::PatternFormatFailed => "Time format pattern could not be rendered",
            Self::FileOpenFailed => "Rotated file could not be opened",
            Self::FileWriteFailed => "Rotated file write failed",
            Self::RotationLockContention => "Rotation lock held by another writer",
            Self::RotationLockFailed => "Rotation lock marker could not be created",
            Self::AliasUpdateFailed => "Current-file alias update failed",
            Self::PurgeDisabled => "Purge disabled",
            Self::NothingToPurge => "Nothing to purge",
            Self::PurgeEnumerationFailed => "Rotated file enumeration failed",
            Self::PurgeSpawnFailed => "Background purge could not start",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidConfig => {
                Some("Set a filename pattern and a rotation period greater than zero.")
            }
            Self::ConfigParseError => Some("Fix syntax in the rotlog config.toml and retry."),
            Self::PatternFormatFailed => {
                Some("Check the pattern for unsupported or incomplete `%` directives.")
            }
            Self::FileOpenFailed | Self::FileWriteFailed => {
                Some("Check that the target directory exists, has space, and is writable.")
            }
            Self::RotationLockContention => Some(
                "Another process is rotating the same file. Remove a stale `_lock` marker if none is.",
            ),
            Self::RotationLockFailed | Self::AliasUpdateFailed => {
                Some("Check write permissions on the log and alias directories.")
            }
            Self::PurgeDisabled | Self::NothingToPurge => None,
            Self::PurgeEnumerationFailed => {
                Some("Avoid unbalanced `[` or `]` in the pattern; they are glob syntax.")
            }
            Self::PurgeSpawnFailed => Some("The process may be out of threads; retry later."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A time-format pattern the strftime engine refused to render.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time format pattern: {pattern}")]
pub struct FormatError {
    /// The rejected pattern, verbatim.
    pub pattern: String,
}

/// Errors returned to callers of the sink.
///
/// Only failures that prevent the requested bytes from being written at all
/// are represented here. Rotation problems are reported as [`RotateError`]
/// and never escape [`crate::RotatingFile::write`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The filename pattern could not be rendered for the current time.
    #[error("{}: {0}", ErrorCode::PatternFormatFailed)]
    Format(#[from] FormatError),

    /// The target file could not be opened for appending.
    #[error("{}: failed to open {}: {source}", ErrorCode::FileOpenFailed, .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bytes could not be written to the opened file. `written` bytes of
    /// the buffer reached the file before the failure.
    #[error("{}: write failed after {written} bytes: {source}", ErrorCode::FileWriteFailed)]
    Write {
        written: usize,
        #[source]
        source: io::Error,
    },

    /// Construction options were rejected.
    #[error("{}: {0}", ErrorCode::InvalidConfig)]
    InvalidConfig(String),
}

impl SinkError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Format(_) => ErrorCode::PatternFormatFailed,
            Self::Open { .. } => ErrorCode::FileOpenFailed,
            Self::Write { .. } => ErrorCode::FileWriteFailed,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

impl From<SinkError> for io::Error {
    fn from(err: SinkError) -> Self {
        let kind = match &err {
            SinkError::Write { source, .. } | SinkError::Open { source, .. } => source.kind(),
            SinkError::Format(_) | SinkError::InvalidConfig(_) => io::ErrorKind::InvalidInput,
        };
        match err {
            SinkError::Write { source, .. } => source,
            other => Self::new(kind, other),
        }
    }
}

/// Outcomes of a rotation pass that stopped short of scheduling a purge.
///
/// These are advisory: the sink logs them, hands them to a
/// [`crate::RotationHandler`] if one is installed, and carries on writing.
#[derive(Debug, thiserror::Error)]
pub enum RotateError {
    /// Another actor already holds the rotation lock marker.
    #[error("{}: rotation lock {} is held", ErrorCode::RotationLockContention, .path.display())]
    LockUnavailable { path: PathBuf },

    /// The lock marker could not be created for a reason other than contention.
    #[error("{}: cannot create {}: {source}", ErrorCode::RotationLockFailed, .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Staging or renaming the current-file alias failed.
    #[error("{}: cannot update {}: {source}", ErrorCode::AliasUpdateFailed, .link.display())]
    Alias {
        link: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `max_age` is unset or zero.
    #[error("{}: max age not set, not purging", ErrorCode::PurgeDisabled)]
    PurgeDisabled,

    /// No rotated file is older than the retention cutoff.
    #[error("{}: nothing to purge", ErrorCode::NothingToPurge)]
    NothingToPurge,

    /// The derived glob pattern is not a valid glob.
    #[error("{}: {0}", ErrorCode::PurgeEnumerationFailed)]
    Glob(#[from] glob::PatternError),

    /// The background deletion thread could not be started.
    #[error("{}: {0}", ErrorCode::PurgeSpawnFailed)]
    SpawnPurge(#[source] io::Error),
}

impl RotateError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::LockUnavailable { .. } => ErrorCode::RotationLockContention,
            Self::Lock { .. } => ErrorCode::RotationLockFailed,
            Self::Alias { .. } => ErrorCode::AliasUpdateFailed,
            Self::PurgeDisabled => ErrorCode::PurgeDisabled,
            Self::NothingToPurge => ErrorCode::NothingToPurge,
            Self::Glob(_) => ErrorCode::PurgeEnumerationFailed,
            Self::SpawnPurge(_) => ErrorCode::PurgeSpawnFailed,
        }
    }

    /// True for the expected "nothing happened" outcomes: the alias (if any)
    /// was updated, but there was no purge to schedule.
    #[must_use]
    pub const fn is_inert(&self) -> bool {
        matches!(self, Self::PurgeDisabled | Self::NothingToPurge)
    }

    /// True when the pass was skipped because another actor was rotating.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::LockUnavailable { .. })
    }
}
