use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock, UtcClock};
use crate::error::{ErrorCode, SinkError};
use crate::sink::{DEFAULT_ROTATION_PERIOD, RotatingFile, RotatingFileBuilder};

/// Which wall clock names the rotated files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockKind {
    #[default]
    Local,
    Utc,
}

impl ClockKind {
    #[must_use]
    pub fn clock(self) -> Arc<dyn Clock> {
        match self {
            Self::Local => Arc::new(SystemClock),
            Self::Utc => Arc::new(UtcClock),
        }
    }
}

/// Sink options as read from a TOML file.
///
/// Every field is optional so that layers (command line, explicit file, user
/// file) can be stacked with [`SinkConfig::or`]. Durations use humantime
/// syntax: `"1h"`, `"7days"`, `"90m"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_name: Option<PathBuf>,
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_age: Option<Duration>,
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub rotation_period: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<ClockKind>,
}

impl SinkConfig {
    /// Fill every unset field of `self` from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            pattern: self.pattern.or(fallback.pattern),
            link_name: self.link_name.or(fallback.link_name),
            max_age: self.max_age.or(fallback.max_age),
            rotation_period: self.rotation_period.or(fallback.rotation_period),
            clock: self.clock.or(fallback.clock),
        }
    }

    /// Builder preloaded with these options, for callers that want to add a
    /// handler or swap the clock before building.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::InvalidConfig`] when no pattern is set.
    pub fn builder(&self) -> Result<RotatingFileBuilder, SinkError> {
        let Some(pattern) = self.pattern.as_deref().filter(|p| !p.is_empty()) else {
            return Err(SinkError::InvalidConfig(
                "no filename pattern configured".to_string(),
            ));
        };

        let mut builder = RotatingFile::builder(pattern)
            .clock(self.clock.unwrap_or_default().clock())
            .rotation_period(self.rotation_period.unwrap_or(DEFAULT_ROTATION_PERIOD));
        if let Some(link) = &self.link_name {
            builder = builder.link_name(link);
        }
        if let Some(age) = self.max_age {
            builder = builder.max_age(age);
        }
        Ok(builder)
    }

    /// Create the sink these options describe.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::InvalidConfig`] when no pattern is set or the
    /// rotation period is zero.
    pub fn build(&self) -> Result<RotatingFile, SinkError> {
        self.builder()?.build()
    }
}

/// Read an explicitly named config file.
///
/// # Errors
///
/// Fails if the file is missing, unreadable, or not valid config TOML.
pub fn load_config(path: &Path) -> Result<SinkConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<SinkConfig>(&content)
        .with_context(|| format!("{}: Failed to parse {}", ErrorCode::ConfigParseError, path.display()))
}

/// `<config dir>/rotlog/config.toml`, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rotlog/config.toml"))
}

/// Read the per-user config file, falling back to defaults when absent.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<SinkConfig> {
    let Some(path) = user_config_path() else {
        return Ok(SinkConfig::default());
    };
    if !path.exists() {
        return Ok(SinkConfig::default());
    }

    load_config(&path)
}
