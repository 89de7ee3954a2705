//! Filename patterns.
//!
//! A pattern is a strftime string such as `/var/log/app-%Y%m%d%H.log`. From it
//! we derive two things:
//!
//! - the filename for an instant, rendered against the start of the rotation
//!   window containing that instant, and
//! - a glob (`/var/log/app-*.log`) that enumerates every file the pattern
//!   could ever have produced, used when purging.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, TimeDelta};
use regex::Regex;

use crate::error::FormatError;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// A strftime directive: `%`, optional padding flag, optional `:`/`.` modifier
/// with width, then the conversion character.
static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[-_0]?[:.]?[0-9]*[%+A-Za-z]").expect("directive regex"));

static WILDCARD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*+").expect("wildcard regex"));

/// Turn a filename pattern into a glob matching every file it can produce.
///
/// Each directive becomes `*` and runs of `*` collapse to one. Nothing is
/// validated here: a malformed directive that does not look like a directive
/// is passed through unchanged.
#[must_use]
pub fn derive_glob(pattern: &str) -> String {
    let replaced = DIRECTIVE.replace_all(pattern, "*");
    WILDCARD_RUN.replace_all(&replaced, "*").into_owned()
}

/// Render `pattern` for `instant` using the strftime engine.
///
/// # Errors
///
/// Returns [`FormatError`] if the pattern contains a directive the engine
/// does not understand.
pub fn format_time(pattern: &str, instant: &DateTime<FixedOffset>) -> Result<String, FormatError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(FormatError {
            pattern: pattern.to_string(),
        });
    }
    Ok(instant.format_with_items(items.iter()).to_string())
}

/// Floor `now` to the start of its rotation window.
///
/// Windows are aligned on the Unix epoch, so the result depends only on the
/// absolute instant and `period`, never on when a writer started. A zero
/// period leaves `now` unchanged.
#[must_use]
pub fn bucket(now: &DateTime<FixedOffset>, period: Duration) -> DateTime<FixedOffset> {
    let Ok(period_nanos) = i128::try_from(period.as_nanos()) else {
        return *now;
    };
    if period_nanos == 0 {
        return *now;
    }

    let nanos = i128::from(now.timestamp()) * NANOS_PER_SEC
        + i128::from(now.timestamp_subsec_nanos());
    let offset = nanos.rem_euclid(period_nanos);

    let offset_secs = i64::try_from(offset / NANOS_PER_SEC).unwrap_or(i64::MAX);
    let offset_subsec = i64::try_from(offset % NANOS_PER_SEC).unwrap_or(0);
    let delta = TimeDelta::try_seconds(offset_secs)
        .and_then(|secs| secs.checked_add(&TimeDelta::nanoseconds(offset_subsec)));

    delta
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(*now)
}

/// Filename for `now`: the pattern rendered against the bucketed instant.
///
/// Every instant in the same window yields the same name, including across
/// process restarts.
///
/// # Errors
///
/// Returns [`FormatError`] if the pattern cannot be rendered.
pub fn resolve(
    now: &DateTime<FixedOffset>,
    period: Duration,
    pattern: &str,
) -> Result<String, FormatError> {
    format_time(pattern, &bucket(now, period))
}
