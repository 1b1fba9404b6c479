// crates/sweep-runner/src/host.rs
// ============================================================================
// Module: Host Context
// Description: Provenance attached to every result.
// Purpose: Record where, by whom, when, and at which revision a vector ran.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Host and user are resolved once per process. Timestamps are taken per
//! result in UTC and formatted `YYYY-MM-DD_HH-MM-SS`. The source revision is
//! read from git once per export; any failure yields `"unknown"`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::process::Command;
use std::process::Stdio;

use time::OffsetDateTime;
use time::UtcOffset;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Value recorded when a provenance field cannot be determined.
pub const UNKNOWN: &str = "unknown";

/// Result timestamp layout, `YYYY-MM-DD_HH-MM-SS`.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");

// ============================================================================
// SECTION: Host Context
// ============================================================================

/// Executing host and user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    /// Host name.
    pub host: String,
    /// User name.
    pub user: String,
}

impl HostContext {
    /// Creates a context with explicit values.
    #[must_use]
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
        }
    }

    /// Detects the host from `uname -n` (or `HOSTNAME`) and the user from
    /// `USER`.
    #[must_use]
    pub fn detect() -> Self {
        let host = command_output("uname", &["-n"])
            .or_else(|| env::var("HOSTNAME").ok().filter(|value| !value.is_empty()))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let user = env::var("USER")
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            host,
            user,
        }
    }

    /// Returns the current UTC timestamp in result format.
    #[must_use]
    pub fn timestamp(&self) -> String {
        format_timestamp(OffsetDateTime::now_utc())
    }
}

/// Formats a timestamp in UTC as `YYYY-MM-DD_HH-MM-SS`; a formatting error
/// yields `"unknown"`.
#[must_use]
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let utc = at.checked_to_offset(UtcOffset::UTC).unwrap_or(at);
    utc.format(TIMESTAMP_FORMAT).unwrap_or_else(|_| UNKNOWN.to_string())
}

/// Returns the short git revision of the working directory, or `"unknown"`.
#[must_use]
pub fn git_revision() -> String {
    command_output("git", &["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| UNKNOWN.to_string())
}

/// Runs a command and returns its trimmed stdout when it succeeds.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).stderr(Stdio::null()).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
