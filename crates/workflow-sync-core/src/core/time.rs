// crates/workflow-sync-core/src/core/time.rs
// ============================================================================
// Module: Workflow Sync Time Model
// Description: Canonical timestamp representation for sync records.
// Purpose: Keep wall-clock reads at the edges and make windows testable.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Timestamps are unix epoch milliseconds. Engines never read wall-clock time
//! directly; they ask an injected [`crate::interfaces::Clock`]. RFC 3339
//! conversion is provided for orchestrator wire formats.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Unix epoch timestamp in milliseconds.
///
/// # Invariants
/// - Values are supplied by callers or a [`crate::interfaces::Clock`].
/// - Arithmetic saturates instead of overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp moved back by `duration`.
    #[must_use]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(millis))
    }

    /// Returns the timestamp moved forward by `duration`.
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Parses an RFC 3339 timestamp string.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampParseError`] when the input is not valid RFC 3339.
    pub fn parse_rfc3339(value: &str) -> Result<Self, TimestampParseError> {
        let parsed = OffsetDateTime::parse(value, &Rfc3339)
            .map_err(|err| TimestampParseError(format!("{value}: {err}")))?;
        let millis = parsed.unix_timestamp_nanos() / 1_000_000;
        i64::try_from(millis)
            .map(Self)
            .map_err(|_| TimestampParseError(format!("{value}: out of range")))
    }

    /// Formats the timestamp as RFC 3339 (UTC).
    ///
    /// # Errors
    ///
    /// Returns [`TimestampParseError`] when the value is outside the
    /// representable calendar range.
    pub fn to_rfc3339(self) -> Result<String, TimestampParseError> {
        let nanos = i128::from(self.0) * 1_000_000;
        let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|err| TimestampParseError(err.to_string()))?;
        datetime.format(&Rfc3339).map_err(|err| TimestampParseError(err.to_string()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// RFC 3339 conversion failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp: {0}")]
pub struct TimestampParseError(String);

// ============================================================================
// SECTION: Tests
// ============================================================================
