// crates/workflow-sync-core/src/core/spec.rs
// ============================================================================
// Module: Workflow Spec Descriptors
// Description: Parsing and validation of blob-stored workflow spec files.
// Purpose: Turn untrusted YAML spec content into a validated descriptor.
// Dependencies: serde, serde_yaml, cron, chrono-tz, sha2
// ============================================================================

//! ## Overview
//! Spec files are YAML documents naming a workflow, its owning team and its
//! schedule. The schedule may be written as a bare cron string or as a
//! mapping with `cron` and `timezone`. Standard 5-field cron expressions are
//! accepted and normalized to the seconds-first form the `cron` crate parses.
//! Unknown top-level keys are ignored; other platform tooling shares the file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use serde::Deserialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::definition::DefinitionStatus;
use crate::core::definition::Schedule;
use crate::core::identifiers::TeamId;
use crate::core::identifiers::WorkflowName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of workflow names and team identifiers.
pub const MAX_NAME_LENGTH: usize = 255;
/// Timezone applied when a spec omits one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Spec parsing and validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecParseError {
    /// Content is not valid YAML for a spec document.
    #[error("spec yaml invalid: {0}")]
    Yaml(String),
    /// Workflow or team identifier is malformed.
    #[error("invalid {field}: {message}")]
    InvalidIdentifier {
        /// Field name.
        field: &'static str,
        /// Reason.
        message: String,
    },
    /// Cron expression does not parse.
    #[error("invalid schedule `{cron}`: {message}")]
    InvalidSchedule {
        /// Expression as written.
        cron: String,
        /// Parser message.
        message: String,
    },
    /// Timezone is not a known IANA name.
    #[error("invalid timezone `{0}`")]
    InvalidTimezone(String),
}

// ============================================================================
// SECTION: Descriptor
// ============================================================================

/// Validated contents of one spec file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDescriptor {
    /// Workflow name.
    pub name: WorkflowName,
    /// Owning team.
    pub team: TeamId,
    /// Optional description.
    pub description: Option<String>,
    /// Validated schedule.
    pub schedule: Schedule,
    /// Declared lifecycle status.
    pub status: DefinitionStatus,
    /// SHA-256 hex digest of the raw content.
    pub digest: String,
}

/// Raw YAML document shape.
#[derive(Debug, Deserialize)]
struct RawSpec {
    /// Workflow name.
    name: String,
    /// Owning team.
    team: String,
    /// Optional description.
    #[serde(default)]
    description: Option<String>,
    /// Optional declared status.
    #[serde(default)]
    status: Option<RawStatus>,
    /// Schedule block.
    schedule: RawSchedule,
}

/// Status spellings accepted in spec files.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawStatus {
    /// `active`
    Active,
    /// `paused`
    Paused,
    /// `disabled`
    Disabled,
}

/// Schedule written either as a bare string or a mapping.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSchedule {
    /// `schedule: "0 6 * * *"`
    Cron(String),
    /// `schedule: { cron: ..., timezone: ... }`
    Detailed {
        /// Cron expression.
        cron: String,
        /// Optional timezone.
        #[serde(default)]
        timezone: Option<String>,
    },
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses and validates spec file content.
///
/// # Errors
///
/// Returns [`SpecParseError`] when the document is malformed, an identifier
/// is invalid, or the schedule/timezone does not validate.
pub fn parse_spec(content: &[u8]) -> Result<SpecDescriptor, SpecParseError> {
    let raw: RawSpec =
        serde_yaml::from_slice(content).map_err(|err| SpecParseError::Yaml(err.to_string()))?;
    validate_identifier("name", &raw.name)?;
    validate_identifier("team", &raw.team)?;
    let schedule = match raw.schedule {
        RawSchedule::Cron(cron) => Schedule {
            cron,
            timezone: DEFAULT_TIMEZONE.to_string(),
        },
        RawSchedule::Detailed {
            cron,
            timezone,
        } => Schedule {
            cron,
            timezone: timezone.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
        },
    };
    validate_schedule(&schedule)?;
    let status = match raw.status {
        None | Some(RawStatus::Active) => DefinitionStatus::Active,
        Some(RawStatus::Paused) => DefinitionStatus::Paused,
        Some(RawStatus::Disabled) => DefinitionStatus::Disabled,
    };
    Ok(SpecDescriptor {
        name: WorkflowName::new(raw.name),
        team: TeamId::new(raw.team),
        description: raw.description.filter(|text| !text.trim().is_empty()),
        schedule,
        status,
        digest: content_digest(content),
    })
}

/// Validates a schedule's cron expression and timezone.
///
/// # Errors
///
/// Returns [`SpecParseError`] when either part is invalid.
pub fn validate_schedule(schedule: &Schedule) -> Result<(), SpecParseError> {
    let normalized = normalize_cron(&schedule.cron);
    cron::Schedule::from_str(&normalized).map_err(|err| SpecParseError::InvalidSchedule {
        cron: schedule.cron.clone(),
        message: err.to_string(),
    })?;
    schedule
        .timezone
        .parse::<chrono_tz::Tz>()
        .map_err(|_| SpecParseError::InvalidTimezone(schedule.timezone.clone()))?;
    Ok(())
}

/// Validates a workflow or team identifier.
///
/// # Errors
///
/// Returns [`SpecParseError::InvalidIdentifier`] for empty, overlong, or
/// non `[A-Za-z0-9_.-]` values.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), SpecParseError> {
    if value.is_empty() {
        return Err(SpecParseError::InvalidIdentifier {
            field,
            message: "must be non-empty".to_string(),
        });
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(SpecParseError::InvalidIdentifier {
            field,
            message: format!("exceeds {MAX_NAME_LENGTH} characters"),
        });
    }
    if let Some(bad) =
        value.chars().find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')))
    {
        return Err(SpecParseError::InvalidIdentifier {
            field,
            message: format!("unsupported character '{bad}'"),
        });
    }
    Ok(())
}

/// Returns the lowercase hex SHA-256 digest of `content`.
#[must_use]
pub fn content_digest(content: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let digest = Sha256::digest(content);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

/// Prefixes a seconds field onto 5-field Unix cron expressions.
fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 { format!("0 {trimmed}") } else { trimmed.to_string() }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
