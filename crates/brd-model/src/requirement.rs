//! Consolidated requirements
//!
//! [`Requirement`] is the only externally emitted artifact. Once packaged it
//! is immutable; [`RequirementRecord`] is its wire shape.

use crate::fragment::{FragmentId, Scope};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sequential requirement identifier (`REQ-001`, `REQ-002`, ...)
///
/// Numbering starts at 1 for every run; there is no counter shared between
/// documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequirementId(u32);

impl RequirementId {
    /// Prefix of the textual form
    pub const PREFIX: &'static str = "REQ-";

    /// Create from a 1-based sequence number
    ///
    /// # Errors
    /// Returns error for sequence number 0
    pub fn new(sequence: u32) -> Result<Self, RequirementIdError> {
        if sequence == 0 {
            return Err(RequirementIdError::ZeroSequence);
        }
        Ok(Self(sequence))
    }

    /// Identifier at the given 0-based position in packaging order
    #[must_use]
    pub fn from_position(position: usize) -> Self {
        Self(u32::try_from(position).map_or(u32::MAX, |p| p.saturating_add(1)))
    }

    /// 1-based sequence number
    #[inline]
    #[must_use]
    pub const fn sequence(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for RequirementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:03}", Self::PREFIX, self.0)
    }
}

impl FromStr for RequirementId {
    type Err = RequirementIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| RequirementIdError::Malformed(s.to_string()))?;
        if digits.len() < 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(RequirementIdError::Malformed(s.to_string()));
        }
        let sequence = digits
            .parse::<u32>()
            .map_err(|_| RequirementIdError::Malformed(s.to_string()))?;
        Self::new(sequence)
    }
}

impl Serialize for RequirementId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RequirementId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Requirement identifier errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequirementIdError {
    /// Sequence numbers start at 1
    #[error("requirement sequence numbers start at 1")]
    ZeroSequence,

    /// Text is not of the form `REQ-###`
    #[error("malformed requirement id: '{0}'")]
    Malformed(String),
}

/// Consolidated, source-traceable requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Sequential identifier
    pub requirement_id: RequirementId,
    /// Scope shared by all sources
    pub scope: Scope,
    /// Source fragments, ascending document order
    pub source_fragment_ids: Vec<FragmentId>,
    /// Verbatim source texts, parallel to `source_fragment_ids`
    pub source_texts: Vec<String>,
    /// Source-constrained consolidated text
    pub requirement_text: String,
}

impl Requirement {
    /// Wire-schema projection
    #[must_use]
    pub fn to_record(&self) -> RequirementRecord {
        RequirementRecord {
            requirement_id: self.requirement_id,
            session: self.scope.display_label(),
            source_texts: self.source_texts.clone(),
            requirement_text: self.requirement_text.clone(),
        }
    }
}

/// Externally visible requirement record
///
/// ```json
/// {
///   "requirement_id": "REQ-001",
///   "session": "Registration",
///   "source_texts": ["User enters OTP.", "System validates OTP."],
///   "requirement_text": "User enters OTP. System validates OTP."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementRecord {
    /// `REQ-###`
    pub requirement_id: RequirementId,
    /// Role/session label
    pub session: String,
    /// Verbatim fragment texts
    pub source_texts: Vec<String>,
    /// Consolidated text
    pub requirement_text: String,
}
