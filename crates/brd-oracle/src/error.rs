//! Error types for the structuring oracle
//!
//! Two failure families with different blast radius:
//! - [`OracleError`]: the call itself failed (transport, status, empty
//!   reply). There is no retry; a failed call fails the whole run.
//! - [`ContractViolation`]: the call succeeded but the reply breaks the
//!   contract. Only the affected cluster fails.

use serde::{Deserialize, Serialize};

/// Oracle invocation failures
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// HTTP transport error
    #[error("oracle transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("oracle returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Reply carried no text
    #[error("oracle reply contained no text")]
    EmptyReply,

    /// Request could not be encoded
    #[error("failed to encode oracle request: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Oracle is not reachable or refused the call
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

impl OracleError {
    /// Check if the failure came from the network layer
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

/// Reply that does not satisfy the structuring contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum ContractViolation {
    /// Reply is not exactly the fixed record shape
    #[error("malformed oracle reply: {detail}")]
    Malformed {
        /// Parser diagnostic
        detail: String,
    },

    /// `requirement_text` is empty or whitespace
    #[error("oracle reply has empty requirement_text")]
    EmptyRequirementText,

    /// A source text is not one of the supplied fragment texts
    #[error("oracle reply cites unknown source text: '{text}'")]
    UnknownSourceText {
        /// Offending text
        text: String,
    },

    /// A source text appears more than once
    #[error("oracle reply cites source text twice: '{text}'")]
    DuplicateSourceText {
        /// Offending text
        text: String,
    },

    /// A supplied fragment text is absent from the reply
    #[error("oracle reply omits source text: '{text}'")]
    MissingSourceText {
        /// Omitted text
        text: String,
    },

    /// Produced text uses words absent from the sources
    #[error("oracle reply introduces out-of-vocabulary tokens: {tokens:?}")]
    OutOfVocabulary {
        /// Offending normalised tokens, sorted
        tokens: Vec<String>,
    },
}

impl ContractViolation {
    /// Create a malformed-reply violation
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_display() {
        let v = ContractViolation::OutOfVocabulary {
            tokens: vec!["automatically".to_string()],
        };
        assert!(v.to_string().contains("automatically"));
        assert!(ContractViolation::malformed("eof")
            .to_string()
            .contains("malformed"));
    }

    #[test]
    fn violation_serializes_tagged() {
        let json = serde_json::to_value(ContractViolation::EmptyRequirementText).unwrap();
        assert_eq!(json["violation"], "empty_requirement_text");
    }

    #[test]
    fn unavailable_is_not_transport() {
        assert!(!OracleError::Unavailable("down".into()).is_transport());
        assert!(OracleError::Status {
            status: 503,
            body: String::new()
        }
        .is_transport());
    }
}
