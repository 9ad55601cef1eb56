//! Engine error types
//!
//! Two layers: [`ClusterFailure`] is a per-cluster outcome recorded in the
//! audit log while the run continues; [`ConsolidationError`] is the single
//! top-level failure of a whole run.

use crate::state_machine::RunState;
use brd_model::{ClusterId, FragmentId, Scope};
use brd_oracle::{ContractViolation, OracleError};
use serde::{Deserialize, Serialize};

/// Pipeline stage, for abort reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Fragment extraction
    Extraction,
    /// Dependency detection
    Detection,
    /// Cluster building
    Clustering,
    /// Requirement synthesis
    Synthesis,
    /// Traceability packaging
    Packaging,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Extraction => "extraction",
            Stage::Detection => "detection",
            Stage::Clustering => "clustering",
            Stage::Synthesis => "synthesis",
            Stage::Packaging => "packaging",
        };
        f.write_str(name)
    }
}

/// Why a cluster produced no requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Oracle reply broke the structuring contract
    #[error("oracle contract violation: {0}")]
    OracleContractViolation(ContractViolation),

    /// Concatenated text failed the vocabulary check
    #[error("text uses tokens outside the source vocabulary: {tokens:?}")]
    VocabularyViolation {
        /// Offending tokens, sorted
        tokens: Vec<String>,
    },
}

impl FailureKind {
    /// Check if the oracle broke its contract (as opposed to the concatenation path)
    #[inline]
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::OracleContractViolation(_))
    }
}

/// Per-cluster failure record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterFailure {
    /// Failed cluster
    pub cluster: ClusterId,
    /// Cluster scope
    pub scope: Scope,
    /// Member fragments
    pub source_fragment_ids: Vec<FragmentId>,
    /// Member texts, verbatim
    pub source_texts: Vec<String>,
    /// Failure reason
    pub kind: FailureKind,
    /// Raw oracle reply, when there was one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_reply: Option<String>,
}

/// Illegal run-state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not in the allowed table
    #[error("illegal run state transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: RunState,
        /// Requested state
        to: RunState,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML did not parse into the configuration shape
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Audit chain errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    /// Record hash or back-link does not match
    #[error("audit chain broken at record {sequence}")]
    IntegrityViolation {
        /// First bad record
        sequence: u64,
    },

    /// Entry could not be encoded for hashing
    #[error("failed to encode audit record {sequence}: {detail}")]
    Encoding {
        /// Record being hashed
        sequence: u64,
        /// Encoder diagnostic
        detail: String,
    },
}

/// Whole-run failure
#[derive(Debug, thiserror::Error)]
pub enum ConsolidationError {
    /// Nothing survived extraction
    #[error("document yielded no usable fragments")]
    EmptyInput,

    /// Oracle transport failed; the run does not retry
    #[error("structuring oracle unavailable while phrasing cluster {cluster}: {source}")]
    OracleUnavailable {
        /// Cluster being phrased
        cluster: ClusterId,
        /// Transport error
        #[source]
        source: OracleError,
    },

    /// A cluster failed while strict mode was on
    #[error("cluster {} failed in strict mode: {}", .0.cluster, .0.kind)]
    StrictModeViolation(Box<ClusterFailure>),

    /// Internal invariant broken mid-run
    #[error("pipeline aborted during {stage}: {reason}")]
    PipelineAbort {
        /// Stage that detected the problem
        stage: Stage,
        /// What was wrong
        reason: String,
    },

    /// Run tracker refused a transition
    #[error("run state error: {0}")]
    StateMachine(#[from] StateMachineError),

    /// Bad configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Audit record could not be written
    #[error("audit log error: {0}")]
    Audit(#[from] AuditError),
}

impl ConsolidationError {
    /// Create a pipeline abort
    pub fn abort(stage: Stage, reason: impl Into<String>) -> Self {
        Self::PipelineAbort {
            stage,
            reason: reason.into(),
        }
    }

    /// Check if the document simply had no content
    #[inline]
    #[must_use]
    pub fn is_empty_input(&self) -> bool {
        matches!(self, Self::EmptyInput)
    }

    /// Check if the run produced nothing usable (everything except empty input)
    #[inline]
    #[must_use]
    pub fn is_run_fatal(&self) -> bool {
        !self.is_empty_input()
    }

    /// Check if the caller might succeed by re-running later
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OracleUnavailable { source, .. } if source.is_transport())
    }

    /// Check if the error indicates a defect rather than bad input
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::PipelineAbort { .. } | Self::StateMachine(_) | Self::Audit(_)
        )
    }
}
