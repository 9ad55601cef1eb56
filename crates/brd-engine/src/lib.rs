//! BRD Engine - Deterministic Requirement Consolidation
//!
//! Turns the plain text of a business-requirements document into numbered,
//! source-traceable requirement statements:
//! - Splits text into fragments with scope and data-object metadata
//! - Detects Sequential, ConditionalOutcome and SharedDataObject relations
//! - Clusters related fragments without crossing role/session boundaries
//! - Phrases each cluster by concatenation or through an injected oracle,
//!   then rejects any text that uses words absent from its sources
//! - Numbers the survivors `REQ-001`, `REQ-002`, ... with a hash-chained
//!   audit log of everything that was discarded
//!
//! # Example
//!
//! ```rust
//! use brd_engine::{ConsolidationPipeline, EngineConfig};
//!
//! # async fn example() -> Result<(), brd_engine::ConsolidationError> {
//! let pipeline = ConsolidationPipeline::new(EngineConfig::default())?;
//! let report = pipeline
//!     .run("User enters OTP.\nSystem validates OTP.\nIf OTP invalid, show error.")
//!     .await?;
//!
//! assert_eq!(report.requirements.len(), 1);
//! assert_eq!(report.records()[0].requirement_id.to_string(), "REQ-001");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod audit;
pub mod cluster;
pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod package;
pub mod pipeline;
pub mod state_machine;
pub mod synthesize;

// Re-exports for convenience
pub use audit::{AuditEntry, AuditLog, AuditRecord};
pub use cluster::build_clusters;
pub use config::EngineConfig;
pub use detect::{detect, DependencyDetector, DependencyGraph};
pub use error::{
    AuditError, ClusterFailure, ConfigError, ConsolidationError, FailureKind, Stage,
    StateMachineError,
};
pub use extract::{extract, FragmentExtractor};
pub use package::{
    export_delimited, export_rows, package, to_delimited, ExportEntry, ExportRow, ExportView,
    PackagedRequirements,
};
pub use pipeline::{ConsolidationPipeline, ConsolidationReport, RunStats};
pub use state_machine::{allowed_transitions, validate_transition, RunState, RunTracker};
pub use synthesize::{concatenate, DraftRequirement, Phrasing, SynthesisOutcome, Synthesizer};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running consolidation
    pub use crate::{
        ClusterFailure, ConsolidationError, ConsolidationPipeline, ConsolidationReport,
        EngineConfig, FailureKind, RunState,
    };
    pub use brd_model::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
