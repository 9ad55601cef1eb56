//! BRD Structuring Oracle
//!
//! The external phrasing step used to turn a cluster of fragment texts into
//! one fluent requirement. The oracle is an injected capability: the engine
//! only sees the [`StructuringOracle`] trait, which makes stub oracles a
//! first-class way to test the pipeline deterministically.
//!
//! # Contract
//!
//! - Requests carry the fixed, versioned [`INSTRUCTIONS`] and the ordered
//!   fragment texts of one cluster.
//! - Replies must be exactly `{"source_texts": [...], "requirement_text": "..."}`.
//!   [`OracleResponse::parse_strict`] rejects anything else; there is no
//!   best-effort interpretation.
//! - Source texts must be the supplied fragment texts, verbatim, each exactly
//!   once (reordering is allowed).
//!
//! Vocabulary containment is enforced by the caller after parsing.
//!
//! # Example
//!
//! ```rust
//! use brd_oracle::{OracleRequest, OracleResponse};
//!
//! let request = OracleRequest::new(vec!["User enters OTP.".into(), "System validates OTP.".into()]);
//! let reply = r#"{"source_texts":["User enters OTP.","System validates OTP."],
//!                 "requirement_text":"User enters OTP; System validates OTP."}"#;
//!
//! let response = OracleResponse::parse_strict(reply).unwrap();
//! response.check_sources(&request).unwrap();
//! ```

#![warn(missing_docs)]

pub mod contract;
pub mod error;
pub mod gemini;
pub mod oracle;

// Re-exports
pub use contract::{OracleRequest, OracleResponse, CONTRACT_VERSION, INSTRUCTIONS};
pub use error::{ContractViolation, OracleError};
pub use gemini::{GeminiConfig, GeminiOracle};
pub use oracle::{SharedOracle, StructuringOracle};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
