//! BRD Model
//!
//! Immutable data types shared by every stage of requirement consolidation.
//!
//! # Overview
//!
//! - **Fragment**: an atomic unit of source text with position and scope
//! - **DependencyEdge**: a detected structural relation between two fragments
//! - **Cluster**: fragments connected by in-boundary dependency edges
//! - **Requirement**: the consolidated, source-traceable output unit
//! - **Vocabulary**: the normalised token set used for containment checks
//!
//! # Example
//!
//! ```rust
//! use brd_model::{Vocabulary, tokenize};
//!
//! let vocab = Vocabulary::from_texts(["User enters OTP.", "System validates OTP."]);
//! assert!(vocab.contains("otp"));
//! assert_eq!(vocab.missing_from("User enters OTP automatically"), vec!["automatically"]);
//! assert_eq!(tokenize("If OTP invalid, show error.").count(), 5);
//! ```

#![warn(missing_docs)]

pub mod cluster;
pub mod digest;
pub mod edge;
pub mod fragment;
pub mod requirement;
pub mod vocabulary;

// Re-exports
pub use cluster::{Cluster, ClusterId};
pub use digest::{DigestError, DocumentDigest};
pub use edge::{DependencyEdge, EdgeKind};
pub use fragment::{DataObject, Fragment, FragmentId, Label, Scope, IMPLICIT_LABEL};
pub use requirement::{Requirement, RequirementId, RequirementIdError, RequirementRecord};
pub use vocabulary::{tokenize, Vocabulary};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with consolidation types
    pub use crate::{
        Cluster, ClusterId, DataObject, DependencyEdge, EdgeKind, Fragment, FragmentId, Label,
        Requirement, RequirementId, RequirementRecord, Scope, Vocabulary,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
