//! Dependency edges between fragments

use crate::fragment::FragmentId;
use serde::{Deserialize, Serialize};

/// Relation class that produced an edge
///
/// Variants are listed in detection priority order: a pair that qualifies
/// for several classes is recorded with the first one only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// `to` directly follows `from` in the same scope and paragraph
    Sequential,
    /// `to` opens with a conditional/outcome marker and refers back to `from`
    ConditionalOutcome,
    /// Both fragments reference a common data object
    SharedDataObject,
}

impl EdgeKind {
    /// All kinds, highest priority first
    pub const PRIORITY: [EdgeKind; 3] = [
        EdgeKind::Sequential,
        EdgeKind::ConditionalOutcome,
        EdgeKind::SharedDataObject,
    ];

    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Sequential => "sequential",
            EdgeKind::ConditionalOutcome => "conditional_outcome",
            EdgeKind::SharedDataObject => "shared_data_object",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected relation between two fragments
///
/// Direction follows document order (`from < to`) for audit purposes only;
/// clustering treats edges as undirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Earlier fragment
    pub from: FragmentId,
    /// Later fragment
    pub to: FragmentId,
    /// Relation class
    pub kind: EdgeKind,
    /// Endpoints differ in role or session; excluded from clustering
    pub crosses_boundary: bool,
}

impl DependencyEdge {
    /// Create an edge
    #[inline]
    #[must_use]
    pub fn new(from: FragmentId, to: FragmentId, kind: EdgeKind, crosses_boundary: bool) -> Self {
        Self {
            from,
            to,
            kind,
            crosses_boundary,
        }
    }

    /// Check if the edge may be used for clustering
    #[inline]
    #[must_use]
    pub fn is_clusterable(&self) -> bool {
        !self.crosses_boundary
    }

    /// Endpoints as an ordered pair
    #[inline]
    #[must_use]
    pub fn endpoints(&self) -> (FragmentId, FragmentId) {
        (self.from, self.to)
    }
}
