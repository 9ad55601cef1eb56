//! Fragment clusters
//!
//! Clusters are derived and never persisted on their own; they exist only as
//! the grouping key used to build requirements.

use crate::fragment::{FragmentId, Scope};
use serde::{Deserialize, Serialize};

/// Position of a cluster in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub usize);

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Maximal set of fragments connected by in-boundary edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Processing-order id
    pub id: ClusterId,
    /// Scope shared by every member
    pub scope: Scope,
    /// Member fragment ids, ascending document order
    pub fragment_ids: Vec<FragmentId>,
}

impl Cluster {
    /// Smallest member id (the cluster's ordering key)
    #[inline]
    #[must_use]
    pub fn min_fragment(&self) -> Option<FragmentId> {
        self.fragment_ids.first().copied()
    }

    /// Number of member fragments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragment_ids.len()
    }

    /// Check if the cluster has no members
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragment_ids.is_empty()
    }

    /// Check if the cluster is a single isolated fragment
    #[inline]
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.fragment_ids.len() == 1
    }
}
