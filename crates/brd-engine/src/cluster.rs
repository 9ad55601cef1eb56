//! Cluster building
//!
//! Connected components over in-boundary edges, computed with union-find.
//! Clusters are ordered by their smallest fragment id, members ascend.

use crate::detect::DependencyGraph;
use crate::error::{ConsolidationError, Stage};
use brd_model::{Cluster, ClusterId, Fragment, FragmentId};
use indexmap::IndexMap;
use petgraph::unionfind::UnionFind;

/// Partition fragments into clusters
///
/// A fragment with no qualifying edge forms a singleton cluster.
///
/// # Errors
/// [`ConsolidationError::PipelineAbort`] when fragment ids are not the
/// positions `0..n`, or when a clusterable edge points outside the sequence or
/// joins two scopes.
pub fn build_clusters(
    fragments: &[Fragment],
    graph: &DependencyGraph,
) -> Result<Vec<Cluster>, ConsolidationError> {
    if let Some((position, fragment)) = fragments
        .iter()
        .enumerate()
        .find(|(position, f)| f.id.index() != *position)
    {
        return Err(ConsolidationError::abort(
            Stage::Clustering,
            format!("fragment {} found at position {position}", fragment.id),
        ));
    }

    let mut components = UnionFind::<usize>::new(fragments.len());
    for edge in graph.clusterable() {
        let (from, to) = edge.endpoints();
        let (Some(a), Some(b)) = (fragments.get(from.index()), fragments.get(to.index())) else {
            return Err(ConsolidationError::abort(
                Stage::Clustering,
                format!("edge {from} -> {to} references an unknown fragment"),
            ));
        };
        if !a.same_scope(b) {
            return Err(ConsolidationError::abort(
                Stage::Clustering,
                format!("edge {from} -> {to} joins scopes {} and {}", a.scope, b.scope),
            ));
        }
        components.union(from.index(), to.index());
    }

    let mut groups: IndexMap<usize, Vec<FragmentId>> = IndexMap::new();
    for fragment in fragments {
        let root = components.find(fragment.id.index());
        groups.entry(root).or_default().push(fragment.id);
    }

    let clusters: Vec<Cluster> = groups
        .into_values()
        .enumerate()
        .map(|(position, fragment_ids)| Cluster {
            id: ClusterId(position),
            scope: fragments[fragment_ids[0].index()].scope.clone(),
            fragment_ids,
        })
        .collect();

    tracing::debug!(
        clusters = clusters.len(),
        singletons = clusters.iter().filter(|c| c.is_singleton()).count(),
        "clusters built"
    );
    Ok(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::detect::detect;
    use crate::extract::extract;
    use brd_model::{DependencyEdge, EdgeKind, Scope};
    use pretty_assertions::assert_eq;

    fn members(clusters: &[Cluster]) -> Vec<Vec<usize>> {
        clusters
            .iter()
            .map(|c| c.fragment_ids.iter().map(|id| id.index()).collect())
            .collect()
    }

    #[test]
    fn components_ordered_by_minimum_member() {
        let raw = "\
User enters OTP.
System validates OTP.

Admin exports the monthly Report.

If OTP invalid, show error.

User downloads the Report archive.";
        let config = EngineConfig::default().with_paragraph_breaks_sequence(true);
        let fragments = extract(raw, &config);
        let clusters = build_clusters(&fragments, &detect(&fragments, &config)).unwrap();

        assert_eq!(members(&clusters), vec![vec![0, 1, 3], vec![2, 4]]);
        assert_eq!(clusters[1].id, ClusterId(1));
    }

    #[test]
    fn isolated_fragments_become_singletons() {
        let raw = "User opens the settings page.\n\nAdmin archives old tickets.";
        let config = EngineConfig::default().with_paragraph_breaks_sequence(true);
        let fragments = extract(raw, &config);
        let clusters = build_clusters(&fragments, &detect(&fragments, &config)).unwrap();

        assert_eq!(members(&clusters), vec![vec![0], vec![1]]);
        assert!(clusters.iter().all(Cluster::is_singleton));
    }

    #[test]
    fn zero_fragments_zero_clusters() {
        let clusters = build_clusters(&[], &DependencyGraph::default()).unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn discarded_edges_never_merge() {
        let raw = "# Upload Receipt\nCustomer uploads the Receipt photo.\n# Redeem Reward\nCustomer redeems points using a Receipt.";
        let config = EngineConfig::default();
        let fragments = extract(raw, &config);
        let clusters = build_clusters(&fragments, &detect(&fragments, &config)).unwrap();

        assert_eq!(members(&clusters), vec![vec![0], vec![1]]);
        assert_eq!(clusters[0].scope, Scope::session("Upload Receipt"));
        assert_eq!(clusters[1].scope, Scope::session("Redeem Reward"));
    }

    #[test]
    fn malformed_inputs_abort() {
        let config = EngineConfig::default();
        let mut fragments = extract("User enters OTP.\nSystem validates OTP.", &config);

        let dangling = DependencyGraph::from_edges(vec![DependencyEdge::new(
            FragmentId(0),
            FragmentId(9),
            EdgeKind::SharedDataObject,
            false,
        )]);
        assert!(matches!(
            build_clusters(&fragments, &dangling),
            Err(ConsolidationError::PipelineAbort { stage: Stage::Clustering, .. })
        ));

        fragments[1].scope = Scope::session("Other");
        let unflagged = DependencyGraph::from_edges(vec![DependencyEdge::new(
            FragmentId(0),
            FragmentId(1),
            EdgeKind::Sequential,
            false,
        )]);
        assert!(build_clusters(&fragments, &unflagged).is_err());

        fragments[1].id = FragmentId(5);
        assert!(build_clusters(&fragments, &DependencyGraph::default()).is_err());
    }
}
