//! Dependency detection
//!
//! Every pair `(i, j)` with `i` before `j` is tested against three lexical
//! rules; the first that matches decides the edge kind:
//!
//! 1. [`EdgeKind::Sequential`]: `j` directly follows `i` in the filtered
//!    fragment order, in the same scope (and paragraph, when configured)
//! 2. [`EdgeKind::ConditionalOutcome`]: `j` opens with a conditional marker
//!    and repeats, or shares a long prefix with, a content word of `i`
//! 3. [`EdgeKind::SharedDataObject`]: both reference a common data object
//!
//! Edges between different scopes are kept, flagged, for audit; they never
//! reach clustering.

use crate::config::EngineConfig;
use brd_model::{tokenize, DependencyEdge, EdgeKind, Fragment};
use std::collections::{BTreeMap, BTreeSet};

/// Function words ignored when looking for back-references
const FUNCTION_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "these", "those", "then", "than", "are",
    "was", "were", "will", "shall", "should", "must", "can", "could", "may", "might", "not",
    "has", "have", "had", "into", "onto", "upon", "when", "else", "otherwise", "unless", "after",
    "once", "their", "there", "its", "his", "her", "they", "them", "you", "your", "our", "any",
    "all", "each", "such", "being", "been", "which", "who", "whom", "what", "also", "via", "per",
    "only", "both", "but", "nor", "yet", "out", "off", "over", "under", "again", "same", "able",
];

const MIN_CONTENT_WORD_CHARS: usize = 3;

/// Detected edges of one fragment sequence, sorted by `(from, to)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Build from edges in any order
    #[must_use]
    pub fn from_edges(mut edges: Vec<DependencyEdge>) -> Self {
        edges.sort_by_key(|e| (e.from, e.to));
        Self { edges }
    }

    /// All edges, including cross-boundary ones
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Edges offered to clustering
    pub fn clusterable(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(|e| e.is_clusterable())
    }

    /// Edges excluded because they cross a scope boundary
    pub fn discarded(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(|e| e.crosses_boundary)
    }

    /// Number of edges
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if there are no edges
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edge counts per kind
    #[must_use]
    pub fn count_by_kind(&self) -> BTreeMap<EdgeKind, usize> {
        let mut counts = BTreeMap::new();
        for edge in &self.edges {
            *counts.entry(edge.kind).or_default() += 1;
        }
        counts
    }
}

#[derive(Debug)]
struct Lexicon {
    tokens: Vec<String>,
    content: BTreeSet<String>,
}

/// Pairwise rule evaluation
#[derive(Debug, Clone)]
pub struct DependencyDetector<'a> {
    config: &'a EngineConfig,
    markers: Vec<Vec<String>>,
}

impl<'a> DependencyDetector<'a> {
    /// Create a detector over a configuration
    #[must_use]
    pub fn new(config: &'a EngineConfig) -> Self {
        let mut markers: Vec<Vec<String>> = config
            .conditional_markers
            .iter()
            .map(|m| tokenize(m).collect::<Vec<_>>())
            .filter(|m| !m.is_empty())
            .collect();
        markers.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        markers.dedup();
        Self { config, markers }
    }

    /// Detect edges over fragments in document order
    #[must_use]
    pub fn detect(&self, fragments: &[Fragment]) -> DependencyGraph {
        let lexicons: Vec<Lexicon> = fragments.iter().map(|f| self.lexicon(f)).collect();
        let mut edges = Vec::new();

        for (i, earlier) in fragments.iter().enumerate() {
            for (j, later) in fragments.iter().enumerate().skip(i + 1) {
                let Some(kind) = self.classify(earlier, later, &lexicons[i], &lexicons[j]) else {
                    continue;
                };
                let crosses_boundary = !earlier.same_scope(later);
                if crosses_boundary {
                    tracing::debug!(
                        from = %earlier.id,
                        to = %later.id,
                        kind = %kind,
                        "edge crosses scope boundary"
                    );
                }
                edges.push(DependencyEdge::new(earlier.id, later.id, kind, crosses_boundary));
            }
        }

        DependencyGraph::from_edges(edges)
    }

    /// First matching rule for an ordered pair
    #[must_use]
    pub fn relation(&self, earlier: &Fragment, later: &Fragment) -> Option<EdgeKind> {
        self.classify(earlier, later, &self.lexicon(earlier), &self.lexicon(later))
    }

    fn classify(
        &self,
        earlier: &Fragment,
        later: &Fragment,
        earlier_lex: &Lexicon,
        later_lex: &Lexicon,
    ) -> Option<EdgeKind> {
        if self.is_sequential(earlier, later) {
            Some(EdgeKind::Sequential)
        } else if self.is_conditional_outcome(earlier_lex, later_lex) {
            Some(EdgeKind::ConditionalOutcome)
        } else if earlier.shares_data_object(later) {
            Some(EdgeKind::SharedDataObject)
        } else {
            None
        }
    }

    fn is_sequential(&self, earlier: &Fragment, later: &Fragment) -> bool {
        later.id == earlier.id.next()
            && earlier.same_scope(later)
            && (!self.config.paragraph_breaks_sequence || earlier.paragraph == later.paragraph)
    }

    fn is_conditional_outcome(&self, earlier: &Lexicon, later: &Lexicon) -> bool {
        let Some(marker_len) = self.leading_marker(&later.tokens) else {
            return false;
        };
        let marker_words: BTreeSet<&str> = later.tokens[..marker_len]
            .iter()
            .map(String::as_str)
            .collect();

        later
            .content
            .iter()
            .filter(|w| !marker_words.contains(w.as_str()))
            .any(|word| {
                earlier
                    .content
                    .iter()
                    .any(|other| self.refers_to(word, other))
            })
    }

    /// Token count of the longest marker the sequence opens with
    fn leading_marker(&self, tokens: &[String]) -> Option<usize> {
        self.markers
            .iter()
            .find(|marker| tokens.starts_with(marker))
            .map(Vec::len)
    }

    fn refers_to(&self, word: &str, other: &str) -> bool {
        if word == other {
            return true;
        }
        let prefix = self.config.back_reference_prefix_len;
        let shared = word
            .chars()
            .zip(other.chars())
            .take_while(|(a, b)| a == b)
            .count();
        shared >= prefix
    }

    fn lexicon(&self, fragment: &Fragment) -> Lexicon {
        let tokens: Vec<String> = tokenize(&fragment.text).collect();
        let content = tokens
            .iter()
            .filter(|t| is_content_word(t))
            .cloned()
            .collect();
        Lexicon { tokens, content }
    }
}

fn is_content_word(token: &str) -> bool {
    token.chars().count() >= MIN_CONTENT_WORD_CHARS
        && token.chars().any(char::is_alphabetic)
        && !FUNCTION_WORDS.contains(&token)
}

/// Detect edges with a given configuration
#[must_use]
pub fn detect(fragments: &[Fragment], config: &EngineConfig) -> DependencyGraph {
    DependencyDetector::new(config).detect(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use brd_model::FragmentId;
    use pretty_assertions::assert_eq;

    fn kinds(graph: &DependencyGraph) -> Vec<(usize, usize, EdgeKind, bool)> {
        graph
            .edges()
            .iter()
            .map(|e| (e.from.index(), e.to.index(), e.kind, e.crosses_boundary))
            .collect()
    }

    #[test]
    fn otp_flow_is_sequential_then_conditional() {
        let config = EngineConfig::default();
        let fragments = extract(
            "User enters OTP.\nSystem validates OTP.\nIf OTP invalid, show error.",
            &config,
        );
        let graph = detect(&fragments, &config);

        assert_eq!(
            kinds(&graph),
            vec![
                (0, 1, EdgeKind::Sequential, false),
                (0, 2, EdgeKind::ConditionalOutcome, false),
                (1, 2, EdgeKind::Sequential, false),
            ]
        );
    }

    #[test]
    fn sequential_outranks_shared_data_object() {
        let config = EngineConfig::default();
        let fragments = extract("User uploads the Receipt.\nAdmin reviews the Receipt.", &config);
        assert!(fragments[0].shares_data_object(&fragments[1]));

        let graph = detect(&fragments, &config);
        assert_eq!(kinds(&graph), vec![(0, 1, EdgeKind::Sequential, false)]);
    }

    #[test]
    fn blank_line_does_not_interrupt_sequence() {
        let config = EngineConfig::default();
        let fragments = extract("User enters OTP.\n\nSystem validates OTP.", &config);
        assert_ne!(fragments[0].paragraph, fragments[1].paragraph);

        assert_eq!(
            kinds(&detect(&fragments, &config)),
            vec![(0, 1, EdgeKind::Sequential, false)]
        );
    }

    #[test]
    fn paragraph_break_interrupts_sequence_when_enabled() {
        let raw = "User opens the settings page.\n\nUser changes the display name.";
        let config = EngineConfig::default().with_paragraph_breaks_sequence(true);
        let fragments = extract(raw, &config);
        assert!(detect(&fragments, &config).is_empty());

        let config = EngineConfig::default();
        let fragments = extract(raw, &config);
        assert_eq!(
            kinds(&detect(&fragments, &config)),
            vec![(0, 1, EdgeKind::Sequential, false)]
        );
    }

    #[test]
    fn conditional_needs_back_reference() {
        let config = EngineConfig::default().with_paragraph_breaks_sequence(true);
        let fragments = extract(
            "User submits the registration form.\n\nOtherwise show the welcome banner.\n\nOnce registered, send a confirmation mail.",
            &config,
        );
        let graph = detect(&fragments, &config);

        // "registered" shares the prefix "regist" with "registration"
        assert_eq!(kinds(&graph), vec![(0, 2, EdgeKind::ConditionalOutcome, false)]);
    }

    #[test]
    fn multi_word_markers_match_on_leading_tokens() {
        let config = EngineConfig::default().with_paragraph_breaks_sequence(true);
        let detector = DependencyDetector::new(&config);
        let fragments = extract(
            "Customer redeems the voucher code.\n\nIn case voucher expired, display a notice.",
            &config,
        );
        assert_eq!(
            detector.relation(&fragments[0], &fragments[1]),
            Some(EdgeKind::ConditionalOutcome)
        );
        assert_eq!(detector.leading_marker(&["in".into(), "case".into()]), Some(2));
        assert_eq!(detector.leading_marker(&["in".into(), "app".into()]), None);
    }

    #[test]
    fn cross_scope_edges_are_flagged() {
        let raw = "# Upload Receipt\nCustomer uploads the Receipt photo.\n# Redeem Reward\nCustomer redeems points using a Receipt.";
        let config = EngineConfig::default();
        let fragments = extract(raw, &config);
        let graph = detect(&fragments, &config);

        assert_eq!(
            kinds(&graph),
            vec![(0, 1, EdgeKind::SharedDataObject, true)]
        );
        assert_eq!(graph.clusterable().count(), 0);
        assert_eq!(graph.discarded().count(), 1);
    }

    #[test]
    fn edges_are_sorted_and_counted() {
        let graph = DependencyGraph::from_edges(vec![
            DependencyEdge::new(FragmentId(2), FragmentId(5), EdgeKind::SharedDataObject, false),
            DependencyEdge::new(FragmentId(0), FragmentId(1), EdgeKind::Sequential, false),
            DependencyEdge::new(FragmentId(0), FragmentId(4), EdgeKind::SharedDataObject, true),
        ]);
        let pairs: Vec<(usize, usize)> = graph
            .edges()
            .iter()
            .map(|e| (e.from.index(), e.to.index()))
            .collect();
        assert_eq!(pairs, vec![(0, 1), (0, 4), (2, 5)]);
        assert_eq!(graph.count_by_kind()[&EdgeKind::SharedDataObject], 2);
    }

    #[test]
    fn detection_is_deterministic() {
        let config = EngineConfig::default();
        let fragments = extract(
            "User enters OTP.\nSystem validates OTP.\n\nIf OTP invalid, show error.\nAdmin exports the OTP audit.",
            &config,
        );
        assert_eq!(detect(&fragments, &config), detect(&fragments, &config));
    }
}
