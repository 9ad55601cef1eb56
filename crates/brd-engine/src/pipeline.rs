//! Pipeline driver
//!
//! One call to [`ConsolidationPipeline::run`] is one request-scoped, linear
//! pass over a document: extract, detect, cluster, synthesize, package. Every
//! derived structure belongs to the run; nothing is shared between runs, so a
//! pipeline can serve many documents concurrently.

use crate::audit::{AuditEntry, AuditLog};
use crate::cluster::build_clusters;
use crate::config::EngineConfig;
use crate::detect::DependencyDetector;
use crate::error::{ClusterFailure, ConsolidationError};
use crate::extract::FragmentExtractor;
use crate::package::{export_delimited, package, ExportView, PackagedRequirements};
use crate::state_machine::{RunState, RunTracker};
use crate::synthesize::{SynthesisOutcome, Synthesizer};
use brd_model::{DocumentDigest, Fragment, Requirement, RequirementRecord};
use brd_oracle::SharedOracle;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn, Instrument};

/// Counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Extracted fragments
    pub fragments: usize,
    /// Fragments in the implicit scope
    pub implicit_fragments: usize,
    /// Detected edges, including discarded ones
    pub edges: usize,
    /// Edges offered to clustering
    pub clustered_edges: usize,
    /// Cross-boundary edges kept out of clustering
    pub discarded_edges: usize,
    /// Clusters built
    pub clusters: usize,
    /// Packaged requirements
    pub requirements: usize,
    /// Clusters that failed validation
    pub failed_clusters: usize,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationReport {
    /// Hash of the input text
    pub digest: DocumentDigest,
    /// Packaged requirements
    pub requirements: Vec<Requirement>,
    /// `requirement_id -> entry` view
    pub export: ExportView,
    /// Failed clusters, excluded from `requirements`
    pub failures: Vec<ClusterFailure>,
    /// Hash-chained audit log
    pub audit: AuditLog,
    /// Counters
    pub stats: RunStats,
    /// States visited by the run
    pub states: Vec<RunState>,
}

impl ConsolidationReport {
    /// Wire-schema records
    #[must_use]
    pub fn records(&self) -> Vec<RequirementRecord> {
        self.requirements.iter().map(Requirement::to_record).collect()
    }

    /// Delimited export with a header row
    #[must_use]
    pub fn to_delimited(&self, delimiter: char) -> String {
        export_delimited(&self.requirements, delimiter)
    }

    /// Check if every cluster produced a requirement
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Consolidation pipeline with an optional injected oracle
#[derive(Debug, Clone)]
pub struct ConsolidationPipeline {
    config: EngineConfig,
    oracle: Option<SharedOracle>,
}

impl ConsolidationPipeline {
    /// Create a pipeline
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn new(config: EngineConfig) -> Result<Self, ConsolidationError> {
        config.validate()?;
        Ok(Self {
            config,
            oracle: None,
        })
    }

    /// Attach a structuring oracle
    #[must_use]
    pub fn with_oracle(mut self, oracle: SharedOracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check if runs will phrase through the oracle
    #[inline]
    #[must_use]
    pub fn uses_oracle(&self) -> bool {
        self.config.use_oracle && self.oracle.is_some()
    }

    /// Consolidate one document
    ///
    /// # Errors
    /// Whole-run failures only; per-cluster failures are in the report
    pub async fn run(&self, raw_text: &str) -> Result<ConsolidationReport, ConsolidationError> {
        let digest = DocumentDigest::of_text(raw_text);
        let span = tracing::info_span!("consolidate", digest = %digest.short());
        self.run_inner(raw_text, digest).instrument(span).await
    }

    /// Consolidate independent documents concurrently
    ///
    /// Results are returned in input order.
    pub async fn run_batch<S: AsRef<str>>(
        &self,
        documents: &[S],
    ) -> Vec<Result<ConsolidationReport, ConsolidationError>> {
        info!(documents = documents.len(), "starting batch");
        futures::future::join_all(documents.iter().map(|d| self.run(d.as_ref()))).await
    }

    /// Extract fragments without running the rest of the pipeline
    #[must_use]
    pub fn fragments(&self, raw_text: &str) -> Vec<Fragment> {
        FragmentExtractor::new(&self.config).extract(raw_text)
    }

    async fn run_inner(
        &self,
        raw_text: &str,
        digest: DocumentDigest,
    ) -> Result<ConsolidationReport, ConsolidationError> {
        let mut tracker = RunTracker::new();
        let mut audit = AuditLog::new();
        let mut stats = RunStats::default();

        match self
            .run_stages(raw_text, &mut tracker, &mut audit, &mut stats)
            .await
        {
            Ok((packaged, failures)) => {
                info!(
                    requirements = stats.requirements,
                    failed_clusters = stats.failed_clusters,
                    discarded_edges = stats.discarded_edges,
                    "consolidation finished"
                );
                Ok(ConsolidationReport {
                    digest,
                    requirements: packaged.requirements,
                    export: packaged.export,
                    failures,
                    audit,
                    stats,
                    states: tracker.history().to_vec(),
                })
            }
            Err(err) => {
                let state = tracker.current();
                tracker.fail();
                if err.is_empty_input() {
                    warn!("document yielded no usable fragments");
                } else {
                    error!(state = ?state, error = %err, "consolidation aborted");
                }
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        raw_text: &str,
        tracker: &mut RunTracker,
        audit: &mut AuditLog,
        stats: &mut RunStats,
    ) -> Result<(PackagedRequirements, Vec<ClusterFailure>), ConsolidationError> {
        tracker.advance(RunState::Extracting)?;
        let fragments = FragmentExtractor::new(&self.config).extract(raw_text);
        if fragments.is_empty() {
            return Err(ConsolidationError::EmptyInput);
        }
        stats.fragments = fragments.len();
        stats.implicit_fragments = fragments.iter().filter(|f| f.scope.is_implicit()).count();
        if stats.implicit_fragments > 0 {
            audit.append(AuditEntry::ImplicitScopeFallback {
                fragment_count: stats.implicit_fragments,
            })?;
        }
        info!(
            fragments = stats.fragments,
            implicit = stats.implicit_fragments,
            "fragments extracted"
        );

        tracker.advance(RunState::Detecting)?;
        let graph = DependencyDetector::new(&self.config).detect(&fragments);
        for edge in graph.discarded() {
            let (from, to) = edge.endpoints();
            warn!(%from, %to, kind = %edge.kind, "cross-boundary edge discarded");
            audit.append(AuditEntry::CrossBoundaryEdgeDiscarded {
                from,
                to,
                kind: edge.kind,
                from_scope: fragments[from.index()].scope.clone(),
                to_scope: fragments[to.index()].scope.clone(),
            })?;
        }
        stats.edges = graph.len();
        stats.clustered_edges = graph.clusterable().count();
        stats.discarded_edges = stats.edges - stats.clustered_edges;
        info!(
            edges = stats.edges,
            clustered = stats.clustered_edges,
            discarded = stats.discarded_edges,
            "dependencies detected"
        );

        tracker.advance(RunState::Clustering)?;
        let clusters = build_clusters(&fragments, &graph)?;
        stats.clusters = clusters.len();
        info!(clusters = stats.clusters, "clusters built");

        tracker.advance(RunState::Synthesizing)?;
        let synthesizer = match &self.oracle {
            Some(oracle) if self.config.use_oracle => Synthesizer::with_oracle(oracle.clone()),
            _ => Synthesizer::new(),
        };
        let mut drafts = Vec::with_capacity(clusters.len());
        let mut failures = Vec::new();
        for cluster in &clusters {
            match synthesizer.synthesize(cluster, &fragments).await? {
                SynthesisOutcome::Drafted(draft) => drafts.push(draft),
                SynthesisOutcome::Failed(failure) => {
                    warn!(cluster = %failure.cluster, reason = %failure.kind, "cluster failed validation");
                    if self.config.strict_mode {
                        return Err(ConsolidationError::StrictModeViolation(Box::new(failure)));
                    }
                    audit.append(AuditEntry::ClusterFailed(failure.clone()))?;
                    failures.push(failure);
                }
            }
        }

        let packaged = package(drafts)?;
        stats.requirements = packaged.requirements.len();
        stats.failed_clusters = failures.len();
        tracker.advance(RunState::Packaged)?;
        Ok((packaged, failures))
    }
}
