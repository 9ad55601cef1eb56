//! Requirement synthesis
//!
//! Each cluster is phrased either by plain concatenation or by the injected
//! [`StructuringOracle`](brd_oracle::StructuringOracle). Both paths end in the
//! same vocabulary check: a draft is accepted only when every token of its
//! text appears in the cluster's source texts. Nothing is ever patched; a
//! draft that fails becomes a [`ClusterFailure`].

use crate::error::{ClusterFailure, ConsolidationError, FailureKind, Stage};
use brd_model::{Cluster, ClusterId, Fragment, FragmentId, Scope, Vocabulary};
use brd_oracle::{ContractViolation, OracleRequest, OracleResponse, SharedOracle};
use serde::{Deserialize, Serialize};

/// How a draft was phrased
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum Phrasing {
    /// Joined in document order
    Concatenation,
    /// Returned by a structuring oracle
    Oracle {
        /// Oracle name
        name: String,
    },
}

/// Validated requirement text, not yet numbered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRequirement {
    /// Source cluster
    pub cluster: ClusterId,
    /// Cluster scope
    pub scope: Scope,
    /// Source fragments, ascending
    pub source_fragment_ids: Vec<FragmentId>,
    /// Source texts, parallel to the ids
    pub source_texts: Vec<String>,
    /// Validated consolidated text
    pub requirement_text: String,
    /// Phrasing path
    pub phrasing: Phrasing,
}

/// Result of phrasing one cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// Draft passed validation
    Drafted(DraftRequirement),
    /// Draft rejected
    Failed(ClusterFailure),
}

/// Phrases clusters and validates the result
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    oracle: Option<SharedOracle>,
}

impl Synthesizer {
    /// Concatenation only
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Phrase through an oracle
    #[must_use]
    pub fn with_oracle(oracle: SharedOracle) -> Self {
        Self {
            oracle: Some(oracle),
        }
    }

    /// Check if an oracle is attached
    #[inline]
    #[must_use]
    pub fn uses_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    /// Phrase and validate one cluster
    ///
    /// # Errors
    /// [`ConsolidationError::OracleUnavailable`] if the oracle call itself
    /// fails, [`ConsolidationError::PipelineAbort`] if the cluster references
    /// a fragment that does not exist. Validation failures are returned as
    /// [`SynthesisOutcome::Failed`].
    pub async fn synthesize(
        &self,
        cluster: &Cluster,
        fragments: &[Fragment],
    ) -> Result<SynthesisOutcome, ConsolidationError> {
        let source_texts = source_texts(cluster, fragments)?;
        let vocabulary = Vocabulary::from_texts(&source_texts);

        let Some(oracle) = &self.oracle else {
            let text = concatenate(&source_texts);
            let missing = vocabulary.missing_from(&text);
            if !missing.is_empty() {
                return Ok(SynthesisOutcome::Failed(failure(
                    cluster,
                    source_texts,
                    FailureKind::VocabularyViolation { tokens: missing },
                    None,
                )));
            }
            return Ok(SynthesisOutcome::Drafted(draft(
                cluster,
                source_texts,
                text,
                Phrasing::Concatenation,
            )));
        };

        let request = OracleRequest::new(source_texts.clone());
        let raw = oracle
            .structure(&request)
            .await
            .map_err(|source| ConsolidationError::OracleUnavailable {
                cluster: cluster.id,
                source,
            })?;

        let checked = OracleResponse::parse_strict(&raw).and_then(|response| {
            response.check_sources(&request)?;
            let missing = vocabulary.missing_from(&response.requirement_text);
            if missing.is_empty() {
                Ok(response)
            } else {
                Err(ContractViolation::OutOfVocabulary { tokens: missing })
            }
        });

        match checked {
            Ok(response) => Ok(SynthesisOutcome::Drafted(draft(
                cluster,
                source_texts,
                response.requirement_text.trim().to_string(),
                Phrasing::Oracle {
                    name: oracle.name().to_string(),
                },
            ))),
            Err(violation) => {
                tracing::debug!(cluster = %cluster.id, %violation, "oracle reply rejected");
                Ok(SynthesisOutcome::Failed(failure(
                    cluster,
                    source_texts,
                    FailureKind::OracleContractViolation(violation),
                    Some(raw),
                )))
            }
        }
    }
}

/// Join texts in order, normalising only the connective punctuation
///
/// Each text gets its trailing `,` `;` `:` replaced by a full stop (or a stop
/// appended when it has none); internal whitespace is collapsed.
#[must_use]
pub fn concatenate<S: AsRef<str>>(texts: &[S]) -> String {
    texts
        .iter()
        .map(|text| {
            let collapsed = text.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
            let body = collapsed.trim_end_matches([',', ';', ':', ' ']);
            if body.is_empty() || body.ends_with(['.', '!', '?']) {
                body.to_string()
            } else {
                format!("{body}.")
            }
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn source_texts(cluster: &Cluster, fragments: &[Fragment]) -> Result<Vec<String>, ConsolidationError> {
    cluster
        .fragment_ids
        .iter()
        .map(|id| {
            fragments
                .get(id.index())
                .filter(|f| f.id == *id)
                .map(|f| f.text.clone())
                .ok_or_else(|| {
                    ConsolidationError::abort(
                        Stage::Synthesis,
                        format!("cluster {} references unknown fragment {id}", cluster.id),
                    )
                })
        })
        .collect()
}

fn draft(
    cluster: &Cluster,
    source_texts: Vec<String>,
    requirement_text: String,
    phrasing: Phrasing,
) -> DraftRequirement {
    DraftRequirement {
        cluster: cluster.id,
        scope: cluster.scope.clone(),
        source_fragment_ids: cluster.fragment_ids.clone(),
        source_texts,
        requirement_text,
        phrasing,
    }
}

fn failure(
    cluster: &Cluster,
    source_texts: Vec<String>,
    kind: FailureKind,
    raw_reply: Option<String>,
) -> ClusterFailure {
    ClusterFailure {
        cluster: cluster.id,
        scope: cluster.scope.clone(),
        source_fragment_ids: cluster.fragment_ids.clone(),
        source_texts,
        kind,
        raw_reply,
    }
}
