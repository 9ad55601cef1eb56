//! Fixed, versioned structuring contract
//!
//! The instruction string is part of the contract: changing it requires a new
//! [`CONTRACT_VERSION`].

use crate::error::ContractViolation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version tag of the structuring contract
pub const CONTRACT_VERSION: &str = "brd-structuring/v1";

/// Instructions sent with every request
pub const INSTRUCTIONS: &str = "\
contract: brd-structuring/v1
You are a deterministic text-structuring step. You do not interpret, infer or add meaning.
Input: fragment_texts, an ordered list of requirement fragments that belong to one role and one session.
Allowed operations: grouping, reordering and concatenation of the supplied fragment texts.
Forbidden: any word that does not already appear in fragment_texts; summarising; paraphrasing; resolving ambiguity; merging text from outside the supplied list.
Output: exactly one JSON object and nothing else, no markdown fences, no commentary:
{\"source_texts\": [<every supplied fragment text, verbatim, each exactly once>], \"requirement_text\": \"<consolidated text>\"}";

/// Request sent to the oracle for one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    /// Fixed contract instructions
    pub instructions: String,
    /// Cluster fragment texts, document order
    pub fragment_texts: Vec<String>,
}

impl OracleRequest {
    /// Create a request under the current contract
    #[must_use]
    pub fn new(fragment_texts: Vec<String>) -> Self {
        Self {
            instructions: INSTRUCTIONS.to_string(),
            fragment_texts,
        }
    }

    /// Contract version the request was built for
    #[inline]
    #[must_use]
    pub fn contract_version(&self) -> &'static str {
        CONTRACT_VERSION
    }
}

/// Oracle reply, exactly the fixed record shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleResponse {
    /// Cited fragment texts
    pub source_texts: Vec<String>,
    /// Consolidated text
    pub requirement_text: String,
}

impl OracleResponse {
    /// Parse a raw reply against the fixed record shape
    ///
    /// Surrounding whitespace is the only tolerance. Markdown fences, prose,
    /// extra fields, missing fields, wrong types and trailing content are all
    /// rejected.
    ///
    /// # Errors
    /// [`ContractViolation::Malformed`] or [`ContractViolation::EmptyRequirementText`]
    pub fn parse_strict(raw: &str) -> Result<Self, ContractViolation> {
        let trimmed = raw.trim();
        if !trimmed.starts_with('{') {
            return Err(ContractViolation::malformed(
                "reply must be a single JSON object",
            ));
        }

        let response: Self = serde_json::from_str(trimmed)
            .map_err(|e| ContractViolation::malformed(e.to_string()))?;

        if response.requirement_text.trim().is_empty() {
            return Err(ContractViolation::EmptyRequirementText);
        }

        Ok(response)
    }

    /// Check that cited sources are exactly the supplied fragment texts
    ///
    /// Compared as multisets: a text supplied twice must be cited twice.
    ///
    /// # Errors
    /// Unknown, duplicate or missing source texts
    pub fn check_sources(&self, request: &OracleRequest) -> Result<(), ContractViolation> {
        let mut remaining: BTreeMap<&str, usize> = BTreeMap::new();
        for text in &request.fragment_texts {
            *remaining.entry(text.as_str()).or_default() += 1;
        }

        for text in &self.source_texts {
            match remaining.get_mut(text.as_str()) {
                None => {
                    return Err(ContractViolation::UnknownSourceText { text: text.clone() });
                }
                Some(0) => {
                    return Err(ContractViolation::DuplicateSourceText { text: text.clone() });
                }
                Some(count) => *count -= 1,
            }
        }

        if let Some(missing) = request
            .fragment_texts
            .iter()
            .find(|t| remaining.get(t.as_str()).is_some_and(|n| *n > 0))
        {
            return Err(ContractViolation::MissingSourceText {
                text: missing.clone(),
            });
        }

        Ok(())
    }
}
