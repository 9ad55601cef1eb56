//! Engine configuration
//!
//! Every tunable of the lexical rule sets lives here. Process-level concerns
//! (API keys, endpoints, ports) do not: the oracle is injected fully built.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Leading terms that mark a conditional or outcome fragment
pub const DEFAULT_CONDITIONAL_MARKERS: &[&str] = &[
    "if",
    "then",
    "otherwise",
    "else",
    "when",
    "whenever",
    "unless",
    "upon",
    "once",
    "after",
    "in case",
    "on success",
    "on failure",
    "failing which",
];

/// Capitalised words never treated as data objects
pub const DEFAULT_DATA_OBJECT_STOPWORDS: &[&str] = &[
    "a", "an", "the", "i", "if", "then", "else", "otherwise", "when", "and", "or", "not", "no",
    "yes", "on", "in", "at", "to", "of", "for", "by", "with", "is", "are", "be", "must", "shall",
    "should", "will", "can", "may", "system", "user", "users", "once", "after", "upon", "unless",
];

/// Consolidation engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum non-whitespace characters for a fragment
    pub min_fragment_chars: usize,
    /// Minimum alphabetic words for a fragment
    pub min_fragment_words: usize,
    /// A blank line between two fragments breaks a Sequential relation (off by default)
    pub paragraph_breaks_sequence: bool,
    /// Conditional/outcome markers (matched on leading words, case-insensitive)
    pub conditional_markers: Vec<String>,
    /// Shared prefix length that counts as a lexical back-reference
    pub back_reference_prefix_len: usize,
    /// Extra domain nouns treated as data objects wherever they appear
    pub data_object_terms: Vec<String>,
    /// Capitalised words excluded from data-object detection
    pub data_object_stopwords: Vec<String>,
    /// Any failed cluster aborts the run
    pub strict_mode: bool,
    /// Phrase through the injected oracle when one is available
    pub use_oracle: bool,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML; missing keys take their defaults
    ///
    /// # Errors
    /// Returns error on malformed TOML or invalid values
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// With strict mode
    #[inline]
    #[must_use]
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// With oracle phrasing enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_oracle(mut self, use_oracle: bool) -> Self {
        self.use_oracle = use_oracle;
        self
    }

    /// With extra data-object terms
    #[must_use]
    pub fn with_data_object_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_object_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    /// With paragraph-break rule for Sequential edges
    #[inline]
    #[must_use]
    pub fn with_paragraph_breaks_sequence(mut self, enabled: bool) -> Self {
        self.paragraph_breaks_sequence = enabled;
        self
    }

    /// With minimum fragment size
    #[inline]
    #[must_use]
    pub fn with_min_fragment(mut self, chars: usize, words: usize) -> Self {
        self.min_fragment_chars = chars;
        self.min_fragment_words = words;
        self
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first bad value
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_fragment_words == 0 {
            return Err(ConfigError::Invalid(
                "min_fragment_words must be at least 1".to_string(),
            ));
        }
        if self.back_reference_prefix_len < 3 {
            return Err(ConfigError::Invalid(
                "back_reference_prefix_len must be at least 3".to_string(),
            ));
        }
        if let Some(marker) = self
            .conditional_markers
            .iter()
            .find(|m| m.split_whitespace().next().is_none())
        {
            return Err(ConfigError::Invalid(format!(
                "conditional marker '{marker}' is blank"
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_fragment_chars: 8,
            min_fragment_words: 2,
            paragraph_breaks_sequence: false,
            conditional_markers: DEFAULT_CONDITIONAL_MARKERS
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
            back_reference_prefix_len: 6,
            data_object_terms: Vec::new(),
            data_object_stopwords: DEFAULT_DATA_OBJECT_STOPWORDS
                .iter()
                .map(|w| (*w).to_string())
                .collect(),
            strict_mode: false,
            use_oracle: true,
        }
    }
}
