//! Vocabulary normalisation and containment
//!
//! Tokens are maximal runs of alphanumeric characters, lower-cased.
//! Punctuation, whitespace and symbols only separate tokens. The same
//! tokenizer is applied to source fragments and to produced requirement text,
//! so containment is a plain set-membership check.

use std::collections::BTreeSet;

/// Split text into normalised tokens
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Normalised token set of one or more source texts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    tokens: BTreeSet<String>,
}

impl Vocabulary {
    /// Build from the union of several texts
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = texts
            .into_iter()
            .flat_map(|t| tokenize(t.as_ref()).collect::<Vec<_>>())
            .collect();
        Self { tokens }
    }

    /// Check if a normalised token is part of the vocabulary
    #[inline]
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Tokens of `text` absent from the vocabulary, sorted and deduplicated
    #[must_use]
    pub fn missing_from(&self, text: &str) -> Vec<String> {
        tokenize(text)
            .filter(|t| !self.tokens.contains(t))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Check if every token of `text` is in the vocabulary
    #[inline]
    #[must_use]
    pub fn covers(&self, text: &str) -> bool {
        tokenize(text).all(|t| self.tokens.contains(&t))
    }

    /// Number of distinct tokens
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if the vocabulary is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate tokens in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tokenize_folds_case_and_drops_punctuation() {
        let tokens: Vec<_> = tokenize("If OTP invalid, show error!").collect();
        assert_eq!(tokens, vec!["if", "otp", "invalid", "show", "error"]);
    }

    #[test]
    fn apostrophes_and_hyphens_split() {
        let tokens: Vec<_> = tokenize("user's e-mail").collect();
        assert_eq!(tokens, vec!["user", "s", "e", "mail"]);
    }

    #[test]
    fn missing_tokens_are_sorted_and_unique() {
        let vocab = Vocabulary::from_texts(["User enters OTP."]);
        assert_eq!(
            vocab.missing_from("User automatically enters OTP, automatically."),
            vec!["automatically"]
        );
        assert!(vocab.covers("OTP user enters"));
    }

    #[test]
    fn empty_text_is_always_covered() {
        let vocab = Vocabulary::default();
        assert!(vocab.is_empty());
        assert!(vocab.covers(" ... "));
    }

    proptest! {
        #[test]
        fn prop_source_text_is_covered_by_its_own_vocabulary(
            texts in proptest::collection::vec("[A-Za-z0-9 ,.;:!?'-]{0,40}", 1..6)
        ) {
            let vocab = Vocabulary::from_texts(&texts);
            for text in &texts {
                prop_assert!(vocab.covers(text));
            }
            prop_assert!(vocab.covers(&texts.join(" ")));
        }
    }
}
