//! Fragment extraction
//!
//! Splits plain document text into atomic [`Fragment`]s:
//!
//! - line breaks and bullet glyphs separate items, blank lines separate
//!   paragraphs
//! - enumeration markers (`-`, `1.`, `(a)`, `iv)` ...) are stripped; the
//!   fragment text is the remaining span of the raw text, verbatim
//! - `Role:` / `Session:` directives and heading lines set the scope of the
//!   fragments that follow and are not fragments themselves
//! - noise (page markers, items below the configured size) is dropped
//!
//! Extraction is a pure function of the text and the configuration.

use crate::config::EngineConfig;
use brd_model::{DataObject, Fragment, FragmentId, Label, Scope};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Glyphs that separate list items flattened onto one line
pub const BULLET_GLYPHS: &[char] = &['•', '●', '▪', '◦', '‣'];

const MAX_DIRECTIVE_WORDS: usize = 8;
const MAX_COLON_HEADING_WORDS: usize = 8;
const MAX_TITLE_HEADING_WORDS: usize = 5;

static ENUMERATION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[-*+•●▪◦‣]|\((?:\d{1,3}|(?i:xii|xi|ix|viii|vii|vi|iv|iii|ii)|[A-Za-z])\)|(?:\d{1,3}(?:\.\d{1,3})*|(?i:xii|xi|ix|viii|vii|vi|iv|iii|ii)|[A-Za-z])[.)])\s+",
    )
    .expect("enumeration marker pattern is valid")
});

static PAGE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:page\s*\d+(?:\s*(?:of|/)\s*\d+)?|\d+\s*/\s*\d+|[-–—]\s*\d+\s*[-–—]|\d+)$")
        .expect("page marker pattern is valid")
});

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(role|actor|session|flow|module)\s*:\s*(\S.*)$")
        .expect("directive pattern is valid")
});

static MARKDOWN_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#{1,6}\s+(.+?)[\s#]*$").expect("markdown heading pattern is valid")
});

static WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:[-_][\p{L}\p{N}]+)*(?:['’][sS]\b)?")
        .expect("word pattern is valid")
});

#[derive(Debug, PartialEq, Eq)]
enum Directive {
    Role(Label),
    Session(Label),
}

/// Splits raw text into fragments
#[derive(Debug, Clone)]
pub struct FragmentExtractor<'a> {
    config: &'a EngineConfig,
    stopwords: BTreeSet<String>,
    terms: BTreeSet<String>,
}

impl<'a> FragmentExtractor<'a> {
    /// Create an extractor over a configuration
    #[must_use]
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            stopwords: config
                .data_object_stopwords
                .iter()
                .map(|w| w.to_lowercase())
                .collect(),
            terms: config
                .data_object_terms
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Extract fragments in document order
    ///
    /// Empty or all-noise input yields an empty sequence.
    #[must_use]
    pub fn extract(&self, raw_text: &str) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        let mut scope = Scope::implicit();
        let mut paragraph = 0usize;
        let mut paragraph_open = false;
        let mut line_start = 0usize;

        for segment in raw_text.split_inclusive('\n') {
            let line = segment.trim_end_matches(|c| c == '\n' || c == '\r');
            let offset = line_start;
            line_start += segment.len();

            let trimmed = line.trim();
            if trimmed.is_empty() {
                if paragraph_open {
                    paragraph += 1;
                    paragraph_open = false;
                }
                continue;
            }

            if let Some(directive) = parse_directive(trimmed) {
                match directive {
                    Directive::Role(role) => scope.role = role,
                    Directive::Session(session) => scope.session = session,
                }
                if paragraph_open {
                    paragraph += 1;
                    paragraph_open = false;
                }
                continue;
            }

            let items = split_items(line);
            if let [(_, only)] = items
                .iter()
                .filter(|(_, item)| !item.trim().is_empty())
                .collect::<Vec<_>>()
                .as_slice()
            {
                let (marker_len, body) = strip_marker(only);
                if let Some(session) = parse_heading(body, marker_len > 0) {
                    tracing::debug!(session = %session, "heading sets session");
                    scope = Scope::new(Label::Implicit, session);
                    if paragraph_open {
                        paragraph += 1;
                        paragraph_open = false;
                    }
                    continue;
                }
            }

            for (item_offset, item) in items {
                let (marker_len, body) = strip_marker(item);
                if self.is_noise(body) {
                    continue;
                }
                let start_offset = offset + item_offset + marker_len;
                fragments.push(Fragment {
                    id: FragmentId(fragments.len()),
                    text: body.to_string(),
                    start_offset,
                    end_offset: start_offset + body.len(),
                    paragraph,
                    scope: scope.clone(),
                    data_object_refs: self.data_objects(body),
                });
                paragraph_open = true;
            }
        }

        tracing::debug!(fragments = fragments.len(), paragraphs = paragraph + 1, "extraction finished");
        fragments
    }

    /// Extract, then replace heuristic scopes with supplied metadata
    ///
    /// Overrides are keyed by fragment id; ids without an override keep the
    /// heuristic scope.
    #[must_use]
    pub fn extract_with_scopes(
        &self,
        raw_text: &str,
        overrides: &BTreeMap<FragmentId, Scope>,
    ) -> Vec<Fragment> {
        let mut fragments = self.extract(raw_text);
        for fragment in &mut fragments {
            if let Some(scope) = overrides.get(&fragment.id) {
                fragment.scope = scope.clone();
            }
        }
        fragments
    }

    /// Data-object tokens referenced by a text
    #[must_use]
    pub fn data_objects(&self, text: &str) -> BTreeSet<DataObject> {
        let mut objects = BTreeSet::new();
        let mut previous_end: Option<usize> = None;

        for m in WORD.find_iter(text) {
            let sentence_start = previous_end
                .map_or(true, |end| text[end..m.start()].contains(['.', '!', '?', ':']));
            previous_end = Some(m.end());

            let word = strip_possessive(m.as_str());
            let lower = word.to_lowercase();
            if self.stopwords.contains(&lower) {
                continue;
            }

            let is_term = self.terms.contains(&lower);
            let is_acronym = is_acronym(word);
            let is_capitalised =
                !sentence_start && word.chars().next().is_some_and(char::is_uppercase);

            if is_term || is_acronym || is_capitalised {
                objects.insert(DataObject::new(word));
            }
        }

        objects
    }

    fn is_noise(&self, item: &str) -> bool {
        let non_whitespace = item.chars().filter(|c| !c.is_whitespace()).count();
        if non_whitespace < self.config.min_fragment_chars {
            return true;
        }
        let words = item
            .split_whitespace()
            .filter(|w| w.chars().any(char::is_alphabetic))
            .count();
        words < self.config.min_fragment_words || PAGE_MARKER.is_match(item)
    }
}

/// Extract fragments with a given configuration
#[must_use]
pub fn extract(raw_text: &str, config: &EngineConfig) -> Vec<Fragment> {
    FragmentExtractor::new(config).extract(raw_text)
}

/// Split a line on bullet glyphs, keeping byte offsets relative to the line
fn split_items(line: &str) -> Vec<(usize, &str)> {
    let mut items = Vec::new();
    let mut start = 0;
    for (idx, ch) in line.char_indices() {
        if BULLET_GLYPHS.contains(&ch) {
            items.push((start, &line[start..idx]));
            start = idx + ch.len_utf8();
        }
    }
    items.push((start, &line[start..]));
    items
}

/// Strip surrounding whitespace and a leading enumeration marker
///
/// Returns the byte length removed from the front and the kept span.
fn strip_marker(item: &str) -> (usize, &str) {
    let leading = item.len() - item.trim_start().len();
    let rest = &item[leading..];
    let marker = ENUMERATION_MARKER.find(rest).map_or(0, |m| m.end());
    let body = rest[marker..].trim_end();
    (leading + marker, body)
}

fn parse_directive(line: &str) -> Option<Directive> {
    let caps = DIRECTIVE.captures(line)?;
    let value = caps[2].trim().trim_end_matches(['.', ';', ',']);
    if value.split_whitespace().count() > MAX_DIRECTIVE_WORDS {
        return None;
    }
    let label = Label::named(value);
    if label.is_implicit() {
        return None;
    }
    if caps[1].eq_ignore_ascii_case("role") || caps[1].eq_ignore_ascii_case("actor") {
        Some(Directive::Role(label))
    } else {
        Some(Directive::Session(label))
    }
}

/// Recognise a heading line, returning the session label it introduces
///
/// The title-case form only applies to lines without an enumeration marker;
/// short title-case list entries are content.
fn parse_heading(body: &str, had_marker: bool) -> Option<Label> {
    if PAGE_MARKER.is_match(body) {
        return None;
    }
    if let Some(caps) = MARKDOWN_HEADING.captures(body) {
        let label = Label::named(caps[1].trim_end_matches(':'));
        return (!label.is_implicit()).then_some(label);
    }

    let words: Vec<&str> = body.split_whitespace().collect();

    if let Some(head) = body.strip_suffix(':') {
        if !words.is_empty() && words.len() <= MAX_COLON_HEADING_WORDS && !head.contains(':') {
            let label = Label::named(head);
            return (!label.is_implicit()).then_some(label);
        }
        return None;
    }

    let title_case = !had_marker
        && !words.is_empty()
        && words.len() <= MAX_TITLE_HEADING_WORDS
        && !body.ends_with(['.', '!', '?', ';', ','])
        && body.chars().any(char::is_alphabetic)
        && words.iter().all(|w| {
            w.chars()
                .next()
                .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit() || !c.is_alphanumeric())
        });

    title_case.then(|| Label::named(body))
}

fn strip_possessive(word: &str) -> &str {
    for suffix in ["'s", "'S", "’s", "’S"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            return stem;
        }
    }
    word
}

fn is_acronym(word: &str) -> bool {
    let mut letters = word.chars().filter(|c| c.is_alphabetic()).peekable();
    word.chars().count() >= 2 && letters.peek().is_some() && letters.all(char::is_uppercase)
}
