//! Fragments and their classification scope
//!
//! A [`Fragment`] is created once per document run and never mutated. Its
//! [`Scope`] (role + session) is assigned by upstream classification; when no
//! classification is available the scope falls back to [`Label::Implicit`],
//! which is a documented fallback and never a classification result.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Label emitted for an implicit (unclassified) role or session
pub const IMPLICIT_LABEL: &str = "Unclassified";

/// Document-order fragment identifier
///
/// Ids are assigned monotonically during extraction and are relied upon for
/// deterministic tie-breaking in every later stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(pub usize);

impl FragmentId {
    /// Index of this fragment in the extracted sequence
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// The id directly after this one in document order
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for FragmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// A role or session classification
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Label {
    /// No classification was available; single implicit fallback
    #[default]
    Implicit,
    /// Named classification (e.g. "Registration", "Redeem Reward")
    Named(String),
}

impl Label {
    /// Create a named label, collapsing internal whitespace
    ///
    /// Blank names yield [`Label::Implicit`].
    #[must_use]
    pub fn named(name: impl AsRef<str>) -> Self {
        let collapsed = name.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            Self::Implicit
        } else {
            Self::Named(collapsed)
        }
    }

    /// Check if this is the implicit fallback
    #[inline]
    #[must_use]
    pub fn is_implicit(&self) -> bool {
        matches!(self, Self::Implicit)
    }

    /// Name of a classified label
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Implicit => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name().unwrap_or(IMPLICIT_LABEL))
    }
}

/// Role + session pair that bounds clustering
///
/// Two fragments may only end up in the same cluster when their scopes are
/// equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Actor role (e.g. "Customer", "Admin")
    pub role: Label,
    /// Session or flow (e.g. "Registration")
    pub session: Label,
}

impl Scope {
    /// Create a scope from role and session labels
    #[inline]
    #[must_use]
    pub fn new(role: Label, session: Label) -> Self {
        Self { role, session }
    }

    /// The single implicit scope used when no classification exists
    #[inline]
    #[must_use]
    pub fn implicit() -> Self {
        Self::default()
    }

    /// Scope with a named session and implicit role
    #[inline]
    #[must_use]
    pub fn session(name: impl AsRef<str>) -> Self {
        Self::new(Label::Implicit, Label::named(name))
    }

    /// Check if both role and session fell back to implicit
    #[inline]
    #[must_use]
    pub fn is_implicit(&self) -> bool {
        self.role.is_implicit() && self.session.is_implicit()
    }

    /// Label reported in the `session` field of the output schema
    ///
    /// Prefers the session name, then the role name, then [`IMPLICIT_LABEL`].
    #[must_use]
    pub fn display_label(&self) -> String {
        self.session
            .name()
            .or_else(|| self.role.name())
            .unwrap_or(IMPLICIT_LABEL)
            .to_string()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.role, self.session)
    }
}

/// A referenced data-object token (e.g. "OTP", "Receipt")
///
/// Keeps the first-seen surface form for display; equality, ordering and
/// hashing use the case-folded key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DataObject {
    surface: String,
    key: String,
}

impl DataObject {
    /// Create from a surface token
    #[must_use]
    pub fn new(surface: impl Into<String>) -> Self {
        let surface = surface.into();
        let key = surface.to_lowercase();
        Self { surface, key }
    }

    /// Token as written in the source
    #[inline]
    #[must_use]
    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// Case-folded comparison key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for DataObject {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DataObject {}

impl PartialOrd for DataObject {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataObject {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Hash for DataObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl From<String> for DataObject {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<DataObject> for String {
    fn from(value: DataObject) -> Self {
        value.surface
    }
}

impl std::fmt::Display for DataObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.surface)
    }
}

/// Atomic unit of source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Document-order id
    pub id: FragmentId,
    /// Verbatim source text
    pub text: String,
    /// Byte offset of the first character in the raw text
    pub start_offset: usize,
    /// Byte offset one past the last character in the raw text
    pub end_offset: usize,
    /// Paragraph index (blank lines separate paragraphs)
    pub paragraph: usize,
    /// Role/session classification
    pub scope: Scope,
    /// Referenced data-object tokens
    pub data_object_refs: BTreeSet<DataObject>,
}

impl Fragment {
    /// Check if both fragments share role and session
    #[inline]
    #[must_use]
    pub fn same_scope(&self, other: &Fragment) -> bool {
        self.scope == other.scope
    }

    /// Data objects referenced by both fragments, in key order
    #[must_use]
    pub fn shared_data_objects<'a>(&'a self, other: &'a Fragment) -> Vec<&'a DataObject> {
        self.data_object_refs
            .intersection(&other.data_object_refs)
            .collect()
    }

    /// Check if the fragments reference at least one common data object
    #[inline]
    #[must_use]
    pub fn shares_data_object(&self, other: &Fragment) -> bool {
        self.data_object_refs
            .iter()
            .any(|obj| other.data_object_refs.contains(obj))
    }
}
