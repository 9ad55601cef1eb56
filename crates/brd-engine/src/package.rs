//! Traceability packaging
//!
//! The only stage that assigns `REQ-###` identifiers and the only producer of
//! the external record schema. Numbering restarts at `REQ-001` for every run.

use crate::error::{ConsolidationError, Stage};
use crate::synthesize::DraftRequirement;
use brd_model::{FragmentId, Requirement, RequirementId, RequirementRecord};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Separator between several source texts in one delimited cell
pub const SOURCE_TEXT_SEPARATOR: &str = " | ";

/// Delimited header row
pub const EXPORT_COLUMNS: [&str; 4] = ["requirement_id", "session", "source_texts", "requirement_text"];

/// One entry of the export view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    /// Role/session label
    pub session: String,
    /// Source fragments, ascending
    pub source_fragment_ids: Vec<FragmentId>,
    /// Consolidated text
    pub requirement_text: String,
}

/// Ordered `requirement_id -> entry` map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportView {
    entries: IndexMap<RequirementId, ExportEntry>,
}

impl ExportView {
    /// Look up an entry
    #[must_use]
    pub fn get(&self, id: RequirementId) -> Option<&ExportEntry> {
        self.entries.get(&id)
    }

    /// Entries in requirement order
    pub fn iter(&self) -> impl Iterator<Item = (&RequirementId, &ExportEntry)> {
        self.entries.iter()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flat row of the delimited export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    /// `REQ-###`
    pub requirement_id: String,
    /// Role/session label
    pub session: String,
    /// Source texts joined with [`SOURCE_TEXT_SEPARATOR`]
    pub source_texts: String,
    /// Consolidated text
    pub requirement_text: String,
}

impl ExportRow {
    /// Project a requirement
    #[must_use]
    pub fn from_requirement(requirement: &Requirement) -> Self {
        Self {
            requirement_id: requirement.requirement_id.to_string(),
            session: requirement.scope.display_label(),
            source_texts: requirement.source_texts.join(SOURCE_TEXT_SEPARATOR),
            requirement_text: requirement.requirement_text.clone(),
        }
    }

    fn cells(&self) -> [&str; 4] {
        [
            &self.requirement_id,
            &self.session,
            &self.source_texts,
            &self.requirement_text,
        ]
    }
}

/// Packaged output of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagedRequirements {
    /// Numbered requirements, cluster order
    pub requirements: Vec<Requirement>,
    /// Parallel export view
    pub export: ExportView,
}

impl PackagedRequirements {
    /// Wire-schema records
    #[must_use]
    pub fn records(&self) -> Vec<RequirementRecord> {
        self.requirements.iter().map(Requirement::to_record).collect()
    }

    /// Flat rows
    #[must_use]
    pub fn rows(&self) -> Vec<ExportRow> {
        export_rows(&self.requirements)
    }

    /// Delimited export with a header row
    #[must_use]
    pub fn to_delimited(&self, delimiter: char) -> String {
        export_delimited(&self.requirements, delimiter)
    }
}

/// One export row per requirement, in numbering order
#[must_use]
pub fn export_rows(requirements: &[Requirement]) -> Vec<ExportRow> {
    requirements.iter().map(ExportRow::from_requirement).collect()
}

/// Delimited export of numbered requirements
#[must_use]
pub fn export_delimited(requirements: &[Requirement], delimiter: char) -> String {
    to_delimited(&export_rows(requirements), delimiter)
}

/// Number drafts and build the export view
///
/// Drafts are numbered in the order of their smallest source fragment, which
/// is cluster-processing order.
///
/// # Errors
/// [`ConsolidationError::PipelineAbort`] when a draft has no sources, its ids
/// and texts are not parallel, or its ids are not strictly ascending.
pub fn package(mut drafts: Vec<DraftRequirement>) -> Result<PackagedRequirements, ConsolidationError> {
    for draft in &drafts {
        check_draft(draft)?;
    }
    drafts.sort_by_key(|d| d.source_fragment_ids.first().copied());

    let mut packaged = PackagedRequirements::default();
    for (position, draft) in drafts.into_iter().enumerate() {
        let requirement_id = RequirementId::from_position(position);
        packaged.export.entries.insert(
            requirement_id,
            ExportEntry {
                session: draft.scope.display_label(),
                source_fragment_ids: draft.source_fragment_ids.clone(),
                requirement_text: draft.requirement_text.clone(),
            },
        );
        packaged.requirements.push(Requirement {
            requirement_id,
            scope: draft.scope,
            source_fragment_ids: draft.source_fragment_ids,
            source_texts: draft.source_texts,
            requirement_text: draft.requirement_text,
        });
    }

    tracing::debug!(requirements = packaged.requirements.len(), "requirements packaged");
    Ok(packaged)
}

fn check_draft(draft: &DraftRequirement) -> Result<(), ConsolidationError> {
    let ids = &draft.source_fragment_ids;
    let reason = if ids.is_empty() {
        Some("has no source fragments".to_string())
    } else if ids.len() != draft.source_texts.len() {
        Some(format!(
            "has {} source ids but {} source texts",
            ids.len(),
            draft.source_texts.len()
        ))
    } else if ids.windows(2).any(|w| w[0] >= w[1]) {
        Some("has source ids out of document order".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConsolidationError::abort(
            Stage::Packaging,
            format!("draft for cluster {} {reason}", draft.cluster),
        )),
        None => Ok(()),
    }
}

/// Render rows as delimited text with a header row
///
/// Fields containing the delimiter, a quote or a line break are quoted;
/// quotes inside are doubled. Lines end with `\r\n`.
#[must_use]
pub fn to_delimited(rows: &[ExportRow], delimiter: char) -> String {
    let mut out = String::new();
    write_line(&mut out, &EXPORT_COLUMNS, delimiter);
    for row in rows {
        write_line(&mut out, &row.cells(), delimiter);
    }
    out
}

fn write_line(out: &mut String, cells: &[&str], delimiter: char) {
    for (position, cell) in cells.iter().enumerate() {
        if position > 0 {
            out.push(delimiter);
        }
        if cell.contains(delimiter) || cell.contains(['"', '\n', '\r']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesize::Phrasing;
    use brd_model::{ClusterId, Scope};
    use pretty_assertions::assert_eq;

    fn draft(cluster: usize, ids: &[usize], texts: &[&str], session: &str) -> DraftRequirement {
        DraftRequirement {
            cluster: ClusterId(cluster),
            scope: Scope::session(session),
            source_fragment_ids: ids.iter().copied().map(FragmentId).collect(),
            source_texts: texts.iter().map(|t| (*t).to_string()).collect(),
            requirement_text: texts.join(" "),
            phrasing: Phrasing::Concatenation,
        }
    }

    #[test]
    fn numbers_follow_minimum_source_order() {
        let packaged = package(vec![
            draft(1, &[4], &["Admin approves the Receipt."], "Review"),
            draft(0, &[0, 2], &["User enters OTP.", "If OTP invalid, show error."], "Login"),
        ])
        .unwrap();

        let ids: Vec<String> = packaged
            .requirements
            .iter()
            .map(|r| r.requirement_id.to_string())
            .collect();
        assert_eq!(ids, vec!["REQ-001", "REQ-002"]);
        assert_eq!(packaged.requirements[0].scope, Scope::session("Login"));

        let view: Vec<(String, &str)> = packaged
            .export
            .iter()
            .map(|(id, entry)| (id.to_string(), entry.session.as_str()))
            .collect();
        assert_eq!(
            view,
            vec![("REQ-001".to_string(), "Login"), ("REQ-002".to_string(), "Review")]
        );
    }

    #[test]
    fn export_view_serializes_as_ordered_map() {
        let packaged = package(vec![draft(0, &[0, 1], &["User enters OTP.", "System validates OTP."], "Login")])
            .unwrap();
        let json = serde_json::to_value(&packaged.export).unwrap();
        assert_eq!(json["REQ-001"]["session"], "Login");
        assert_eq!(json["REQ-001"]["source_fragment_ids"], serde_json::json!([0, 1]));
    }

    #[test]
    fn empty_input_packages_nothing() {
        let packaged = package(Vec::new()).unwrap();
        assert!(packaged.requirements.is_empty());
        assert!(packaged.export.is_empty());
    }

    #[test]
    fn inconsistent_drafts_abort() {
        let mut unordered = draft(0, &[3, 1], &["a", "b"], "Login");
        assert!(package(vec![unordered.clone()]).is_err());

        unordered.source_fragment_ids = vec![FragmentId(1)];
        assert!(matches!(
            package(vec![unordered]),
            Err(ConsolidationError::PipelineAbort { stage: Stage::Packaging, .. })
        ));
    }

    #[test]
    fn delimited_output_quotes_when_needed() {
        let packaged = package(vec![draft(
            0,
            &[0, 1],
            &["If OTP invalid, show error.", "Show \"Retry\" button."],
            "Login",
        )])
        .unwrap();

        let csv = to_delimited(&packaged.rows(), ',');
        let mut lines = csv.split("\r\n");
        assert_eq!(
            lines.next(),
            Some("requirement_id,session,source_texts,requirement_text")
        );
        assert_eq!(
            lines.next(),
            Some(
                "REQ-001,Login,\"If OTP invalid, show error. | Show \"\"Retry\"\" button.\",\"If OTP invalid, show error. Show \"\"Retry\"\" button.\""
            )
        );

        let tsv = to_delimited(&packaged.rows(), '\t');
        assert!(tsv.contains("REQ-001\tLogin\t\"If OTP invalid, show error. | Show \"\"Retry\"\" button.\""));
    }

    #[test]
    fn implicit_scope_reports_unclassified() {
        let mut implicit = draft(0, &[0], &["User enters OTP."], "x");
        implicit.scope = Scope::implicit();
        let packaged = package(vec![implicit]).unwrap();
        assert_eq!(packaged.records()[0].session, brd_model::IMPLICIT_LABEL);
        assert_eq!(packaged.rows()[0].session, "Unclassified");
    }
}
