//! Append-only, hash-chained audit log
//!
//! Each record commits to its predecessor with SHA-256, so a report written to
//! disk can be checked for tampering with [`AuditLog::verify_integrity`].

use crate::error::{AuditError, ClusterFailure};
use brd_model::{EdgeKind, FragmentId, Scope};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One auditable event of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum AuditEntry {
    /// Fragments extracted without any role or session classification
    ImplicitScopeFallback {
        /// Number of fragments placed in the implicit scope
        fragment_count: usize,
    },

    /// A relation spanning two scopes was kept out of clustering
    CrossBoundaryEdgeDiscarded {
        /// Earlier fragment
        from: FragmentId,
        /// Later fragment
        to: FragmentId,
        /// Relation kind
        kind: EdgeKind,
        /// Scope of `from`
        from_scope: Scope,
        /// Scope of `to`
        to_scope: Scope,
    },

    /// A cluster produced no requirement
    ClusterFailed(ClusterFailure),
}

impl AuditEntry {
    /// Short name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AuditEntry::ImplicitScopeFallback { .. } => "implicit_scope_fallback",
            AuditEntry::CrossBoundaryEdgeDiscarded { .. } => "cross_boundary_edge_discarded",
            AuditEntry::ClusterFailed(_) => "cluster_failed",
        }
    }
}

/// Chained record wrapping an [`AuditEntry`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Position in the log, from 0
    pub sequence: u64,
    /// Event payload
    pub entry: AuditEntry,
    /// Hash of the previous record (zeros for the first)
    #[serde(with = "hex::serde")]
    pub prev_hash: [u8; 32],
    /// Hash of this record
    #[serde(with = "hex::serde")]
    pub hash: [u8; 32],
}

/// Ordered audit log of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
}

impl AuditLog {
    /// Create an empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning its sequence number
    ///
    /// # Errors
    /// [`AuditError::Encoding`] if the entry cannot be encoded for hashing;
    /// the log is unchanged
    pub fn append(&mut self, entry: AuditEntry) -> Result<u64, AuditError> {
        let sequence = self.records.len() as u64;
        let prev_hash = self.records.last().map_or([0u8; 32], |r| r.hash);
        let hash = compute_hash(sequence, &entry, &prev_hash)?;
        tracing::debug!(sequence, entry = entry.name(), "audit record appended");
        self.records.push(AuditRecord {
            sequence,
            entry,
            prev_hash,
            hash,
        });
        Ok(sequence)
    }

    /// All records, in append order
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Entries only
    pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.records.iter().map(|r| &r.entry)
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recorded cluster failures
    pub fn failures(&self) -> impl Iterator<Item = &ClusterFailure> {
        self.entries().filter_map(|e| match e {
            AuditEntry::ClusterFailed(f) => Some(f),
            _ => None,
        })
    }

    /// Number of discarded cross-boundary edges
    #[must_use]
    pub fn discarded_edge_count(&self) -> usize {
        self.entries()
            .filter(|e| matches!(e, AuditEntry::CrossBoundaryEdgeDiscarded { .. }))
            .count()
    }

    /// Recompute the chain and compare every link
    ///
    /// # Errors
    /// Returns the first record whose back-link or hash does not match
    pub fn verify_integrity(&self) -> Result<(), AuditError> {
        let mut prev = [0u8; 32];
        for (position, record) in self.records.iter().enumerate() {
            let sequence = position as u64;
            if record.sequence != sequence
                || record.prev_hash != prev
                || record.hash != compute_hash(sequence, &record.entry, &prev)?
            {
                return Err(AuditError::IntegrityViolation { sequence });
            }
            prev = record.hash;
        }
        Ok(())
    }
}

fn compute_hash<T: Serialize>(
    sequence: u64,
    entry: &T,
    prev_hash: &[u8; 32],
) -> Result<[u8; 32], AuditError> {
    let encoded = serde_json::to_vec(entry).map_err(|e| AuditError::Encoding {
        sequence,
        detail: e.to_string(),
    })?;
    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(encoded);
    hasher.update([0]);
    hasher.update(prev_hash);
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> AuditLog {
        let mut log = AuditLog::new();
        log.append(AuditEntry::ImplicitScopeFallback { fragment_count: 2 }).unwrap();
        log.append(AuditEntry::CrossBoundaryEdgeDiscarded {
            from: FragmentId(0),
            to: FragmentId(3),
            kind: EdgeKind::SharedDataObject,
            from_scope: Scope::session("Upload"),
            to_scope: Scope::session("Redeem"),
        })
        .unwrap();
        log
    }

    #[test]
    fn chain_links_records() {
        let log = sample();
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].prev_hash, [0u8; 32]);
        assert_eq!(log.records()[1].prev_hash, log.records()[0].hash);
        assert!(log.verify_integrity().is_ok());
        assert_eq!(log.discarded_edge_count(), 1);
    }

    #[test]
    fn tampering_is_detected() {
        let mut log = sample();
        if let AuditEntry::ImplicitScopeFallback { fragment_count } = &mut log.records[0].entry {
            *fragment_count = 9;
        }
        assert_eq!(
            log.verify_integrity(),
            Err(AuditError::IntegrityViolation { sequence: 0 })
        );
    }

    #[test]
    fn survives_json_round_trip() {
        let log = sample();
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("\"entry\":\"cross_boundary_edge_discarded\""));
        let back: AuditLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
        assert!(back.verify_integrity().is_ok());
    }

    #[test]
    fn identical_runs_hash_identically() {
        assert_eq!(sample().records()[1].hash, sample().records()[1].hash);
    }

    #[test]
    fn append_returns_sequence_numbers() {
        let mut log = sample();
        let next = log.append(AuditEntry::ImplicitScopeFallback { fragment_count: 1 });
        assert_eq!(next, Ok(2));
        assert!(log.verify_integrity().is_ok());
    }

    #[test]
    fn unencodable_entries_are_errors() {
        // JSON object keys must be strings
        let entry = std::collections::BTreeMap::from([((1u8, 2u8), 3u8)]);
        assert!(matches!(
            compute_hash(7, &entry, &[0u8; 32]),
            Err(AuditError::Encoding { sequence: 7, .. })
        ));
    }
}
