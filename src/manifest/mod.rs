// ABOUTME: Revision manifest data model.
// ABOUTME: An ordered, newest-first record of every revision deployed to a remote root.

mod store;

pub use store::{ManifestStore, StoreError};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::RevisionKey;

/// One deployed revision as persisted in `revisions.json`.
///
/// `revision` stays a plain string on the wire so manifests written by older
/// tooling always parse; validated keys apply only to caller input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRecord {
    /// Opaque revision identifier, unique within a manifest.
    pub revision: String,

    /// `user@host` of whoever ran the deploy. Informational.
    #[serde(default)]
    pub deployer: String,

    /// Milliseconds since epoch, set at creation.
    #[serde(default)]
    pub timestamp: i64,

    /// Present and `true` on at most one record; omitted on all others.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl RevisionRecord {
    /// Create a record for a new deploy, stamped with the current time.
    pub fn new(revision: &RevisionKey, deployer: impl Into<String>) -> Self {
        Self {
            revision: revision.to_string(),
            deployer: deployer.into(),
            timestamp: Utc::now().timestamp_millis(),
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active == Some(true)
    }
}

/// The ordered sequence of deployed revisions, newest-first by insertion.
///
/// Insertion order is the record of deploy order; records are never sorted
/// by timestamp. Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    records: Vec<RevisionRecord>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn records(&self) -> &[RevisionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a record with this revision identifier exists.
    pub fn contains(&self, revision: &str) -> bool {
        self.records.iter().any(|r| r.revision == revision)
    }

    /// Insert a record at the front (newest-first).
    pub fn prepend(&mut self, record: RevisionRecord) {
        self.records.insert(0, record);
    }

    /// Flag the matching record active and clear the flag on every other
    /// record. A missing revision leaves no record flagged.
    pub fn mark_active(&mut self, revision: &str) {
        for record in &mut self.records {
            if record.revision == revision {
                record.active = Some(true);
            } else {
                record.active = None;
            }
        }
    }

    /// The currently active record, if any.
    pub fn active(&self) -> Option<&RevisionRecord> {
        self.records.iter().find(|r| r.is_active())
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a RevisionRecord;
    type IntoIter = std::slice::Iter<'a, RevisionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<RevisionRecord> for Manifest {
    fn from_iter<I: IntoIterator<Item = RevisionRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
