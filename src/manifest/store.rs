// ABOUTME: Remote-backed manifest persistence through a Transport.
// ABOUTME: The remote file is the durable state; every operation re-fetches it.

use thiserror::Error;

use super::{Manifest, RevisionRecord};
use crate::transport::{Transport, TransportError};
use crate::types::RevisionKey;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("manifest transfer failed: {0}")]
    Transport(#[from] TransportError),

    #[error("malformed manifest at {path}: {source}")]
    Malformed {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to serialize manifest: {0}")]
    Serialize(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Reads and writes the revision manifest at a fixed remote path.
///
/// The manifest is fetched fresh at the start of every read-modify-write
/// sequence; no copy is cached across calls. Writes are full-file replaces,
/// so two concurrent deploy runs against the same root can clobber each
/// other's manifest update.
pub struct ManifestStore<'a, T: Transport> {
    transport: &'a T,
    path: String,
}

impl<'a, T: Transport> ManifestStore<'a, T> {
    pub fn new(transport: &'a T, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fetch the manifest from the remote host.
    ///
    /// An absent manifest file is the first-deploy bootstrap and yields an
    /// empty manifest. The mapping keys off the error kind; any other
    /// transport failure propagates, as does malformed JSON.
    pub async fn fetch(&self) -> Result<Manifest> {
        match self.transport.read_file(&self.path).await {
            Ok(bytes) => Manifest::parse(&bytes).map_err(|e| StoreError::Malformed {
                path: self.path.clone(),
                source: e,
            }),
            Err(TransportError::NotFound(_)) => {
                tracing::debug!(path = %self.path, "no manifest on remote, starting empty");
                Ok(Manifest::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the remote manifest with the given one.
    pub async fn save(&self, manifest: &Manifest) -> Result<()> {
        let data = manifest.to_bytes().map_err(StoreError::Serialize)?;
        self.transport.upload(&self.path, &data).await?;
        tracing::debug!(path = %self.path, records = manifest.len(), "manifest saved");
        Ok(())
    }

    /// Prepend a record and save, unless the revision is already present.
    ///
    /// Re-running a deploy with the same revision key is a no-op here: the
    /// manifest is returned unchanged and not re-saved.
    pub async fn append(&self, record: RevisionRecord) -> Result<Manifest> {
        let mut manifest = self.fetch().await?;

        if manifest.contains(&record.revision) {
            tracing::debug!(revision = %record.revision, "revision already recorded");
            return Ok(manifest);
        }

        manifest.prepend(record);
        self.save(&manifest).await?;
        Ok(manifest)
    }

    /// Flag one revision active, clearing the flag on all others, and save.
    ///
    /// Does not validate that the revision exists; a missing key saves a
    /// manifest with nothing flagged. Callers are expected to have appended
    /// the record first.
    pub async fn mark_active(&self, revision: &RevisionKey) -> Result<Manifest> {
        let mut manifest = self.fetch().await?;
        manifest.mark_active(revision.as_str());
        self.save(&manifest).await?;
        Ok(manifest)
    }
}
