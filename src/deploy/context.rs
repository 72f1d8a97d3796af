// ABOUTME: Per-run deployment context passed through the lifecycle phases.
// ABOUTME: Carries caller-supplied inputs and phase outputs for one run.

use crate::manifest::RevisionRecord;
use crate::types::RevisionKey;
use std::path::PathBuf;

/// State threaded through one deployment run.
///
/// The host pipeline supplies `revision_key` and `dist_dir`; the
/// fetch-revisions phase fills `revisions`, and activation records the key
/// it switched to.
#[derive(Debug)]
pub struct RunContext {
    /// Local build output directory the application files come from.
    pub dist_dir: PathBuf,
    /// Revision being deployed or activated in this run.
    pub revision_key: RevisionKey,
    /// Manifest records as of the fetch-revisions phase, newest first.
    pub revisions: Vec<RevisionRecord>,
    /// Set once activation has switched the active pointer.
    pub activated_revision: Option<RevisionKey>,
}

impl RunContext {
    pub fn new(revision_key: RevisionKey) -> Self {
        Self {
            dist_dir: PathBuf::new(),
            revision_key,
            revisions: Vec::new(),
            activated_revision: None,
        }
    }

    pub fn with_dist_dir(mut self, dist_dir: impl Into<PathBuf>) -> Self {
        self.dist_dir = dist_dir.into();
        self
    }
}

/// `user@hostname` of whoever is running this deploy.
pub fn deployer_identity() -> String {
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    format!("{user}@{host}")
}
