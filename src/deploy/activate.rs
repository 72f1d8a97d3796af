// ABOUTME: Switching the active pointer to a revision.
// ABOUTME: Builds the remote switch command per strategy and flags the manifest.

use serde::Deserialize;

use super::error::DeployError;
use super::layout::RemoteLayout;
use crate::manifest::ManifestStore;
use crate::transport::Transport;
use crate::types::RevisionKey;

/// Method used to make a revision live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationStrategy {
    /// Replace the active pointer with a symlink to the revision directory.
    #[default]
    Symlink,

    /// Replace the active pointer with a full copy of the revision directory.
    /// Useful when the serving layer cannot follow symlinks.
    Copy,
}

impl ActivationStrategy {
    /// Build the remote command that switches the active pointer.
    pub fn switch_command(&self, layout: &RemoteLayout, revision: &RevisionKey) -> String {
        let source = layout.revision_dir(revision);
        let dest = layout.active_path();
        match self {
            // Forced, no-dereference replacement so an existing directory
            // symlink is swapped rather than written through.
            ActivationStrategy::Symlink => format!("ln -sfn '{source}/' '{dest}'"),
            ActivationStrategy::Copy => format!("rm -rf '{dest}' && cp -a '{source}' '{dest}'"),
        }
    }
}

/// Result of a successful activation, for the caller's run context.
#[derive(Debug, Clone)]
pub struct Activation {
    pub revision: RevisionKey,
}

/// Switch the active pointer to `revision` and flag it in the manifest.
///
/// The manifest is only touched once the switch command's stream has
/// completed with a zero exit status; a failing command leaves the manifest
/// unchanged.
pub async fn activate_revision<T: Transport>(
    transport: &T,
    store: &ManifestStore<'_, T>,
    layout: &RemoteLayout,
    revision: &RevisionKey,
    strategy: ActivationStrategy,
) -> Result<Activation, DeployError> {
    let command = strategy.switch_command(layout, revision);
    tracing::info!(revision = %revision, strategy = ?strategy, "activating revision");

    let output = transport.exec(&command).await?;
    if !output.success() {
        return Err(DeployError::ActivationFailed {
            command,
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }

    store.mark_active(revision).await?;

    Ok(Activation {
        revision: revision.clone(),
    })
}
