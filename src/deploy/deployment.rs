// ABOUTME: Lifecycle runner owning the transport for one deployment run.
// ABOUTME: Sequences fetch-revisions, upload, activate, and teardown phases.

use nonempty::NonEmpty;

use super::activate::{Activation, ActivationStrategy, activate_revision};
use super::context::{RunContext, deployer_identity};
use super::error::DeployError;
use super::layout::RemoteLayout;
use super::upload::upload_application_files;
use crate::config::Config;
use crate::manifest::{Manifest, ManifestStore, RevisionRecord};
use crate::transport::{Transport, TransportError};

/// Runs the deployment lifecycle against one remote host.
///
/// Owns the single transport session for the duration of one run. Phases
/// are sequenced strictly by the caller: connect, fetch-revisions and/or
/// upload, activate, teardown. Nothing is retried automatically; a failed
/// phase fails the run and the caller tears the session down.
pub struct Deployer<T: Transport> {
    transport: T,
    layout: RemoteLayout,
    application_files: NonEmpty<String>,
    strategy: ActivationStrategy,
    max_concurrent_uploads: usize,
}

impl<T: Transport> Deployer<T> {
    /// Bind an established transport session to the resolved configuration.
    pub fn new(config: &Config, transport: T) -> Self {
        Self {
            transport,
            layout: RemoteLayout::new(config.root.clone()),
            application_files: config.application_files.clone(),
            strategy: config.activation_strategy,
            max_concurrent_uploads: config.max_concurrent_uploads,
        }
    }

    pub fn layout(&self) -> &RemoteLayout {
        &self.layout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn store(&self) -> ManifestStore<'_, T> {
        ManifestStore::new(&self.transport, self.layout.manifest_path())
    }

    /// Fetch the manifest as currently persisted on the remote host.
    pub async fn manifest(&self) -> Result<Manifest, DeployError> {
        Ok(self.store().fetch().await?)
    }

    /// Populate the context with the manifest records on the remote host.
    pub async fn fetch_revisions(&self, ctx: &mut RunContext) -> Result<(), DeployError> {
        let manifest = self.manifest().await?;
        ctx.revisions = manifest.records().to_vec();
        Ok(())
    }

    /// Record the revision in the manifest and place its files.
    ///
    /// The manifest append and the file transfers are independent and run
    /// concurrently; the phase completes only when both have. A manifest
    /// entry can therefore exist before its files have finished uploading,
    /// and stays in place if they never do.
    pub async fn upload(&self, ctx: &RunContext) -> Result<(), DeployError> {
        // A fresh host has no root directory yet; the manifest write needs
        // its parent to exist.
        let output = self
            .transport
            .exec(&format!("mkdir -p '{}'", self.layout.root()))
            .await?;
        if !output.success() {
            return Err(DeployError::Transport(TransportError::Command(format!(
                "mkdir -p '{}' exited with {}: {}",
                self.layout.root(),
                output.exit_code,
                output.stderr.trim()
            ))));
        }

        let record = RevisionRecord::new(&ctx.revision_key, deployer_identity());
        let store = self.store();

        let (appended, uploaded) = tokio::join!(
            store.append(record),
            upload_application_files(
                &self.transport,
                &ctx.dist_dir,
                &self.application_files,
                &self.layout,
                &ctx.revision_key,
                self.max_concurrent_uploads,
            )
        );
        appended?;
        uploaded?;

        Ok(())
    }

    /// Switch the active pointer to the context's revision.
    pub async fn activate(&self, ctx: &mut RunContext) -> Result<Activation, DeployError> {
        let store = self.store();
        let activation = activate_revision(
            &self.transport,
            &store,
            &self.layout,
            &ctx.revision_key,
            self.strategy,
        )
        .await?;
        ctx.activated_revision = Some(activation.revision.clone());
        Ok(activation)
    }

    /// Close the transport session.
    ///
    /// Attempted exactly once per run by the caller, after success or
    /// failure alike; closing an already-closed session is a no-op.
    pub async fn teardown(&mut self) -> Result<(), DeployError> {
        self.transport.close().await.map_err(DeployError::Transport)
    }
}
