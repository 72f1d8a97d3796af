// ABOUTME: Error types for deployment lifecycle phases.
// ABOUTME: Covers transport, manifest, upload, and activation failures.

use crate::manifest::StoreError;
use crate::transport::TransportError;

/// Errors that can occur during a deployment lifecycle phase.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Remote command or file operation failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Manifest fetch, parse, or save failed.
    #[error(transparent)]
    Manifest(#[from] StoreError),

    /// One application file failed to transfer.
    #[error("upload of {path} failed: {source}")]
    Upload {
        path: String,
        #[source]
        source: TransportError,
    },

    /// The remote switch command reported a non-zero exit status.
    #[error("activation command `{command}` exited with {exit_code}: {stderr}")]
    ActivationFailed {
        command: String,
        exit_code: u32,
        stderr: String,
    },
}
