// ABOUTME: Transport capability trait over one remote host.
// ABOUTME: Shell exec plus file read/write/copy, implemented by ssh::Session.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from transport operations after the session is established.
///
/// `NotFound` is its own kind so callers can treat an absent remote file as
/// a value (the manifest bootstrap case) without inspecting message text.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("remote path not found: {0}")]
    NotFound(String),

    #[error("command execution failed: {0}")]
    Command(String),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("file transfer failed for {path}: {reason}")]
    Transfer { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Output from a remote command execution.
///
/// The wire protocol reports the command's exit status once its stream
/// completes; callers that only care about dispatch can ignore it.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability over one remote host: run commands and move files.
///
/// Owned by exactly one deployment run. Each file-oriented operation opens
/// its own sub-channel and releases it on every exit path.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a command on the remote host, waiting for its stream to end.
    async fn exec(&self, command: &str) -> Result<CommandOutput>;

    /// Read a remote file in full.
    ///
    /// Returns `TransportError::NotFound` when the path does not exist, so
    /// callers can distinguish that from real I/O failures.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Write bytes to a remote path, overwriting any existing file.
    async fn upload(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Copy a local file to a remote path, creating parent directories.
    async fn put_file(&self, local: &Path, remote: &str) -> Result<()>;

    /// Close the session.
    ///
    /// Safe to call if the session never fully established, and safe to
    /// call more than once; later calls are no-ops.
    async fn close(&mut self) -> Result<()>;
}
