// ABOUTME: Test support utilities.
// ABOUTME: Provides an in-memory mock transport for integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use revlink::transport::{CommandOutput, Result, Transport, TransportError};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// In-memory stand-in for an SSH session.
///
/// Remote files live in a map, executed commands are recorded in order, and
/// individual remote paths can be made to fail their transfer.
#[derive(Default)]
pub struct MockTransport {
    files: Mutex<HashMap<String, Vec<u8>>>,
    commands: Mutex<Vec<String>>,
    fail_reads: Mutex<HashSet<String>>,
    fail_writes: Mutex<HashSet<String>>,
    exit_code: Mutex<u32>,
    close_calls: Mutex<usize>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a remote file.
    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.files.lock().insert(path.to_string(), data.to_vec());
        self
    }

    /// Make reads of this remote path fail with a non-NotFound error.
    pub fn fail_read(self, path: &str) -> Self {
        self.fail_reads.lock().insert(path.to_string());
        self
    }

    /// Make writes to this remote path fail.
    pub fn fail_write(self, path: &str) -> Self {
        self.fail_writes.lock().insert(path.to_string());
        self
    }

    /// Make every executed command report this exit code.
    pub fn with_exit_code(self, code: u32) -> Self {
        *self.exit_code.lock() = code;
        self
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.files.lock().contains_key(path)
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn close_calls(&self) -> usize {
        *self.close_calls.lock()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.commands.lock().push(command.to_string());
        Ok(CommandOutput {
            exit_code: *self.exit_code.lock(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        if self.fail_reads.lock().contains(path) {
            return Err(TransportError::Transfer {
                path: path.to_string(),
                reason: "injected read failure".to_string(),
            });
        }
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(path.to_string()))
    }

    async fn upload(&self, path: &str, data: &[u8]) -> Result<()> {
        if self.fail_writes.lock().contains(path) {
            return Err(TransportError::Transfer {
                path: path.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        self.files.lock().insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn put_file(&self, local: &Path, remote: &str) -> Result<()> {
        if self.fail_writes.lock().contains(remote) {
            return Err(TransportError::Transfer {
                path: remote.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        let data = tokio::fs::read(local).await?;
        self.files.lock().insert(remote.to_string(), data);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        *self.close_calls.lock() += 1;
        Ok(())
    }
}
