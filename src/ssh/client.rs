// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection, authentication, command execution, and SFTP file transfer.

use super::error::{Error, Result};
use crate::transport::{CommandOutput, Transport, TransportError};
use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

/// One resolved credential set for authenticating the session.
///
/// Selection between these is a configuration concern; the session accepts
/// exactly one.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Password authentication.
    Password(String),
    /// Private key file, optionally passphrase-protected.
    PrivateKey {
        path: PathBuf,
        passphrase: Option<String>,
    },
    /// Running SSH agent. `socket` overrides `SSH_AUTH_SOCK`.
    Agent { socket: Option<PathBuf> },
}

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Resolved credential set.
    pub credentials: Credentials,
    /// Whether to accept unknown hosts (Trust On First Use).
    /// If false, connection to unknown hosts will fail.
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Timeout for command execution (default: 5 minutes).
    pub command_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            credentials,
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(300), // 5 minutes
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn new(
        host: String,
        port: u16,
        trust_on_first_use: bool,
        known_hosts_path: Option<PathBuf>,
    ) -> Self {
        Self {
            host,
            port,
            trust_on_first_use,
            known_hosts_path,
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) => {
                // Host not in known_hosts
                if self.trust_on_first_use {
                    tracing::warn!(
                        "Trust-On-First-Use: accepting unknown host key for {}:{}",
                        self.host,
                        self.port
                    );
                    let learn_result = match &self.known_hosts_path {
                        Some(path) => {
                            learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                        }
                        None => learn_known_hosts(&self.host, self.port, server_public_key),
                    };
                    if let Err(e) = learn_result {
                        tracing::warn!("Failed to save host key to known_hosts: {}", e);
                    }
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Err(russh::keys::Error::KeyChanged { .. }) => Ok(false),
            Err(_) => {
                // Other errors - treat as unknown host
                if self.trust_on_first_use {
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}

/// Authentication method resolved from the credential set.
enum AuthMethod {
    Password(String),
    Agent(AgentClient<UnixStream>),
    KeyFile(Arc<ssh_key::PrivateKey>),
}

/// An established SSH session.
///
/// One session serves one deployment run. File operations each open their
/// own SFTP subsystem channel and release it before returning.
pub struct Session {
    config: SessionConfig,
    handle: Arc<Handle<SshHandler>>,
    closed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Session {
    /// Connect to the remote host and authenticate.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let auth_method = Self::resolve_auth_method(&config).await?;

        let russh_config = Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let handler = SshHandler::new(
            config.host.clone(),
            config.port,
            config.trust_on_first_use,
            config.known_hosts_path.clone(),
        );

        let mut session = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            handler,
        )
        .await
        .map_err(|e| {
            if e.to_string().contains("Connection refused") {
                Error::Connection(format!(
                    "connection refused to {}:{}",
                    config.host, config.port
                ))
            } else {
                Error::Connection(e.to_string())
            }
        })?;

        let auth_success = Self::authenticate(&mut session, &config, auth_method).await?;
        if !auth_success {
            return Err(Error::AuthenticationFailed);
        }

        tracing::debug!(host = %config.host, port = config.port, "SSH session established");

        Ok(Self {
            config,
            handle: Arc::new(session),
            closed: false,
        })
    }

    /// Resolve which authentication method to use.
    async fn resolve_auth_method(config: &SessionConfig) -> Result<AuthMethod> {
        match &config.credentials {
            Credentials::Password(password) => Ok(AuthMethod::Password(password.clone())),
            Credentials::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_deref()).map_err(|e| {
                    Error::KeyLoadFailed {
                        path: path.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(AuthMethod::KeyFile(Arc::new(key)))
            }
            Credentials::Agent { socket } => {
                let agent = match socket {
                    Some(path) => AgentClient::connect_uds(path).await.map_err(|e| {
                        Error::AgentUnavailable(format!(
                            "cannot reach agent at {}: {}",
                            path.display(),
                            e
                        ))
                    })?,
                    None => AgentClient::connect_env().await.map_err(|e| {
                        Error::AgentUnavailable(format!("cannot reach agent via SSH_AUTH_SOCK: {e}"))
                    })?,
                };
                Ok(AuthMethod::Agent(agent))
            }
        }
    }

    /// Authenticate the session.
    async fn authenticate(
        session: &mut Handle<SshHandler>,
        config: &SessionConfig,
        auth_method: AuthMethod,
    ) -> Result<bool> {
        match auth_method {
            AuthMethod::Password(password) => {
                let result = session
                    .authenticate_password(&config.user, password)
                    .await
                    .map_err(Error::Protocol)?;
                Ok(result.success())
            }
            AuthMethod::Agent(mut agent) => {
                let keys = agent.request_identities().await.map_err(|e| {
                    Error::AgentUnavailable(format!("failed to list agent keys: {}", e))
                })?;

                if keys.is_empty() {
                    return Err(Error::AgentUnavailable("no keys in SSH agent".to_string()));
                }

                for key in &keys {
                    match session
                        .authenticate_publickey_with(&config.user, key.clone(), None, &mut agent)
                        .await
                    {
                        Ok(result) if result.success() => return Ok(true),
                        _ => continue,
                    }
                }
                Ok(false)
            }
            AuthMethod::KeyFile(key) => {
                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(Error::Protocol)?
                    .flatten();

                let result = session
                    .authenticate_publickey(&config.user, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await
                    .map_err(Error::Protocol)?;

                Ok(result.success())
            }
        }
    }

    async fn exec_inner(&self, command: &str) -> crate::transport::Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::Command(format!("failed to open channel: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| TransportError::Command(format!("failed to exec command: {}", e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = 0u32;

        let mut got_exit_status = false;
        let mut got_eof = false;

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        // stderr
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = exit_status;
                    got_exit_status = true;
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelMsg::Eof) => {
                    got_eof = true;
                    if got_exit_status {
                        break;
                    }
                }
                Some(ChannelMsg::Close) => {
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }

        // A channel that closes without an exit status indicates abnormal
        // termination (connection loss, remote crash).
        if !got_exit_status {
            return Err(TransportError::ChannelClosed);
        }

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }

    /// Open an SFTP subsystem channel scoped to a single file operation.
    async fn sftp_channel(&self, path: &str) -> crate::transport::Result<SftpSession> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::Transfer {
                path: path.to_string(),
                reason: format!("failed to open channel: {e}"),
            })?;

        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| TransportError::Transfer {
                path: path.to_string(),
                reason: format!("sftp subsystem request failed: {e}"),
            })?;

        SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| TransportError::Transfer {
                path: path.to_string(),
                reason: format!("sftp handshake failed: {e}"),
            })
    }

    async fn read_file_inner(
        &self,
        sftp: &SftpSession,
        path: &str,
    ) -> crate::transport::Result<Vec<u8>> {
        let mut file = sftp.open(path).await.map_err(|e| sftp_error(path, e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .await
            .map_err(|e| TransportError::Transfer {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(data)
    }

    async fn upload_inner(
        &self,
        sftp: &SftpSession,
        path: &str,
        data: &[u8],
    ) -> crate::transport::Result<()> {
        let mut file = sftp.create(path).await.map_err(|e| sftp_error(path, e))?;
        file.write_all(data)
            .await
            .map_err(|e| TransportError::Transfer {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        file.shutdown().await.map_err(|e| TransportError::Transfer {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Map an SFTP error, keeping "no such file" as its own kind.
fn sftp_error(path: &str, err: russh_sftp::client::error::Error) -> TransportError {
    match &err {
        russh_sftp::client::error::Error::Status(status)
            if status.status_code == StatusCode::NoSuchFile =>
        {
            TransportError::NotFound(path.to_string())
        }
        _ => TransportError::Transfer {
            path: path.to_string(),
            reason: err.to_string(),
        },
    }
}

#[async_trait]
impl Transport for Session {
    async fn exec(&self, command: &str) -> crate::transport::Result<CommandOutput> {
        tracing::debug!(command, "executing remote command");
        match tokio::time::timeout(self.config.command_timeout, self.exec_inner(command)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.config.command_timeout)),
        }
    }

    async fn read_file(&self, path: &str) -> crate::transport::Result<Vec<u8>> {
        tracing::debug!(path, "reading remote file");
        let sftp = self.sftp_channel(path).await?;
        let result = self.read_file_inner(&sftp, path).await;
        // Release the sub-channel on every exit path.
        let _ = sftp.close().await;
        result
    }

    async fn upload(&self, path: &str, data: &[u8]) -> crate::transport::Result<()> {
        tracing::debug!(path, bytes = data.len(), "writing remote file");
        let sftp = self.sftp_channel(path).await?;
        let result = self.upload_inner(&sftp, path, data).await;
        let _ = sftp.close().await;
        result
    }

    async fn put_file(&self, local: &Path, remote: &str) -> crate::transport::Result<()> {
        // Ensure the remote parent directory exists before placing the file.
        if let Some((parent, _)) = remote.rsplit_once('/')
            && !parent.is_empty()
        {
            let output = self.exec(&format!("mkdir -p '{}'", parent)).await?;
            if !output.success() {
                return Err(TransportError::Command(format!(
                    "mkdir -p '{}' exited with {}: {}",
                    parent,
                    output.exit_code,
                    output.stderr.trim()
                )));
            }
        }

        let data = tokio::fs::read(local).await?;
        self.upload(remote, &data).await
    }

    async fn close(&mut self) -> crate::transport::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| TransportError::Command(format!("disconnect failed: {e}")))?;
        Ok(())
    }
}
