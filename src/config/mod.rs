// ABOUTME: Configuration types and parsing for revlink.yml.
// ABOUTME: Defaults are resolved once at load time, not lazily per read.

mod init;
mod secret;

pub use init::init_config;
pub use secret::SecretValue;

use crate::deploy::ActivationStrategy;
use crate::error::{Error, Result};
use crate::ssh::{Credentials, SessionConfig};
use crate::types::AppName;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "revlink.yml";
pub const CONFIG_FILENAME_ALT: &str = "revlink.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".revlink/config.yml";

/// Base for the default remote root when none is configured.
const DEFAULT_ROOT_BASE: &str = "/usr/local/www";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Application name; seeds the default remote root.
    #[serde(deserialize_with = "deserialize_app_name")]
    pub app: AppName,

    /// Remote host to deploy to. Exactly one host per run.
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    #[serde(default)]
    pub password: Option<SecretValue>,

    #[serde(default)]
    pub private_key_path: Option<String>,

    #[serde(default)]
    pub passphrase: Option<SecretValue>,

    #[serde(default)]
    pub agent: Option<AgentConfig>,

    /// Base remote directory. Defaults to `/usr/local/www/<app>`,
    /// resolved at load time.
    #[serde(default)]
    pub root: String,

    /// Relative paths uploaded for every revision.
    #[serde(
        default = "default_application_files",
        deserialize_with = "deserialize_application_files"
    )]
    pub application_files: NonEmpty<String>,

    #[serde(default)]
    pub activation_strategy: ActivationStrategy,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,

    /// Cap on concurrent file transfers within one upload phase.
    #[serde(default = "default_max_concurrent_uploads")]
    pub max_concurrent_uploads: usize,

    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,

    #[serde(default)]
    pub known_hosts_path: Option<String>,
}

fn default_port() -> u16 {
    22
}

fn default_application_files() -> NonEmpty<String> {
    NonEmpty::new("index.html".to_string())
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_concurrent_uploads() -> usize {
    8
}

fn default_trust_first_connection() -> bool {
    true
}

/// Agent authentication: `agent: true` uses `SSH_AUTH_SOCK`,
/// `agent: /path/to/socket` pins a socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AgentConfig {
    Enabled(bool),
    Socket(String),
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        config.resolve_defaults();
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Fill in context-dependent defaults, once.
    fn resolve_defaults(&mut self) {
        if self.root.is_empty() {
            self.root = format!("{}/{}", DEFAULT_ROOT_BASE, self.app);
        }
    }

    /// Resolve the configured credentials to exactly one set.
    ///
    /// Precedence: agent, then private key, then password. Configuring no
    /// credentials is an error.
    pub fn credentials(&self) -> Result<Credentials> {
        match &self.agent {
            Some(AgentConfig::Socket(socket)) => {
                return Ok(Credentials::Agent {
                    socket: Some(expand_tilde(socket)),
                });
            }
            Some(AgentConfig::Enabled(true)) => {
                return Ok(Credentials::Agent { socket: None });
            }
            Some(AgentConfig::Enabled(false)) | None => {}
        }

        if let Some(path) = &self.private_key_path {
            let passphrase = self
                .passphrase
                .as_ref()
                .map(|secret| secret.resolve())
                .transpose()?;
            return Ok(Credentials::PrivateKey {
                path: expand_tilde(path),
                passphrase,
            });
        }

        if let Some(password) = &self.password {
            return Ok(Credentials::Password(password.resolve()?));
        }

        Err(Error::InvalidConfig(
            "no credentials configured: set one of agent, private_key_path, or password"
                .to_string(),
        ))
    }

    /// Build the SSH session configuration for this deployment target.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let credentials = self.credentials()?;

        let mut session = SessionConfig::new(&self.host, &self.username, credentials)
            .port(self.port)
            .trust_on_first_use(self.trust_first_connection)
            .command_timeout(self.command_timeout);

        if let Some(path) = &self.known_hosts_path {
            session = session.known_hosts_path(expand_tilde(path));
        }

        Ok(session)
    }

    pub fn template() -> Self {
        let mut config = Config {
            app: AppName::new("my-app").unwrap(),
            host: "server.example.com".to_string(),
            port: 22,
            username: "deploy".to_string(),
            password: None,
            private_key_path: None,
            passphrase: None,
            agent: Some(AgentConfig::Enabled(true)),
            root: String::new(),
            application_files: default_application_files(),
            activation_strategy: ActivationStrategy::default(),
            command_timeout: default_command_timeout(),
            max_concurrent_uploads: default_max_concurrent_uploads(),
            trust_first_connection: default_trust_first_connection(),
            known_hosts_path: None,
        };
        config.resolve_defaults();
        config
    }
}

/// Expand a leading `~/` against `$HOME`.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}

// Custom deserializers

fn deserialize_app_name<'de, D>(deserializer: D) -> std::result::Result<AppName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    AppName::new(&s).map_err(serde::de::Error::custom)
}

fn deserialize_application_files<'de, D>(
    deserializer: D,
) -> std::result::Result<NonEmpty<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<String> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(values)
        .ok_or_else(|| serde::de::Error::custom("application_files cannot be empty"))
}
