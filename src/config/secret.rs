// ABOUTME: Secret value types with environment indirection.
// ABOUTME: Keeps passwords and passphrases out of config files when desired.

use crate::error::{Error, Result};
use serde::Deserialize;

/// A secret that is either written inline or pulled from the environment.
///
/// ```yaml
/// password: hunter2
/// # or
/// password:
///   env: DEPLOY_PASSWORD
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecretValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl SecretValue {
    /// Resolve to a concrete string, once, at startup.
    pub fn resolve(&self) -> Result<String> {
        match self {
            SecretValue::Literal(s) => Ok(s.clone()),
            SecretValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}
