// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates revlink.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::AppName;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, app: Option<&str>, host: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(a) = app {
        config.app = AppName::new(a).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    if let Some(h) = host {
        config.host = h.to_string();
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"app: {}
host: {}
port: {}
username: {}
# Authentication: exactly one of the following.
# agent: true                      # running SSH agent via SSH_AUTH_SOCK
# private_key_path: ~/.ssh/id_ed25519
# password:
#   env: DEPLOY_PASSWORD
agent: true

# Remote base directory (default: /usr/local/www/<app>)
# root: /var/www/{}

# Files uploaded for every revision, relative to --dist-dir.
application_files:
  - index.html

# How the active pointer is switched: symlink (default) or copy.
# activation_strategy: symlink
"#,
        config.app, config.host, config.port, config.username, config.app
    )
}
