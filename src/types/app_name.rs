// ABOUTME: Validated application name newtype.
// ABOUTME: The app name seeds the default remote root path.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppNameError {
    #[error("app name cannot be empty")]
    Empty,

    #[error("app name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("invalid character in app name: '{0}'")]
    InvalidChar(char),
}

/// Name of the deployed application.
///
/// Used as the final segment of the default remote root
/// (`/usr/local/www/<app>`), so it must be a single path-safe component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppName(String);

impl AppName {
    pub fn new(value: &str) -> Result<Self, AppNameError> {
        if value.is_empty() {
            return Err(AppNameError::Empty);
        }

        if value.len() > 63 {
            return Err(AppNameError::TooLong);
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
                return Err(AppNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_names() {
        assert!(AppName::new("my-app").is_ok());
        assert!(AppName::new("blog2").is_ok());
        assert!(AppName::new("internal_tool").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(AppName::new(""), Err(AppNameError::Empty)));
    }

    #[test]
    fn rejects_path_separators() {
        assert!(matches!(
            AppName::new("a/b"),
            Err(AppNameError::InvalidChar('/'))
        ));
    }

    #[test]
    fn rejects_spaces() {
        assert!(matches!(
            AppName::new("my app"),
            Err(AppNameError::InvalidChar(' '))
        ));
    }
}
