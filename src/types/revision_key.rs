// ABOUTME: Validated revision key newtype.
// ABOUTME: Revision keys become remote directory names, so they must be path-safe.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RevisionKeyError {
    #[error("revision key cannot be empty")]
    Empty,

    #[error("revision key exceeds maximum length of 255 characters")]
    TooLong,

    #[error("revision key cannot be '.' or '..'")]
    Reserved,

    #[error("invalid character in revision key: '{0}'")]
    InvalidChar(char),
}

/// An opaque identifier for one deployable build, supplied by the caller.
///
/// Keys are used verbatim as directory names under `revisions/` on the
/// remote host, so path separators, whitespace and control characters are
/// rejected up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionKey(String);

impl RevisionKey {
    pub fn new(value: &str) -> Result<Self, RevisionKeyError> {
        if value.is_empty() {
            return Err(RevisionKeyError::Empty);
        }

        if value.len() > 255 {
            return Err(RevisionKeyError::TooLong);
        }

        if value == "." || value == ".." {
            return Err(RevisionKeyError::Reserved);
        }

        for c in value.chars() {
            if c == '/' || c == '\\' || c.is_whitespace() || c.is_control() {
                return Err(RevisionKeyError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
