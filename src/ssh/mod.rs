// ABOUTME: SSH client module for remote server connections.
// ABOUTME: Supports password, key, and agent authentication with known_hosts verification.

mod client;
mod error;

pub use client::{Credentials, Session, SessionConfig};
pub use error::{Error, Result};
