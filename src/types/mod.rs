// ABOUTME: Validated domain types used at API boundaries.
// ABOUTME: Rejects unsafe values before they become remote paths.

mod app_name;
mod revision_key;

pub use app_name::{AppName, AppNameError};
pub use revision_key::{RevisionKey, RevisionKeyError};
