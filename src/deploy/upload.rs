// ABOUTME: Concurrent transfer of application files into a revision directory.
// ABOUTME: Bounded fan-out, attempt-all, first failure fails the aggregate.

use futures::StreamExt;
use futures::stream;
use nonempty::NonEmpty;
use std::path::Path;

use super::error::DeployError;
use super::layout::RemoteLayout;
use crate::transport::Transport;
use crate::types::RevisionKey;

/// Copy every application file from `dist_dir` into the revision's remote
/// directory.
///
/// Transfers run concurrently, at most `max_in_flight` at a time. Every
/// transfer is driven to completion before the aggregate result is decided;
/// if any fails, the whole operation fails and the partially-populated
/// revision directory is left on the remote host. Callers must treat the
/// directory as incomplete on error.
pub async fn upload_application_files<T: Transport>(
    transport: &T,
    dist_dir: &Path,
    files: &NonEmpty<String>,
    layout: &RemoteLayout,
    revision: &RevisionKey,
    max_in_flight: usize,
) -> Result<(), DeployError> {
    tracing::debug!(
        count = files.len(),
        dest = %layout.revision_dir(revision),
        "uploading application files"
    );

    let transfers = files.iter().map(|file| {
        let local = dist_dir.join(file.as_str());
        let remote = layout.revision_file(revision, file);
        async move {
            transport
                .put_file(&local, &remote)
                .await
                .map_err(|source| DeployError::Upload {
                    path: remote.clone(),
                    source,
                })
        }
    });

    let results: Vec<_> = stream::iter(transfers)
        .buffer_unordered(max_in_flight.max(1))
        .collect()
        .await;

    for result in results {
        result?;
    }

    Ok(())
}
