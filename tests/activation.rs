// ABOUTME: Tests for activation strategies and the active-pointer switch.
// ABOUTME: Covers symlink and copy commands, manifest flagging, and failed switches.

mod support;

use revlink::deploy::{ActivationStrategy, DeployError, RemoteLayout, activate_revision};
use revlink::manifest::{Manifest, ManifestStore};
use revlink::types::RevisionKey;
use support::MockTransport;

const MANIFEST_PATH: &str = "/var/www/app/revisions.json";

fn key(s: &str) -> RevisionKey {
    RevisionKey::new(s).unwrap()
}

/// Test: symlink activation for root /var/www/app and revision "abc".
/// Expected: a forced, no-dereference symlink from the active pointer to
/// the revision directory, and an exclusive manifest flag on "abc".
#[tokio::test]
async fn symlink_activation_switches_pointer_and_manifest() {
    let transport = MockTransport::new().with_file(
        MANIFEST_PATH,
        br#"[{"revision":"abc"},{"revision":"111","active":true}]"#,
    );
    let layout = RemoteLayout::new("/var/www/app");
    let store = ManifestStore::new(&transport, MANIFEST_PATH);

    let activation = activate_revision(
        &transport,
        &store,
        &layout,
        &key("abc"),
        ActivationStrategy::Symlink,
    )
    .await
    .expect("activation should succeed");

    assert_eq!(activation.revision.as_str(), "abc");
    assert_eq!(
        transport.commands(),
        ["ln -sfn '/var/www/app/revisions/abc/' '/var/www/app/active'"]
    );

    let persisted = Manifest::parse(&transport.file(MANIFEST_PATH).unwrap()).unwrap();
    assert_eq!(persisted.active().unwrap().revision, "abc");
    assert!(!persisted.records()[1].is_active());
}

/// Test: copy activation with the same inputs.
/// Expected: a recursive directory copy replacing the destination, with the
/// same manifest outcome.
#[tokio::test]
async fn copy_activation_switches_pointer_and_manifest() {
    let transport = MockTransport::new().with_file(
        MANIFEST_PATH,
        br#"[{"revision":"abc"},{"revision":"111","active":true}]"#,
    );
    let layout = RemoteLayout::new("/var/www/app");
    let store = ManifestStore::new(&transport, MANIFEST_PATH);

    activate_revision(
        &transport,
        &store,
        &layout,
        &key("abc"),
        ActivationStrategy::Copy,
    )
    .await
    .expect("activation should succeed");

    assert_eq!(
        transport.commands(),
        ["rm -rf '/var/www/app/active' && cp -a '/var/www/app/revisions/abc' '/var/www/app/active'"]
    );

    let persisted = Manifest::parse(&transport.file(MANIFEST_PATH).unwrap()).unwrap();
    assert_eq!(persisted.active().unwrap().revision, "abc");
}

/// Test: a switch command reporting a non-zero exit status.
/// Expected: activation fails and the manifest is left untouched.
#[tokio::test]
async fn failed_switch_leaves_manifest_untouched() {
    let original: &[u8] = br#"[{"revision":"abc"},{"revision":"111","active":true}]"#;
    let transport = MockTransport::new()
        .with_file(MANIFEST_PATH, original)
        .with_exit_code(1);
    let layout = RemoteLayout::new("/var/www/app");
    let store = ManifestStore::new(&transport, MANIFEST_PATH);

    let err = activate_revision(
        &transport,
        &store,
        &layout,
        &key("abc"),
        ActivationStrategy::Symlink,
    )
    .await
    .unwrap_err();

    assert!(
        matches!(err, DeployError::ActivationFailed { exit_code: 1, .. }),
        "got: {err:?}"
    );
    assert_eq!(transport.file(MANIFEST_PATH).unwrap(), original);
}

/// Test: activating a revision the manifest does not know about.
/// Expected: the switch proceeds and the saved manifest has nothing
/// flagged; appending first is the caller's job.
#[tokio::test]
async fn activation_of_unknown_revision_flags_nothing() {
    let transport =
        MockTransport::new().with_file(MANIFEST_PATH, br#"[{"revision":"111","active":true}]"#);
    let layout = RemoteLayout::new("/var/www/app");
    let store = ManifestStore::new(&transport, MANIFEST_PATH);

    activate_revision(
        &transport,
        &store,
        &layout,
        &key("zzz"),
        ActivationStrategy::Symlink,
    )
    .await
    .expect("activation should succeed");

    let persisted = Manifest::parse(&transport.file(MANIFEST_PATH).unwrap()).unwrap();
    assert!(persisted.active().is_none());
}
