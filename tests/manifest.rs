// ABOUTME: Tests for the revision manifest model and remote-backed store.
// ABOUTME: Covers ordering, idempotent append, exclusive activation, and bootstrap.

mod support;

use revlink::manifest::{Manifest, ManifestStore, RevisionRecord, StoreError};
use revlink::types::RevisionKey;
use support::MockTransport;

const MANIFEST_PATH: &str = "/srv/app/revisions.json";

fn record(revision: &str) -> RevisionRecord {
    RevisionRecord {
        revision: revision.to_string(),
        deployer: "u@h".to_string(),
        timestamp: 1_700_000_000_000,
        active: None,
    }
}

fn key(s: &str) -> RevisionKey {
    RevisionKey::new(s).unwrap()
}

mod model {
    use super::*;

    /// Test: Prepending keeps newest-first insertion order.
    /// Expected: [A, B] + C yields [C, A, B].
    #[test]
    fn prepend_orders_newest_first() {
        let mut manifest: Manifest = [record("A"), record("B")].into_iter().collect();
        manifest.prepend(record("C"));

        let order: Vec<_> = manifest.records().iter().map(|r| &r.revision).collect();
        assert_eq!(order, ["C", "A", "B"]);
    }

    /// Test: mark_active flags exactly the matching record.
    /// Expected: one record active, all others cleared in the same pass.
    #[test]
    fn mark_active_is_exclusive() {
        let mut manifest: Manifest = [record("A"), record("B"), record("C")]
            .into_iter()
            .collect();
        manifest.mark_active("B");
        manifest.mark_active("C");

        let active: Vec<_> = manifest
            .records()
            .iter()
            .filter(|r| r.is_active())
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].revision, "C");
    }

    /// Test: mark_active with an unknown key clears every flag.
    /// Expected: no record is active afterwards.
    #[test]
    fn mark_active_with_unknown_key_clears_all() {
        let mut manifest: Manifest = [record("A")].into_iter().collect();
        manifest.mark_active("A");
        manifest.mark_active("missing");

        assert!(manifest.active().is_none());
    }

    /// Test: serializing and parsing a manifest round-trips.
    /// Expected: equal ordered sequence of records.
    #[test]
    fn serialize_parse_round_trip() {
        let mut manifest: Manifest = [record("A"), record("B")].into_iter().collect();
        manifest.mark_active("A");

        let bytes = manifest.to_bytes().unwrap();
        let parsed = Manifest::parse(&bytes).unwrap();

        assert_eq!(parsed, manifest);
    }

    /// Test: non-active records omit the `active` field entirely.
    /// Expected: the field is absent, not `false`.
    #[test]
    fn active_field_is_omitted_when_not_set() {
        let mut manifest: Manifest = [record("A"), record("B")].into_iter().collect();
        manifest.mark_active("A");

        let bytes = manifest.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value[0]["active"], serde_json::json!(true));
        assert!(value[1].get("active").is_none());
    }

    /// Test: a record with only a revision field parses.
    /// Expected: manifests written by older tooling stay readable.
    #[test]
    fn parses_minimal_record() {
        let manifest = Manifest::parse(br#"[{"revision":"111"}]"#).unwrap();

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.records()[0].revision, "111");
        assert!(!manifest.records()[0].is_active());
    }
}

mod store {
    use super::*;

    /// Test: fetching a manifest path that does not exist.
    /// Expected: an empty manifest, not an error.
    #[tokio::test]
    async fn bootstrap_missing_manifest_returns_empty() {
        let transport = MockTransport::new();
        let store = ManifestStore::new(&transport, MANIFEST_PATH);

        let manifest = store.fetch().await.expect("bootstrap should succeed");
        assert!(manifest.is_empty());
    }

    /// Test: a read failure other than NotFound propagates.
    /// Expected: the empty-manifest fallback never masks transport failures.
    #[tokio::test]
    async fn read_failure_propagates() {
        let transport = MockTransport::new().fail_read(MANIFEST_PATH);
        let store = ManifestStore::new(&transport, MANIFEST_PATH);

        let err = store.fetch().await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)), "got: {err:?}");
    }

    /// Test: malformed manifest JSON propagates as a serialization error.
    /// Expected: a corrupt manifest is never silently repaired.
    #[tokio::test]
    async fn malformed_manifest_is_an_error() {
        let transport = MockTransport::new().with_file(MANIFEST_PATH, b"not json");
        let store = ManifestStore::new(&transport, MANIFEST_PATH);

        let err = store.fetch().await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }), "got: {err:?}");
    }

    /// Test: appending to an existing manifest.
    /// Expected: [{"revision":"111"}] + 222 persists [222, 111] with the
    /// new record's deployer and timestamp intact.
    #[tokio::test]
    async fn append_persists_newest_first() {
        let transport = MockTransport::new().with_file(MANIFEST_PATH, br#"[{"revision":"111"}]"#);
        let store = ManifestStore::new(&transport, MANIFEST_PATH);

        let manifest = store.append(record("222")).await.unwrap();
        assert_eq!(manifest.len(), 2);

        let persisted = Manifest::parse(&transport.file(MANIFEST_PATH).unwrap()).unwrap();
        assert_eq!(persisted.records()[0].revision, "222");
        assert_eq!(persisted.records()[0].deployer, "u@h");
        assert_eq!(persisted.records()[0].timestamp, 1_700_000_000_000);
        assert_eq!(persisted.records()[1].revision, "111");
    }

    /// Test: appending the same revision twice.
    /// Expected: the second call changes nothing, on the remote included.
    #[tokio::test]
    async fn append_is_idempotent() {
        let transport = MockTransport::new();
        let store = ManifestStore::new(&transport, MANIFEST_PATH);

        let first = store.append(record("222")).await.unwrap();
        let saved_after_first = transport.file(MANIFEST_PATH).unwrap();

        let second = store.append(record("222")).await.unwrap();
        let saved_after_second = transport.file(MANIFEST_PATH).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
        assert_eq!(saved_after_first, saved_after_second);
    }

    /// Test: mark_active persists an exclusive flag.
    /// Expected: the previously active record loses its flag in the same write.
    #[tokio::test]
    async fn mark_active_replaces_previous_holder() {
        let transport = MockTransport::new().with_file(
            MANIFEST_PATH,
            br#"[{"revision":"222"},{"revision":"111","active":true}]"#,
        );
        let store = ManifestStore::new(&transport, MANIFEST_PATH);

        store.mark_active(&key("222")).await.unwrap();

        let persisted = Manifest::parse(&transport.file(MANIFEST_PATH).unwrap()).unwrap();
        assert_eq!(persisted.active().unwrap().revision, "222");
        assert!(!persisted.records()[1].is_active());
    }

    /// Test: mark_active for a revision the manifest does not contain.
    /// Expected: the save still happens and nothing ends up flagged.
    #[tokio::test]
    async fn mark_active_without_match_saves_unflagged() {
        let transport = MockTransport::new()
            .with_file(MANIFEST_PATH, br#"[{"revision":"111","active":true}]"#);
        let store = ManifestStore::new(&transport, MANIFEST_PATH);

        store.mark_active(&key("999")).await.unwrap();

        let persisted = Manifest::parse(&transport.file(MANIFEST_PATH).unwrap()).unwrap();
        assert!(persisted.active().is_none());
        assert_eq!(persisted.len(), 1);
    }

    /// Test: save failures propagate out of append.
    /// Expected: the transport error is not swallowed.
    #[tokio::test]
    async fn save_failure_propagates() {
        let transport = MockTransport::new().fail_write(MANIFEST_PATH);
        let store = ManifestStore::new(&transport, MANIFEST_PATH);

        let err = store.append(record("222")).await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)), "got: {err:?}");
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn keys() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::hash_set("[a-z0-9]{1,8}", 1..8)
            .prop_map(|set| set.into_iter().collect())
    }

    proptest! {
        /// At most one record is active after any mark_active call.
        #[test]
        fn mark_active_never_flags_more_than_one(revisions in keys(), pick in any::<prop::sample::Index>()) {
            let mut manifest: Manifest = revisions.iter().map(|r| record(r)).collect();
            let chosen = pick.get(&revisions).clone();
            manifest.mark_active(&chosen);

            let active_count = manifest.records().iter().filter(|r| r.is_active()).count();
            prop_assert_eq!(active_count, 1);
            prop_assert_eq!(&manifest.active().unwrap().revision, &chosen);
        }

        /// Prepending a fresh revision puts it first and grows the manifest by one.
        #[test]
        fn prepend_inserts_at_front(revisions in keys()) {
            let mut manifest: Manifest = revisions.iter().map(|r| record(r)).collect();
            let before = manifest.len();
            manifest.prepend(record("fresh-one"));

            prop_assert_eq!(manifest.len(), before + 1);
            prop_assert_eq!(&manifest.records()[0].revision, "fresh-one");
        }
    }
}
