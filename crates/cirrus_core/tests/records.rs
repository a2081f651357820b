//! Record lifecycle against the in-memory backend.

mod common;

use cirrus_core::permissions::READ;
use cirrus_core::{CoreError, Query, Record, RecordStatus, TransportError};
use cirrus_testkit::property_map;
use cirrus_transport::Method;
use common::harness;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeSet;

#[tokio::test]
async fn create_then_partial_update() {
    let h = harness();
    let store = h.client.data();

    let mut note = store.create("notes", [("title", "a")]).unwrap();
    store.save(&mut note).await.unwrap();
    assert_eq!(note.id(), Some("n1"));
    assert_eq!(note.status(), RecordStatus::Saved);

    note.set("content", "b").unwrap();
    assert_eq!(note.status(), RecordStatus::Modified);
    assert_eq!(note.dirty_properties().collect::<Vec<_>>(), ["content"]);

    store.save(&mut note).await.unwrap();
    let put = h.backend.last_request().unwrap();
    assert_eq!(put.method, Method::Put);
    assert_eq!(put.path, "objects/notes/n1");
    assert_eq!(put.json(), Some(json!({"content": "b"})));
    assert_eq!(note.status(), RecordStatus::Saved);
    assert_eq!(note.dirty_properties().count(), 0);

    let stored = h.backend.object("notes", "n1").unwrap();
    assert_eq!(stored["title"], "a");
    assert_eq!(stored["content"], "b");
}

#[tokio::test]
async fn unchanged_saved_record_sends_nothing() {
    let h = harness();
    h.backend.insert_object("notes", json!({"title": "a"}));
    let store = h.client.data();

    let mut note = store.find_by_id("notes", "n1").await.unwrap();
    assert!(note.serialize_for_save().unwrap().is_empty());

    let before = h.backend.request_count();
    store.save(&mut note).await.unwrap();
    assert_eq!(h.backend.request_count(), before);
    assert_eq!(note.status(), RecordStatus::Saved);
}

#[tokio::test]
async fn failed_create_can_be_retried() {
    let h = harness();
    let store = h.client.data();
    h.backend.fail_next_network(Method::Post, "objects/notes");

    let mut note = store.create("notes", [("title", "a")]).unwrap();
    let err = store.save(&mut note).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(note.status(), RecordStatus::New);
    assert_eq!(note.id(), None);
    assert!(note.is_dirty("title"));

    store.save(&mut note).await.unwrap();
    assert_eq!(note.id(), Some("n1"));
}

#[tokio::test]
async fn failed_update_keeps_dirty_properties() {
    let h = harness();
    h.backend.insert_object("notes", json!({"title": "a"}));
    h.backend.fail_next(Method::Put, "objects/notes/n1", 409, "conflict");
    let store = h.client.data();

    let mut note = store.find_by_id("notes", "n1").await.unwrap();
    note.set("title", "b").unwrap();
    let err = store.save(&mut note).await.unwrap_err();

    assert_eq!(err.status(), Some(409));
    assert_eq!(note.status(), RecordStatus::Modified);
    assert!(note.is_dirty("title"));
}

#[tokio::test]
async fn save_all_stops_at_first_failure() {
    let h = harness();
    h.backend.insert_object("notes", json!({"title": "existing"}));
    let store = h.client.data();

    let mut existing = store.find_by_id("notes", "n1").await.unwrap();
    existing.set("title", "changed").unwrap();
    let mut records = vec![
        store.create("notes", [("title", "first")]).unwrap(),
        existing,
        store.create("notes", [("title", "third")]).unwrap(),
    ];
    h.backend.fail_next(Method::Put, "objects/notes/n1", 500, "boom");

    let err = store.save_all(&mut records).await.unwrap_err();
    assert!(matches!(err, CoreError::BatchAborted { index: 1, .. }));
    assert_eq!(err.status(), Some(500));

    assert_eq!(records[0].status(), RecordStatus::Saved);
    assert_eq!(records[1].status(), RecordStatus::Modified);
    assert_eq!(records[2].status(), RecordStatus::New);
    assert_eq!(h.backend.objects("notes").len(), 2);
    assert_eq!(h.backend.object("notes", "n1").unwrap()["title"], "existing");
}

#[tokio::test]
async fn find_where_compiles_equality() {
    let h = harness();
    h.backend.insert_object("cars", json!({"color": "red"}));
    h.backend.insert_object("cars", json!({"color": "blue"}));

    let red = h
        .client
        .data()
        .find_where("cars", [("color", "red")])
        .await
        .unwrap();

    assert_eq!(red.len(), 1);
    assert_eq!(red[0].get("color").unwrap(), "red");
    let request = h.backend.last_request().unwrap();
    assert_eq!(request.query_param("filter"), Some(r#"color eq "red""#));
}

#[tokio::test]
async fn two_clauses_default_to_and() {
    let h = harness();
    h.backend.insert_object("cars", json!({"color": "red", "doors": 4}));
    h.backend.insert_object("cars", json!({"color": "red", "doors": 2}));

    let mut query = Query::new();
    query.equals("color", "red").unwrap();
    query.equals("doors", 4).unwrap();
    let found = h.client.data().find_by_query("cars", &query).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(
        h.backend.last_request().unwrap().query_param("filter"),
        Some(r#"color eq "red" and doors eq 4"#)
    );
}

#[tokio::test]
async fn search_joins_with_or() {
    let h = harness();
    h.backend.insert_object("notes", json!({"title": "Milk", "body": ""}));
    h.backend.insert_object("notes", json!({"title": "", "body": "oat milk"}));
    h.backend.insert_object("notes", json!({"title": "eggs", "body": ""}));

    let found = h
        .client
        .data()
        .search("notes", "milk", ["title", "body"])
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(
        h.backend.last_request().unwrap().query_param("filter"),
        Some(r#"title contains "milk" or body contains "milk""#)
    );
}

#[tokio::test]
async fn search_over_no_properties_finds_nothing() {
    let h = harness();
    h.backend.insert_object("notes", json!({"title": "milk"}));
    let store = h.client.data();

    let found = store
        .search("notes", "milk", Vec::<String>::new())
        .await
        .unwrap();
    assert!(found.is_empty());

    let found = store
        .search_values("notes", Vec::<(String, String)>::new())
        .await
        .unwrap();
    assert!(found.is_empty());
    assert_eq!(h.backend.request_count(), 0);
}

#[tokio::test]
async fn empty_query_fetches_everything() {
    let h = harness();
    h.backend.insert_object("notes", json!({}));
    h.backend.insert_object("notes", json!({}));

    let all = h
        .client
        .data()
        .find_by_query("notes", &Query::new())
        .await
        .unwrap();

    assert_eq!(all.len(), 2);
    assert_eq!(h.backend.last_request().unwrap().query_param("filter"), None);
}

#[tokio::test]
async fn missing_record_is_an_api_error() {
    let h = harness();
    let err = h
        .client
        .data()
        .find_by_id("notes", "n404")
        .await
        .unwrap_err();
    match err {
        CoreError::Transport(TransportError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "notes/n404 not found");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn delete_is_terminal() {
    let h = harness();
    let store = h.client.data();

    let mut unsaved = store.create("notes", [("title", "a")]).unwrap();
    assert!(matches!(
        store.delete(&mut unsaved).await,
        Err(CoreError::MissingIdentifier { .. })
    ));

    store.save(&mut unsaved).await.unwrap();
    store.delete(&mut unsaved).await.unwrap();
    assert_eq!(unsaved.status(), RecordStatus::Deleted);
    assert_eq!(unsaved.id(), None);
    assert!(h.backend.object("notes", "n1").is_none());

    assert!(matches!(
        store.delete(&mut unsaved).await,
        Err(CoreError::StaleRecord { .. })
    ));
    assert!(matches!(
        unsaved.set("title", "b"),
        Err(CoreError::StaleRecord { .. })
    ));
    assert!(matches!(
        store.save(&mut unsaved).await,
        Err(CoreError::StaleRecord { .. })
    ));
    assert!(matches!(
        store.refresh(&mut unsaved).await,
        Err(CoreError::StaleRecord { .. })
    ));

    // Reads still show what was deleted.
    assert_eq!(unsaved.get("title").unwrap(), "a");
    assert_eq!(unsaved.to_json(), json!({"title": "a"}));
}

#[tokio::test]
async fn refresh_discards_local_edits() {
    let h = harness();
    h.backend.insert_object("notes", json!({"title": "server"}));
    let store = h.client.data();

    let mut note = store.find_by_id("notes", "n1").await.unwrap();
    note.set("title", "local").unwrap();
    note.set("extra", 1).unwrap();
    store.refresh(&mut note).await.unwrap();

    assert_eq!(note.get("title").unwrap(), "server");
    assert!(note.get("extra").is_none());
    assert_eq!(note.status(), RecordStatus::Saved);
    assert_eq!(note.dirty_properties().count(), 0);
}

#[tokio::test]
async fn read_only_properties_are_rejected() {
    let mut note = Record::new("notes");
    assert!(matches!(
        note.set("sysObjectId", "x"),
        Err(CoreError::ReadOnlyProperty { .. })
    ));
    let mut user = Record::new("users");
    assert!(user.set("sysUsername", "x").is_err());
    assert!(note.set("sysUsername", "x").is_ok());
}

#[tokio::test]
async fn permissions_follow_the_save() {
    let h = harness();
    let store = h.client.data();

    let mut note = store.create("notes", [("title", "a")]).unwrap();
    note.grant(["bob"], [READ]).unwrap();
    note.grant_public([READ]).unwrap();
    store.save(&mut note).await.unwrap();

    let deltas = h.backend.permission_deltas();
    assert_eq!(deltas.len(), 1);
    assert_eq!(
        deltas[0],
        json!({
            "grants": [
                {"sysObjectId": "n1", "username": "*", "permissions": ["read"]},
                {"sysObjectId": "n1", "username": "bob", "permissions": ["read"]}
            ],
            "revokes": []
        })
    );
    assert!(note.permissions().is_empty());
}

#[tokio::test]
async fn failed_permission_flush_keeps_changes() {
    let h = harness();
    let store = h.client.data();
    h.backend.fail_next(Method::Post, "permissions", 403, "forbidden");

    let mut note = store.create("notes", [("title", "a")]).unwrap();
    note.revoke_public([READ]).unwrap();
    let err = store.save(&mut note).await.unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert_eq!(note.status(), RecordStatus::Saved);
    assert!(!note.permissions().is_empty());

    store.save(&mut note).await.unwrap();
    assert_eq!(h.backend.permission_deltas().len(), 1);
    assert!(note.permissions().is_empty());
}

#[tokio::test]
async fn to_json_includes_identifier() {
    let h = harness();
    h.backend.insert_object("notes", json!({"title": "a"}));
    let note = h.client.data().find_by_id("notes", "n1").await.unwrap();
    assert_eq!(note.to_json(), json!({"sysObjectId": "n1", "title": "a"}));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn save_body_is_full_then_dirty_only(
        initial in property_map(6),
        changes in property_map(3),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(async {
            let h = harness();
            let store = h.client.data();

            let mut record = store.create("items", initial.clone()).unwrap();
            let body = record.serialize_for_save().unwrap();
            let expected: serde_json::Map<String, Value> = initial.clone().into_iter().collect();
            assert_eq!(body, expected);

            store.save(&mut record).await.unwrap();
            assert!(record.serialize_for_save().unwrap().is_empty());

            for (key, value) in &changes {
                record.set(key.clone(), value.clone()).unwrap();
            }
            let body = record.serialize_for_save().unwrap();
            let keys: BTreeSet<&str> = body.keys().map(String::as_str).collect();
            let changed: BTreeSet<&str> = changes.keys().map(String::as_str).collect();
            assert_eq!(keys, changed);
        });
    }
}
