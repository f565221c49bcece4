//! Integration tests for Storage (find / find_all / save / insert).

#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use resource_state::{Method, Model, ModelType, Storage, SyncError, SyncOptions};
use serde_json::json;
use support::{attrs, FakeServer};

fn book_type(server: &Arc<FakeServer>) -> Arc<ModelType> {
    Arc::new(ModelType::new("Book", server.clone()))
}

fn library() -> (Storage, Arc<FakeServer>) {
    let server = FakeServer::with_rows(json!([
        { "id": 1, "title": "Dune" },
        { "id": 2, "title": "Emma" }
    ]));
    let storage = Storage::for_model(book_type(&server));
    (storage, server)
}

// find

#[tokio::test]
async fn find_by_id_returns_cached_record_without_fetching() {
    let (storage, server) = library();
    let cached = storage.insert(json!({ "id": 1 }));

    let found = storage.find(1, false).await.unwrap();
    assert!(found.ptr_eq(&cached));
    assert_eq!(server.count(Method::Read, false), 0);
}

#[tokio::test]
async fn find_by_id_fetches_missing_record_once() {
    let (storage, server) = library();

    let first = storage.find(2, false).await.unwrap();
    let second = storage.find(2, false).await.unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(first.get("title"), Some(json!("Emma")));
    assert_eq!(server.count(Method::Read, false), 1);
    assert!(storage.records().get(2).unwrap().ptr_eq(&first));
}

#[tokio::test]
async fn find_with_force_fetch_always_fetches() {
    let (storage, server) = library();

    let first = storage.find(2, false).await.unwrap();
    let second = storage.find(2, true).await.unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(server.count(Method::Read, false), 2);
    assert_eq!(storage.records().len(), 1);
}

#[tokio::test]
async fn find_by_object_uses_the_identity_attribute() {
    let (storage, server) = library();
    let cached = storage.insert(json!({ "id": 1 }));

    assert!(storage.find(json!({ "id": 1 }), false).await.unwrap().ptr_eq(&cached));
    assert_eq!(server.count(Method::Read, false), 0);

    let fetched = storage.find(json!({ "id": 2 }), false).await.unwrap();
    assert_eq!(fetched.id(), Some(json!(2)));
    assert_eq!(server.count(Method::Read, false), 1);
}

#[tokio::test]
async fn find_by_model_returns_that_model_once_fetched() {
    let (storage, server) = library();
    let kind = storage.model_type().clone();
    let cached = storage.insert(Model::with_id(&kind, 1));
    let wanted = Model::with_id(&kind, 2);

    assert!(storage.find(&cached, false).await.unwrap().ptr_eq(&cached));
    let found = storage.find(&wanted, false).await.unwrap();

    assert!(found.ptr_eq(&wanted));
    assert_eq!(wanted.get("title"), Some(json!("Emma")));
    assert_eq!(server.count(Method::Read, false), 1);
}

#[tokio::test]
async fn concurrent_finds_both_fetch_but_converge_on_one_record() {
    let server = FakeServer::gated(json!([{ "id": 2, "title": "Emma" }]), 2);
    let storage = Storage::for_model(book_type(&server));

    let (a, b) = tokio::join!(storage.find(2, false), storage.find(2, false));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(server.count(Method::Read, false), 2);
    assert_eq!(storage.records().len(), 1);
    assert!(a.ptr_eq(&b));
    assert!(storage.records().get(2).unwrap().ptr_eq(&a));
}

#[tokio::test]
async fn failed_find_inserts_nothing() {
    let (storage, _server) = library();

    let err = storage.find(42, false).await.unwrap_err();
    assert_eq!(err, SyncError::Transport("404 42".into()));
    assert!(storage.records().is_empty());
}

// find_all

#[tokio::test]
async fn find_all_fetches_when_never_synced() {
    let (storage, server) = library();

    let records = storage.find_all(SyncOptions::new(), false).await.unwrap();
    assert!(records.ptr_eq(storage.records()));
    assert_eq!(records.len(), 2);
    assert_eq!(server.count(Method::Read, true), 1);
    assert!(storage.has_synced());
}

#[tokio::test]
async fn find_all_twice_fetches_once() {
    let (storage, server) = library();

    storage.find_all(SyncOptions::new(), false).await.unwrap();
    storage.find_all(SyncOptions::new(), false).await.unwrap();
    assert_eq!(server.count(Method::Read, true), 1);
}

#[tokio::test]
async fn find_all_with_force_fetch_fetches_again() {
    let (storage, server) = library();

    storage.find_all(SyncOptions::new(), false).await.unwrap();
    storage.find_all(SyncOptions::new(), true).await.unwrap();
    assert_eq!(server.count(Method::Read, true), 2);
    assert!(storage.has_synced());
}

#[tokio::test]
async fn find_all_returns_records_once_the_collection_has_synced() {
    let (storage, server) = library();
    storage.records().trigger_sync();
    storage.insert(json!({ "id": 1 }));
    storage.insert(json!({ "id": 2 }));

    let records = storage.find_all(SyncOptions::new(), false).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(server.count(Method::Read, true), 0);
}

#[tokio::test]
async fn find_all_passes_options_through() {
    let (storage, server) = library();

    storage
        .find_all(SyncOptions::new().with_data(json!({ "sortBy": "name" })), false)
        .await
        .unwrap();
    let request = &server.requests()[0];
    assert_eq!(request.data, Some(json!({ "sortBy": "name" })));
}

#[tokio::test]
async fn find_calls_do_not_mark_the_collection_synced() {
    let (storage, server) = library();

    storage.find(1, false).await.unwrap();
    assert!(!storage.has_synced());
    storage.find_all(SyncOptions::new(), false).await.unwrap();
    assert_eq!(server.count(Method::Read, true), 1);
}

#[tokio::test]
async fn failed_find_all_leaves_storage_unsynced() {
    let (storage, server) = library();
    server.fail_with("offline");

    let err = storage.find_all(SyncOptions::new(), false).await.unwrap_err();
    assert_eq!(err, SyncError::Transport("offline".into()));
    assert!(!storage.has_synced());
    assert!(storage.records().is_empty());
}

// save

#[tokio::test]
async fn save_inserts_a_model_that_was_not_cached() {
    let (storage, server) = library();
    let book = Model::with_id(storage.model_type(), 2);

    let saved = storage.save(&book, SyncOptions::new()).await.unwrap();
    assert!(saved.ptr_eq(&book));
    assert!(storage.records().get(2).unwrap().ptr_eq(&book));
    assert_eq!(server.count(Method::Update, false), 1);
}

#[tokio::test]
async fn save_by_id_saves_the_cached_record() {
    let (storage, server) = library();
    let cached = storage.insert(json!({ "id": 1, "title": "Dune" }));

    let saved = storage.save(1, SyncOptions::new()).await.unwrap();
    assert!(saved.ptr_eq(&cached));
    assert_eq!(server.requests()[0].attributes, attrs(json!({ "id": 1, "title": "Dune" })));
}

#[tokio::test]
async fn save_by_unknown_id_saves_and_inserts() {
    let (storage, server) = library();

    let saved = storage.save(7, SyncOptions::new()).await.unwrap();
    assert_eq!(saved.id(), Some(json!(7)));
    assert_eq!(server.count(Method::Update, false), 1);
    assert!(storage.records().get(7).unwrap().ptr_eq(&saved));
}

#[tokio::test]
async fn save_with_attributes_updates_the_cached_record_in_place() {
    let (storage, server) = library();
    let cached = storage.insert(json!({ "id": 1, "title": "Dune" }));

    let saved = storage
        .save(json!({ "id": 1, "title": "Dune Messiah" }), SyncOptions::new())
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Update);
    assert_eq!(requests[0].attributes.get("title"), Some(&json!("Dune Messiah")));
    assert!(saved.ptr_eq(&cached));
    assert!(storage.records().get(1).unwrap().ptr_eq(&cached));
    assert_eq!(cached.get("title"), Some(json!("Dune Messiah")));
}

#[tokio::test]
async fn save_of_attributes_without_id_creates() {
    let (storage, server) = library();

    let saved = storage
        .save(json!({ "title": "Persuasion" }), SyncOptions::new())
        .await
        .unwrap();
    assert_eq!(server.count(Method::Create, false), 1);
    assert_eq!(saved.id(), Some(json!(100)));
    assert!(storage.records().get(100).unwrap().ptr_eq(&saved));
}

#[tokio::test]
async fn save_with_a_foreign_model_uses_its_attributes() {
    let (storage, server) = library();
    let cached = storage.insert(json!({ "id": 1, "title": "Dune" }));
    let other_type = Arc::new(ModelType::new("Draft", server.clone()));
    let draft = Model::new(&other_type, attrs(json!({ "id": 1, "title": "Draft title" })));

    let saved = storage.save(&draft, SyncOptions::new()).await.unwrap();
    assert!(saved.ptr_eq(&cached));
    assert_eq!(cached.get("title"), Some(json!("Draft title")));
    assert_eq!(storage.records().len(), 1);
}

#[tokio::test]
async fn save_assigning_a_cached_id_folds_into_the_cached_record() {
    // The fake server hands out ids from 100.
    let server = FakeServer::with_rows(json!([{ "id": 100, "title": "Persuasion" }]));
    let storage = Storage::for_model(book_type(&server));
    let cached = storage.find(100, false).await.unwrap();
    let draft = storage.insert(Model::new(storage.model_type(), attrs(json!({ "title": "Draft" }))));
    assert_eq!(storage.records().len(), 2);

    let saved = storage.save(&draft, SyncOptions::new()).await.unwrap();

    assert_eq!(server.count(Method::Create, false), 1);
    assert!(saved.ptr_eq(&cached));
    assert_eq!(storage.records().len(), 1);
    assert!(storage.records().get(100).unwrap().ptr_eq(&cached));
    assert_eq!(cached.get("title"), Some(json!("Draft")));
    assert!(draft.collection().is_none());
}

#[tokio::test]
async fn failed_save_does_not_insert() {
    let (storage, server) = library();
    server.fail_with("500");

    let err = storage.save(9, SyncOptions::new()).await.unwrap_err();
    assert_eq!(err, SyncError::Transport("500".into()));
    assert!(storage.records().get(9).is_none());
}

// insert

#[test]
fn insert_by_object_creates_a_record() {
    let server = FakeServer::new();
    let storage = Storage::for_model(book_type(&server));

    let model = storage.insert(json!({ "id": 1 }));
    assert_eq!(model.id(), Some(json!(1)));
    assert!(storage.records().get(1).unwrap().ptr_eq(&model));
}

#[test]
fn insert_by_model_keeps_the_instance() {
    let server = FakeServer::new();
    let storage = Storage::for_model(book_type(&server));
    let book = Model::with_id(storage.model_type(), 1);

    let model = storage.insert(&book);
    assert!(model.ptr_eq(&book));
    assert!(storage.records().get(1).unwrap().ptr_eq(&book));
    assert!(book.collection().unwrap().ptr_eq(storage.records()));
}

#[test]
fn insert_merges_duplicates() {
    let server = FakeServer::new();
    let storage = Storage::for_model(book_type(&server));

    let first = storage.insert(json!({ "id": 1, "title": "Dune" }));
    let second = storage.insert(json!({ "id": "1", "year": 1965 }));
    assert!(first.ptr_eq(&second));
    assert_eq!(storage.records().len(), 1);
    assert_eq!(first.get("year"), Some(json!(1965)));
}
