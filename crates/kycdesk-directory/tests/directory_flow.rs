//! End-to-end flows over the in-memory backends: live sync, cache
//! coherence with deletion, and the best-effort cascade.

use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use kycdesk_core::{
    ConsoleError, ConsoleSettings, DocumentFields, EvidenceCategory, RecordPatch,
    VerificationCheck,
};
use kycdesk_directory::{
    DirectoryService, DirectorySync, FileReferenceCache, MemoryBlobStore, MemoryRecordStore,
};

fn fields(value: serde_json::Value) -> DocumentFields {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("fixture must be an object"),
    }
}

fn harness() -> (
    MemoryRecordStore,
    Arc<MemoryBlobStore>,
    DirectoryService,
    FileReferenceCache,
) {
    let settings = ConsoleSettings::default();
    let records = MemoryRecordStore::new();
    let blobs = Arc::new(MemoryBlobStore::new());
    let cache = FileReferenceCache::new(blobs.clone(), &settings);
    let service = DirectoryService::new(
        Arc::new(records.clone()),
        blobs.clone(),
        cache.clone(),
        &settings,
    );
    (records, blobs, service, cache)
}

fn seed_evidence(blobs: &MemoryBlobStore, owner: &str) {
    blobs.put_object(
        &format!("users/{owner}/document/passport.jpg"),
        Bytes::from_static(b"p"),
    );
    blobs.put_object(
        &format!("users/{owner}/selfie/front.jpg"),
        Bytes::from_static(b"s"),
    );
    blobs.put_object(
        &format!("users/{owner}/liveness/check.mp4"),
        Bytes::from_static(b"l"),
    );
}

#[tokio::test]
async fn directory_mirrors_the_store() {
    let (records, _, _, _) = harness();
    records.insert_document(
        "users",
        "u1",
        fields(json!({
            "firstName": "Anita",
            "dob": { "seconds": 638_928_000 },
            "isEmailVerified": true,
            "isDocumentVerified": true,
        })),
    );

    let sync = DirectorySync::new(Arc::new(records.clone()), "users");
    let mut feed = sync.start().await.unwrap();

    feed.changed().await.unwrap();
    {
        let snapshot = feed.borrow_and_update().clone();
        assert_eq!(snapshot.len(), 1);
        let record = snapshot.find("u1").unwrap();
        assert_eq!(record.first_name.as_deref(), Some("Anita"));
        assert_eq!(record.dob.as_deref(), Some("1990-04-01"));
        assert_eq!(record.progress(), 50.0);
    }

    // A change on any record re-delivers the whole directory.
    records.insert_document("users", "u2", fields(json!({ "firstName": "Bimala" })));
    feed.changed().await.unwrap();
    let snapshot = feed.borrow_and_update().clone();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.revision() > 1);

    sync.stop().await;
}

#[tokio::test]
async fn second_start_is_rejected_while_running() {
    let (records, _, _, _) = harness();
    let sync = DirectorySync::new(Arc::new(records), "users");

    let _feed = sync.start().await.unwrap();
    assert!(sync.is_running().await);
    assert!(matches!(
        sync.start().await,
        Err(ConsoleError::InvalidState { .. })
    ));

    sync.stop().await;
    assert!(!sync.is_running().await);
    // After a stop the sync can be started again.
    let _feed = sync.start().await.unwrap();
    sync.stop().await;
}

#[tokio::test]
async fn no_delivery_after_stop() {
    let (records, _, _, _) = harness();
    let sync = DirectorySync::new(Arc::new(records.clone()), "users");
    let mut feed = sync.start().await.unwrap();

    feed.changed().await.unwrap();
    let before = feed.borrow_and_update().revision();

    sync.stop().await;
    records.insert_document("users", "u9", fields(json!({})));
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(!feed.has_changed().unwrap_or(false));
    assert_eq!(feed.borrow().revision(), before);

    // stop is idempotent, and safe on a sync that never started.
    sync.stop().await;
    DirectorySync::new(Arc::new(MemoryRecordStore::new()), "users")
        .stop()
        .await;
}

#[tokio::test]
async fn malformed_dates_never_hide_a_record() {
    let (records, _, _, _) = harness();
    records.insert_document(
        "users",
        "u1",
        fields(json!({ "firstName": "Anita", "dob": "circa 1990" })),
    );

    let sync = DirectorySync::new(Arc::new(records), "users");
    let mut feed = sync.start().await.unwrap();
    feed.changed().await.unwrap();

    let snapshot = feed.borrow().clone();
    let record = snapshot.find("u1").unwrap();
    assert_eq!(record.dob.as_deref(), Some("circa 1990"));

    sync.stop().await;
}

#[tokio::test]
async fn deletion_invalidates_the_cache_before_returning() {
    let (records, blobs, service, cache) = harness();
    records.insert_document("users", "u1", fields(json!({ "firstName": "Anita" })));
    seed_evidence(&blobs, "u1");

    let cached = cache.get("u1", EvidenceCategory::Document).await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(blobs.list_calls(), 1);

    let report = service.delete_record("u1").await.unwrap();
    assert!(report.is_clean());
    assert!(records.document("users", "u1").is_none());

    // The old sequence is gone; a fresh get re-queries the store.
    let fresh = cache.get("u1", EvidenceCategory::Document).await.unwrap();
    assert!(fresh.is_empty());
    assert!(blobs.list_calls() > 1);
}

#[tokio::test]
async fn cascade_tolerates_missing_categories() {
    let (records, blobs, service, _) = harness();
    records.insert_document("users", "u1", fields(json!({})));
    // Only documents were ever uploaded; the other categories have nothing.
    blobs.put_object("users/u1/document/passport.jpg", Bytes::from_static(b"p"));
    blobs.fail_listing("users/u1/liveness");

    let report = service.delete_record("u1").await.unwrap();
    assert!(report.is_clean());
    assert!(!blobs.contains("users/u1/document/passport.jpg"));
}

#[tokio::test]
async fn blob_deletion_failure_downgrades_to_a_warning() {
    let (records, blobs, service, _) = harness();
    records.insert_document("users", "u1", fields(json!({})));
    seed_evidence(&blobs, "u1");
    blobs.fail_deletion("users/u1/selfie/front.jpg");

    let report = service.delete_record("u1").await.unwrap();

    assert_eq!(report.warnings.len(), 1);
    let warning = &report.warnings[0];
    assert_eq!(warning.category, EvidenceCategory::Selfie);
    assert_eq!(warning.object, "users/u1/selfie/front.jpg");

    // The record and the other categories' blobs are gone regardless.
    assert!(records.document("users", "u1").is_none());
    assert!(!blobs.contains("users/u1/document/passport.jpg"));
    assert!(!blobs.contains("users/u1/liveness/check.mp4"));
    assert!(blobs.contains("users/u1/selfie/front.jpg"));
}

#[tokio::test]
async fn updates_forward_only_provided_fields() {
    let (records, _, service, _) = harness();
    records.insert_document(
        "users",
        "u1",
        fields(json!({
            "firstName": "Anita",
            "address": "Kathmandu",
            "email": "anita@example.com",
        })),
    );

    service
        .update_record(
            "u1",
            RecordPatch {
                address: Some("Pokhara".to_string()),
                email: Some("attacker@example.com".to_string()),
                ..RecordPatch::default()
            },
        )
        .await
        .unwrap();

    let document = records.document("users", "u1").unwrap();
    assert_eq!(document["address"], "Pokhara");
    // Untouched fields keep their value; immutable contact fields too.
    assert_eq!(document["firstName"], "Anita");
    assert_eq!(document["email"], "anita@example.com");
}

#[tokio::test]
async fn verification_toggle_flows_through_to_the_feed() {
    let (records, _, service, _) = harness();
    records.insert_document("users", "u1", fields(json!({ "firstName": "Anita" })));

    let sync = DirectorySync::new(Arc::new(records.clone()), "users");
    let mut feed = sync.start().await.unwrap();
    feed.changed().await.unwrap();
    assert_eq!(feed.borrow_and_update().find("u1").unwrap().progress(), 0.0);

    service
        .set_verification("u1", VerificationCheck::Selfie, true)
        .await
        .unwrap();

    feed.changed().await.unwrap();
    let snapshot = feed.borrow().clone();
    let record = snapshot.find("u1").unwrap();
    assert!(record.flags.selfie_verified);
    assert_eq!(record.progress(), 25.0);
    // The store stamped the write.
    assert!(record.updated_at.is_some());

    sync.stop().await;
}

#[tokio::test]
async fn updating_a_missing_record_surfaces_not_found() {
    let (_, _, service, _) = harness();
    let err = service
        .update_record(
            "ghost",
            RecordPatch {
                address: Some("Pokhara".to_string()),
                ..RecordPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::NotFound { .. }));
}
