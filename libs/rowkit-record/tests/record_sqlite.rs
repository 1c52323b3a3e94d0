#![allow(clippy::unwrap_used, clippy::expect_used)]
#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use common::{Article, Counter, env};
use rowkit_db::Driver;
use rowkit_record::{DbValue, Env, FixedSubject, Record, RecordError};
use tracing_test::traced_test;

#[tokio::test]
async fn round_trips_coerced_values_through_storage() {
    let env = env().await;

    let mut article = Record::<Article>::with_fields(serde_json::json!({
        "title": "typed fields",
        "published": true,
        "views": "7",
        "meta": { "tags": ["a", "b"] }
    }))
    .unwrap();
    // string input was coerced on assignment
    assert_eq!(article.get("views"), Some(&DbValue::Int(7)));
    assert!(article.save(&env).await.unwrap());

    let id = article.id().unwrap().clone();
    let reloaded = Record::<Article>::find(&env, id).await.unwrap().unwrap();

    // boolean true persists and reloads as boolean true, not "1"
    assert_eq!(reloaded.get("published"), Some(&DbValue::Bool(true)));
    assert_eq!(reloaded.get("views"), Some(&DbValue::Int(7)));
    assert_eq!(
        reloaded.get("meta"),
        Some(&DbValue::Json(serde_json::json!({ "tags": ["a", "b"] })))
    );
    assert!(matches!(reloaded.get("created_at"), Some(DbValue::DateTime(_))));
    assert!(!reloaded.is_new());
    assert!(!reloaded.is_dirty());
}

#[tokio::test]
async fn lifecycle_walks_new_persisted_new() {
    let env = env().await;

    let mut article = common::article("lifecycle");
    assert!(article.is_new());
    assert!(article.id().is_none());

    assert!(article.save(&env).await.unwrap());
    assert!(!article.is_new());
    assert!(article.id().is_some());
    assert!(!article.is_dirty());

    article.destroy(&env).await.unwrap();
    assert!(article.is_new());

    // destroying twice is a no-op, not an error
    article.destroy(&env).await.unwrap();
    assert!(article.is_new());
}

#[tokio::test]
async fn uuid_ids_are_generated_client_side_on_first_save_only() {
    let env = env().await;

    let mut article = common::article("id once");
    assert!(article.save(&env).await.unwrap());
    let first_id = article.id().unwrap().clone();
    assert!(matches!(first_id, DbValue::Uuid(_)));

    article.set_field("views", 5).unwrap();
    assert!(article.save(&env).await.unwrap());
    assert_eq!(article.id(), Some(&first_id));
}

#[tokio::test]
async fn dirty_tracking_follows_value_changes() {
    let env = env().await;

    let mut article = common::article("dirty");
    assert!(article.save(&env).await.unwrap());
    assert!(!article.is_dirty());

    // assigning the stored value is not a change
    article.set_field("title", "dirty").unwrap();
    assert!(!article.is_dirty());

    article.set_field("title", "dirtier").unwrap();
    assert_eq!(article.dirty_fields(), ["title"]);

    assert!(article.save(&env).await.unwrap());
    assert!(!article.is_dirty());

    let reloaded = Record::<Article>::find(&env, article.id().unwrap().clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.get("title"), Some(&DbValue::Text("dirtier".into())));
}

#[tokio::test]
async fn saving_a_clean_persisted_record_is_a_no_io_success() {
    let env = env().await;

    // Counter declares no lifecycle fields, so a second save has nothing
    // to write and succeeds without touching the database
    let mut counter = Record::<Counter>::with_fields(serde_json::json!({ "label": "x" })).unwrap();
    assert!(counter.save(&env).await.unwrap());
    assert!(!counter.is_dirty());
    assert!(counter.save(&env).await.unwrap());
    assert!(!counter.is_new());
}

#[tokio::test]
async fn validation_failure_blocks_the_save() {
    let env = env().await;

    let mut article = Record::<Article>::new();
    assert_eq!(article.save(&env).await.unwrap(), false);
    assert!(article.is_new());
    assert_eq!(article.errors_on("title"), ["must not be blank"]);

    // fixing the field clears the verdict on the next check
    article.set_field("title", "present").unwrap();
    assert!(article.save(&env).await.unwrap());
    assert!(article.errors().is_empty());
}

#[tokio::test]
async fn failed_insert_rolls_back_stamped_fields_exactly() {
    let env = env().await;

    // bypass validation so the NOT NULL constraint fires in the engine
    let mut article = Record::<Article>::new();
    assert_eq!(article.save_with(&env, false).await.unwrap(), false);

    // the speculative id and timestamps were rolled back
    assert!(article.is_new());
    assert!(article.id().is_none());
    assert_eq!(article.get("created_at"), None);
    assert_eq!(article.get("updated_at"), None);
}

#[tokio::test]
async fn failed_update_rolls_back_stamps_and_keeps_state() {
    let env = env().await;

    let mut article = common::article("stable");
    assert!(article.save(&env).await.unwrap());
    let stamped_at = article.get("updated_at").cloned();

    // NULL title violates the NOT NULL constraint at the engine
    article.set_field("title", DbValue::Null).unwrap();
    assert_eq!(article.save_with(&env, false).await.unwrap(), false);

    // still persisted, the caller's change is still pending, and the
    // speculative updated_at was restored exactly
    assert!(!article.is_new());
    assert_eq!(article.dirty_fields(), ["title"]);
    assert_eq!(article.get("updated_at").cloned(), stamped_at);
}

#[tokio::test]
async fn audit_fields_record_the_current_subject() {
    let registry = common::registry().await;
    let env = Env::with_subject(
        registry,
        Arc::new(FixedSubject(DbValue::Text("user-1".into()))),
    );

    let mut article = common::article("audited");
    assert!(article.save(&env).await.unwrap());
    assert_eq!(article.get("created_by"), Some(&DbValue::Text("user-1".into())));
    assert_eq!(article.get("updated_by"), Some(&DbValue::Text("user-1".into())));
}

#[test]
#[traced_test]
fn bulk_update_skips_protected_fields_with_a_warning() {
    let mut article = common::article("guarded");
    let before = article.get("id").cloned();

    article
        .update_properties(serde_json::json!({
            "id": "11111111-2222-3333-4444-555555555555",
            "title": "retitled",
            "draft_note": "only transient"
        }))
        .unwrap();

    // the protected field kept its value, the rest landed
    assert_eq!(article.get("id").cloned(), before);
    assert_eq!(article.get("title"), Some(&DbValue::Text("retitled".into())));
    assert_eq!(
        article.get_transient("draft_note"),
        Some(&DbValue::Text("only transient".into()))
    );
    assert!(logs_contain("filtering out protected field"));
}

#[test]
fn bulk_update_rejects_unknown_properties() {
    let mut article = common::article("strict");
    let err = article
        .update_properties(serde_json::json!({ "no_such_field": 1 }))
        .unwrap_err();
    assert!(matches!(err, RecordError::UnknownProperty(name) if name == "no_such_field"));
}

#[tokio::test]
async fn destroy_failure_is_fatal() {
    let env = env().await;

    let mut counter = Record::<Counter>::with_fields(serde_json::json!({ "label": "x" })).unwrap();
    assert!(counter.save(&env).await.unwrap());

    // sabotage: drop the table so the DELETE fails
    let driver = env.db().driver_or_err(rowkit_db::DEFAULT_PROFILE).unwrap();
    driver
        .execute("DROP TABLE counters", &rowkit_record::Params::new())
        .await
        .unwrap();

    let err = counter.destroy(&env).await.unwrap_err();
    assert!(matches!(err, RecordError::DestroyFailed { .. }));
    // failed destroy leaves the lifecycle state unchanged
    assert!(!counter.is_new());
}

#[tokio::test]
async fn defaults_apply_to_unset_fields_only() {
    let env = env().await;

    let mut article = Record::<Article>::with_fields(serde_json::json!({
        "title": "defaults",
        "views": 9
    }))
    .unwrap();
    assert_eq!(article.get("views"), Some(&DbValue::Int(9)));
    assert_eq!(article.get("published"), Some(&DbValue::Bool(false)));
    assert!(article.save(&env).await.unwrap());

    let reloaded = Record::<Article>::find(&env, article.id().unwrap().clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.get("views"), Some(&DbValue::Int(9)));
    assert_eq!(reloaded.get("published"), Some(&DbValue::Bool(false)));
}

#[tokio::test]
async fn find_returns_none_for_absent_ids() {
    let env = env().await;
    let absent = Record::<Article>::find(&env, uuid::Uuid::new_v4())
        .await
        .unwrap();
    assert!(absent.is_none());
}
