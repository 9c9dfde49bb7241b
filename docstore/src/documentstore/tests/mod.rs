//! This contains test scenarios that a given [DocumentStore] needs to pass.
//! We use [rstest] and [rstest_reuse] to provide all stores we want to test
//! against, and then apply this template to all test functions.

use rstest::*;
use rstest_reuse::{self, *};
use serde_json::json;

use super::DocumentStore;
use crate::documentstore;
use crate::{Error, FieldPathBuf, Filter, Update, UpdateResult};

fn p(s: &str) -> FieldPathBuf {
    s.parse().unwrap()
}

/// This produces a template, which will be applied to all individual test functions.
/// See https://github.com/la10736/rstest/issues/130#issuecomment-968864832
#[template]
#[rstest]
#[case::memory(documentstore::from_addr("memory://").await.unwrap())]
#[case::redb(documentstore::from_addr("redb://").await.unwrap())]
pub fn document_stores(#[case] document_store: impl DocumentStore) {}

/// Asking for a document that doesn't exist returns Ok(None).
#[apply(document_stores)]
#[tokio::test]
async fn test_non_exist(document_store: impl DocumentStore) {
    assert_eq!(Ok(None), document_store.get("b1").await);
    assert_eq!(Ok(None), document_store.find_one(&Filter::by_id("b1")).await);
    assert_eq!(Ok(vec![]), document_store.find(&Filter::new()).await);
}

/// Inserting a document and getting it back should work.
#[apply(document_stores)]
#[tokio::test]
async fn insert_get(document_store: impl DocumentStore) {
    let document = json!({"_id": "b1", "name": "north", "children": []});

    assert_eq!(
        "b1",
        document_store.insert_one(document.clone()).await.unwrap()
    );
    assert_eq!(Some(document), document_store.get("b1").await.unwrap());
}

/// Inserting a document with an identity that's already present must fail,
/// and leave the stored document alone.
#[apply(document_stores)]
#[tokio::test]
async fn insert_duplicate(document_store: impl DocumentStore) {
    document_store
        .insert_one(json!({"_id": "b1", "name": "north"}))
        .await
        .unwrap();

    document_store
        .insert_one(json!({"_id": "b1", "name": "south"}))
        .await
        .expect_err("must fail");

    assert_eq!(
        Some(json!({"_id": "b1", "name": "north"})),
        document_store.get("b1").await.unwrap()
    );
}

/// Documents need to be objects carrying a string identity.
#[apply(document_stores)]
#[tokio::test]
async fn insert_invalid(document_store: impl DocumentStore) {
    for document in [json!({"name": "north"}), json!({"_id": 1}), json!(["b1"])] {
        assert!(matches!(
            document_store.insert_one(document).await,
            Err(Error::InvalidRequest(_))
        ));
    }
}

/// Finding by nested fields should reach into arrays.
#[apply(document_stores)]
#[tokio::test]
async fn find_nested(document_store: impl DocumentStore) {
    let b1 = json!({"_id": "b1", "children": [{"_id": "r1", "children": [{"_id": "o1"}]}]});
    let b2 = json!({"_id": "b2", "children": [{"_id": "r2", "children": []}]});
    document_store.insert_one(b1.clone()).await.unwrap();
    document_store.insert_one(b2.clone()).await.unwrap();

    assert_eq!(
        Some(b1.clone()),
        document_store
            .find_one(&Filter::new().eq(p("children.children._id"), "o1"))
            .await
            .unwrap()
    );
    assert_eq!(
        Some(b2.clone()),
        document_store
            .find_one(&Filter::new().eq(p("children._id"), "r2"))
            .await
            .unwrap()
    );
    assert_eq!(
        vec![b1, b2],
        document_store.find(&Filter::new()).await.unwrap()
    );
}

/// Updates only apply if the filter matches, and report what happened.
#[apply(document_stores)]
#[tokio::test]
async fn update_guarded(document_store: impl DocumentStore) {
    document_store
        .insert_one(json!({"_id": "b1", "children": [{"_id": "r1"}]}))
        .await
        .unwrap();

    let guard = Filter::by_id("b1")
        .eq(p("children.0._id"), "r1")
        .exists(p("children.0.deleted_at"), false);
    let update = Update::new().set(p("children.0.deleted_at"), "t1");

    assert_eq!(
        UpdateResult::matched(true),
        document_store.update_one(&guard, &update).await.unwrap()
    );
    assert_eq!(
        Some(json!({"_id": "b1", "children": [{"_id": "r1", "deleted_at": "t1"}]})),
        document_store.get("b1").await.unwrap()
    );

    // the guard doesn't hold anymore.
    assert_eq!(
        UpdateResult::NOT_MATCHED,
        document_store.update_one(&guard, &update).await.unwrap()
    );

    // matching, but not modifying anything.
    assert_eq!(
        UpdateResult::matched(false),
        document_store
            .update_one(&Filter::by_id("b1"), &update)
            .await
            .unwrap()
    );
}

/// A failing update must not leave a partially modified document behind.
#[apply(document_stores)]
#[tokio::test]
async fn update_failing(document_store: impl DocumentStore) {
    let document = json!({"_id": "b1", "children": []});
    document_store.insert_one(document.clone()).await.unwrap();

    let update = Update::new()
        .set(p("name"), "north")
        .set(p("children.3.deleted_at"), "t1");
    document_store
        .update_one(&Filter::by_id("b1"), &update)
        .await
        .expect_err("must fail");

    assert_eq!(Some(document), document_store.get("b1").await.unwrap());
}

#[apply(document_stores)]
#[tokio::test]
async fn delete(document_store: impl DocumentStore) {
    document_store
        .insert_one(json!({"_id": "b1"}))
        .await
        .unwrap();

    assert!(!document_store.delete_one(&Filter::by_id("b2")).await.unwrap());
    assert!(document_store.delete_one(&Filter::by_id("b1")).await.unwrap());
    assert_eq!(Ok(None), document_store.get("b1").await);
}
