use flare::firestore::{
    Changes, FirebaseFirestore, FirestoreValue, LocalFirestore, Merge, Query, Source,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Dog {
    name: String,
    age: i64,
}

fn hailey() -> Dog {
    Dog {
        name: "Hailey".into(),
        age: 1,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn set_round_trips_through_a_nested_collection() {
    let store = LocalFirestore::new();
    store
        .set_document("test/42/dogs/Hailey", &hailey(), Merge::None)
        .await
        .unwrap();

    let snapshot = store
        .get_collection_once("test/42/dogs", Query::new(), Source::Default)
        .await
        .unwrap();
    assert_eq!(snapshot.len(), 1);
    let dogs: Vec<Dog> = snapshot.data().unwrap();
    assert_eq!(dogs, vec![hailey()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_makes_the_document_unreadable() {
    let store = LocalFirestore::new();
    store
        .set_document("dogs/Hailey", &hailey(), Merge::None)
        .await
        .unwrap();
    store.delete_document("dogs/Hailey").await.unwrap();

    let err = store
        .get_document_once("dogs/Hailey", Source::Default)
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "firestore/not-found");
}

#[tokio::test(flavor = "multi_thread")]
async fn two_increments_add_up() {
    let store = LocalFirestore::new();
    store
        .set_document("dogs/Hailey", &hailey(), Merge::None)
        .await
        .unwrap();

    for _ in 0..2 {
        let mut changes = Changes::new();
        changes.increment("age", 3).unwrap();
        store.update_document("dogs/Hailey", changes).await.unwrap();
    }

    let snapshot = store
        .get_document_once("dogs/Hailey", Source::Default)
        .await
        .unwrap();
    assert_eq!(snapshot.get("age"), Some(&FirestoreValue::from_integer(7)));
}

#[tokio::test(flavor = "multi_thread")]
async fn union_then_remove_cancel_out_across_writes() {
    let store = LocalFirestore::new();
    store
        .set_document("dogs/Hailey", &hailey(), Merge::None)
        .await
        .unwrap();

    // Both transforms on one field in a single write step are rejected.
    let mut changes = Changes::new();
    changes
        .array_union("toys", vec![FirestoreValue::from_string("ball")])
        .unwrap();
    let err = changes
        .array_remove("toys", vec![FirestoreValue::from_string("ball")])
        .unwrap_err();
    assert_eq!(err.code_str(), "firestore/invalid-argument");

    let mut changes = Changes::new();
    changes
        .array_union(
            "toys",
            vec![
                FirestoreValue::from_string("ball"),
                FirestoreValue::from_string("rope"),
            ],
        )
        .unwrap();
    store.update_document("dogs/Hailey", changes).await.unwrap();

    let mut changes = Changes::new();
    changes
        .array_remove("toys", vec![FirestoreValue::from_string("ball")])
        .unwrap();
    store.update_document("dogs/Hailey", changes).await.unwrap();

    let snapshot = store
        .get_document_once("dogs/Hailey", Source::Default)
        .await
        .unwrap();
    assert_eq!(
        snapshot.get("toys"),
        Some(&FirestoreValue::from_array(vec![
            FirestoreValue::from_string("rope"),
        ]))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn two_inequality_fields_fail_at_clause_time() {
    let err = Query::new()
        .where_greater_than("age", 1_i64)
        .unwrap()
        .where_less_than("weight", 10_i64)
        .unwrap_err();
    assert_eq!(err.code_str(), "firestore/invalid-argument");
}

#[tokio::test(flavor = "multi_thread")]
async fn document_stream_tracks_writes() {
    let store = LocalFirestore::new();
    store
        .set_document("dogs/Hailey", &hailey(), Merge::None)
        .await
        .unwrap();

    let stream = store.get_document("dogs/Hailey").await.unwrap();
    let initial = stream.recv().await.unwrap();
    assert_eq!(initial.get("age"), Some(&FirestoreValue::from_integer(1)));

    store
        .set_document(
            "dogs/Hailey",
            &Dog {
                name: "Hailey".into(),
                age: 2,
            },
            Merge::All,
        )
        .await
        .unwrap();
    let updated = stream.recv().await.unwrap();
    assert_eq!(updated.get("age"), Some(&FirestoreValue::from_integer(2)));
}
