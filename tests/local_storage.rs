use bytes::Bytes;
use flare::storage::{FirebaseStorage, LocalStorage};

#[tokio::test(flavor = "multi_thread")]
async fn bytes_round_trip_under_the_exact_ceiling() {
    let storage = LocalStorage::new();
    let payload = Bytes::from_static(b"hello blob");

    storage
        .put_bytes("u/file.txt", payload.clone(), None, None)
        .await
        .unwrap();

    let read = storage
        .get_bytes("u/file.txt", payload.len() as u64)
        .await
        .unwrap();
    assert_eq!(read, payload);

    let err = storage
        .get_bytes("u/file.txt", payload.len() as u64 - 1)
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "storage/unknown");
}
