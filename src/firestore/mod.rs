//! Document store surface and its in-memory backend.
//!
//! [`FirebaseFirestore`] is the abstract surface; [`LocalFirestore`] serves it
//! entirely from memory with live snapshot streams, transform sentinels and
//! query evaluation, which makes it a drop-in backend for tests.

pub mod api;
pub mod codec;
pub mod error;
pub mod local;
pub mod path;
pub mod query;
pub mod value;

pub use api::{
    Changes, CollectionSnapshot, CollectionStream, DocumentSnapshot, DocumentStream,
    FirebaseFirestore, Merge, Source,
};
pub use codec::{decode_document, decode_value, encode_document, encode_value, DOC_ID};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use local::LocalFirestore;
pub use path::ResourcePath;
pub use query::{Direction, Query};
pub use value::{Blob, DocumentData, FirestoreValue, SentinelValue, ValueKind};
