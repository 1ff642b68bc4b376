//! Blob store surface and its in-memory backend.

pub mod api;
pub mod error;
pub mod local;
pub mod types;

pub use api::{FirebaseStorage, ProgressFn};
pub use error::{StorageError, StorageErrorCode, StorageResult};
pub use local::LocalStorage;
pub use types::{ListResult, StorageMetadata};
