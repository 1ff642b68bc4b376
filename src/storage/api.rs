use async_trait::async_trait;
use bytes::Bytes;

use crate::storage::error::StorageResult;
use crate::storage::types::{ListResult, StorageMetadata};

/// Transfer progress callback: `(bytes_transferred, total_bytes)`. Borrowed
/// callbacks are accepted, so callers can capture local state.
pub type ProgressFn<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

/// The blob store surface. Paths are slash-delimited folder routes ending in
/// an object name.
#[async_trait]
pub trait FirebaseStorage: Send + Sync {
    /// Removes an object. Fails with an object-not-found error if the path
    /// does not name a stored object.
    async fn delete_file(&self, path: &str) -> StorageResult<()>;

    /// Reads an object's bytes, failing if they exceed `max_download_size`.
    async fn get_bytes(&self, path: &str, max_download_size: u64) -> StorageResult<Bytes>;

    async fn get_download_url(&self, path: &str) -> StorageResult<String>;

    async fn get_metadata(&self, path: &str) -> StorageResult<StorageMetadata>;

    /// Lists the entries directly under a folder path, paged by
    /// `max_results` with an opaque continuation token.
    async fn list(
        &self,
        path: &str,
        max_results: Option<usize>,
        page_token: Option<&str>,
    ) -> StorageResult<ListResult>;

    /// Stores an object at a fresh path, creating intermediate folders.
    /// Writing over an existing object or folder is an error.
    async fn put_bytes(
        &self,
        path: &str,
        bytes: Bytes,
        metadata: Option<StorageMetadata>,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> StorageResult<StorageMetadata>;

    /// Replaces the caller-settable metadata fields of an object.
    async fn update_metadata(
        &self,
        path: &str,
        metadata: StorageMetadata,
    ) -> StorageResult<StorageMetadata>;

    fn bucket(&self) -> &str;
}
