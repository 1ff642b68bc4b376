use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use log::debug;

use crate::storage::api::{FirebaseStorage, ProgressFn};
use crate::storage::error::{object_not_found, unknown, StorageResult};
use crate::storage::types::{ListResult, StorageMetadata};

const DEFAULT_BUCKET: &str = "local-bucket";

enum Node {
    File {
        bytes: Bytes,
        metadata: StorageMetadata,
    },
    Folder {
        children: BTreeMap<String, Node>,
    },
}

impl Node {
    fn kind(&self) -> &'static str {
        match self {
            Node::File { .. } => "file",
            Node::Folder { .. } => "folder",
        }
    }
}

fn split_path(path: &str) -> StorageResult<Vec<&str>> {
    if path.is_empty() || path.split('/').any(str::is_empty) {
        return Err(unknown(format!("Invalid storage path: '{path}'")));
    }
    Ok(path.split('/').collect())
}

fn resolve<'a>(root: &'a BTreeMap<String, Node>, segments: &[&str]) -> Option<&'a Node> {
    let (first, rest) = segments.split_first()?;
    let mut node = root.get(*first)?;
    for segment in rest {
        match node {
            Node::Folder { children } => node = children.get(*segment)?,
            Node::File { .. } => return None,
        }
    }
    Some(node)
}

/// In-memory blob store.
///
/// Objects live in a folder tree rooted at an unnamed folder; folders are
/// materialized as object paths are written and never deleted on their own.
#[derive(Clone)]
pub struct LocalStorage {
    inner: Arc<Mutex<BTreeMap<String, Node>>>,
    bucket: String,
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::with_bucket(DEFAULT_BUCKET)
    }
}

impl LocalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BTreeMap::new())),
            bucket: bucket.into(),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, BTreeMap<String, Node>>> {
        self.inner
            .lock()
            .map_err(|_| unknown("Storage tree lock poisoned"))
    }

    fn file_metadata(&self, path: &str) -> StorageResult<StorageMetadata> {
        let segments = split_path(path)?;
        let tree = self.lock()?;
        match resolve(&tree, &segments) {
            Some(Node::File { metadata, .. }) => Ok(metadata.clone()),
            _ => Err(object_not_found(format!("No object stored at '{path}'"))),
        }
    }
}

#[async_trait]
impl FirebaseStorage for LocalStorage {
    async fn delete_file(&self, path: &str) -> StorageResult<()> {
        let segments = split_path(path)?;
        let mut tree = self.lock()?;
        let missing = || object_not_found(format!("No object stored at '{path}'"));

        let (leaf, folders) = segments.split_last().ok_or_else(missing)?;
        let mut children = &mut *tree;
        for segment in folders {
            match children.get_mut(*segment) {
                Some(Node::Folder {
                    children: next_children,
                }) => children = next_children,
                _ => return Err(missing()),
            }
        }
        match children.get(*leaf) {
            Some(Node::File { .. }) => {
                children.remove(*leaf);
                debug!("deleted object {path}");
                Ok(())
            }
            _ => Err(missing()),
        }
    }

    async fn get_bytes(&self, path: &str, max_download_size: u64) -> StorageResult<Bytes> {
        let segments = split_path(path)?;
        let tree = self.lock()?;
        match resolve(&tree, &segments) {
            Some(Node::File { bytes, .. }) => {
                if bytes.len() as u64 > max_download_size {
                    return Err(unknown(format!(
                        "Object at '{path}' is {} bytes, larger than the maximum download size {max_download_size}",
                        bytes.len()
                    )));
                }
                Ok(bytes.clone())
            }
            _ => Err(object_not_found(format!("No object stored at '{path}'"))),
        }
    }

    async fn get_download_url(&self, path: &str) -> StorageResult<String> {
        self.file_metadata(path)?;
        Ok(format!("http://localhost/v0/b/{}/o/{path}", self.bucket))
    }

    async fn get_metadata(&self, path: &str) -> StorageResult<StorageMetadata> {
        self.file_metadata(path)
    }

    async fn list(
        &self,
        path: &str,
        max_results: Option<usize>,
        page_token: Option<&str>,
    ) -> StorageResult<ListResult> {
        let tree = self.lock()?;
        let children = if path.is_empty() {
            Some(&*tree)
        } else {
            match resolve(&tree, &split_path(path)?) {
                Some(Node::Folder { children }) => Some(children),
                _ => None,
            }
        };
        let names: Vec<String> = children
            .map(|children| {
                children
                    .keys()
                    .map(|name| {
                        if path.is_empty() {
                            name.clone()
                        } else {
                            format!("{path}/{name}")
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| unknown(format!("Invalid page token: '{token}'")))?,
            None => 0,
        };
        let remaining = names.len().saturating_sub(offset);
        let take = max_results.unwrap_or(remaining).min(remaining);
        let items: Vec<String> = names.into_iter().skip(offset).take(take).collect();
        let next = offset + items.len();
        let page_token = (remaining > take).then(|| next.to_string());
        Ok(ListResult { items, page_token })
    }

    async fn put_bytes(
        &self,
        path: &str,
        bytes: Bytes,
        metadata: Option<StorageMetadata>,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> StorageResult<StorageMetadata> {
        let segments = split_path(path)?;
        let mut tree = self.lock()?;

        let (leaf, folders) = match segments.split_last() {
            Some(parts) => parts,
            None => return Err(unknown(format!("Invalid storage path: '{path}'"))),
        };
        let mut children = &mut *tree;
        for segment in folders {
            let node = children.entry(segment.to_string()).or_insert(Node::Folder {
                children: BTreeMap::new(),
            });
            match node {
                Node::Folder {
                    children: next_children,
                } => children = next_children,
                Node::File { .. } => {
                    return Err(unknown(format!(
                        "A file already exists along the path at '{segment}'"
                    )))
                }
            }
        }
        if let Some(existing) = children.get(*leaf) {
            return Err(unknown(format!(
                "A {} already exists at '{path}'",
                existing.kind()
            )));
        }

        // Coarse progress simulation: one callback per byte index, then the
        // final full-size call.
        if let Some(progress) = on_progress {
            let total = bytes.len() as u64;
            for transferred in 0..total {
                progress(transferred, total);
            }
            progress(total, total);
        }

        let now = Utc::now();
        let mut metadata = metadata.unwrap_or_default();
        metadata.bucket = Some(self.bucket.clone());
        metadata.name = Some(leaf.to_string());
        metadata.path = path.to_string();
        metadata.size = bytes.len() as u64;
        metadata.creation_time = Some(now);
        metadata.updated_time = Some(now);
        metadata.generation = 1;
        metadata.metadata_generation = 1;

        debug!("stored {} bytes at {path}", bytes.len());
        children.insert(
            leaf.to_string(),
            Node::File {
                bytes,
                metadata: metadata.clone(),
            },
        );
        Ok(metadata)
    }

    async fn update_metadata(
        &self,
        path: &str,
        incoming: StorageMetadata,
    ) -> StorageResult<StorageMetadata> {
        let segments = split_path(path)?;
        let mut tree = self.lock()?;

        let mut node = match segments.split_first() {
            Some((first, _)) => tree.get_mut(*first),
            None => None,
        };
        for segment in &segments[1..] {
            node = match node {
                Some(Node::Folder { children }) => children.get_mut(*segment),
                _ => None,
            };
        }
        let Some(Node::File { metadata, .. }) = node else {
            return Err(object_not_found(format!("No object stored at '{path}'")));
        };

        metadata.cache_control = incoming.cache_control;
        metadata.content_disposition = incoming.content_disposition;
        metadata.content_encoding = incoming.content_encoding;
        metadata.content_language = incoming.content_language;
        metadata.content_type = incoming.content_type;
        metadata.custom_metadata = incoming.custom_metadata;
        metadata.metadata_generation += 1;
        metadata.updated_time = Some(Utc::now());
        Ok(metadata.clone())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let storage = LocalStorage::new();
        let metadata = storage
            .put_bytes("photos/cat.png", Bytes::from_static(b"meow"), None, None)
            .await
            .unwrap();
        assert_eq!(metadata.size, 4);
        assert_eq!(metadata.name.as_deref(), Some("cat.png"));
        assert_eq!(metadata.path, "photos/cat.png");
        assert_eq!(metadata.bucket.as_deref(), Some("local-bucket"));

        let bytes = storage.get_bytes("photos/cat.png", 1024).await.unwrap();
        assert_eq!(&bytes[..], b"meow");
    }

    #[tokio::test]
    async fn put_rejects_existing_nodes() {
        let storage = LocalStorage::new();
        storage
            .put_bytes("photos/cat.png", Bytes::from_static(b"meow"), None, None)
            .await
            .unwrap();

        let err = storage
            .put_bytes("photos/cat.png", Bytes::from_static(b"again"), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "storage/unknown");
        assert!(err.to_string().contains("file"));

        let err = storage
            .put_bytes("photos", Bytes::from_static(b"x"), None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("folder"));

        let err = storage
            .put_bytes("photos/cat.png/inner", Bytes::from_static(b"x"), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "storage/unknown");
    }

    #[tokio::test]
    async fn get_bytes_enforces_the_download_ceiling() {
        let storage = LocalStorage::new();
        storage
            .put_bytes("blob", Bytes::from_static(b"0123456789"), None, None)
            .await
            .unwrap();

        let err = storage.get_bytes("blob", 5).await.unwrap_err();
        assert_eq!(err.code_str(), "storage/unknown");
        storage.get_bytes("blob", 10).await.unwrap();
    }

    #[tokio::test]
    async fn missing_objects_are_object_not_found() {
        let storage = LocalStorage::new();
        let err = storage.get_bytes("nope", 10).await.unwrap_err();
        assert_eq!(err.code_str(), "storage/object-not-found");
        let err = storage.get_metadata("nope").await.unwrap_err();
        assert_eq!(err.code_str(), "storage/object-not-found");
        let err = storage.delete_file("nope").await.unwrap_err();
        assert_eq!(err.code_str(), "storage/object-not-found");
    }

    #[tokio::test]
    async fn delete_removes_the_object() {
        let storage = LocalStorage::new();
        storage
            .put_bytes("a/b", Bytes::from_static(b"x"), None, None)
            .await
            .unwrap();
        storage.delete_file("a/b").await.unwrap();
        let err = storage.get_metadata("a/b").await.unwrap_err();
        assert_eq!(err.code_str(), "storage/object-not-found");
    }

    #[tokio::test]
    async fn progress_runs_per_byte_plus_final_call() {
        let storage = LocalStorage::new();
        let calls = AtomicU64::new(0);
        let final_seen = AtomicU64::new(0);
        storage
            .put_bytes(
                "blob",
                Bytes::from_static(b"abc"),
                None,
                Some(&|transferred, total| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if transferred == total {
                        final_seen.store(total, Ordering::SeqCst);
                    }
                }),
            )
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(final_seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn update_metadata_bumps_the_metadata_generation() {
        let storage = LocalStorage::new();
        storage
            .put_bytes("blob", Bytes::from_static(b"x"), None, None)
            .await
            .unwrap();

        let mut incoming = StorageMetadata::default();
        incoming.content_type = Some("text/plain".into());
        let updated = storage.update_metadata("blob", incoming).await.unwrap();
        assert_eq!(updated.metadata_generation, 2);
        assert_eq!(updated.content_type.as_deref(), Some("text/plain"));
        assert_eq!(updated.size, 1);
    }

    #[tokio::test]
    async fn list_pages_through_folder_entries() {
        let storage = LocalStorage::new();
        for name in ["a", "b", "c"] {
            storage
                .put_bytes(&format!("dir/{name}"), Bytes::from_static(b"x"), None, None)
                .await
                .unwrap();
        }

        let page = storage.list("dir", Some(2), None).await.unwrap();
        assert_eq!(page.items, vec!["dir/a", "dir/b"]);
        let token = page.page_token.unwrap();

        let page = storage.list("dir", Some(2), Some(&token)).await.unwrap();
        assert_eq!(page.items, vec!["dir/c"]);
        assert!(page.page_token.is_none());

        let empty = storage.list("elsewhere", None, None).await.unwrap();
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn download_url_names_the_bucket_and_path() {
        let storage = LocalStorage::with_bucket("pics");
        storage
            .put_bytes("a/b", Bytes::from_static(b"x"), None, None)
            .await
            .unwrap();
        let url = storage.get_download_url("a/b").await.unwrap();
        assert!(url.contains("pics"));
        assert!(url.contains("a/b"));
    }
}
