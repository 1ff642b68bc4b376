use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use serde::Serialize;

use crate::firestore::api::{
    Changes, CollectionSnapshot, CollectionStream, DocumentSnapshot, DocumentStream,
    FirebaseFirestore, Merge, Source,
};
use crate::firestore::codec::encode_document;
use crate::firestore::error::{internal_error, invalid_argument, not_found, FirestoreResult};
use crate::firestore::path::ResourcePath;
use crate::firestore::query::Query;
use crate::firestore::value::{DocumentData, FirestoreValue, SentinelValue, ValueKind};

#[derive(Default)]
struct DocumentNode {
    data: DocumentData,
    collections: BTreeMap<String, CollectionNode>,
    watchers: Vec<async_channel::Sender<DocumentSnapshot>>,
}

#[derive(Default)]
struct CollectionNode {
    documents: BTreeMap<String, DocumentNode>,
    watchers: Vec<(Query, async_channel::Sender<CollectionSnapshot>)>,
}

impl CollectionNode {
    fn snapshots(&self) -> Vec<DocumentSnapshot> {
        self.documents
            .iter()
            .map(|(id, node)| DocumentSnapshot::new(id.clone(), node.data.clone()))
            .collect()
    }
}

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, CollectionNode>,
}

impl Inner {
    /// Walks to the collection the path names, materializing missing nodes
    /// along the way.
    fn collection_mut(&mut self, path: &ResourcePath) -> &mut CollectionNode {
        let segments = path.segments();
        let mut collection = self
            .collections
            .entry(segments[0].clone())
            .or_default();
        let mut rest = &segments[1..];
        while let [document, child, tail @ ..] = rest {
            collection = collection
                .documents
                .entry(document.clone())
                .or_default()
                .collections
                .entry(child.clone())
                .or_default();
            rest = tail;
        }
        collection
    }

    /// Walks to the document the path names without creating anything.
    fn document(&self, path: &ResourcePath) -> Option<&DocumentNode> {
        let segments = path.segments();
        let mut collection = self.collections.get(&segments[0])?;
        let mut rest = &segments[1..];
        loop {
            match rest {
                [document] => return collection.documents.get(document),
                [document, child, tail @ ..] => {
                    collection = collection
                        .documents
                        .get(document)?
                        .collections
                        .get(child)?;
                    rest = tail;
                }
                [] => return None,
            }
        }
    }

    fn document_mut(&mut self, path: &ResourcePath) -> Option<&mut DocumentNode> {
        let segments = path.segments();
        let mut collection = self.collections.get_mut(&segments[0])?;
        let mut rest = &segments[1..];
        loop {
            match rest {
                [document] => return collection.documents.get_mut(document),
                [document, child, tail @ ..] => {
                    collection = collection
                        .documents
                        .get_mut(document)?
                        .collections
                        .get_mut(child)?;
                    rest = tail;
                }
                [] => return None,
            }
        }
    }

    fn collection(&self, path: &ResourcePath) -> Option<&CollectionNode> {
        let segments = path.segments();
        let mut collection = self.collections.get(&segments[0])?;
        let mut rest = &segments[1..];
        while let [document, child, tail @ ..] = rest {
            collection = collection
                .documents
                .get(document)?
                .collections
                .get(child)?;
            rest = tail;
        }
        Some(collection)
    }

    /// Applies writes to the named document, creating it and any missing
    /// ancestors, then notifies document and parent collection watchers.
    fn write_document<F>(&mut self, path: &ResourcePath, mutate: F) -> FirestoreResult<()>
    where
        F: FnOnce(&mut DocumentData) -> FirestoreResult<()>,
    {
        let id = path.id().to_string();
        let collection = self.collection_mut(&path.parent());
        let node = collection.documents.entry(id.clone()).or_default();
        mutate(&mut node.data)?;

        let snapshot = DocumentSnapshot::new(id, node.data.clone());
        node.watchers
            .retain(|sender| sender.try_send(snapshot.clone()).is_ok());
        notify_collection(collection, path.parent().id());
        Ok(())
    }
}

fn notify_collection(collection: &mut CollectionNode, id: &str) {
    if collection.watchers.is_empty() {
        return;
    }
    let snapshots = collection.snapshots();
    collection.watchers.retain(|(query, sender)| {
        let snapshot = CollectionSnapshot::new(id, query.apply(snapshots.clone()));
        sender.try_send(snapshot).is_ok()
    });
}

/// Applies one field write, expanding transform sentinels against the
/// current field value.
fn apply_field(data: &mut DocumentData, field: String, value: FirestoreValue) {
    let sentinel = match value.into_kind() {
        ValueKind::Sentinel(sentinel) => sentinel,
        kind => {
            data.insert(field, FirestoreValue::from_kind(kind));
            return;
        }
    };
    match sentinel {
        SentinelValue::ServerTimestamp => {
            data.insert(field, FirestoreValue::from_timestamp(Utc::now()));
        }
        SentinelValue::Delete => {
            data.remove(&field);
        }
        SentinelValue::ArrayUnion(values) => match data.get_mut(&field) {
            Some(existing) => match existing.kind_mut() {
                ValueKind::Array(elements) => {
                    for value in values {
                        if !elements.contains(&value) {
                            elements.push(value);
                        }
                    }
                }
                _ => *existing = FirestoreValue::from_array(values),
            },
            None => {
                data.insert(field, FirestoreValue::from_array(values));
            }
        },
        SentinelValue::ArrayRemove(values) => {
            if let Some(existing) = data.get_mut(&field) {
                if let ValueKind::Array(elements) = existing.kind_mut() {
                    elements.retain(|element| !values.contains(element));
                }
            }
        }
        SentinelValue::IncrementInteger(amount) => {
            let next = match data.get(&field).map(FirestoreValue::kind) {
                Some(ValueKind::Integer(current)) => {
                    FirestoreValue::from_integer(current.wrapping_add(amount))
                }
                Some(ValueKind::Double(current)) => {
                    FirestoreValue::from_double(current + amount as f64)
                }
                _ => FirestoreValue::from_integer(amount),
            };
            data.insert(field, next);
        }
        SentinelValue::IncrementDouble(amount) => {
            let next = match data.get(&field).map(FirestoreValue::kind) {
                Some(ValueKind::Integer(current)) => {
                    FirestoreValue::from_double(*current as f64 + amount)
                }
                Some(ValueKind::Double(current)) => FirestoreValue::from_double(current + amount),
                _ => FirestoreValue::from_double(amount),
            };
            data.insert(field, next);
        }
    }
}

/// In-memory Firestore backend.
///
/// Documents live in a tree of alternating collection and document nodes,
/// created lazily as paths are written or subscribed. Clones share the same
/// store.
#[derive(Clone, Default)]
pub struct LocalFirestore {
    inner: Arc<Mutex<Inner>>,
}

impl LocalFirestore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> FirestoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| internal_error("Firestore store lock poisoned"))
    }
}

#[async_trait]
impl FirebaseFirestore for LocalFirestore {
    async fn get_document_once(
        &self,
        path: &str,
        _source: Source,
    ) -> FirestoreResult<DocumentSnapshot> {
        let path = ResourcePath::document(path)?;
        let inner = self.lock()?;
        match inner.document(&path) {
            Some(node) => Ok(DocumentSnapshot::new(path.id(), node.data.clone())),
            None => Err(not_found(format!("No document at '{path}'"))),
        }
    }

    async fn get_document(&self, path: &str) -> FirestoreResult<DocumentStream> {
        let path = ResourcePath::document(path)?;
        let (sender, receiver) = async_channel::unbounded();
        let mut inner = self.lock()?;
        // Subscribing must not materialize the document.
        let node = inner
            .document_mut(&path)
            .ok_or_else(|| not_found(format!("No document at '{path}'")))?;
        let initial = DocumentSnapshot::new(path.id(), node.data.clone());
        if sender.try_send(initial).is_ok() {
            node.watchers.push(sender);
        }
        Ok(receiver)
    }

    async fn set_document_with_changes<T: Serialize + Send + Sync>(
        &self,
        path: &str,
        data: &T,
        merge: Merge,
        changes: Changes,
    ) -> FirestoreResult<()> {
        let path = ResourcePath::document(path)?;
        let mut incoming = encode_document(data)?;
        if let Merge::Fields(fields) = &merge {
            let mut selected = DocumentData::new();
            for field in fields {
                match incoming.remove(field) {
                    Some(value) => {
                        selected.insert(field.clone(), value);
                    }
                    None => {
                        return Err(invalid_argument(format!(
                            "Merge field '{field}' is not present in the incoming data"
                        )))
                    }
                }
            }
            incoming = selected;
        }
        let staged = changes.into_data();

        debug!("set {path} (merge: {merge:?})");
        let mut inner = self.lock()?;
        inner.write_document(&path, |existing| {
            if merge == Merge::None {
                existing.clear();
            }
            for (field, value) in incoming {
                apply_field(existing, field, value);
            }
            // Staged changes land after the encoded data, so their
            // transforms see the freshly written fields.
            for (field, value) in staged {
                apply_field(existing, field, value);
            }
            Ok(())
        })
    }

    async fn update_document(&self, path: &str, changes: Changes) -> FirestoreResult<()> {
        let path = ResourcePath::document(path)?;
        debug!("update {path}");
        let mut inner = self.lock()?;
        if inner.document(&path).is_none() {
            return Err(not_found(format!("No document at '{path}' to update")));
        }
        inner.write_document(&path, |existing| {
            for (field, value) in changes.into_data() {
                apply_field(existing, field, value);
            }
            Ok(())
        })
    }

    async fn delete_document(&self, path: &str) -> FirestoreResult<()> {
        let path = ResourcePath::document(path)?;
        debug!("delete {path}");
        let mut inner = self.lock()?;
        if inner.document(&path).is_none() {
            return Ok(());
        }
        let parent = path.parent();
        let collection = inner.collection_mut(&parent);
        collection.documents.remove(path.id());
        notify_collection(collection, parent.id());
        Ok(())
    }

    async fn get_collection_once(
        &self,
        path: &str,
        query: Query,
        _source: Source,
    ) -> FirestoreResult<CollectionSnapshot> {
        let path = ResourcePath::collection(path)?;
        let inner = self.lock()?;
        let documents = inner
            .collection(&path)
            .map(CollectionNode::snapshots)
            .unwrap_or_default();
        Ok(CollectionSnapshot::new(path.id(), query.apply(documents)))
    }

    async fn get_collection(
        &self,
        path: &str,
        query: Query,
    ) -> FirestoreResult<CollectionStream> {
        let path = ResourcePath::collection(path)?;
        let (sender, receiver) = async_channel::unbounded();
        let mut inner = self.lock()?;
        let collection = inner.collection_mut(&path);
        collection.watchers.push((query, sender));
        Ok(receiver)
    }
}
