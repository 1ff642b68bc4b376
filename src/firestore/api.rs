use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::firestore::codec::{decode_document, encode_value};
use crate::firestore::error::{invalid_argument, FirestoreErrorCode, FirestoreResult};
use crate::firestore::query::Query;
use crate::firestore::value::{DocumentData, FirestoreValue, SentinelValue};

/// Where a read is allowed to resolve from. The local store serves every
/// source from memory; the distinction matters only to networked backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Source {
    Cache,
    #[default]
    Default,
    Server,
}

/// How a set operation combines incoming fields with an existing document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Merge {
    /// Replace the document wholesale.
    None,
    /// Merge every incoming field over the existing ones.
    All,
    /// Merge only the named incoming fields. Naming a field absent from the
    /// incoming data is an error.
    Fields(Vec<String>),
}

/// A field-level mutation set for update operations.
///
/// Plain values overwrite, the sentinel methods record transforms the store
/// applies against the current document state. At most one transform may be
/// staged per field.
#[derive(Clone, Debug, Default)]
pub struct Changes {
    fields: DocumentData,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Serialize) -> FirestoreResult<()> {
        let encoded = encode_value(&value)?;
        self.insert(field.into(), encoded)
    }

    /// Appends the given elements to the array field, skipping elements
    /// already present.
    pub fn array_union(
        &mut self,
        field: impl Into<String>,
        values: Vec<FirestoreValue>,
    ) -> FirestoreResult<()> {
        self.insert(
            field.into(),
            FirestoreValue::sentinel(SentinelValue::ArrayUnion(values)),
        )
    }

    /// Removes every occurrence of the given elements from the array field.
    pub fn array_remove(
        &mut self,
        field: impl Into<String>,
        values: Vec<FirestoreValue>,
    ) -> FirestoreResult<()> {
        self.insert(
            field.into(),
            FirestoreValue::sentinel(SentinelValue::ArrayRemove(values)),
        )
    }

    /// Deletes the field from the document.
    pub fn delete(&mut self, field: impl Into<String>) -> FirestoreResult<()> {
        self.insert(field.into(), FirestoreValue::sentinel(SentinelValue::Delete))
    }

    /// Adds `amount` to the integer field, treating an absent field as zero.
    pub fn increment(&mut self, field: impl Into<String>, amount: i64) -> FirestoreResult<()> {
        self.insert(
            field.into(),
            FirestoreValue::sentinel(SentinelValue::IncrementInteger(amount)),
        )
    }

    /// Adds `amount` to the double field, treating an absent field as zero.
    pub fn increment_double(
        &mut self,
        field: impl Into<String>,
        amount: f64,
    ) -> FirestoreResult<()> {
        self.insert(
            field.into(),
            FirestoreValue::sentinel(SentinelValue::IncrementDouble(amount)),
        )
    }

    /// Sets the field to the server clock at the moment the write lands.
    pub fn server_timestamp(&mut self, field: impl Into<String>) -> FirestoreResult<()> {
        self.insert(
            field.into(),
            FirestoreValue::sentinel(SentinelValue::ServerTimestamp),
        )
    }

    fn insert(&mut self, field: String, value: FirestoreValue) -> FirestoreResult<()> {
        if let Some(existing) = self.fields.get(&field) {
            if existing.is_sentinel() || value.is_sentinel() {
                return Err(invalid_argument(format!(
                    "Field '{field}' already has a pending transform"
                )));
            }
        }
        self.fields.insert(field, value);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn into_data(self) -> DocumentData {
        self.fields
    }
}

/// A point-in-time view of a single document.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    id: String,
    fields: DocumentData,
}

impl DocumentSnapshot {
    pub(crate) fn new(id: impl Into<String>, fields: DocumentData) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, field: &str) -> Option<&FirestoreValue> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &DocumentData {
        &self.fields
    }

    /// Decodes the snapshot into a typed record.
    pub fn data<T: DeserializeOwned>(&self) -> FirestoreResult<T> {
        decode_document(&self.id, &self.fields)
    }
}

/// A point-in-time view of a collection's documents, post query evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionSnapshot {
    id: String,
    documents: Vec<DocumentSnapshot>,
}

impl CollectionSnapshot {
    pub(crate) fn new(id: impl Into<String>, documents: Vec<DocumentSnapshot>) -> Self {
        Self {
            id: id.into(),
            documents,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn documents(&self) -> &[DocumentSnapshot] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Decodes every document into a typed record.
    pub fn data<T: DeserializeOwned>(&self) -> FirestoreResult<Vec<T>> {
        self.documents.iter().map(DocumentSnapshot::data).collect()
    }
}

/// Live feed of snapshots for one document. The current state is delivered
/// first, then one snapshot per subsequent write.
pub type DocumentStream = async_channel::Receiver<DocumentSnapshot>;

/// Live feed of snapshots for a collection. Snapshots are delivered for
/// writes after the subscription was established.
pub type CollectionStream = async_channel::Receiver<CollectionSnapshot>;

/// The Firestore document surface.
///
/// Paths use slash-separated segments; an even number of segments names a
/// document, an odd number names a collection.
#[async_trait]
pub trait FirebaseFirestore: Send + Sync {
    /// Reads a document once. Fails with a not-found error if it does not
    /// exist.
    async fn get_document_once(
        &self,
        path: &str,
        source: Source,
    ) -> FirestoreResult<DocumentSnapshot>;

    /// Reads a document once, mapping the missing-document case to `None`.
    async fn get_document_once_or_null(
        &self,
        path: &str,
        source: Source,
    ) -> FirestoreResult<Option<DocumentSnapshot>> {
        match self.get_document_once(path, source).await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(error) if error.code == FirestoreErrorCode::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Subscribes to a document. The stream yields the current state first.
    /// Fails with a not-found error if the document does not exist.
    async fn get_document(&self, path: &str) -> FirestoreResult<DocumentStream>;

    /// Writes a document, creating it and any missing ancestors.
    async fn set_document<T: Serialize + Send + Sync>(
        &self,
        path: &str,
        data: &T,
        merge: Merge,
    ) -> FirestoreResult<()> {
        self.set_document_with_changes(path, data, merge, Changes::new())
            .await
    }

    /// Writes a document like `set_document`, applying the staged field
    /// changes on top of the encoded data. Transforms that need the write to
    /// create or replace the document go through here.
    async fn set_document_with_changes<T: Serialize + Send + Sync>(
        &self,
        path: &str,
        data: &T,
        merge: Merge,
        changes: Changes,
    ) -> FirestoreResult<()>;

    /// Applies field-level changes to an existing document.
    async fn update_document(&self, path: &str, changes: Changes) -> FirestoreResult<()>;

    /// Deletes a document. Deleting a missing document is a no-op.
    async fn delete_document(&self, path: &str) -> FirestoreResult<()>;

    /// Evaluates a query against a collection once.
    async fn get_collection_once(
        &self,
        path: &str,
        query: Query,
        source: Source,
    ) -> FirestoreResult<CollectionSnapshot>;

    /// Subscribes to a collection query. Only writes after the subscription
    /// produce snapshots.
    async fn get_collection(&self, path: &str, query: Query)
        -> FirestoreResult<CollectionStream>;
}
