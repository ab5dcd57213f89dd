//! In-memory storage implementation for the document cache.
//!
//! Documents live in insertion-ordered maps keyed by their `_id`, behind an async-aware
//! read-write lock. Change sets published by write transactions fan out over a tokio
//! broadcast channel.

use async_trait::async_trait;
use bson::{Bson, Document};
use indexmap::IndexMap;
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::broadcast;

use cachelayer_core::{
    backend::{ChangeSet, StoreBackend, StoreBackendBuilder},
    document::{document_id, id_key},
    error::{DocumentStoreError, DocumentStoreResult, UpsertError},
};

/// Default number of change sets buffered for slow subscribers.
pub const DEFAULT_CHANGE_CAPACITY: usize = 64;

type CollectionMap = IndexMap<String, Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait with every document held in
/// memory and indexed by a key derived from its `_id`. Collections keep documents in
/// the order they were first inserted; replacing a document keeps its position.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data and the same change channel.
///
/// # Performance
///
/// Finds scan every document in a collection (no indexing). Lookups by id are
/// constant time.
///
/// # Example
///
/// ```ignore
/// use cachelayer_memory::InMemoryStore;
/// use cachelayer_core::backend::StoreBackend;
/// use bson::{Bson, doc};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///     store.add_collection("users").await?;
///     store.upsert_documents(vec![doc! { "_id": "u1", "name": "Alice" }], "users").await?;
///
///     let docs = store.get_documents(&[Bson::from("u1")], "users").await?;
///     assert_eq!(docs.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (id key -> document)
    store: Arc<RwLock<StoreMap>>,
    changes: broadcast::Sender<ChangeSet>,
}

impl InMemoryStore {
    /// Creates a new empty store with the default change capacity.
    pub fn new() -> Self {
        Self::with_change_capacity(DEFAULT_CHANGE_CAPACITY)
    }

    fn with_change_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            changes,
        }
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use cachelayer_memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::builder().change_capacity(16).build().await.unwrap();
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn upsert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        let keyed = documents
            .into_iter()
            .map(|doc| match document_id(&doc) {
                Some(id) => Ok((id_key(id), doc)),
                None => Err(UpsertError::MissingId),
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (key, doc) in keyed {
            collection_map.insert(key, doc);
        }

        Ok(())
    }

    async fn remove_documents(
        &self,
        ids: &[Bson],
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        Ok(ids
            .iter()
            .filter_map(|id| collection_map.shift_remove(&id_key(id)))
            .collect())
    }

    async fn get_documents(
        &self,
        ids: &[Bson],
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        Ok(ids
            .iter()
            .filter_map(|id| collection_map.get(&id_key(id)).cloned())
            .collect())
    }

    async fn all_documents(&self, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .map(|col| col.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.contains_key(name) {
            return Err(DocumentStoreError::CollectionAlreadyExists(name.to_string()));
        }

        store.insert(name.to_string(), CollectionMap::new());
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names: Vec<String> = self.store.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn publish_changes(&self, changes: ChangeSet) {
        if self.changes.send(changes).is_err() {
            log::trace!("no subscribers for published changes");
        }
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeSet> {
        self.changes.subscribe()
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use cachelayer_memory::InMemoryStore;
/// use cachelayer_core::backend::StoreBackendBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryStore::builder().change_capacity(128).build().await.unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct InMemoryStoreBuilder {
    change_capacity: usize,
}

impl InMemoryStoreBuilder {
    /// Sets how many change sets are buffered per subscriber before the oldest are
    /// dropped. Zero is treated as one.
    pub fn change_capacity(mut self, capacity: usize) -> Self {
        self.change_capacity = capacity;
        self
    }
}

impl Default for InMemoryStoreBuilder {
    fn default() -> Self {
        Self {
            change_capacity: DEFAULT_CHANGE_CAPACITY,
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::with_change_capacity(self.change_capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    async fn store_with_users() -> InMemoryStore {
        let store = InMemoryStore::builder().build().await.unwrap();
        store.add_collection("users").await.unwrap();
        store
            .upsert_documents(
                vec![
                    doc! { "_id": "a", "name": "Alice" },
                    doc! { "_id": "b", "name": "Bob" },
                    doc! { "_id": 7, "name": "Seven" },
                ],
                "users",
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn upsert_replaces_in_place() {
        let store = store_with_users().await;
        store
            .upsert_documents(vec![doc! { "_id": "a", "name": "Alicia" }], "users")
            .await
            .unwrap();

        let all = store.all_documents("users").await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], doc! { "_id": "a", "name": "Alicia" });
        assert_eq!(all[1].get_str("name").unwrap(), "Bob");
    }

    #[tokio::test]
    async fn ids_of_different_types_are_distinct() {
        let store = store_with_users().await;
        let found = store
            .get_documents(&[Bson::Int32(7), Bson::String("7".into())], "users")
            .await
            .unwrap();
        assert_eq!(found, vec![doc! { "_id": 7, "name": "Seven" }]);
    }

    #[tokio::test]
    async fn upsert_requires_collection_and_ids() {
        let store = store_with_users().await;
        assert!(matches!(
            store.upsert_documents(vec![doc! { "_id": 1 }], "posts").await,
            Err(DocumentStoreError::CollectionNotFound(name)) if name == "posts"
        ));
        assert!(matches!(
            store.upsert_documents(vec![doc! { "x": 1 }], "users").await,
            Err(DocumentStoreError::Upsert(UpsertError::MissingId))
        ));
        assert_eq!(store.all_documents("users").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn remove_returns_removed_documents() {
        let store = store_with_users().await;
        let removed = store
            .remove_documents(&[Bson::from("b"), Bson::from("missing")], "users")
            .await
            .unwrap();
        assert_eq!(removed, vec![doc! { "_id": "b", "name": "Bob" }]);

        let names: Vec<_> = store
            .all_documents("users")
            .await
            .unwrap()
            .iter()
            .map(|d| d.get_str("name").unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["Alice", "Seven"]);
    }

    #[tokio::test]
    async fn collection_management() {
        let store = store_with_users().await;
        store.add_collection("posts").await.unwrap();
        assert!(matches!(
            store.add_collection("posts").await,
            Err(DocumentStoreError::CollectionAlreadyExists(_))
        ));
        assert_eq!(store.list_collections().await.unwrap(), vec!["posts", "users"]);

        store.drop_collection("users").await.unwrap();
        assert!(store.drop_collection("users").await.is_err());
        assert!(store.all_documents("users").await.unwrap().is_empty());
        assert!(store.get_documents(&[Bson::from("a")], "users").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clones_share_changes() {
        let store = store_with_users().await;
        let mut rx = store.clone().subscribe_changes();

        let mut changes = ChangeSet::new();
        changes.insert("users".into(), vec![doc! { "_id": "a" }]);
        store.publish_changes(changes.clone());

        assert_eq!(rx.recv().await.unwrap(), changes);
        store.publish_changes(ChangeSet::new());
    }
}
