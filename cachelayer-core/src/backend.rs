//! Storage backend abstraction for the document cache.
//!
//! This module defines the traits that abstract over where cached documents live, so the
//! transaction layer and the [`Database`](crate::store::Database) front end can work with
//! any backend that can store documents by id and broadcast change sets.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait provides a unified async interface for per-id document
//! upserts, removals and lookups, full collection scans, collection management, and the
//! change notification channel used by write transactions to publish their flushes.
//! Implementations are required to be thread-safe (`Send + Sync`) and support concurrent access.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use cachelayer::backend::StoreBackend;
//! use bson::{Bson, doc};
//!
//! let backend = InMemoryStore::builder().build().await?;
//! backend.add_collection("users").await?;
//! backend.upsert_documents(vec![doc! { "_id": "u1", "name": "Alice" }], "users").await?;
//!
//! let found = backend.get_documents(&[Bson::from("u1")], "users").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::{collections::BTreeMap, fmt::Debug, sync::Arc};
use tokio::sync::broadcast;

use crate::error::DocumentStoreResult;

/// Refreshed documents grouped by collection name, as published after a flush.
pub type ChangeSet = BTreeMap<String, Vec<Document>>;

/// Abstract interface for document cache backends.
///
/// Documents are identified by their `_id` field. A backend stores at most one document
/// per id and collection; upserting a document with an existing id replaces it entirely.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. The exact concurrency model is implementation-specific but should be
/// documented by the implementer.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// Implementers should document which error variants may be returned by each operation.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts or replaces documents in a collection, keyed by `_id`.
    ///
    /// # Arguments
    ///
    /// * `documents` - Documents carrying an `_id` field
    /// * `collection` - The name of the collection to write to
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` on success, or a [`DocumentStoreError`](crate::error::DocumentStoreError)
    /// such as `CollectionNotFound` on failure.
    async fn upsert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Removes documents from a collection by id.
    ///
    /// Ids that are not present are skipped.
    ///
    /// # Returns
    ///
    /// Returns the documents that were removed.
    async fn remove_documents(
        &self,
        ids: &[Bson],
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Retrieves documents from a collection by id.
    ///
    /// Missing ids are omitted from the result, and a missing collection yields no documents.
    async fn get_documents(
        &self,
        ids: &[Bson],
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Returns every document in a collection, in insertion order.
    async fn all_documents(&self, collection: &str) -> DocumentStoreResult<Vec<Document>>;

    /// Creates a new, empty collection.
    ///
    /// # Returns
    ///
    /// Returns `CollectionAlreadyExists` if the name is taken.
    async fn add_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Drops a collection and all of its documents.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Publishes a change set to every subscriber.
    ///
    /// Publishing with no subscribers is not an error.
    fn publish_changes(&self, changes: ChangeSet);

    /// Subscribes to change sets published after this call.
    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeSet>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend,
{
    async fn upsert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        (**self).upsert_documents(documents, collection).await
    }

    async fn remove_documents(
        &self,
        ids: &[Bson],
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        (**self).remove_documents(ids, collection).await
    }

    async fn get_documents(
        &self,
        ids: &[Bson],
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        (**self).get_documents(ids, collection).await
    }

    async fn all_documents(&self, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        (**self).all_documents(collection).await
    }

    async fn add_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (**self).add_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (**self).drop_collection(name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        (**self).list_collections().await
    }

    fn publish_changes(&self, changes: ChangeSet) {
        (**self).publish_changes(changes)
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeSet> {
        (**self).subscribe_changes()
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
