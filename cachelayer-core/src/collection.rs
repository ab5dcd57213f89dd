//! Collection handles for cache operations.
//!
//! Every operation consults the transaction on top of the owning
//! [`Database`](crate::store::Database)'s stack: reads and writes are refused before they
//! reach the store if that transaction cannot perform them, and the store's result is
//! passed through the transaction so it can record what was touched.
//!
//! # Collection Types
//!
//! - [`Collection`] - Untyped collection with explicit BSON documents
//! - [`TypedCollection`] - Collection that (de)serializes a specific document type
//!
//! # Example
//!
//! ```ignore
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! # async fn example(db: &cachelayer::store::Database<impl cachelayer::backend::StoreBackend + Clone>) -> cachelayer::error::DocumentStoreResult<()> {
//! let users = db.collection("users").typed::<User>();
//! users.upsert(vec![User { id: create_uid(), name: "Alice".to_string() }]).await?;
//! let alice = users.find_one(&doc! { "name": "Alice" }).await?;
//! # Ok(()) }
//! ```

use bson::{Bson, Document, de::deserialize_from_document, ser::serialize_to_document};
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;

use crate::{
    backend::StoreBackend,
    error::DocumentStoreResult,
    query::{find_with, FindOptions},
    selector::DocumentSelector,
    store::Database,
    upsert::{regularize_upsert, OneOrMany},
};

/// An untyped collection bound to a database.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the database reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend + Clone + 'static> {
    name: String,
    database: &'a Database<B>,
}

impl<'a, B: StoreBackend + Clone + 'static> Collection<'a, B> {
    pub(crate) fn new(name: String, database: &'a Database<B>) -> Self {
        Self { name, database }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Views this collection through a serde document type.
    pub fn typed<D>(&self) -> TypedCollection<'a, B, D>
    where
        D: Serialize + DeserializeOwned + Send + Sync,
    {
        TypedCollection {
            inner: Collection::new(self.name.clone(), self.database),
            _marker: PhantomData,
        }
    }

    /// Retrieves a document by id.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the current
    /// transaction cannot read or the store fails.
    pub async fn get(&self, id: impl Into<Bson>) -> DocumentStoreResult<Option<Document>> {
        let id = id.into();
        let tx = self.database.transaction();
        tx.check_read()?;

        let result = self
            .database
            .backend()
            .get_documents(std::slice::from_ref(&id), &self.name)
            .await?
            .into_iter()
            .next();
        Ok(tx.get(&self.name, result, Some(&id))?)
    }

    /// Finds documents matching a selector.
    ///
    /// # Arguments
    ///
    /// * `selector` - A MongoDB-style selector document
    /// * `options` - Sort, skip, limit and projection
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the selector
    /// does not compile, the sort fails, the current transaction cannot read, or the
    /// store fails.
    pub async fn find(
        &self,
        selector: &Document,
        options: &FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        let selector = DocumentSelector::compile(selector)?;
        self.find_compiled(&selector, options).await
    }

    /// Finds documents with an already compiled selector, such as one carrying a
    /// `$where` predicate.
    pub async fn find_compiled(
        &self,
        selector: &DocumentSelector,
        options: &FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        let tx = self.database.transaction();
        tx.check_read()?;

        let documents = self.database.backend().all_documents(&self.name).await?;
        let found = find_with(&documents, selector, options)?;
        Ok(tx.find(&self.name, found)?)
    }

    /// Finds the first document matching a selector.
    pub async fn find_one(
        &self,
        selector: &Document,
        options: &FindOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        let selector = DocumentSelector::compile(selector)?;
        let tx = self.database.transaction();
        tx.check_read()?;

        let options = FindOptions {
            limit: Some(1),
            ..options.clone()
        };
        let documents = self.database.backend().all_documents(&self.name).await?;
        let found = find_with(&documents, &selector, &options)?.into_iter().next();
        Ok(tx.find_one(&self.name, found)?)
    }

    /// Inserts or replaces one or many documents.
    ///
    /// # Returns
    ///
    /// The documents as written.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if a document
    /// has no `_id`, the current transaction cannot write, or the store fails.
    pub async fn upsert(
        &self,
        documents: impl Into<OneOrMany<Document>>,
    ) -> DocumentStoreResult<Vec<Document>> {
        let documents: Vec<Document> = regularize_upsert(documents, None)?
            .into_iter()
            .map(|item| item.doc)
            .collect();
        let tx = self.database.transaction();
        tx.check_write()?;

        self.database
            .backend()
            .upsert_documents(documents.clone(), &self.name)
            .await?;
        Ok(tx.upsert(&self.name, documents.clone(), &documents)?)
    }

    /// Removes documents by id.
    ///
    /// # Returns
    ///
    /// The documents that were removed.
    pub async fn remove(&self, ids: Vec<Bson>) -> DocumentStoreResult<Vec<Document>> {
        let tx = self.database.transaction();
        tx.check_write()?;

        let removed = self.database.backend().remove_documents(&ids, &self.name).await?;
        Ok(tx.del(&self.name, removed.clone(), &removed)?)
    }
}

/// A collection that converts between BSON and a serde document type.
///
/// Documents must serialize to a BSON document carrying an `_id` field.
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend + Clone + 'static, D> {
    inner: Collection<'a, B>,
    _marker: PhantomData<D>,
}

impl<'a, B, D> TypedCollection<'a, B, D>
where
    B: StoreBackend + Clone + 'static,
    D: Serialize + DeserializeOwned + Send + Sync,
{
    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn get(&self, id: impl Into<Bson>) -> DocumentStoreResult<Option<D>> {
        self.inner
            .get(id)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn find(&self, selector: &Document, options: &FindOptions) -> DocumentStoreResult<Vec<D>> {
        self.inner
            .find(selector, options)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn find_one(&self, selector: &Document) -> DocumentStoreResult<Option<D>> {
        self.inner
            .find_one(selector, &FindOptions::default())
            .await?
            .map(decode)
            .transpose()
    }

    /// Serializes and upserts documents.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if serialization
    /// or the upsert fails.
    pub async fn upsert(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        let documents = documents
            .iter()
            .map(serialize_to_document)
            .collect::<Result<Vec<Document>, _>>()?;
        self.inner.upsert(documents).await?;
        Ok(())
    }

    pub async fn remove(&self, ids: Vec<Bson>) -> DocumentStoreResult<Vec<D>> {
        self.inner
            .remove(ids)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}

fn decode<D: DeserializeOwned>(document: Document) -> DocumentStoreResult<D> {
    Ok(deserialize_from_document(document)?)
}
