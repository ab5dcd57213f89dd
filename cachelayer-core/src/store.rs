//! Main database interface tying a backend to the transaction stack.
//!
//! A [`Database`] owns a backend and a stack of transactions. The bottom of the stack is
//! always the database's own [`WriteTransaction`], so writes are batched and published by
//! default. Callers may push further transactions to change how a unit of work is
//! observed or gated; every [`Collection`] operation runs inside the transaction on top.
//!
//! # Example
//!
//! ```ignore
//! use cachelayer::{store::Database, memory::InMemoryStore, transaction::ReadTransaction};
//! use std::sync::Arc;
//!
//! let db = Database::new(InMemoryStore::builder().build().await?);
//! let users = db.add_collection("users").await?;
//! users.upsert(doc! { "_id": "u1", "name": "Alice" }).await?;
//!
//! let read = Arc::new(ReadTransaction::new());
//! db.push_transaction(read.clone())?;
//! users.find(&doc! { "name": "Alice" }, &FindOptions::default()).await?;
//! db.pop_transaction();
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::{
    backend::{ChangeSet, StoreBackend},
    collection::Collection,
    error::{DocumentStoreResult, TransactionError, TransactionResult},
    transaction::{Transaction, WriteTransaction},
};

/// A document cache bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type. It is cloned into the base write
///   transaction, so it should be a cheap handle to shared state.
#[derive(Debug)]
pub struct Database<B: StoreBackend + Clone + 'static> {
    backend: B,
    base: Arc<WriteTransaction<B>>,
    stack: Mutex<Vec<Arc<dyn Transaction>>>,
}

impl<B: StoreBackend + Clone + 'static> Database<B> {
    /// Creates a database whose base transaction is a plain [`WriteTransaction`].
    pub fn new(backend: B) -> Self {
        let base = WriteTransaction::new(backend.clone());
        Self::with_write_transaction(backend, base)
    }

    /// Creates a database around a preconfigured base transaction.
    pub fn with_write_transaction(backend: B, base: WriteTransaction<B>) -> Self {
        Self {
            backend,
            base: Arc::new(base),
            stack: Mutex::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The base write transaction, always at the bottom of the stack.
    pub fn write_transaction(&self) -> &WriteTransaction<B> {
        &self.base
    }

    /// The transaction operations currently run in.
    pub fn transaction(&self) -> Arc<dyn Transaction> {
        match self.stack.lock().last() {
            Some(top) => Arc::clone(top),
            None => self.base.clone() as Arc<dyn Transaction>,
        }
    }

    /// Pushes a transaction if the current one accepts it.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::CannotPush`] if the current transaction's kind does
    /// not accept the candidate's kind.
    pub fn push_transaction(&self, candidate: Arc<dyn Transaction>) -> TransactionResult<()> {
        let mut stack = self.stack.lock();
        let current: &dyn Transaction = match stack.last() {
            Some(top) => top.as_ref(),
            None => self.base.as_ref(),
        };
        if !current.can_push_transaction(candidate.as_ref()) {
            return Err(TransactionError::CannotPush {
                current: current.kind().to_string(),
                candidate: candidate.kind().to_string(),
            });
        }
        log::trace!("pushed {} onto {}", candidate.kind(), current.kind());
        stack.push(candidate);
        Ok(())
    }

    /// Pops the top transaction. The base write transaction is never popped.
    pub fn pop_transaction(&self) -> Option<Arc<dyn Transaction>> {
        self.stack.lock().pop()
    }

    /// Gets a collection handle with the given name.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the collection
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, B> {
        Collection::new(name.to_string(), self)
    }

    /// Creates a new collection and returns a handle to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection already exists or creation fails.
    pub async fn add_collection<'a>(&'a self, name: &str) -> DocumentStoreResult<Collection<'a, B>> {
        self.backend.add_collection(name).await?;
        Ok(self.collection(name))
    }

    /// Drops a collection with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or deletion fails.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Subscribes to change sets published by write transaction flushes.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeSet> {
        self.backend.subscribe_changes()
    }

    /// Flushes the base write transaction immediately.
    pub async fn flush(&self) -> DocumentStoreResult<()> {
        self.base.flush().await
    }
}
