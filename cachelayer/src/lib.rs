//! Main cachelayer crate: a MongoDB-query-compatible document cache.
//!
//! This crate is the primary entry point for users of cachelayer. It re-exports the
//! core query and transaction machinery and the in-memory backend.
//!
//! # Features
//!
//! - **MongoDB selectors** - Comparison, logical, element, regex, array and geo operators
//! - **Find pipeline** - Sorting, skip, limit and field projection over cached documents
//! - **Transactions** - Read tracking, write gating, and batched change publication
//! - **Custom types** - Register extension value types with their own equality
//!
//! # Quick Start
//!
//! ```ignore
//! use cachelayer::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let db = Database::new(InMemoryStore::builder().build().await?);
//!     let users = db.add_collection("users").await?;
//!
//!     users
//!         .upsert(vec![
//!             doc! { "_id": 1, "name": "Alice", "age": 31 },
//!             doc! { "_id": 2, "name": "Bob", "age": 25 },
//!         ])
//!         .await?;
//!
//!     let adults = users
//!         .find(
//!             &doc! { "age": { "$gte": 18 } },
//!             &FindOptions::builder().sort(SortSpec::new().asc("age")).build(),
//!         )
//!         .await?;
//!     println!("{adults:?}");
//!
//!     // Both upserts above are published together as one change set.
//!     db.flush().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Transactions
//!
//! Operations run inside the transaction on top of the database's stack. Pushing a
//! [`ReadTransaction`](transaction::ReadTransaction) records which ids and collections a
//! unit of work read; pushing a
//! [`SynchronousWriteTransaction`](transaction::SynchronousWriteTransaction) lets writes
//! through without batching them.
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! let read = Arc::new(ReadTransaction::new());
//! db.push_transaction(read.clone())?;
//! users.get(1).await?;
//! db.pop_transaction();
//! assert_eq!(read.dirty_ids().ids("users"), vec![bson::Bson::Int32(1)]);
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage with broadcast change notifications

pub mod prelude;

pub use cachelayer_core::{
    backend, codec, collection, document, equality, error, geo, lookup, projection, query,
    selector, sort, store, transaction, upsert, value,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use cachelayer_memory::{InMemoryStore, InMemoryStoreBuilder, DEFAULT_CHANGE_CAPACITY};
}
