//! In-memory document storage backend for cachelayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and a broadcast channel for
//! change notifications.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Id-keyed storage** - Documents indexed by `_id`, kept in insertion order
//! - **Change notifications** - Flushed change sets fan out to every subscriber
//!
//! # Quick Start
//!
//! ```ignore
//! use cachelayer::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(InMemoryStore::builder().build().await?);
//!     let users = db.add_collection("users").await?;
//!     let mut changes = db.subscribe();
//!
//!     users.upsert(doc! { "_id": create_uid(), "name": "Alice" }).await?;
//!
//!     let published = changes.recv().await?;
//!     assert_eq!(published["users"].len(), 1);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as cachelayer_memory;

pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder, DEFAULT_CHANGE_CAPACITY};
