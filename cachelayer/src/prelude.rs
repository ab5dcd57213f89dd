//! Convenient re-exports of commonly used types from cachelayer.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use cachelayer::prelude::*;
//! ```

pub use cachelayer_core::{
    backend::{ChangeSet, StoreBackend, StoreBackendBuilder},
    codec::{CustomType, TypeRegistry},
    collection::{Collection, TypedCollection},
    document::{create_uid, document_id},
    error::{DocumentStoreError, DocumentStoreResult},
    projection::Projection,
    query::{process_find, FindOptions},
    selector::{compile_document_selector, DocumentSelector},
    sort::{compile_sort, SortComparator, SortSpec},
    store::Database,
    transaction::{
        NullTransaction, ReadOnlyTransaction, ReadTransaction, SynchronousWriteTransaction,
        Transaction, TransactionKind, WriteTransaction,
    },
    upsert::{regularize_upsert, OneOrMany},
};
