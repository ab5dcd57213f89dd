//! Transactions coordinating reads and writes against the cache.
//!
//! Every store operation runs inside the transaction currently on top of the
//! [`Database`](crate::store::Database) stack. The transaction decides whether the
//! operation is allowed, observes its result, and returns that result unchanged.
//!
//! | Kind | Reads | Writes | Accepts pushes of |
//! |------|-------|--------|-------------------|
//! | [`NullTransaction`] | yes | no | any kind |
//! | [`ReadOnlyTransaction`] | yes | no | any kind but `Write` |
//! | [`ReadTransaction`] | yes, tracked | no | `SynchronousWrite` |
//! | [`SynchronousWriteTransaction`] | no | yes | nothing |
//! | [`WriteTransaction`] | yes | yes, batched | any kind |
//!
//! A [`WriteTransaction`] records the ids touched by each write and, on the first write
//! after a flush, schedules a deferred flush that re-reads those documents and publishes
//! them as a single [`ChangeSet`](crate::backend::ChangeSet).

mod dirty;
mod null;
mod read;
mod read_only;
mod synchronous_write;
mod write;

pub use dirty::DirtySet;
pub use null::NullTransaction;
pub use read::ReadTransaction;
pub use read_only::ReadOnlyTransaction;
pub use synchronous_write::SynchronousWriteTransaction;
pub use write::{WriteOp, WriteTrace, WriteTransaction, WriteTransactionBuilder};

use bson::{Bson, Document};
use std::fmt::{self, Debug};

use crate::error::{TransactionError, TransactionResult};

/// The five transaction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Null,
    ReadOnly,
    Read,
    SynchronousWrite,
    Write,
}

impl TransactionKind {
    pub fn name(self) -> &'static str {
        match self {
            TransactionKind::Null => "NullTransaction",
            TransactionKind::ReadOnly => "ReadOnlyTransaction",
            TransactionKind::Read => "ReadTransaction",
            TransactionKind::SynchronousWrite => "SynchronousWriteTransaction",
            TransactionKind::Write => "WriteTransaction",
        }
    }

    pub fn can_read(self) -> bool {
        self != TransactionKind::SynchronousWrite
    }

    pub fn can_write(self) -> bool {
        matches!(self, TransactionKind::SynchronousWrite | TransactionKind::Write)
    }

    /// Whether a transaction of this kind may have `candidate` pushed on top of it.
    pub fn accepts(self, candidate: TransactionKind) -> bool {
        match self {
            TransactionKind::Null | TransactionKind::Write => true,
            TransactionKind::ReadOnly => candidate != TransactionKind::Write,
            TransactionKind::Read => candidate == TransactionKind::SynchronousWrite,
            TransactionKind::SynchronousWrite => false,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observer and gatekeeper for store operations.
///
/// Each hook receives the result the store produced and returns it unchanged, or rejects
/// the operation with a [`TransactionError`].
pub trait Transaction: Send + Sync + Debug {
    fn kind(&self) -> TransactionKind;

    /// Observes a single-id lookup.
    fn get(
        &self,
        collection: &str,
        result: Option<Document>,
        id: Option<&Bson>,
    ) -> TransactionResult<Option<Document>>;

    fn find(&self, collection: &str, result: Vec<Document>) -> TransactionResult<Vec<Document>>;

    fn find_one(
        &self,
        collection: &str,
        result: Option<Document>,
    ) -> TransactionResult<Option<Document>>;

    /// Observes an upsert of `docs`.
    fn upsert(
        &self,
        collection: &str,
        result: Vec<Document>,
        docs: &[Document],
    ) -> TransactionResult<Vec<Document>>;

    /// Observes a removal of `docs`.
    fn del(
        &self,
        collection: &str,
        result: Vec<Document>,
        docs: &[Document],
    ) -> TransactionResult<Vec<Document>>;

    /// Fails before a read reaches the store if this kind cannot read.
    fn check_read(&self) -> TransactionResult<()> {
        if self.kind().can_read() {
            Ok(())
        } else {
            Err(TransactionError::ReadInSynchronousWriteTransaction)
        }
    }

    /// Fails before a write reaches the store if this kind cannot write.
    fn check_write(&self) -> TransactionResult<()> {
        if self.kind().can_write() {
            Ok(())
        } else {
            Err(TransactionError::WriteOutsideWriteTransaction)
        }
    }

    fn can_push_transaction(&self, candidate: &dyn Transaction) -> bool {
        self.kind().accepts(candidate.kind())
    }

    /// Ids touched since the last flush, for kinds that track them.
    fn dirty_ids(&self) -> DirtySet {
        DirtySet::default()
    }

    /// Whether a deferred flush is pending.
    fn queued(&self) -> bool {
        false
    }
}

pub(crate) fn reject_write<T>() -> TransactionResult<T> {
    Err(TransactionError::WriteOutsideWriteTransaction)
}

pub(crate) fn reject_read<T>() -> TransactionResult<T> {
    Err(TransactionError::ReadInSynchronousWriteTransaction)
}
