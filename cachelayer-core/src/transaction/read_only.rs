use bson::{Bson, Document};

use super::{reject_write, Transaction, TransactionKind};
use crate::error::TransactionResult;

/// Like [`NullTransaction`](super::NullTransaction), but refuses to have a
/// [`WriteTransaction`](super::WriteTransaction) pushed on top of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyTransaction;

impl ReadOnlyTransaction {
    pub fn new() -> Self {
        Self
    }
}

impl Transaction for ReadOnlyTransaction {
    fn kind(&self) -> TransactionKind {
        TransactionKind::ReadOnly
    }

    fn get(
        &self,
        _collection: &str,
        result: Option<Document>,
        _id: Option<&Bson>,
    ) -> TransactionResult<Option<Document>> {
        Ok(result)
    }

    fn find(&self, _collection: &str, result: Vec<Document>) -> TransactionResult<Vec<Document>> {
        Ok(result)
    }

    fn find_one(
        &self,
        _collection: &str,
        result: Option<Document>,
    ) -> TransactionResult<Option<Document>> {
        Ok(result)
    }

    fn upsert(
        &self,
        _collection: &str,
        _result: Vec<Document>,
        _docs: &[Document],
    ) -> TransactionResult<Vec<Document>> {
        reject_write()
    }

    fn del(
        &self,
        _collection: &str,
        _result: Vec<Document>,
        _docs: &[Document],
    ) -> TransactionResult<Vec<Document>> {
        reject_write()
    }
}
