use bson::{Bson, Document};

use super::{reject_read, Transaction, TransactionKind};
use crate::error::TransactionResult;

/// Applies writes immediately and untracked. Reads are refused, and nothing may be
/// pushed on top of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynchronousWriteTransaction;

impl SynchronousWriteTransaction {
    pub fn new() -> Self {
        Self
    }
}

impl Transaction for SynchronousWriteTransaction {
    fn kind(&self) -> TransactionKind {
        TransactionKind::SynchronousWrite
    }

    fn get(
        &self,
        _collection: &str,
        _result: Option<Document>,
        _id: Option<&Bson>,
    ) -> TransactionResult<Option<Document>> {
        reject_read()
    }

    fn find(&self, _collection: &str, _result: Vec<Document>) -> TransactionResult<Vec<Document>> {
        reject_read()
    }

    fn find_one(
        &self,
        _collection: &str,
        _result: Option<Document>,
    ) -> TransactionResult<Option<Document>> {
        reject_read()
    }

    fn upsert(
        &self,
        _collection: &str,
        result: Vec<Document>,
        _docs: &[Document],
    ) -> TransactionResult<Vec<Document>> {
        Ok(result)
    }

    fn del(
        &self,
        _collection: &str,
        result: Vec<Document>,
        _docs: &[Document],
    ) -> TransactionResult<Vec<Document>> {
        Ok(result)
    }
}
