use bson::{Bson, Document};

use super::{reject_write, Transaction, TransactionKind};
use crate::error::TransactionResult;

/// Passes reads through and refuses writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransaction;

impl NullTransaction {
    pub fn new() -> Self {
        Self
    }
}

impl Transaction for NullTransaction {
    fn kind(&self) -> TransactionKind {
        TransactionKind::Null
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
