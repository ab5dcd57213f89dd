use bson::{Bson, Document};
use parking_lot::Mutex;
use std::collections::BTreeSet;

use super::{reject_write, DirtySet, Transaction, TransactionKind};
use crate::{document::document_id, error::TransactionResult};

#[derive(Debug, Default)]
struct ReadState {
    dirty_ids: DirtySet,
    dirty_scans: BTreeSet<String>,
}

/// Records what a unit of work read: individual ids from lookups and whole collections
/// from finds.
#[derive(Debug, Default)]
pub struct ReadTransaction {
    state: Mutex<ReadState>,
}

impl ReadTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collections that were scanned by `find` or `find_one`.
    pub fn dirty_scans(&self) -> BTreeSet<String> {
        self.state.lock().dirty_scans.clone()
    }

    fn record_scan(&self, collection: &str) {
        self.state.lock().dirty_scans.insert(collection.to_owned());
    }
}

impl Transaction for ReadTransaction {
    fn kind(&self) -> TransactionKind {
        TransactionKind::Read
    }

    fn get(
        &self,
        collection: &str,
        result: Option<Document>,
        id: Option<&Bson>,
    ) -> TransactionResult<Option<Document>> {
        let id = id.or_else(|| result.as_ref().and_then(document_id));
        if let Some(id) = id {
            self.state.lock().dirty_ids.insert(collection, id);
        }
        Ok(result)
    }

    fn find(&self, collection: &str, result: Vec<Document>) -> TransactionResult<Vec<Document>> {
        self.record_scan(collection);
        Ok(result)
    }

    fn find_one(
        &self,
        collection: &str,
        result: Option<Document>,
    ) -> TransactionResult<Option<Document>> {
        self.record_scan(collection);
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

    fn dirty_ids(&self) -> DirtySet {
        self.state.lock().dirty_ids.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{NullTransaction, SynchronousWriteTransaction};
    use bson::doc;

    #[test]
    fn get_records_requested_or_returned_id() {
        let tx = ReadTransaction::new();
        tx.get("users", None, Some(&Bson::Int32(1))).unwrap();
        tx.get("users", Some(doc! { "_id": 2 }), None).unwrap();
        tx.get("users", None, None).unwrap();

        let dirty = tx.dirty_ids();
        assert_eq!(dirty.ids("users"), vec![Bson::Int32(1), Bson::Int32(2)]);
        assert!(tx.dirty_scans().is_empty());
    }

    #[test]
    fn finds_record_scans() {
        let tx = ReadTransaction::new();
        let found = vec![doc! { "_id": 1 }];
        assert_eq!(tx.find("users", found.clone()).unwrap(), found);
        tx.find_one("posts", None).unwrap();
        assert_eq!(
            tx.dirty_scans().into_iter().collect::<Vec<_>>(),
            vec!["posts".to_owned(), "users".to_owned()]
        );
        assert!(tx.dirty_ids().is_empty());
    }

    #[test]
    fn only_synchronous_writes_may_be_pushed() {
        let tx = ReadTransaction::new();
        assert!(tx.can_push_transaction(&SynchronousWriteTransaction::new()));
        assert!(!tx.can_push_transaction(&NullTransaction::new()));
        assert!(!tx.can_push_transaction(&ReadTransaction::new()));
        assert!(tx.del("users", vec![], &[]).is_err());
    }
}
