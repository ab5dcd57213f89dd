use bson::{Bson, Document};
use parking_lot::Mutex;
use std::{collections::BTreeMap, fmt, sync::Arc};
use tokio::{runtime::Handle, task::JoinHandle};

use super::{DirtySet, Transaction, TransactionKind};
use crate::{
    backend::{ChangeSet, StoreBackend},
    document::document_id,
    error::{DocumentStoreResult, TransactionError, TransactionResult},
};

/// The kind of write recorded in a [`WriteTrace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Upsert,
    Delete,
}

/// One traced write, kept when tracing is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteTrace {
    pub op: WriteOp,
    pub id: Bson,
}

#[derive(Default)]
struct WriteState {
    dirty_ids: DirtySet,
    traces: BTreeMap<String, Vec<WriteTrace>>,
    queued: bool,
    // Bumped by every flush so a scheduled flush can tell it was overtaken.
    epoch: u64,
    pending: Option<JoinHandle<()>>,
}

struct WriteInner<B> {
    store: B,
    trace_writes: bool,
    state: Mutex<WriteState>,
}

impl<B: StoreBackend> WriteInner<B> {
    async fn flush(&self, scheduled_epoch: Option<u64>) -> DocumentStoreResult<()> {
        let (dirty, traces) = {
            let mut state = self.state.lock();
            if scheduled_epoch.is_some_and(|epoch| epoch != state.epoch) {
                log::trace!("scheduled flush already superseded");
                return Ok(());
            }
            state.epoch += 1;
            state.queued = false;
            state.pending = None;
            (
                std::mem::take(&mut state.dirty_ids),
                std::mem::take(&mut state.traces),
            )
        };

        if dirty.is_empty() {
            log::trace!("nothing to flush");
            return Ok(());
        }

        for (collection, traced) in &traces {
            log::debug!("flushing {} traced write(s) to {collection}", traced.len());
        }

        let mut changes = ChangeSet::new();
        for collection in dirty.collections() {
            let ids = dirty.ids(collection);
            let documents = self.store.get_documents(&ids, collection).await?;
            changes.insert(collection.to_owned(), documents);
        }

        log::debug!(
            "publishing {} refreshed document(s) across {} collection(s)",
            changes.values().map(Vec::len).sum::<usize>(),
            changes.len()
        );
        self.store.publish_changes(changes);
        Ok(())
    }
}

/// Batching write transaction.
///
/// Every write records the affected ids. The first write after a flush schedules a
/// deferred flush on the current tokio runtime; later writes join that batch. The flush
/// re-reads the dirty documents from the store, so it reflects the store as of flush
/// time, and publishes them as one [`ChangeSet`].
///
/// Dropping the transaction aborts a pending flush.
pub struct WriteTransaction<B: StoreBackend + 'static> {
    inner: Arc<WriteInner<B>>,
}

impl<B: StoreBackend + 'static> WriteTransaction<B> {
    pub fn new(store: B) -> Self {
        Self::builder(store).build()
    }

    pub fn builder(store: B) -> WriteTransactionBuilder<B> {
        WriteTransactionBuilder {
            store,
            trace_writes: false,
        }
    }

    pub fn store(&self) -> &B {
        &self.inner.store
    }

    /// Writes recorded since the last flush, per collection. Empty unless tracing is enabled.
    pub fn traces(&self) -> BTreeMap<String, Vec<WriteTrace>> {
        self.inner.state.lock().traces.clone()
    }

    /// Flushes now instead of waiting for the scheduled flush, which then does nothing.
    ///
    /// # Errors
    ///
    /// Propagates store errors raised while re-reading dirty documents. The dirty set is
    /// cleared either way.
    pub async fn flush(&self) -> DocumentStoreResult<()> {
        self.inner.flush(None).await
    }

    /// Aborts a pending flush. Dirty ids are kept, and the next write schedules a new flush.
    ///
    /// Returns whether a flush was pending.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.state.lock();
        state.queued = false;
        match state.pending.take() {
            Some(pending) => {
                pending.abort();
                log::debug!("cancelled pending flush");
                true
            }
            None => false,
        }
    }

    fn record(&self, collection: &str, docs: &[Document], op: WriteOp) -> TransactionResult<()> {
        let runtime = Handle::try_current().map_err(|_| TransactionError::NoRuntime)?;

        let mut state = self.inner.state.lock();
        for id in docs.iter().filter_map(document_id) {
            state.dirty_ids.insert(collection, id);
            if self.inner.trace_writes {
                state
                    .traces
                    .entry(collection.to_owned())
                    .or_default()
                    .push(WriteTrace { op, id: id.clone() });
            }
        }

        if !state.queued {
            state.queued = true;
            let epoch = state.epoch;
            let inner = Arc::clone(&self.inner);
            log::debug!("scheduling flush after write to {collection}");
            state.pending = Some(runtime.spawn(async move {
                tokio::task::yield_now().await;
                if let Err(err) = inner.flush(Some(epoch)).await {
                    log::error!("deferred flush failed: {err}");
                }
            }));
        }

        Ok(())
    }
}

impl<B: StoreBackend + 'static> Drop for WriteTransaction<B> {
    fn drop(&mut self) {
        if let Some(pending) = self.inner.state.lock().pending.take() {
            pending.abort();
        }
    }
}

impl<B: StoreBackend + 'static> fmt::Debug for WriteTransaction<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("WriteTransaction")
            .field("dirty_ids", &state.dirty_ids)
            .field("queued", &state.queued)
            .field("trace_writes", &self.inner.trace_writes)
            .finish()
    }
}

impl<B: StoreBackend + 'static> Transaction for WriteTransaction<B> {
    fn kind(&self) -> TransactionKind {
        TransactionKind::Write
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
        collection: &str,
        result: Vec<Document>,
        docs: &[Document],
    ) -> TransactionResult<Vec<Document>> {
        self.record(collection, docs, WriteOp::Upsert)?;
        Ok(result)
    }

    fn del(
        &self,
        collection: &str,
        result: Vec<Document>,
        docs: &[Document],
    ) -> TransactionResult<Vec<Document>> {
        self.record(collection, docs, WriteOp::Delete)?;
        Ok(result)
    }

    fn dirty_ids(&self) -> DirtySet {
        self.inner.state.lock().dirty_ids.clone()
    }

    fn queued(&self) -> bool {
        self.inner.state.lock().queued
    }
}

/// Configures a [`WriteTransaction`].
#[derive(Debug)]
pub struct WriteTransactionBuilder<B> {
    store: B,
    trace_writes: bool,
}

impl<B: StoreBackend + 'static> WriteTransactionBuilder<B> {
    /// Keeps a per-collection trace of writes until the next flush.
    pub fn trace_writes(mut self, enabled: bool) -> Self {
        self.trace_writes = enabled;
        self
    }

    pub fn build(self) -> WriteTransaction<B> {
        WriteTransaction {
            inner: Arc::new(WriteInner {
                store: self.store,
                trace_writes: self.trace_writes,
                state: Mutex::new(WriteState::default()),
            }),
        }
    }
}
