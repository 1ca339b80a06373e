//! InMemoryDocumentStore - BTreeMap-backed document store for testing and development.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

use async_trait::async_trait;
use log::{debug, trace};

use super::{
    DocumentListener, DocumentSnapshot, DocumentStore, Query, QueryListener, QuerySnapshot,
};
use crate::error::StoreError;
use crate::record::{merge_into, Record};
use crate::reference::{CollectionRef, DocumentRef};
use crate::subscription::Subscription;

type Documents = BTreeMap<DocumentRef, Record>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct DeliveryState<S> {
    /// Last delivered snapshot; unchanged snapshots are not redelivered.
    last: Option<S>,
    running: bool,
    pending: bool,
}

/// Serializes deliveries to one listener.
///
/// One caller at a time evaluates and delivers. Writers arriving while it
/// runs, including writes made from inside the listener, only mark a change
/// pending; the running caller re-evaluates until nothing is pending, so the
/// last delivery always reflects the latest state.
struct Delivery<S> {
    active: AtomicBool,
    state: Mutex<DeliveryState<S>>,
}

impl<S: Clone + PartialEq> Delivery<S> {
    fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            state: Mutex::new(DeliveryState {
                last: None,
                running: false,
                pending: false,
            }),
        }
    }

    fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn run<E, L>(&self, evaluate: E, listener: L)
    where
        E: Fn() -> Result<S, StoreError>,
        L: Fn(Result<S, StoreError>),
    {
        {
            let mut state = lock(&self.state);
            state.pending = true;
            if state.running {
                return;
            }
            state.running = true;
        }

        loop {
            {
                let mut state = lock(&self.state);
                if !state.pending || !self.is_active() {
                    state.running = false;
                    return;
                }
                state.pending = false;
            }

            let result = evaluate();
            let changed = match &result {
                Ok(snapshot) => {
                    let mut state = lock(&self.state);
                    if state.last.as_ref() == Some(snapshot) {
                        false
                    } else {
                        state.last = Some(snapshot.clone());
                        true
                    }
                }
                Err(_) => true,
            };

            if changed && self.is_active() {
                listener(result);
            }
        }
    }
}

struct DocWatch {
    id: u64,
    reference: DocumentRef,
    listener: DocumentListener,
    delivery: Delivery<DocumentSnapshot>,
}

struct QueryWatch {
    id: u64,
    query: Query,
    listener: QueryListener,
    delivery: Delivery<QuerySnapshot>,
}

#[derive(Default)]
struct Watches {
    docs: Vec<Arc<DocWatch>>,
    queries: Vec<Arc<QueryWatch>>,
}

struct Inner {
    documents: RwLock<Documents>,
    watches: Mutex<Watches>,
    next_watch_id: AtomicU64,
    deny_writes: AtomicBool,
}

/// In-memory document store.
///
/// Documents are kept in path order. Listeners run on a writing task once
/// the write is applied, with no store lock held, and stop receiving
/// snapshots as soon as their subscription is cancelled.
/// Clone-friendly via Arc.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                documents: RwLock::new(BTreeMap::new()),
                watches: Mutex::new(Watches::default()),
                next_watch_id: AtomicU64::new(1),
                deny_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Reject every subsequent write with [`StoreError::PermissionDenied`],
    /// the way a store's security rules would.
    pub fn deny_writes(&self, deny: bool) {
        self.inner.deny_writes.store(deny, Ordering::SeqCst);
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.inner.read_documents().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner
            .lock_watches()
            .map(|w| w.docs.len() + w.queries.len())
            .unwrap_or(0)
    }

    fn check_writable(&self, reference: &DocumentRef) -> Result<(), StoreError> {
        if self.inner.deny_writes.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied {
                path: reference.path().to_string(),
            });
        }
        Ok(())
    }

    fn next_id(&self) -> u64 {
        self.inner.next_watch_id.fetch_add(1, Ordering::Relaxed)
    }

    fn subscription(&self, id: u64) -> Subscription {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                debug!("removing listener {}", id);
                inner.remove_watch(id);
            }
        })
    }
}

impl Inner {
    fn read_documents(&self) -> Result<RwLockReadGuard<'_, Documents>, StoreError> {
        self.documents
            .read()
            .map_err(|_| StoreError::Internal("lock poisoned".into()))
    }

    fn write_documents(&self) -> Result<RwLockWriteGuard<'_, Documents>, StoreError> {
        self.documents
            .write()
            .map_err(|_| StoreError::Internal("lock poisoned".into()))
    }

    fn lock_watches(&self) -> Result<MutexGuard<'_, Watches>, StoreError> {
        self.watches
            .lock()
            .map_err(|_| StoreError::Internal("lock poisoned".into()))
    }

    /// Deactivates the watch before unregistering it, so a fan-out already
    /// holding it skips the listener.
    fn remove_watch(&self, id: u64) {
        let mut watches = lock(&self.watches);
        watches.docs.retain(|w| {
            if w.id == id {
                w.delivery.cancel();
            }
            w.id != id
        });
        watches.queries.retain(|w| {
            if w.id == id {
                w.delivery.cancel();
            }
            w.id != id
        });
    }

    fn snapshot(&self, reference: &DocumentRef) -> Result<DocumentSnapshot, StoreError> {
        let documents = self.read_documents()?;
        Ok(DocumentSnapshot::new(
            reference.clone(),
            documents.get(reference).cloned(),
        ))
    }

    fn evaluate(&self, query: &Query) -> Result<QuerySnapshot, StoreError> {
        let documents = self.read_documents()?;
        let collection = query.collection();

        let mut matched: Vec<(&DocumentRef, &Record)> = documents
            .iter()
            .filter(|(reference, _)| is_child_of(reference, collection))
            .filter(|(_, record)| query.matches(record))
            .collect();

        if !query.orderings().is_empty() {
            matched.sort_by(|a, b| query.compare(*a, *b));
        }
        if let Some(limit) = query.max_results() {
            matched.truncate(limit);
        }

        Ok(QuerySnapshot::new(
            matched
                .into_iter()
                .map(|(reference, record)| {
                    DocumentSnapshot::new(reference.clone(), Some(record.clone()))
                })
                .collect(),
        ))
    }

    fn deliver_doc(&self, watch: &DocWatch) {
        watch.delivery.run(
            || self.snapshot(&watch.reference),
            |snapshot| (watch.listener)(snapshot),
        );
    }

    fn deliver_query(&self, watch: &QueryWatch) {
        watch.delivery.run(
            || self.evaluate(&watch.query),
            |snapshot| (watch.listener)(snapshot),
        );
    }

    /// Fan a change at `reference` out to document and query listeners.
    fn notify(&self, reference: &DocumentRef) {
        let (docs, queries) = match self.lock_watches() {
            Ok(watches) => {
                let collection = reference.parent();
                let docs: Vec<Arc<DocWatch>> = watches
                    .docs
                    .iter()
                    .filter(|w| &w.reference == reference)
                    .cloned()
                    .collect();
                let queries: Vec<Arc<QueryWatch>> = watches
                    .queries
                    .iter()
                    .filter(|w| w.query.collection() == &collection)
                    .cloned()
                    .collect();
                (docs, queries)
            }
            Err(_) => return,
        };

        trace!(
            "notifying {} document and {} query listeners for {}",
            docs.len(),
            queries.len(),
            reference
        );

        for watch in docs {
            self.deliver_doc(&watch);
        }
        for watch in queries {
            self.deliver_query(&watch);
        }
    }
}

fn is_child_of(reference: &DocumentRef, collection: &CollectionRef) -> bool {
    reference
        .path()
        .strip_prefix(collection.path())
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|id| !id.contains('/'))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, reference: &DocumentRef) -> Result<Option<Record>, StoreError> {
        let documents = self.inner.read_documents()?;
        Ok(documents.get(reference).cloned())
    }

    async fn set(&self, reference: &DocumentRef, record: Record) -> Result<(), StoreError> {
        self.check_writable(reference)?;
        let changed = {
            let mut documents = self.inner.write_documents()?;
            let previous = documents.insert(reference.clone(), record);
            previous.as_ref() != documents.get(reference)
        };
        if changed {
            self.inner.notify(reference);
        }
        Ok(())
    }

    async fn update(&self, reference: &DocumentRef, record: Record) -> Result<(), StoreError> {
        self.check_writable(reference)?;
        let changed = {
            let mut documents = self.inner.write_documents()?;
            let stored = documents
                .get_mut(reference)
                .ok_or_else(|| StoreError::NotFound {
                    path: reference.path().to_string(),
                })?;
            let before = stored.clone();
            merge_into(stored, record);
            before != *stored
        };
        if changed {
            self.inner.notify(reference);
        }
        Ok(())
    }

    async fn delete(&self, reference: &DocumentRef) -> Result<(), StoreError> {
        self.check_writable(reference)?;
        let existed = {
            let mut documents = self.inner.write_documents()?;
            documents.remove(reference).is_some()
        };
        if existed {
            self.inner.notify(reference);
        }
        Ok(())
    }

    async fn run_query(&self, query: &Query) -> Result<QuerySnapshot, StoreError> {
        self.inner.evaluate(query)
    }

    fn on_document_snapshot(
        &self,
        reference: &DocumentRef,
        listener: DocumentListener,
    ) -> Result<Subscription, StoreError> {
        let id = self.next_id();
        let watch = Arc::new(DocWatch {
            id,
            reference: reference.clone(),
            listener,
            delivery: Delivery::new(),
        });
        self.inner.lock_watches()?.docs.push(Arc::clone(&watch));

        self.inner.deliver_doc(&watch);
        Ok(self.subscription(id))
    }

    fn on_query_snapshot(
        &self,
        query: &Query,
        listener: QueryListener,
    ) -> Result<Subscription, StoreError> {
        let id = self.next_id();
        let watch = Arc::new(QueryWatch {
            id,
            query: query.clone(),
            listener,
            delivery: Delivery::new(),
        });
        self.inner.lock_watches()?.queries.push(Arc::clone(&watch));

        self.inner.deliver_query(&watch);
        Ok(self.subscription(id))
    }
}
