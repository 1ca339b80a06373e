//! A store that reports deletes of missing documents as `NotFound`.

use document_dao::{
    async_trait, CollectionRef, DocumentListener, DocumentRef, DocumentStore,
    InMemoryDocumentStore, Query, QueryListener, QuerySnapshot, Record, StoreError,
    Subscription,
};

#[derive(Clone, Default)]
pub struct StrictDeleteStore {
    inner: InMemoryDocumentStore,
}

impl StrictDeleteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for StrictDeleteStore {
    async fn get(&self, reference: &DocumentRef) -> Result<Option<Record>, StoreError> {
        self.inner.get(reference).await
    }

    async fn set(&self, reference: &DocumentRef, record: Record) -> Result<(), StoreError> {
        self.inner.set(reference, record).await
    }

    async fn update(&self, reference: &DocumentRef, record: Record) -> Result<(), StoreError> {
        self.inner.update(reference, record).await
    }

    async fn delete(&self, reference: &DocumentRef) -> Result<(), StoreError> {
        if self.inner.get(reference).await?.is_none() {
            return Err(StoreError::NotFound {
                path: reference.path().to_string(),
            });
        }
        self.inner.delete(reference).await
    }

    async fn add(
        &self,
        collection: &CollectionRef,
        record: Record,
    ) -> Result<DocumentRef, StoreError> {
        self.inner.add(collection, record).await
    }

    async fn run_query(&self, query: &Query) -> Result<QuerySnapshot, StoreError> {
        self.inner.run_query(query).await
    }

    fn on_document_snapshot(
        &self,
        reference: &DocumentRef,
        listener: DocumentListener,
    ) -> Result<Subscription, StoreError> {
        self.inner.on_document_snapshot(reference, listener)
    }

    fn on_query_snapshot(
        &self,
        query: &Query,
        listener: QueryListener,
    ) -> Result<Subscription, StoreError> {
        self.inner.on_query_snapshot(query, listener)
    }
}
