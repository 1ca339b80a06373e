//! DocumentStore - the document-database client a mapper talks to.
//!
//! Implementations own transport, consistency and snapshot delivery. The
//! crate ships [`InMemoryDocumentStore`] for tests and development.

#[cfg(feature = "memory")]
mod in_memory;
mod query;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::Record;
use crate::reference::{CollectionRef, DocumentRef};
use crate::subscription::Subscription;

#[cfg(feature = "memory")]
pub use in_memory::InMemoryDocumentStore;
pub use query::{Direction, Filter, FilterOp, OrderBy, Query};

/// The state of one document at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    reference: DocumentRef,
    record: Option<Record>,
}

impl DocumentSnapshot {
    pub fn new(reference: DocumentRef, record: Option<Record>) -> Self {
        Self { reference, record }
    }

    pub fn reference(&self) -> &DocumentRef {
        &self.reference
    }

    /// The stored fields, or `None` if the document does not exist.
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    pub fn exists(&self) -> bool {
        self.record.is_some()
    }

    pub fn into_parts(self) -> (DocumentRef, Option<Record>) {
        (self.reference, self.record)
    }
}

/// The documents matching a query, in result order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySnapshot {
    docs: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub fn new(docs: Vec<DocumentSnapshot>) -> Self {
        Self { docs }
    }

    pub fn docs(&self) -> &[DocumentSnapshot] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn into_docs(self) -> Vec<DocumentSnapshot> {
        self.docs
    }
}

/// Callback receiving every snapshot of a watched document.
pub type DocumentListener = Arc<dyn Fn(Result<DocumentSnapshot, StoreError>) + Send + Sync>;

/// Callback receiving every snapshot of a watched query.
pub type QueryListener = Arc<dyn Fn(Result<QuerySnapshot, StoreError>) + Send + Sync>;

/// Document-database client.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Resolve a document path to a reference.
    fn doc(&self, path: &str) -> Result<DocumentRef, StoreError> {
        Ok(DocumentRef::parse(path)?)
    }

    /// Resolve a collection path to a reference.
    fn collection(&self, path: &str) -> Result<CollectionRef, StoreError> {
        Ok(CollectionRef::parse(path)?)
    }

    /// Read a document. `Ok(None)` when it does not exist.
    async fn get(&self, reference: &DocumentRef) -> Result<Option<Record>, StoreError>;

    /// Create or fully replace a document.
    async fn set(&self, reference: &DocumentRef, record: Record) -> Result<(), StoreError>;

    /// Merge `record`'s fields into an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] when the document does not exist.
    async fn update(&self, reference: &DocumentRef, record: Record) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, reference: &DocumentRef) -> Result<(), StoreError>;

    /// Create a document with a generated id.
    async fn add(
        &self,
        collection: &CollectionRef,
        record: Record,
    ) -> Result<DocumentRef, StoreError> {
        let reference = collection.new_doc();
        self.set(&reference, record).await?;
        Ok(reference)
    }

    /// Read the current results of a query.
    async fn run_query(&self, query: &Query) -> Result<QuerySnapshot, StoreError>;

    /// Watch a document: `listener` gets the current state, then every change.
    fn on_document_snapshot(
        &self,
        reference: &DocumentRef,
        listener: DocumentListener,
    ) -> Result<Subscription, StoreError>;

    /// Watch a query: `listener` gets the current results, then every change.
    fn on_query_snapshot(
        &self,
        query: &Query,
        listener: QueryListener,
    ) -> Result<Subscription, StoreError>;
}
