//! Mapper - typed load, persist and subscribe operations over a document store.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use log::{debug, warn};

use crate::document::{Document, Lookup};
use crate::error::{MapperError, StoreError};
use crate::record::Record;
use crate::reference::{CollectionRef, DocTarget, DocumentRef};
use crate::serializer;
use crate::store::{
    DocumentListener, DocumentSnapshot, DocumentStore, Query, QueryListener, QuerySnapshot,
};
use crate::subscription::Subscription;

/// How [`Mapped::persist`] writes a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistOptions {
    /// Merge the record's fields into the stored document instead of
    /// replacing it.
    pub partial: bool,
}

impl PersistOptions {
    /// Replace the whole stored document.
    pub fn full() -> Self {
        Self { partial: false }
    }

    /// Write only the fields present in the record; other stored fields survive.
    pub fn partial() -> Self {
        Self { partial: true }
    }
}

/// Typed entry point for one document type.
///
/// Holds the store handle every operation runs against; instances it
/// produces carry a clone of that handle.
pub struct Mapper<D> {
    store: Arc<dyn DocumentStore>,
    collection: CollectionRef,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Clone for Mapper<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            collection: self.collection.clone(),
            _marker: PhantomData,
        }
    }
}

impl<D> fmt::Debug for Mapper<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl<D: Document> Mapper<D> {
    /// Mapper over `D::COLLECTION`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Result<Self, MapperError> {
        let collection = store.collection(D::COLLECTION)?;
        Ok(Self {
            store,
            collection,
            _marker: PhantomData,
        })
    }

    /// Mapper over another collection, e.g. a subcollection `users/u1/posts`.
    pub fn with_collection(
        store: Arc<dyn DocumentStore>,
        collection: &str,
    ) -> Result<Self, MapperError> {
        let collection = store.collection(collection)?;
        Ok(Self {
            store,
            collection,
            _marker: PhantomData,
        })
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    /// A query over this mapper's collection.
    pub fn query(&self) -> Query {
        self.collection.query()
    }

    /// Bind `data` to a new document with a generated id.
    pub fn create(&self, data: D) -> Mapped<D> {
        self.attach(self.collection.new_doc(), data)
    }

    /// Bind `data` to the document `id` in this collection.
    pub fn create_at(&self, id: &str, data: D) -> Result<Mapped<D>, MapperError> {
        let reference = self.collection.doc(id).map_err(StoreError::from)?;
        Ok(self.attach(reference, data))
    }

    /// Bind `data` to an explicit reference.
    pub fn attach(&self, reference: DocumentRef, data: D) -> Mapped<D> {
        Mapped {
            reference,
            data,
            store: Arc::clone(&self.store),
        }
    }

    /// Build an instance from a raw record. The store is not consulted.
    pub fn from_record(
        &self,
        record: &Record,
        reference: DocumentRef,
    ) -> Result<Mapped<D>, MapperError> {
        let data = serializer::deserialize::<D>(record)?;
        Ok(self.attach(reference, data))
    }

    fn resolve(&self, target: DocTarget) -> Result<DocumentRef, MapperError> {
        match target {
            DocTarget::Ref(reference) => Ok(reference),
            DocTarget::Path(path) => Ok(self.store.doc(&path)?),
        }
    }

    /// Load the document at a reference or path.
    ///
    /// `Ok(None)` means no document exists there; store failures are `Err`.
    pub async fn from_reference(
        &self,
        target: impl Into<DocTarget>,
    ) -> Result<Option<Mapped<D>>, MapperError> {
        let reference = self.resolve(target.into())?;
        debug!("reading {}", reference);

        match self.store.get(&reference).await? {
            Some(record) => self.from_record(&record, reference).map(Some),
            None => Ok(None),
        }
    }

    /// Run the type's own [`Lookup`].
    pub async fn get(&self, params: D::Params) -> Result<Option<Mapped<D>>, MapperError>
    where
        D: Lookup,
    {
        D::lookup(self, params).await
    }

    /// Load every document matching `query`, in store order.
    pub async fn list(&self, query: &Query) -> Result<Vec<Mapped<D>>, MapperError> {
        debug!("querying {}", query.collection());
        let snapshot = self.store.run_query(query).await?;
        self.materialize_all(snapshot)
    }

    fn materialize_all(&self, snapshot: QuerySnapshot) -> Result<Vec<Mapped<D>>, MapperError> {
        snapshot
            .into_docs()
            .into_iter()
            .filter_map(|doc| {
                let (reference, record) = doc.into_parts();
                record.map(|record| self.from_record(&record, reference))
            })
            .collect()
    }

    fn materialize(&self, snapshot: DocumentSnapshot) -> Result<Option<Mapped<D>>, MapperError> {
        match snapshot.into_parts() {
            (reference, Some(record)) => self.from_record(&record, reference).map(Some),
            (_, None) => Ok(None),
        }
    }

    /// Watch a query. `callback` gets the mapped results on registration
    /// and after every change, until the subscription is cancelled.
    pub fn subscribe_list<F>(
        &self,
        query: &Query,
        callback: F,
    ) -> Result<Subscription, MapperError>
    where
        F: Fn(Result<Vec<Mapped<D>>, MapperError>) + Send + Sync + 'static,
    {
        let mapper = self.clone();
        let listener: QueryListener =
            Arc::new(move |snapshot: Result<QuerySnapshot, StoreError>| {
                let result = snapshot
                    .map_err(MapperError::from)
                    .and_then(|snapshot| mapper.materialize_all(snapshot));
                if let Err(err) = &result {
                    warn!("{}: list snapshot not delivered: {}", mapper.collection, err);
                }
                callback(result);
            });

        debug!("subscribing to query on {}", query.collection());
        Ok(self.store.on_query_snapshot(query, listener)?)
    }

    /// Watch one document. `callback` gets `Ok(None)` while it does not exist.
    pub fn subscribe_doc<F>(
        &self,
        target: impl Into<DocTarget>,
        callback: F,
    ) -> Result<Subscription, MapperError>
    where
        F: Fn(Result<Option<Mapped<D>>, MapperError>) + Send + Sync + 'static,
    {
        let reference = self.resolve(target.into())?;
        let mapper = self.clone();
        let listener: DocumentListener =
            Arc::new(move |snapshot: Result<DocumentSnapshot, StoreError>| {
                let result = snapshot
                    .map_err(MapperError::from)
                    .and_then(|snapshot| mapper.materialize(snapshot));
                if let Err(err) = &result {
                    warn!("document snapshot not delivered: {}", err);
                }
                callback(result);
            });

        debug!("subscribing to {}", reference);
        Ok(self.store.on_document_snapshot(&reference, listener)?)
    }
}

/// A value bound to the one document it is persisted at.
///
/// Dereferences to `D`, so domain fields are read and changed directly.
pub struct Mapped<D> {
    reference: DocumentRef,
    data: D,
    store: Arc<dyn DocumentStore>,
}

impl<D: Clone> Clone for Mapped<D> {
    fn clone(&self) -> Self {
        Self {
            reference: self.reference.clone(),
            data: self.data.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<D: fmt::Debug> fmt::Debug for Mapped<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapped")
            .field("reference", &self.reference)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

impl<D: PartialEq> PartialEq for Mapped<D> {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference && self.data == other.data
    }
}

impl<D> Deref for Mapped<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.data
    }
}

impl<D> DerefMut for Mapped<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.data
    }
}

impl<D: Document> Mapped<D> {
    pub fn reference(&self) -> &DocumentRef {
        &self.reference
    }

    pub fn id(&self) -> &str {
        self.reference.id()
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn into_inner(self) -> D {
        self.data
    }

    pub fn into_parts(self) -> (DocumentRef, D) {
        (self.reference, self.data)
    }

    /// The declared fields as a record.
    pub fn to_record(&self) -> Result<Record, MapperError> {
        serializer::serialize(&self.data)
    }

    /// Write the record to this instance's document.
    pub async fn persist(&self, options: PersistOptions) -> Result<(), MapperError> {
        let record = self.to_record()?;
        if options.partial {
            debug!("merging {} fields into {}", record.len(), self.reference);
            self.store.update(&self.reference, record).await?;
        } else {
            debug!("writing {}", self.reference);
            self.store.set(&self.reference, record).await?;
        }
        Ok(())
    }

    /// Merge only the named fields into this instance's document.
    ///
    /// A named field with no value (an empty optional) is left untouched.
    pub async fn persist_fields(&self, fields: &[&str]) -> Result<(), MapperError> {
        let schema = D::schema();
        if let Some(unknown) = fields.iter().find(|name| schema.field(name).is_none()) {
            return Err(MapperError::UnknownField {
                collection: D::COLLECTION,
                field: unknown.to_string(),
            });
        }

        let mut record = self.to_record()?;
        record.retain(|name, _| fields.contains(&name.as_str()));

        debug!("merging {:?} into {}", fields, self.reference);
        self.store.update(&self.reference, record).await?;
        Ok(())
    }

    /// Delete this instance's document. Deleting a missing document succeeds.
    pub async fn un_persist(&self) -> Result<(), MapperError> {
        debug!("deleting {}", self.reference);
        match self.store.delete(&self.reference).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound { path }) => {
                debug!("{} was already deleted", path);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use crate::{FieldSpec, FieldType};
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: u32,
    }

    impl Document for User {
        const COLLECTION: &'static str = "users";
        const FIELDS: &'static [FieldSpec] = &[
            FieldSpec::required("name", FieldType::String),
            FieldSpec::required("age", FieldType::Integer),
        ];
    }

    impl Lookup for User {
        type Params = ();
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn setup() -> (InMemoryDocumentStore, Mapper<User>) {
        let store = InMemoryDocumentStore::new();
        let users = Mapper::<User>::new(Arc::new(store.clone())).unwrap();
        (store, users)
    }

    #[test]
    fn rejects_invalid_collection() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let err = Mapper::<User>::with_collection(store, "users/u1").unwrap_err();
        assert!(matches!(
            err,
            MapperError::Store(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn create_assigns_reference_in_collection() {
        let (_, users) = setup();
        let user = users.create(User {
            name: "Drake".into(),
            age: 25,
        });
        assert_eq!(user.reference().parent().path(), "users");
        assert_eq!(user.name, "Drake");
    }

    #[tokio::test]
    async fn persist_then_load() {
        let (_, users) = setup();
        let user = users.create(User {
            name: "Drake".into(),
            age: 25,
        });
        user.persist(PersistOptions::full()).await.unwrap();

        let loaded = users.from_reference(user.reference()).await.unwrap().unwrap();
        assert_eq!(loaded, user);
    }

    #[tokio::test]
    async fn path_targets_resolve_through_store() {
        let (store, users) = setup();
        let reference = DocumentRef::parse("users/jacob").unwrap();
        store
            .set(&reference, record(json!({ "name": "Jacob", "age": 15 })))
            .await
            .unwrap();

        let loaded = users.from_reference("users/jacob").await.unwrap().unwrap();
        assert_eq!(loaded.reference(), &reference);
        assert_eq!(loaded.age, 15);

        let err = users.from_reference("users").await.unwrap_err();
        assert!(matches!(err, MapperError::Store(StoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn malformed_stored_record_is_deserialization_error() {
        let (store, users) = setup();
        let reference = DocumentRef::parse("users/odd").unwrap();
        store
            .set(&reference, record(json!({ "name": "Odd", "age": "many" })))
            .await
            .unwrap();

        let err = users.from_reference(&reference).await.unwrap_err();
        assert!(matches!(err, MapperError::Deserialization(_)));
    }

    #[tokio::test]
    async fn default_lookup_is_not_implemented() {
        let (_, users) = setup();
        let err = users.get(()).await.unwrap_err();
        assert_eq!(
            err,
            MapperError::NotImplemented {
                collection: "users",
                operation: "get",
            }
        );
    }

    #[tokio::test]
    async fn persist_fields_rejects_unknown_names() {
        let (store, users) = setup();
        let user = users.create(User {
            name: "Drake".into(),
            age: 25,
        });

        let err = user.persist_fields(&["email"]).await.unwrap_err();
        assert!(matches!(err, MapperError::UnknownField { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn write_failures_propagate() {
        let (store, users) = setup();
        store.deny_writes(true);
        let user = users.create(User {
            name: "Drake".into(),
            age: 25,
        });

        let err = user.persist(PersistOptions::full()).await.unwrap_err();
        assert!(matches!(
            err,
            MapperError::Store(StoreError::PermissionDenied { .. })
        ));
    }
}
