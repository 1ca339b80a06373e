//! Active-record style document mapping.
//!
//! A [`Mapper`] turns records read from a [`DocumentStore`] into typed
//! [`Mapped`] values, and a [`Mapped`] value writes itself back to the one
//! [`DocumentRef`] it is bound to.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use document_dao::{Document, InMemoryDocumentStore, Mapper, PersistOptions};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize, Document)]
//! #[document(collection = "users")]
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! let users = Mapper::<User>::new(Arc::new(InMemoryDocumentStore::new()))?;
//! let mut drake = users.create(User { name: "Drake".into(), age: 25 });
//! drake.persist(PersistOptions::full()).await?;
//!
//! drake.age = 26;
//! drake.persist(PersistOptions::partial()).await?;
//!
//! let loaded = users.from_reference(drake.reference()).await?;
//! ```

// Lets generated `::document_dao::` paths resolve inside this crate.
extern crate self as document_dao;

mod document;
mod error;
mod mapper;
mod record;
mod reference;
mod schema;
pub mod serializer;
pub mod store;
mod subscription;

pub use document::{Document, Lookup};
pub use error::{DeserializationError, MapperError, StoreError};
pub use mapper::{Mapped, Mapper, PersistOptions};
pub use record::Record;
pub use reference::{CollectionRef, DocTarget, DocumentRef, PathError};
pub use schema::{FieldSpec, FieldType, Schema};
#[cfg(feature = "memory")]
pub use store::InMemoryDocumentStore;
pub use store::{
    Direction, DocumentListener, DocumentSnapshot, DocumentStore, FilterOp, Query,
    QueryListener, QuerySnapshot,
};
pub use subscription::Subscription;

#[cfg(feature = "derive")]
pub use document_dao_macros::Document;

// Re-exported so `Lookup` impls can use the same attribute the trait uses.
pub use async_trait::async_trait;
