//! Document - the shape descriptor of a mapped type.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::MapperError;
use crate::mapper::{Mapped, Mapper};
use crate::schema::{FieldSpec, Schema};

/// Trait for types that can be mapped to store documents.
///
/// Usually derived with `#[derive(Document)]`; a manual impl only needs the
/// two constants.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The collection documents of this type live in by default
    /// (e.g. "users", "game_views").
    const COLLECTION: &'static str;

    /// Persisted fields, in record order.
    const FIELDS: &'static [FieldSpec];

    fn schema() -> Schema {
        Schema::new(Self::COLLECTION, Self::FIELDS)
    }
}

/// Domain-specific lookup behind [`Mapper::get`].
///
/// The default body fails with [`MapperError::NotImplemented`]; types
/// override it with their own lookup (an id shortcut, a unique-field search).
///
/// ```ignore
/// #[document_dao::async_trait]
/// impl Lookup for User {
///     type Params = String;
///
///     async fn lookup(
///         users: &Mapper<Self>,
///         id: String,
///     ) -> Result<Option<Mapped<Self>>, MapperError> {
///         let reference = users.collection().doc(&id).map_err(StoreError::from)?;
///         users.from_reference(reference).await
///     }
/// }
/// ```
#[async_trait]
pub trait Lookup: Document {
    type Params: Send + 'static;

    async fn lookup(
        mapper: &Mapper<Self>,
        params: Self::Params,
    ) -> Result<Option<Mapped<Self>>, MapperError> {
        let _ = (mapper, params);
        Err(MapperError::NotImplemented {
            collection: Self::COLLECTION,
            operation: "get",
        })
    }
}
