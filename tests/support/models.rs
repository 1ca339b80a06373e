//! Test domain: users in a `users` collection.

use document_dao::{Document, Lookup, Mapped, Mapper, MapperError, StoreError};
use serde::{Deserialize, Serialize};

/// A user with two required fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Document)]
#[document(collection = "users")]
pub struct User {
    pub name: String,
    pub age: u32,
}

impl User {
    pub fn new(name: &str, age: u32) -> Self {
        Self {
            name: name.to_string(),
            age,
        }
    }
}

/// `get` by document id.
#[document_dao::async_trait]
impl Lookup for User {
    type Params = String;

    async fn lookup(users: &Mapper<Self>, id: String) -> Result<Option<Mapped<Self>>, MapperError> {
        let reference = users.collection().doc(&id).map_err(StoreError::from)?;
        users.from_reference(reference).await
    }
}

/// The same documents seen through all-optional fields, for partial writes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Document)]
#[document(collection = "users")]
pub struct UserPatch {
    pub name: Option<String>,
    pub age: Option<u32>,
}

/// A type that keeps the default (unimplemented) lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Document)]
pub struct AuditEntry {
    pub action: String,
}

impl Lookup for AuditEntry {
    type Params = ();
}
