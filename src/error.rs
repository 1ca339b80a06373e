use thiserror::Error;

use crate::reference::PathError;

/// Failure reported by a document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The operation needs an existing document (e.g. a merge update).
    #[error("no document at {path}")]
    NotFound { path: String },
    /// The store's access rules rejected the operation.
    #[error("permission denied for {path}")]
    PermissionDenied { path: String },
    /// A malformed path, query or value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Transport-level failure (network, backend down).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("internal store error: {0}")]
    Internal(String),
}

impl From<PathError> for StoreError {
    fn from(err: PathError) -> Self {
        StoreError::InvalidArgument(err.to_string())
    }
}

/// A record that cannot be turned into the target shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeserializationError {
    #[error("{collection}: required field `{field}` is missing")]
    MissingField {
        collection: &'static str,
        field: &'static str,
    },
    #[error("{collection}: field `{field}` expected {expected}, found {found}")]
    TypeMismatch {
        collection: &'static str,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{collection}: {message}")]
    Serde {
        collection: &'static str,
        message: String,
    },
}

/// Error type for mapper operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapperError {
    /// A lookup that the document type has not implemented.
    #[error("{operation} is not implemented for {collection}")]
    NotImplemented {
        collection: &'static str,
        operation: &'static str,
    },
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),
    #[error("{collection}: cannot serialize record: {message}")]
    Serialization {
        collection: &'static str,
        message: String,
    },
    #[error("{collection}: `{field}` is not a persisted field")]
    UnknownField {
        collection: &'static str,
        field: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = MapperError::from(DeserializationError::TypeMismatch {
            collection: "users",
            field: "age",
            expected: "integer",
            found: "string",
        });
        assert_eq!(
            err.to_string(),
            "users: field `age` expected integer, found string"
        );

        let err = MapperError::from(StoreError::NotFound {
            path: "users/abc".into(),
        });
        assert_eq!(err.to_string(), "no document at users/abc");
    }

    #[test]
    fn path_errors_become_invalid_argument() {
        let err: StoreError = PathError::Empty.into();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }
}
