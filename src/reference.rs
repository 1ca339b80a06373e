//! Document and collection addresses.
//!
//! Paths alternate collection and document segments: `users` is a
//! collection, `users/abc` a document, `users/abc/posts` a subcollection.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::store::Query;

/// Why a path string is not a valid reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path {path:?} contains an empty segment")]
    EmptySegment { path: String },
    #[error("path {path:?} does not address a {expected} (it has {segments} segments)")]
    WrongDepth {
        path: String,
        expected: &'static str,
        segments: usize,
    },
}

fn normalize(path: &str, want_even: bool) -> Result<String, PathError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(PathError::EmptySegment {
            path: path.to_string(),
        });
    }

    let is_even = segments.len() % 2 == 0;
    if is_even != want_even {
        return Err(PathError::WrongDepth {
            path: path.to_string(),
            expected: if want_even { "document" } else { "collection" },
            segments: segments.len(),
        });
    }

    Ok(trimmed.to_string())
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentRef {
    path: String,
}

impl DocumentRef {
    /// Parse a document path such as `users/abc`.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        Ok(Self {
            path: normalize(path, true)?,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The document id (last path segment).
    pub fn id(&self) -> &str {
        last_segment(&self.path)
    }

    /// The collection this document lives in.
    pub fn parent(&self) -> CollectionRef {
        let path = match self.path.rsplit_once('/') {
            Some((parent, _)) => parent.to_string(),
            None => self.path.clone(),
        };
        CollectionRef { path }
    }

    /// A subcollection below this document.
    pub fn collection(&self, name: &str) -> Result<CollectionRef, PathError> {
        CollectionRef::parse(&format!("{}/{}", self.path, name))
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Address of a collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionRef {
    path: String,
}

impl CollectionRef {
    /// Parse a collection path such as `users` or `users/abc/posts`.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        Ok(Self {
            path: normalize(path, false)?,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn id(&self) -> &str {
        last_segment(&self.path)
    }

    /// The document owning this collection, if it is a subcollection.
    pub fn parent(&self) -> Option<DocumentRef> {
        self.path.rsplit_once('/').map(|(parent, _)| DocumentRef {
            path: parent.to_string(),
        })
    }

    /// Reference to the document `id` in this collection.
    pub fn doc(&self, id: &str) -> Result<DocumentRef, PathError> {
        DocumentRef::parse(&format!("{}/{}", self.path, id))
    }

    /// Reference to a new document with a generated id.
    pub fn new_doc(&self) -> DocumentRef {
        DocumentRef {
            path: format!("{}/{}", self.path, Uuid::new_v4().simple()),
        }
    }

    /// A query matching every document in this collection.
    pub fn query(&self) -> Query {
        Query::new(self.clone())
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Either a live reference or a raw path the store resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocTarget {
    Ref(DocumentRef),
    Path(String),
}

impl From<DocumentRef> for DocTarget {
    fn from(reference: DocumentRef) -> Self {
        DocTarget::Ref(reference)
    }
}

impl From<&DocumentRef> for DocTarget {
    fn from(reference: &DocumentRef) -> Self {
        DocTarget::Ref(reference.clone())
    }
}

impl From<&str> for DocTarget {
    fn from(path: &str) -> Self {
        DocTarget::Path(path.to_string())
    }
}

impl From<String> for DocTarget {
    fn from(path: String) -> Self {
        DocTarget::Path(path)
    }
}

impl From<&String> for DocTarget {
    fn from(path: &String) -> Self {
        DocTarget::Path(path.clone())
    }
}
