#![allow(dead_code)]

pub mod models;
pub mod strict_store;

use std::sync::Arc;

use document_dao::{DocumentStore, InMemoryDocumentStore, Record};
use serde_json::Value;

/// A fresh store, plus the same store as the handle mappers take.
pub fn store() -> (InMemoryDocumentStore, Arc<dyn DocumentStore>) {
    let store = InMemoryDocumentStore::new();
    let handle: Arc<dyn DocumentStore> = Arc::new(store.clone());
    (store, handle)
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a map, got {}", other),
    }
}
