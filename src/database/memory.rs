use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::database::store::{Document, DocumentStore, Filter, Modified, Mutator, Query};
use crate::error::{Error, Result};

/// In-process document store. Used when no database is configured and by
/// the test suites.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let guard = self.collections.read().await;
        Ok(guard.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn create(&self, collection: &str, id: &str, data: &JsonValue) -> Result<Document> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(Error::Conflict(format!("{}/{} already exists", collection, id)));
        }
        let doc = Document {
            id: id.to_string(),
            data: data.clone(),
            version: 1,
        };
        docs.insert(id.to_string(), doc.clone());
        Ok(doc)
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        data: &JsonValue,
        expected_version: i64,
    ) -> Result<Option<Document>> {
        let mut guard = self.collections.write().await;
        let Some(existing) = guard.get_mut(collection).and_then(|docs| docs.get_mut(id)) else {
            return Ok(None);
        };
        if existing.version != expected_version {
            return Ok(None);
        }
        existing.data = data.clone();
        existing.version += 1;
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, collection: &str, id: &str, expected_version: i64) -> Result<bool> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(false);
        };
        match docs.get(id) {
            Some(doc) if doc.version == expected_version => {
                docs.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn modify(
        &self,
        collection: &str,
        id: &str,
        mutate: Mutator<'_>,
    ) -> Result<Option<Modified>> {
        let mut guard = self.collections.write().await;
        let Some(existing) = guard.get_mut(collection).and_then(|docs| docs.get_mut(id)) else {
            return Ok(None);
        };
        let written = match mutate(&existing.data)? {
            Some(data) => {
                existing.data = data;
                existing.version += 1;
                true
            }
            None => false,
        };
        Ok(Some(Modified {
            document: existing.clone(),
            written,
        }))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let guard = self.collections.read().await;
        let Some(docs) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .values()
            .filter(|doc| query.filters.iter().all(|f| matches_filter(&doc.data, f)))
            .cloned()
            .collect())
    }
}

fn matches_filter(data: &JsonValue, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(field, value) => data.get(field) == Some(value),
    }
}
