//! Document store capability.
//!
//! Entities live as JSON documents in named collections. Every write that
//! modifies an existing document is conditional on the version the caller
//! read, so read-modify-write cycles are safe under concurrent requests.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

pub mod collections {
    pub const MATCHES: &str = "matches";
    pub const API_KEYS: &str = "apiKeys";
    pub const JOBS: &str = "jobs";
    pub const COMPANIES: &str = "companies";
    pub const STORES: &str = "stores";
    pub const CANDIDATES: &str = "candidates";
    pub const USERS: &str = "users";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Bound on optimistic write retries before giving up with `Conflict`.
pub const MAX_WRITE_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: JsonValue,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Top-level field equals the value.
    Eq(String, JsonValue),
}

/// Conjunction of filters. Results come back in id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }
}

/// Callback for [`DocumentStore::modify`]: given the current data, returns
/// the replacement, or `None` to leave the document as it is.
pub type Mutator<'a> = &'a (dyn Fn(&JsonValue) -> Result<Option<JsonValue>> + Send + Sync);

/// Result of [`DocumentStore::modify`]: the document as it stands afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Modified {
    pub document: Document,
    pub written: bool,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Inserts a new document at version 1. Fails with `Conflict` if the id
    /// is taken.
    async fn create(&self, collection: &str, id: &str, data: &JsonValue) -> Result<Document>;

    /// Replaces the document if it is still at `expected_version`. Returns
    /// `None` when the document changed or disappeared in the meantime.
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        data: &JsonValue,
        expected_version: i64,
    ) -> Result<Option<Document>>;

    /// Deletes the document if it is still at `expected_version`.
    async fn delete(&self, collection: &str, id: &str, expected_version: i64) -> Result<bool>;

    /// Runs `mutate` against the document while no other writer can touch
    /// it and persists its result. `None` when the document does not exist.
    async fn modify(
        &self,
        collection: &str,
        id: &str,
        mutate: Mutator<'_>,
    ) -> Result<Option<Modified>>;

    /// Documents matching every filter, in id order.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;
}

/// A decoded document together with the version it was read at.
#[derive(Debug, Clone)]
pub struct Stored<T> {
    pub id: String,
    pub version: i64,
    pub value: T,
}

/// Decodes a raw document into its typed schema. Documents that do not fit
/// the schema are rejected instead of being defaulted.
pub fn decode<T: DeserializeOwned>(collection: &str, doc: Document) -> Result<Stored<T>> {
    let value = decode_value(collection, &doc.id, doc.data)?;
    Ok(Stored {
        id: doc.id,
        version: doc.version,
        value,
    })
}

fn decode_value<T: DeserializeOwned>(collection: &str, id: &str, data: JsonValue) -> Result<T> {
    serde_json::from_value(data).map_err(|e| Error::MalformedDocument {
        collection: collection.to_string(),
        id: id.to_string(),
        reason: e.to_string(),
    })
}

pub fn encode<T: Serialize>(value: &T) -> Result<JsonValue> {
    Ok(serde_json::to_value(value)?)
}

pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Option<Stored<T>>> {
    match store.get(collection, id).await? {
        Some(doc) => Ok(Some(decode(collection, doc)?)),
        None => Ok(None),
    }
}

pub async fn query_typed<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    query: &Query,
) -> Result<Vec<Stored<T>>> {
    store
        .query(collection, query)
        .await?
        .into_iter()
        .map(|doc| decode(collection, doc))
        .collect()
}

/// Typed [`DocumentStore::modify`]. `change` edits the decoded value in
/// place and returns whether it should be written back.
pub async fn modify_typed<T, F>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    change: F,
) -> Result<Option<(Stored<T>, bool)>>
where
    T: DeserializeOwned + Serialize,
    F: Fn(&mut T) -> bool + Send + Sync,
{
    let mutate = |data: &JsonValue| -> Result<Option<JsonValue>> {
        let mut value: T = decode_value(collection, id, data.clone())?;
        if change(&mut value) {
            Ok(Some(encode(&value)?))
        } else {
            Ok(None)
        }
    };

    match store.modify(collection, id, &mutate).await? {
        Some(modified) => Ok(Some((decode(collection, modified.document)?, modified.written))),
        None => Ok(None),
    }
}
