//! Persistent document store abstraction.
//!
//! A store holds named collections of schemaless documents keyed by a
//! store-assigned id. Writes are [`WriteFields`]; any
//! [`FieldValue::ServerTimestamp`](taskhub_proto::FieldValue::ServerTimestamp)
//! in a write is stamped by the store's own clock.

pub mod memory;

pub use memory::InMemoryDocumentStore;

use std::cmp::Ordering;

use serde_json::Value;
use taskhub_proto::{Document, WriteFields};

/// A document as read back from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Store-assigned id.
    pub id: String,
    /// Stored fields.
    pub fields: Document,
}

/// Sort direction for [`OrderBy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Ordering applied by [`DocumentStore::query_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field to sort on.
    pub field: String,
    /// Sort direction.
    pub direction: Direction,
}

impl OrderBy {
    /// Largest `field` first.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    /// Smallest `field` first.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    /// Compares two documents on this ordering.
    ///
    /// Missing fields sort before any value; mixed types sort by type
    /// (null, bool, number, string, other).
    #[must_use]
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ord = compare_values(a.get(&self.field), b.get(&self.field));
        match self.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_) | Value::Object(_)) => 4,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_u64(), y.as_u64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Errors surfaced by a document store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The targeted document does not exist.
    #[error("document {collection}/{id} not found")]
    NotFound {
        /// Collection searched.
        collection: String,
        /// Id that was not found.
        id: String,
    },

    /// The store could not be reached.
    #[error("document store unavailable")]
    Unavailable,

    /// The store refused the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// Async document store.
///
/// # Consistency
///
/// A read issued after a write may or may not observe that write;
/// callers that need fresh data re-query.
pub trait DocumentStore: Send + Sync {
    /// Adds a document with a store-assigned id and returns the id.
    fn insert(
        &self,
        collection: &str,
        fields: WriteFields,
    ) -> impl std::future::Future<Output = Result<String, StoreError>> + Send;

    /// Creates or replaces the document at `id`.
    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Overwrites only the given fields of an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the document does not exist.
    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Removes a document. Deleting a missing document succeeds.
    fn delete(
        &self,
        collection: &str,
        id: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Reads one document.
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<StoredDocument>, StoreError>> + Send;

    /// Reads a whole collection, optionally ordered.
    ///
    /// Without an ordering, documents come back in insertion order.
    fn query_all(
        &self,
        collection: &str,
        order: Option<OrderBy>,
    ) -> impl std::future::Future<Output = Result<Vec<StoredDocument>, StoreError>> + Send;
}
