//! In-process document store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use taskhub_proto::{Document, WriteFields};

use super::{DocumentStore, OrderBy, StoreError, StoredDocument};
use crate::clock::Clock;

#[derive(Debug)]
struct Entry {
    /// Insertion sequence, used to keep ordering stable.
    seq: u64,
    fields: Document,
}

#[derive(Debug, Default)]
struct StoreState {
    collections: HashMap<String, HashMap<String, Entry>>,
    next_seq: u64,
    unavailable: bool,
    writes: u64,
}

impl StoreState {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// A document store held in memory and shared by cloning.
///
/// Clones share the same collections, so several sessions can act on one
/// store the way several devices act on one hosted backend.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<StoreState>>,
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl InMemoryDocumentStore {
    /// Creates an empty store stamping server timestamps from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    /// Makes every subsequent operation fail with
    /// [`StoreError::Unavailable`] until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Number of documents in `collection`.
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .collections
            .get(collection)
            .map_or(0, HashMap::len)
    }

    /// Number of successful writes (insert, set, update, delete) so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.state.lock().writes
    }

    /// Overwrites a stored document with raw fields, bypassing the write
    /// model. Lets tests plant records other clients could have written.
    pub fn put_raw(&self, collection: &str, id: &str, fields: Document) {
        let mut state = self.state.lock();
        let seq = state.bump_seq();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), Entry { seq, fields });
    }
}

impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, collection: &str, fields: WriteFields) -> Result<String, StoreError> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        state.check_available()?;
        let id = uuid::Uuid::now_v7().simple().to_string();
        let seq = state.bump_seq();
        state.writes += 1;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(
                id.clone(),
                Entry {
                    seq,
                    fields: fields.resolve(now),
                },
            );
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: WriteFields) -> Result<(), StoreError> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        state.check_available()?;
        let next_seq = state.next_seq;
        let docs = state.collections.entry(collection.to_string()).or_default();
        let seq = docs.get(id).map_or(next_seq, |entry| entry.seq);
        docs.insert(
            id.to_string(),
            Entry {
                seq,
                fields: fields.resolve(now),
            },
        );
        if seq == next_seq {
            state.next_seq += 1;
        }
        state.writes += 1;
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields,
    ) -> Result<(), StoreError> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        state.check_available()?;
        let entry = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        for (name, value) in fields.iter() {
            entry.fields.insert(name.to_string(), value.resolve(now));
        }
        state.writes += 1;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.check_available()?;
        if let Some(docs) = state.collections.get_mut(collection) {
            docs.remove(id);
        }
        state.writes += 1;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let state = self.state.lock();
        state.check_available()?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|entry| StoredDocument {
                id: id.to_string(),
                fields: entry.fields.clone(),
            }))
    }

    async fn query_all(
        &self,
        collection: &str,
        order: Option<OrderBy>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let state = self.state.lock();
        state.check_available()?;
        let Some(docs) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<(&String, &Entry)> = docs.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        if let Some(order) = &order {
            // Stable sort: equal keys keep insertion order.
            entries.sort_by(|(_, a), (_, b)| order.compare(&a.fields, &b.fields));
        }

        Ok(entries
            .into_iter()
            .map(|(id, entry)| StoredDocument {
                id: id.clone(),
                fields: entry.fields.clone(),
            })
            .collect())
    }
}
