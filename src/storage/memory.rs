use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{validate_collection, DocumentStore, Filter, Record, StoreError, StoreResult};

type Collections = HashMap<String, Vec<Record>>;

/// Process-local store. Clones share the same underlying collections.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|guard| guard.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn read<T>(&self, f: impl FnOnce(&Collections) -> T) -> StoreResult<T> {
        let guard = self
            .collections
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        Ok(f(&guard))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Collections) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        f(&mut guard)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, fields: Map<String, Value>) -> StoreResult<Record> {
        validate_collection(collection)?;
        let record = Record::new(Uuid::new_v4(), fields);
        self.write(|collections| {
            collections
                .entry(collection.to_string())
                .or_default()
                .push(record.clone());
            Ok(())
        })?;
        Ok(record)
    }

    async fn update(&self, collection: &str, record: Record) -> StoreResult<Record> {
        validate_collection(collection)?;
        self.write(|collections| {
            let slot = collections
                .get_mut(collection)
                .and_then(|records| records.iter_mut().find(|existing| existing.id == record.id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: record.id,
                })?;
            *slot = record.clone();
            Ok(())
        })?;
        Ok(record)
    }

    async fn get(&self, collection: &str, id: Uuid) -> StoreResult<Option<Record>> {
        validate_collection(collection)?;
        self.read(|collections| {
            collections
                .get(collection)
                .and_then(|records| records.iter().find(|record| record.id == id))
                .cloned()
        })
    }

    async fn fetch(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Record>> {
        validate_collection(collection)?;
        self.read(|collections| {
            collections
                .get(collection)
                .map(|records| {
                    records
                        .iter()
                        .filter(|record| filter.matches(record))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        })
    }
}
