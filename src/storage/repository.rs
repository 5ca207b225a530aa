use std::sync::Arc;

use uuid::Uuid;

use crate::domain::Persisted;

use super::{to_fields, DocumentStore, Filter, MemoryStore, Record, StoreError, StoreResult};

/// Typed façade over a [`DocumentStore`].
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn create<E: Persisted>(&self, payload: &E::Payload) -> StoreResult<E> {
        let fields = to_fields(E::COLLECTION, payload)?;
        let record = self.store.create(E::COLLECTION, fields).await?;
        tracing::debug!(collection = E::COLLECTION, id = %record.id, "record created");
        record.into_entity()
    }

    pub async fn update<E: Persisted>(&self, entity: &E) -> StoreResult<E> {
        let record = Record::from_entity(entity)?;
        let saved = self.store.update(E::COLLECTION, record).await?;
        tracing::debug!(collection = E::COLLECTION, id = %saved.id, "record updated");
        saved.into_entity()
    }

    pub async fn get<E: Persisted>(&self, id: Uuid) -> StoreResult<Option<E>> {
        self.store
            .get(E::COLLECTION, id)
            .await?
            .map(Record::into_entity)
            .transpose()
    }

    /// Like [`Repository::get`] but treats absence as an error.
    pub async fn require<E: Persisted>(&self, id: Uuid) -> StoreResult<E> {
        self.get(id).await?.ok_or_else(|| StoreError::NotFound {
            collection: E::COLLECTION.to_string(),
            id,
        })
    }

    pub async fn list<E: Persisted>(&self, filter: &Filter) -> StoreResult<Vec<E>> {
        self.store
            .fetch(E::COLLECTION, filter)
            .await?
            .into_iter()
            .map(Record::into_entity)
            .collect()
    }
}
