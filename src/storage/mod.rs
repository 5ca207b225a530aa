//! Document-store abstraction used by wizard commits.
//!
//! Records are opaque JSON objects keyed by field name plus a store-assigned
//! identifier. Backends only need to implement [`DocumentStore`]; typed access
//! goes through [`Repository`].

pub mod json_backend;
pub mod memory;
pub mod repository;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::Persisted;
pub use crate::errors::{StoreError, StoreResult};

pub use json_backend::JsonStore;
pub use memory::MemoryStore;
pub use repository::Repository;

/// A stored document: the store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: Uuid, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Splits a typed entity into id and fields. The `id` field is not duplicated.
    pub fn from_entity<E: Persisted>(entity: &E) -> StoreResult<Self> {
        let mut fields = to_fields(E::COLLECTION, entity)?;
        fields.remove("id");
        Ok(Self::new(entity.id(), fields))
    }

    pub fn into_entity<E: Persisted>(self) -> StoreResult<E> {
        let Record { id, mut fields } = self;
        fields.insert("id".into(), Value::String(id.to_string()));
        serde_json::from_value(Value::Object(fields)).map_err(|source| StoreError::Corrupt {
            collection: E::COLLECTION.to_string(),
            id,
            source,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        if name == "id" {
            return None;
        }
        self.fields.get(name)
    }
}

/// Serializes a payload into the field map a store expects.
pub fn to_fields<T: Serialize + ?Sized>(
    collection: &str,
    payload: &T,
) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(payload)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidPayload(collection.to_string())),
    }
}

/// Selection criteria for [`DocumentStore::fetch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    /// Field equals value.
    Eq(String, Value),
    /// Array field contains value, or string field contains substring (case-insensitive).
    Contains(String, Value),
    Ids(Vec<Uuid>),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Contains(field.into(), value.into())
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, expected) => record.field(field) == Some(expected),
            Filter::Contains(field, needle) => match (record.field(field), needle) {
                (Some(Value::Array(items)), needle) => items.contains(needle),
                (Some(Value::String(haystack)), Value::String(needle)) => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => false,
            },
            Filter::Ids(ids) => ids.contains(&record.id),
            Filter::And(filters) => filters.iter().all(|filter| filter.matches(record)),
        }
    }
}

/// Asynchronous persistence collaborator. Writes are last-write-wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document and returns it with its assigned id.
    async fn create(&self, collection: &str, fields: Map<String, Value>) -> StoreResult<Record>;

    /// Replaces an existing document; fails with `NotFound` when absent.
    async fn update(&self, collection: &str, record: Record) -> StoreResult<Record>;

    async fn get(&self, collection: &str, id: Uuid) -> StoreResult<Option<Record>>;

    /// Returns matching documents in insertion order.
    async fn fetch(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Record>>;
}

pub(crate) fn validate_collection(name: &str) -> StoreResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: Value) -> Record {
        match fields {
            Value::Object(map) => Record::new(Uuid::new_v4(), map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn contains_matches_arrays_and_substrings() {
        let doc = record(json!({ "roles": ["Spieler", "Helfer"], "last_name": "Zürcher" }));
        assert!(Filter::contains("roles", "Spieler").matches(&doc));
        assert!(!Filter::contains("roles", "Vorstand").matches(&doc));
        assert!(Filter::contains("last_name", "zür").matches(&doc));
        assert!(!Filter::contains("missing", "x").matches(&doc));
    }

    #[test]
    fn and_requires_every_clause() {
        let doc = record(json!({ "season": "2025/26", "league": "3. Liga" }));
        let both = Filter::And(vec![
            Filter::eq("season", "2025/26"),
            Filter::eq("league", "3. Liga"),
        ]);
        assert!(both.matches(&doc));
        let one_wrong = Filter::And(vec![
            Filter::eq("season", "2025/26"),
            Filter::eq("league", "2. Liga"),
        ]);
        assert!(!one_wrong.matches(&doc));
    }

    #[test]
    fn collection_names_are_restricted() {
        assert!(validate_collection("bootcamp_registrations").is_ok());
        assert!(validate_collection("../etc").is_err());
        assert!(validate_collection("").is_err());
    }
}
