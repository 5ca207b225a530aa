use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use uuid::Uuid;

use crate::core::utils::{ensure_dir, tmp_path, PathResolver};

use super::{validate_collection, DocumentStore, Filter, Record, StoreError, StoreResult};

const COLLECTION_EXTENSION: &str = "json";

/// File-backed store: one pretty-printed JSON array per collection.
///
/// Writes stage to a temporary sibling and rename over the target, so a crash
/// mid-write leaves the previous file intact. A single mutex serialises
/// read-modify-write cycles within the process.
pub struct JsonStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(root: Option<PathBuf>) -> StoreResult<Self> {
        let base = PathResolver::resolve_base(root);
        let root = PathResolver::store_dir_in(&base);
        ensure_dir(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn new_default() -> StoreResult<Self> {
        Self::new(None)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", collection, COLLECTION_EXTENSION))
    }

    async fn load(&self, collection: &str) -> StoreResult<Vec<Record>> {
        let path = self.collection_path(collection);
        match fs::read_to_string(&path).await {
            Ok(data) if data.trim().is_empty() => Ok(Vec::new()),
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self, collection: &str, records: &[Record]) -> StoreResult<()> {
        let path = self.collection_path(collection);
        let tmp = tmp_path(&path);
        let json = serde_json::to_string_pretty(records)?;
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(json.as_bytes()).await?;
        file.flush().await?;
        drop(file);
        fs::rename(&tmp, &path).await?;
        tracing::debug!(collection, records = records.len(), "collection written");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonStore {
    async fn create(&self, collection: &str, fields: Map<String, Value>) -> StoreResult<Record> {
        validate_collection(collection)?;
        let _guard = self.write_lock.lock().await;
        let mut records = self.load(collection).await?;
        let record = Record::new(Uuid::new_v4(), fields);
        records.push(record.clone());
        self.persist(collection, &records).await?;
        Ok(record)
    }

    async fn update(&self, collection: &str, record: Record) -> StoreResult<Record> {
        validate_collection(collection)?;
        let _guard = self.write_lock.lock().await;
        let mut records = self.load(collection).await?;
        let slot = records
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: record.id,
            })?;
        *slot = record.clone();
        self.persist(collection, &records).await?;
        Ok(record)
    }

    async fn get(&self, collection: &str, id: Uuid) -> StoreResult<Option<Record>> {
        validate_collection(collection)?;
        Ok(self
            .load(collection)
            .await?
            .into_iter()
            .find(|record| record.id == id))
    }

    async fn fetch(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Record>> {
        validate_collection(collection)?;
        Ok(self
            .load(collection)
            .await?
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn records_survive_a_new_instance() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(Some(temp.path().to_path_buf())).unwrap();
        let created = store
            .create("members", fields(json!({ "first_name": "Nina" })))
            .await
            .unwrap();

        let reopened = JsonStore::new(Some(temp.path().to_path_buf())).unwrap();
        let fetched = reopened.get("members", created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn update_rewrites_in_place() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(Some(temp.path().to_path_buf())).unwrap();
        let mut record = store
            .create("teams", fields(json!({ "name": "U15" })))
            .await
            .unwrap();
        store
            .create("teams", fields(json!({ "name": "U17" })))
            .await
            .unwrap();
        record.fields.insert("name".into(), json!("U15 Junioren"));
        store.update("teams", record.clone()).await.unwrap();

        let all = store.fetch("teams", &Filter::All).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], record);
        assert!(!tmp_path(&store.collection_path("teams")).exists());
    }

    #[tokio::test]
    async fn unknown_collection_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(Some(temp.path().to_path_buf())).unwrap();
        assert!(store.fetch("expenses", &Filter::All).await.unwrap().is_empty());
    }
}
