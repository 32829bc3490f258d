//! In-memory Document Store
//!
//! 개발/테스트용 메모리 저장소

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use super::{Collection, Document, DocumentStore, Fields, StoreChange, CHANGE_FEED_CAPACITY};
use crate::error::{LaunchError, LaunchResult};

pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Fields>>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
        }
    }

    fn notify(&self, collection: Collection) {
        // 구독자가 없으면 무시
        let _ = self.changes.send(StoreChange { collection });
    }

    /// 컬렉션 문서 수
    pub async fn count(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: Collection, data: Fields) -> LaunchResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .insert(id.clone(), data);
        self.notify(collection);
        Ok(id)
    }

    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> LaunchResult<()> {
        {
            let mut collections = self.collections.write().await;
            let doc = collections
                .get_mut(&collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| LaunchError::Store(format!("{}/{} not found", collection.as_str(), id)))?;
            for (field, value) in fields {
                doc.insert(field, value);
            }
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> LaunchResult<()> {
        let removed = self
            .collections
            .write()
            .await
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id));
        if removed.is_some() {
            self.notify(collection);
        }
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> LaunchResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn find_by(&self, collection: Collection, field: &str, value: &Value) -> LaunchResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| data.get(field) == Some(value))
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list(&self, collection: Collection) -> LaunchResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_crud_and_equality_query() {
        let store = MemoryStore::new();
        let a = store
            .create(Collection::LaunchStatuses, fields(json!({"key": "p1-lezhin", "status": "launched"})))
            .await
            .unwrap();
        store
            .create(Collection::LaunchStatuses, fields(json!({"key": "p2-lezhin", "status": "pending"})))
            .await
            .unwrap();

        let found = store
            .find_by(Collection::LaunchStatuses, "key", &json!("p1-lezhin"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a);

        store
            .update(Collection::LaunchStatuses, &a, fields(json!({"status": "none"})))
            .await
            .unwrap();
        let all = store.list(Collection::LaunchStatuses).await.unwrap();
        let updated = all.iter().find(|d| d.id == a).unwrap();
        assert_eq!(updated.field_str("status"), Some("none"));
        assert_eq!(updated.field_str("key"), Some("p1-lezhin"));

        assert!(store.get(Collection::LaunchStatuses, &a).await.unwrap().is_some());
        store.delete(Collection::LaunchStatuses, &a).await.unwrap();
        assert!(store.get(Collection::LaunchStatuses, &a).await.unwrap().is_none());
        assert_eq!(store.count(Collection::LaunchStatuses).await, 1);
        assert!(store.update(Collection::LaunchStatuses, &a, Fields::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_writes_publish_changes() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();
        store.create(Collection::LaunchProjects, Fields::new()).await.unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.collection, Collection::LaunchProjects);
    }
}
