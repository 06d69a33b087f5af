use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Collection, DocumentQuery, DocumentStore, StoreResult, StoredDocument};

/// In-process store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, HashMap<Uuid, StoredDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: Collection, doc: StoredDocument) -> StoreResult<()> {
        let mut guard = self.collections.write().await;
        guard.entry(collection).or_default().insert(doc.id, doc);
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> StoreResult<Option<StoredDocument>> {
        let guard = self.collections.read().await;
        Ok(guard.get(&collection).and_then(|docs| docs.get(&id)).cloned())
    }

    async fn replace(&self, collection: Collection, doc: StoredDocument) -> StoreResult<bool> {
        let mut guard = self.collections.write().await;
        match guard.get_mut(&collection).and_then(|docs| docs.get_mut(&doc.id)) {
            Some(existing) => {
                *existing = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> StoreResult<bool> {
        let mut guard = self.collections.write().await;
        Ok(guard
            .get_mut(&collection)
            .and_then(|docs| docs.remove(&id))
            .is_some())
    }

    async fn find(
        &self,
        collection: Collection,
        query: &DocumentQuery,
    ) -> StoreResult<Vec<StoredDocument>> {
        let guard = self.collections.read().await;
        let mut found: Vec<StoredDocument> = guard
            .get(&collection)
            .map(|docs| docs.values().filter(|d| query.matches(d)).cloned().collect())
            .unwrap_or_default();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }
}
