use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentStore, Item, Lookup, PutCondition, QueryRequest, Record, StoreError};
use crate::document::DocumentKey;

/// In-process store. Used by tests and by local runs without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<DocumentKey, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &DocumentKey) -> Result<Lookup<Item>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(key).map(|r| r.body.clone()).into())
    }

    async fn put(&self, record: Record, condition: PutCondition) -> Result<(), StoreError> {
        let mut records = self.records.write().await;

        if let PutCondition::UpdatedAtEquals(expected) = condition {
            let expected = serde_json::to_value(expected)?;
            let unchanged = records
                .get(&record.key)
                .is_some_and(|current| current.body.get("updatedAt") == Some(&expected));
            if !unchanged {
                return Err(StoreError::ConditionFailed(record.key));
            }
        }

        records.insert(record.key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &DocumentKey) -> Result<(), StoreError> {
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<Item>, StoreError> {
        tracing::trace!(index = %request.index_name, condition = %request.condition, "scanning memory store");

        let records = self.records.read().await;
        let mut matches: Vec<&Record> = records
            .values()
            .filter(|r| request.condition.matches(r.kind, &r.path))
            .collect();
        matches.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.key.id.cmp(&b.key.id)));

        Ok(matches
            .into_iter()
            .map(|r| request.projection.apply(r.body.clone()))
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
