use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::storage::traits::Storage;

/// Ephemeral storage for tests and runs that do not need to survive
/// a restart.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().unwrap();
        Ok(entries.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &Value) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_missing_key() {
        let store = InMemoryStore::new();
        let value = store.load("agents").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemoryStore::new();
        store.save("agents", &json!([{"name": "a"}])).await.unwrap();

        let value = store.load("agents").await.unwrap().unwrap();
        assert_eq!(value[0]["name"], "a");
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemoryStore::new();
        store.save("tasks", &json!([1, 2])).await.unwrap();
        store.save("tasks", &json!([3])).await.unwrap();

        let value = store.load("tasks").await.unwrap().unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }
}
