use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Key-value persistence boundary. Values are whole JSON documents:
/// every save rewrites the document for its key.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Value>>;
    async fn save(&self, key: &str, value: &Value) -> Result<()>;
}
