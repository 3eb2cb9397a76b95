pub mod webhook;

pub use webhook::WebhookNotifier;

use async_trait::async_trait;
use serde::Serialize;

use crate::engine::executor::ExecutionOutcome;
use crate::error::Result;
use crate::types::{AgentId, TaskId};

/// Event fanned out to integrations after a task settles.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionEvent {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub outcome: ExecutionOutcome,
}

/// Outbound messaging adapter (chat webhook, email bridge, ...).
#[async_trait]
pub trait NotificationIntegration: Send + Sync {
    async fn notify(&self, event: &CompletionEvent) -> Result<()>;
}

/// Issue tracker adapter.
#[async_trait]
pub trait IssueTrackingIntegration: Send + Sync {
    async fn create_issue(&self, title: &str, body: &str) -> Result<String>;
    async fn close_issue(&self, issue_id: &str) -> Result<()>;
}

/// CI/CD pipeline adapter.
#[async_trait]
pub trait CICDIntegration: Send + Sync {
    async fn trigger_pipeline(&self, pipeline: &str) -> Result<String>;
    async fn cancel_pipeline(&self, run_id: &str) -> Result<()>;
}
