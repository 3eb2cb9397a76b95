use async_trait::async_trait;
use tokio::process::Command;

use crate::types::Task;

/// Terminal result of running a task.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum ExecutionOutcome {
    Succeeded,
    Failed(String),
}

impl ExecutionOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded)
    }
}

/// Something that can actually perform a task. The engine dispatches
/// through this seam so local processes, remote workers, and test
/// doubles are interchangeable.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &Task) -> ExecutionOutcome;
}

/// Runs a configured worker command with the task description as its
/// single argument; the exit status decides the outcome.
pub struct ProcessExecutor {
    command: String,
}

impl ProcessExecutor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl TaskExecutor for ProcessExecutor {
    async fn execute(&self, task: &Task) -> ExecutionOutcome {
        let result = Command::new(&self.command)
            .arg(&task.description)
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => ExecutionOutcome::Succeeded,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                log::warn!("worker command failed for task {}: {}", task.id, stderr.trim());
                ExecutionOutcome::Failed(format!("worker exited with {}", output.status))
            }
            Err(err) => {
                log::warn!("worker command did not start for task {}: {err}", task.id);
                ExecutionOutcome::Failed(err.to_string())
            }
        }
    }
}
