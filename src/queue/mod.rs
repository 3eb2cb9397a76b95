use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::types::{AgentId, Task, TaskId, TaskPriority, TaskStatus};

/// Storage key the task list is persisted under.
pub const TASKS_KEY: &str = "tasks";

/// Read-only view the assignment engine consumes. The engine never
/// mutates tasks directly; queue bookkeeping stays with the queue.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>>;
}

/// JSON-backed work queue, whole-list rewrite on every mutation,
/// hydrated from storage on open.
pub struct TaskQueue {
    storage: Arc<dyn Storage>,
    tasks: Mutex<Vec<Task>>,
}

impl TaskQueue {
    pub async fn open(storage: Arc<dyn Storage>) -> Self {
        let tasks = match storage.load(TASKS_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<Task>>(value) {
                Ok(tasks) => tasks,
                Err(err) => {
                    log::warn!("discarding unreadable task list: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                log::warn!("failed to load task list, starting empty: {err}");
                Vec::new()
            }
        };

        Self {
            storage,
            tasks: Mutex::new(tasks),
        }
    }

    async fn update<T, F>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<T>,
    {
        let mut tasks = self.tasks.lock().await;
        let outcome = mutate(&mut tasks)?;

        match serde_json::to_value(&*tasks) {
            Ok(value) => {
                if let Err(err) = self.storage.save(TASKS_KEY, &value).await {
                    log::warn!("task list mutation applied but not persisted: {err}");
                }
            }
            Err(err) => log::warn!("task list not serializable, skipping persist: {err}"),
        }

        Ok(outcome)
    }

    pub async fn add(&self, description: String, priority: TaskPriority) -> Result<Task> {
        let task = Task::new(description, priority);
        let added = task.clone();
        self.update(move |tasks| {
            tasks.push(task);
            Ok(())
        })
        .await?;
        Ok(added)
    }

    pub async fn list(&self) -> Vec<Task> {
        self.tasks.lock().await.clone()
    }

    /// Next pending task: highest priority first, FIFO within a
    /// priority.
    pub async fn next(&self) -> Option<Task> {
        let tasks = self.tasks.lock().await;
        tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .max_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(b.created_at.cmp(&a.created_at))
            })
            .cloned()
    }

    pub async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<Task> {
        self.update(|tasks| {
            let task = find_mut(tasks, id)?;
            task.status = status;
            Ok(task.clone())
        })
        .await
    }

    pub async fn mark_assigned(&self, id: TaskId, agent_id: AgentId) -> Result<Task> {
        self.update(|tasks| {
            let task = find_mut(tasks, id)?;
            task.status = TaskStatus::Assigned;
            task.assigned_to = Some(agent_id);
            Ok(task.clone())
        })
        .await
    }

    pub async fn remove(&self, id: TaskId) -> Result<Task> {
        self.update(|tasks| {
            let index = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or(Error::TaskNotFound(id))?;
            Ok(tasks.remove(index))
        })
        .await
    }
}

#[async_trait]
impl TaskStore for TaskQueue {
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.iter().find(|t| t.id == id).cloned())
    }
}

fn find_mut(tasks: &mut [Task], id: TaskId) -> Result<&mut Task> {
    tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or(Error::TaskNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    async fn open_queue() -> (TaskQueue, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let queue = TaskQueue::open(store.clone()).await;
        (queue, store)
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let (queue, _) = open_queue().await;

        let task = queue
            .add("fix the login form".to_string(), TaskPriority::Normal)
            .await
            .unwrap();

        let fetched = queue.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.description, "fix the login form");
        assert_eq!(fetched.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_next_prefers_priority_then_fifo() {
        let (queue, _) = open_queue().await;

        let low = queue.add("low".to_string(), TaskPriority::Low).await.unwrap();
        let first_high = queue.add("h1".to_string(), TaskPriority::High).await.unwrap();
        let _second_high = queue.add("h2".to_string(), TaskPriority::High).await.unwrap();

        let next = queue.next().await.unwrap();
        assert_eq!(next.id, first_high.id);

        queue
            .update_status(first_high.id, TaskStatus::Completed)
            .await
            .unwrap();
        queue
            .update_status(_second_high.id, TaskStatus::Completed)
            .await
            .unwrap();

        let next = queue.next().await.unwrap();
        assert_eq!(next.id, low.id);
    }

    #[tokio::test]
    async fn test_next_skips_non_pending() {
        let (queue, _) = open_queue().await;

        let task = queue.add("only".to_string(), TaskPriority::High).await.unwrap();
        queue
            .mark_assigned(task.id, AgentId::new_v4())
            .await
            .unwrap();

        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn test_remove_unknown_task() {
        let (queue, _) = open_queue().await;

        let err = queue.remove(TaskId::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_queue_rehydrates() {
        let (queue, store) = open_queue().await;

        let task = queue
            .add("survives restart".to_string(), TaskPriority::Normal)
            .await
            .unwrap();

        let reopened = TaskQueue::open(store).await;
        let fetched = reopened.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.description, "survives restart");
    }
}
