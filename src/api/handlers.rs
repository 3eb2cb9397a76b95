use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::types::{Agent, AgentStatus, Task};

#[derive(serde::Serialize)]
pub struct AgentResponse {
    pub id: String,
    pub name: String,
    pub status: String,
    pub specialization: String,
    pub capacity: u32,
    pub current_load: u32,
    pub load_ratio: f64,
}

impl From<Agent> for AgentResponse {
    fn from(agent: Agent) -> Self {
        Self {
            id: agent.id.to_string(),
            name: agent.name.clone(),
            status: agent.status.as_str().to_string(),
            specialization: agent.specialization.as_str().to_string(),
            capacity: agent.capacity,
            current_load: agent.current_load,
            load_ratio: agent.load_ratio(),
        }
    }
}

#[derive(serde::Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub assigned_to: Option<String>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id.to_string(),
            description: task.description,
            priority: task.priority.to_string(),
            status: task.status.as_str().to_string(),
            assigned_to: task.assigned_to.map(|id| id.to_string()),
        }
    }
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentResponse>> {
    let agents = state.registry.list().await;
    Json(agents.into_iter().map(AgentResponse::from).collect())
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AgentResponse>, ApiError> {
    let agent = state.registry.get(id).await?;
    Ok(Json(AgentResponse::from(agent)))
}

pub async fn list_tasks(State(state): State<AppState>) -> Json<Vec<TaskResponse>> {
    let tasks = state.queue.list().await;
    Json(tasks.into_iter().map(TaskResponse::from).collect())
}

pub async fn metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    let agents = state.registry.list().await;

    let total_capacity: u32 = agents.iter().map(|a| a.capacity).sum();
    let total_load: u32 = agents.iter().map(|a| a.current_load).sum();
    let running = agents
        .iter()
        .filter(|a| a.status == AgentStatus::Running)
        .count();

    let per_agent: Vec<serde_json::Value> = agents
        .iter()
        .map(|a| {
            serde_json::json!({
                "id": a.id.to_string(),
                "specialization": a.specialization.as_str(),
                "current_load": a.current_load,
                "capacity": a.capacity,
                "load_ratio": a.load_ratio(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "agent_count": agents.len(),
        "running_agents": running,
        "total_capacity": total_capacity,
        "total_load": total_load,
        "needs_balancing": state.balancer.needs_balancing().await,
        "agents": per_agent,
    }))
}
