pub mod agent;
pub mod task;

pub use agent::Agent;
pub use task::{Task, TaskPriority, TaskStatus};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type AgentId = Uuid;
pub type TaskId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Starting,     // Registered, not yet accepting work
    Running,      // Eligible for assignment
    Completed,    // Finished its workload
    Failed,       // Crashed or reported failure
    Disconnected, // Missed heartbeats
}

impl AgentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AgentStatus::Starting => "Starting",
            AgentStatus::Running => "Running",
            AgentStatus::Completed => "Completed",
            AgentStatus::Failed => "Failed",
            AgentStatus::Disconnected => "Disconnected",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "starting" => Ok(AgentStatus::Starting),
            "running" => Ok(AgentStatus::Running),
            "completed" => Ok(AgentStatus::Completed),
            "failed" => Ok(AgentStatus::Failed),
            "disconnected" => Ok(AgentStatus::Disconnected),
            other => Err(format!("unknown agent status: {other}")),
        }
    }
}

/// Routing category for agents and tasks. `General` is the catch-all:
/// it accumulates no classifier points and matches any task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specialization {
    Frontend,
    Backend,
    Database,
    Devops,
    General,
}

impl Specialization {
    /// Enumeration order is load-bearing: classifier ties keep the
    /// first tag in this order.
    pub const ALL: [Specialization; 5] = [
        Specialization::Frontend,
        Specialization::Backend,
        Specialization::Database,
        Specialization::Devops,
        Specialization::General,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Specialization::Frontend => "frontend",
            Specialization::Backend => "backend",
            Specialization::Database => "database",
            Specialization::Devops => "devops",
            Specialization::General => "general",
        }
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specialization {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "frontend" => Ok(Specialization::Frontend),
            "backend" => Ok(Specialization::Backend),
            "database" => Ok(Specialization::Database),
            "devops" => Ok(Specialization::Devops),
            "general" => Ok(Specialization::General),
            other => Err(format!("unknown specialization: {other}")),
        }
    }
}
