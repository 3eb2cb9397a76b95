use thiserror::Error;

use crate::types::{AgentId, TaskId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("agent {id} is at capacity ({capacity})")]
    CapacityExceeded { id: AgentId, capacity: u32 },

    #[error("no available agent for specialization {specialization}")]
    NoAvailableAgent { specialization: String },

    #[error("storage failure for key {key}: {message}")]
    Storage { key: String, message: String },

    #[error("integration {name} failed: {message}")]
    Integration { name: String, message: String },
}

impl Error {
    pub fn storage(key: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Error::Storage {
            key: key.into(),
            message: source.to_string(),
        }
    }

    pub fn integration(name: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Error::Integration {
            name: name.into(),
            message: source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
