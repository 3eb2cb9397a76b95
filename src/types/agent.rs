use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AgentId, AgentStatus, Specialization};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub status: AgentStatus,
    pub specialization: Specialization,
    pub capacity: u32,
    pub current_load: u32,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl Agent {
    pub fn new(name: String, specialization: Specialization, capacity: u32) -> Self {
        Self {
            id: AgentId::new_v4(),
            name,
            status: AgentStatus::Starting,
            specialization,
            capacity,
            current_load: 0,
            registered_at: Utc::now(),
            last_heartbeat: None,
        }
    }

    /// Relative business of this agent, for comparison only; load
    /// itself is always stored as an integer.
    pub fn load_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return f64::INFINITY;
        }
        f64::from(self.current_load) / f64::from(self.capacity)
    }

    pub fn has_spare_capacity(&self) -> bool {
        self.current_load < self.capacity
    }

    /// Eligible to receive new work via auto-assignment.
    pub fn is_available(&self) -> bool {
        self.status == AgentStatus::Running && self.has_spare_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_starts_idle() {
        let agent = Agent::new("worker-1".to_string(), Specialization::Backend, 3);
        assert_eq!(agent.status, AgentStatus::Starting);
        assert_eq!(agent.current_load, 0);
        assert_eq!(agent.capacity, 3);
        assert!(agent.last_heartbeat.is_none());
    }

    #[test]
    fn test_load_ratio() {
        let mut agent = Agent::new("worker-1".to_string(), Specialization::General, 4);
        assert_eq!(agent.load_ratio(), 0.0);

        agent.current_load = 3;
        assert!((agent.load_ratio() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_zero_capacity_never_has_spare() {
        let agent = Agent::new("worker-1".to_string(), Specialization::General, 0);
        assert!(!agent.has_spare_capacity());
        assert!(agent.load_ratio().is_infinite());
    }

    #[test]
    fn test_availability_requires_running() {
        let mut agent = Agent::new("worker-1".to_string(), Specialization::Frontend, 2);
        assert!(!agent.is_available());

        agent.status = AgentStatus::Running;
        assert!(agent.is_available());

        agent.current_load = 2;
        assert!(!agent.is_available());
    }
}
