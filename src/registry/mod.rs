use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::types::{Agent, AgentId, AgentStatus, Specialization};

/// Storage key the full agent set is persisted under.
pub const AGENTS_KEY: &str = "agents";

/// In-memory agent set, insertion-ordered by registration, persisted
/// wholesale through [`Storage`] after every mutation. All mutations
/// funnel through one async mutex: selection reads and the load
/// updates they justify never interleave.
pub struct AgentRegistry {
    storage: Arc<dyn Storage>,
    agents: Mutex<Vec<Agent>>,
}

impl AgentRegistry {
    /// Hydrate from storage. A missing or unreadable document starts
    /// an empty registry so the system can come up cold.
    pub async fn open(storage: Arc<dyn Storage>) -> Self {
        let agents = match storage.load(AGENTS_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<Agent>>(value) {
                Ok(agents) => agents,
                Err(err) => {
                    log::warn!("discarding unreadable agent set: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                log::warn!("failed to load agent set, starting empty: {err}");
                Vec::new()
            }
        };

        Self {
            storage,
            agents: Mutex::new(agents),
        }
    }

    /// Serialized read-modify-persist. The closure runs under the
    /// registry lock; on success the full set is written back to
    /// storage. A failed save is logged and the in-memory mutation
    /// stands (best-effort durability, surfaced to the operator via
    /// the log).
    pub async fn update<T, F>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Agent>) -> Result<T>,
    {
        let mut agents = self.agents.lock().await;
        let outcome = mutate(&mut agents)?;

        match serde_json::to_value(&*agents) {
            Ok(value) => {
                if let Err(err) = self.storage.save(AGENTS_KEY, &value).await {
                    log::warn!("agent set mutation applied but not persisted: {err}");
                }
            }
            Err(err) => log::warn!("agent set not serializable, skipping persist: {err}"),
        }

        Ok(outcome)
    }

    pub async fn register(
        &self,
        name: String,
        specialization: Specialization,
        capacity: u32,
    ) -> Result<Agent> {
        let agent = Agent::new(name, specialization, capacity);
        let registered = agent.clone();
        self.update(move |agents| {
            agents.push(agent);
            Ok(())
        })
        .await?;

        log::info!(
            "registered agent {} ({}, capacity {})",
            registered.id,
            registered.specialization,
            registered.capacity
        );
        Ok(registered)
    }

    pub async fn get(&self, id: AgentId) -> Result<Agent> {
        let agents = self.agents.lock().await;
        agents
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(Error::AgentNotFound(id))
    }

    /// Snapshot copy, registration order.
    pub async fn list(&self) -> Vec<Agent> {
        self.agents.lock().await.clone()
    }

    pub async fn set_status(&self, id: AgentId, status: AgentStatus) -> Result<Agent> {
        self.update(|agents| {
            let agent = find_mut(agents, id)?;
            agent.status = status;
            Ok(agent.clone())
        })
        .await
    }

    pub async fn increment_load(&self, id: AgentId) -> Result<Agent> {
        self.update(|agents| {
            let agent = find_mut(agents, id)?;
            agent.current_load += 1;
            Ok(agent.clone())
        })
        .await
    }

    /// Decrement, clamped at zero: a stray duplicate completion must
    /// never drive the load negative.
    pub async fn decrement_load(&self, id: AgentId) -> Result<Agent> {
        self.update(|agents| {
            let agent = find_mut(agents, id)?;
            agent.current_load = agent.current_load.saturating_sub(1);
            Ok(agent.clone())
        })
        .await
    }

    pub async fn heartbeat(&self, id: AgentId) -> Result<Agent> {
        self.update(|agents| {
            let agent = find_mut(agents, id)?;
            agent.last_heartbeat = Some(Utc::now());
            if agent.status == AgentStatus::Disconnected {
                agent.status = AgentStatus::Running;
            }
            Ok(agent.clone())
        })
        .await
    }

    /// Mark Running agents Disconnected when their last heartbeat (or
    /// registration, if they never beat) is older than `timeout`.
    /// Returns the ids that flipped.
    pub async fn mark_stale(&self, timeout: Duration) -> Result<Vec<AgentId>> {
        let now = Utc::now();
        self.update(|agents| {
            let mut stale = Vec::new();
            for agent in agents.iter_mut() {
                if agent.status != AgentStatus::Running {
                    continue;
                }
                let last_seen = agent.last_heartbeat.unwrap_or(agent.registered_at);
                if now.signed_duration_since(last_seen) > timeout {
                    agent.status = AgentStatus::Disconnected;
                    stale.push(agent.id);
                }
            }
            Ok(stale)
        })
        .await
    }
}

fn find_mut(agents: &mut [Agent], id: AgentId) -> Result<&mut Agent> {
    agents
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or(Error::AgentNotFound(id))
}
