use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::registry::AgentRegistry;
use crate::types::{AgentId, AgentStatus};

/// A Running-agent load-ratio spread above this asks for a rebalance
/// even when nobody is over capacity.
pub const LOAD_SPREAD_THRESHOLD: f64 = 0.2;

/// One unit of load moved between two agents.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceMove {
    pub from: AgentId,
    pub to: AgentId,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub moves: Vec<BalanceMove>,
    /// False when overloaded agents remained but no receiver had room.
    pub relieved: bool,
}

impl BalanceReport {
    fn noop() -> Self {
        Self {
            moves: Vec::new(),
            relieved: true,
        }
    }
}

/// Redistributes excess load from over-capacity agents to the least
/// loaded ones. A pass runs entirely under the registry lock and
/// persists once at the end.
pub struct LoadBalancer {
    registry: Arc<AgentRegistry>,
}

impl LoadBalancer {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    /// One redistribution pass. Idempotent: a second pass over a
    /// relieved set moves nothing.
    pub async fn rebalance(&self) -> Result<BalanceReport> {
        let report = self
            .registry
            .update(|agents| {
                let overloaded: Vec<usize> = agents
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.current_load > a.capacity)
                    .map(|(i, _)| i)
                    .collect();

                if overloaded.is_empty() {
                    return Ok(BalanceReport::noop());
                }

                // Receivers, registration order. Agents exactly at
                // capacity are neither donors nor receivers.
                let mut eligible: Vec<usize> = agents
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.current_load < a.capacity)
                    .map(|(i, _)| i)
                    .collect();

                if eligible.is_empty() {
                    log::warn!(
                        "cannot balance: {} agent(s) over capacity, no receiver has room",
                        overloaded.len()
                    );
                    return Ok(BalanceReport {
                        moves: Vec::new(),
                        relieved: false,
                    });
                }

                let mut moves = Vec::new();
                let mut relieved = true;

                'donors: for donor in overloaded {
                    let excess = agents[donor].current_load - agents[donor].capacity;
                    for _ in 0..excess {
                        // Most underloaded receiver; equal ratios
                        // resolve to the earliest registered.
                        let Some(slot) = eligible
                            .iter()
                            .enumerate()
                            .min_by(|(_, &a), (_, &b)| {
                                agents[a]
                                    .load_ratio()
                                    .partial_cmp(&agents[b].load_ratio())
                                    .unwrap_or(std::cmp::Ordering::Equal)
                            })
                            .map(|(slot, _)| slot)
                        else {
                            relieved = false;
                            break 'donors;
                        };

                        let target = eligible[slot];
                        agents[donor].current_load -= 1;
                        agents[target].current_load += 1;
                        moves.push(BalanceMove {
                            from: agents[donor].id,
                            to: agents[target].id,
                        });

                        if agents[target].current_load >= agents[target].capacity {
                            eligible.remove(slot);
                        }
                    }
                }

                Ok(BalanceReport { moves, relieved })
            })
            .await?;

        if !report.moves.is_empty() {
            log::info!("rebalanced {} load unit(s)", report.moves.len());
        }
        Ok(report)
    }

    /// True when any agent is over capacity, or the population
    /// standard deviation of Running agents' load ratios exceeds
    /// [`LOAD_SPREAD_THRESHOLD`].
    pub async fn needs_balancing(&self) -> bool {
        let agents = self.registry.list().await;

        if agents.iter().any(|a| a.current_load > a.capacity) {
            return true;
        }

        let ratios: Vec<f64> = agents
            .iter()
            .filter(|a| a.status == AgentStatus::Running)
            .map(|a| a.load_ratio())
            .collect();
        if ratios.len() < 2 {
            return false;
        }

        let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
        let variance =
            ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / ratios.len() as f64;

        variance.sqrt() > LOAD_SPREAD_THRESHOLD
    }

    /// Run rebalance passes on a timer until the handle is stopped.
    /// Passes are driven sequentially from one task, so they can never
    /// overlap; a slow pass skips the ticks it swallowed.
    pub fn spawn_periodic(self: Arc<Self>, interval: std::time::Duration) -> BalancerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                if self.needs_balancing().await {
                    if let Err(err) = self.rebalance().await {
                        log::warn!("periodic rebalance failed: {err}");
                    }
                }
            }
        });

        BalancerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Stops the periodic balancer. The in-flight pass, if any, runs to
/// completion before the task exits; no tick fires after `stop`
/// returns.
pub struct BalancerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl BalancerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::types::Specialization;

    async fn registry_with_loads(loads: &[(u32, u32)]) -> Arc<AgentRegistry> {
        let registry = Arc::new(AgentRegistry::open(Arc::new(InMemoryStore::new())).await);
        for (i, (capacity, load)) in loads.iter().enumerate() {
            let agent = registry
                .register(format!("agent-{i}"), Specialization::General, *capacity)
                .await
                .unwrap();
            registry
                .set_status(agent.id, AgentStatus::Running)
                .await
                .unwrap();
            registry
                .update(|agents| {
                    agents.iter_mut().find(|a| a.id == agent.id).unwrap().current_load = *load;
                    Ok(())
                })
                .await
                .unwrap();
        }
        registry
    }

    async fn loads(registry: &AgentRegistry) -> Vec<u32> {
        registry.list().await.iter().map(|a| a.current_load).collect()
    }

    #[tokio::test]
    async fn test_noop_when_nobody_over_capacity() {
        let registry = registry_with_loads(&[(2, 2), (3, 1)]).await;
        let balancer = LoadBalancer::new(registry.clone());

        let report = balancer.rebalance().await.unwrap();
        assert!(report.moves.is_empty());
        assert!(report.relieved);
        assert_eq!(loads(&registry).await, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_excess_fully_absorbed() {
        let registry = registry_with_loads(&[(2, 4), (3, 0)]).await;
        let balancer = LoadBalancer::new(registry.clone());

        let report = balancer.rebalance().await.unwrap();
        assert_eq!(report.moves.len(), 2);
        assert!(report.relieved);
        assert_eq!(loads(&registry).await, vec![2, 2]);
    }

    #[tokio::test]
    async fn test_cannot_balance_leaves_loads_unchanged() {
        let registry = registry_with_loads(&[(2, 4), (3, 3)]).await;
        let balancer = LoadBalancer::new(registry.clone());

        let report = balancer.rebalance().await.unwrap();
        assert!(report.moves.is_empty());
        assert!(!report.relieved);
        assert_eq!(loads(&registry).await, vec![4, 3]);
    }

    #[tokio::test]
    async fn test_receivers_retire_at_capacity() {
        // One donor with excess 3, two small receivers with one free
        // slot each: only two units can move.
        let registry = registry_with_loads(&[(1, 4), (1, 0), (1, 0)]).await;
        let balancer = LoadBalancer::new(registry.clone());

        let report = balancer.rebalance().await.unwrap();
        assert_eq!(report.moves.len(), 2);
        assert!(!report.relieved);
        assert_eq!(loads(&registry).await, vec![2, 1, 1]);
    }

    #[tokio::test]
    async fn test_units_go_to_least_loaded_first() {
        let registry = registry_with_loads(&[(2, 5), (10, 4), (10, 0)]).await;
        let balancer = LoadBalancer::new(registry.clone());

        let report = balancer.rebalance().await.unwrap();
        // Excess of 3; the empty agent has the lowest ratio throughout.
        assert_eq!(report.moves.len(), 3);
        assert_eq!(loads(&registry).await, vec![2, 4, 3]);
    }

    #[tokio::test]
    async fn test_rebalance_is_idempotent() {
        let registry = registry_with_loads(&[(2, 4), (3, 0)]).await;
        let balancer = LoadBalancer::new(registry.clone());

        balancer.rebalance().await.unwrap();
        let second = balancer.rebalance().await.unwrap();
        assert!(second.moves.is_empty());
        assert_eq!(loads(&registry).await, vec![2, 2]);
    }

    #[tokio::test]
    async fn test_post_pass_invariant() {
        let registry = registry_with_loads(&[(2, 6), (4, 1), (5, 0)]).await;
        let balancer = LoadBalancer::new(registry.clone());

        let report = balancer.rebalance().await.unwrap();
        assert!(report.relieved);
        for agent in registry.list().await {
            assert!(agent.current_load <= agent.capacity);
        }
    }

    #[tokio::test]
    async fn test_needs_balancing_on_overload() {
        let registry = registry_with_loads(&[(2, 3)]).await;
        let balancer = LoadBalancer::new(registry);
        assert!(balancer.needs_balancing().await);
    }

    #[tokio::test]
    async fn test_needs_balancing_on_wide_spread() {
        let registry = registry_with_loads(&[(10, 1), (10, 9)]).await;
        let balancer = LoadBalancer::new(registry);
        // Ratio spread 0.8: population std-dev 0.4 > 0.2.
        assert!(balancer.needs_balancing().await);
    }

    #[tokio::test]
    async fn test_needs_balancing_false_on_narrow_spread() {
        let registry = registry_with_loads(&[(10, 5), (10, 6)]).await;
        let balancer = LoadBalancer::new(registry);
        // Std-dev 0.05, under the threshold.
        assert!(!balancer.needs_balancing().await);
    }

    #[tokio::test]
    async fn test_spread_check_ignores_non_running_agents() {
        let registry = registry_with_loads(&[(10, 1), (10, 9)]).await;
        let second = registry.list().await[1].id;
        registry
            .set_status(second, AgentStatus::Disconnected)
            .await
            .unwrap();

        let balancer = LoadBalancer::new(registry);
        assert!(!balancer.needs_balancing().await);
    }

    #[tokio::test]
    async fn test_periodic_balancer_stops_cleanly() {
        let registry = registry_with_loads(&[(2, 4), (3, 0)]).await;
        let balancer = Arc::new(LoadBalancer::new(registry.clone()));

        let handle = balancer.spawn_periodic(std::time::Duration::from_millis(10));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.stop().await;

        assert_eq!(loads(&registry).await, vec![2, 2]);
    }
}
