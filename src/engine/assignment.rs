use std::sync::Arc;

use crate::engine::classifier::PatternTable;
use crate::engine::executor::{ExecutionOutcome, TaskExecutor};
use crate::engine::extractor::TaskFeatureExtractor;
use crate::error::{Error, Result};
use crate::integrations::{CompletionEvent, NotificationIntegration};
use crate::queue::TaskStore;
use crate::registry::AgentRegistry;
use crate::types::{Agent, AgentId, Specialization, Task, TaskId};

/// Routes tasks onto agents: classifies the task, picks the best
/// eligible agent, and bumps its load under the registry lock so the
/// selection read and the load write are one atomic step.
pub struct AssignmentEngine {
    registry: Arc<AgentRegistry>,
    tasks: Arc<dyn TaskStore>,
    patterns: PatternTable,
    extractor: Box<dyn TaskFeatureExtractor>,
    notifiers: Vec<Arc<dyn NotificationIntegration>>,
}

impl AssignmentEngine {
    pub fn new(
        registry: Arc<AgentRegistry>,
        tasks: Arc<dyn TaskStore>,
        patterns: PatternTable,
        extractor: Box<dyn TaskFeatureExtractor>,
    ) -> Self {
        Self {
            registry,
            tasks,
            patterns,
            extractor,
            notifiers: Vec::new(),
        }
    }

    pub fn add_notifier(&mut self, notifier: Arc<dyn NotificationIntegration>) {
        self.notifiers.push(notifier);
    }

    /// Assign a task. With an explicit agent the only check is spare
    /// capacity; otherwise the task is classified and routed to the
    /// best specialization match.
    pub async fn assign(&self, task_id: TaskId, explicit: Option<AgentId>) -> Result<Agent> {
        match explicit {
            Some(agent_id) => self.assign_explicit(agent_id).await,
            None => self.assign_auto(task_id).await,
        }
    }

    async fn assign_explicit(&self, agent_id: AgentId) -> Result<Agent> {
        self.registry
            .update(|agents| {
                let agent = agents
                    .iter_mut()
                    .find(|a| a.id == agent_id)
                    .ok_or(Error::AgentNotFound(agent_id))?;
                if agent.current_load >= agent.capacity {
                    return Err(Error::CapacityExceeded {
                        id: agent.id,
                        capacity: agent.capacity,
                    });
                }
                agent.current_load += 1;
                Ok(agent.clone())
            })
            .await
    }

    async fn assign_auto(&self, task_id: TaskId) -> Result<Agent> {
        let task = self
            .tasks
            .get_task(task_id)
            .await?
            .ok_or(Error::TaskNotFound(task_id))?;

        let files = self.extractor.extract_files(&task.description);
        let tag = self.patterns.classify(&task.description, &files);
        log::debug!("task {} classified as {}", task.id, tag);

        let chosen = self
            .registry
            .update(|agents| {
                let index = select_agent(agents, tag).ok_or(Error::NoAvailableAgent {
                    specialization: tag.to_string(),
                })?;
                agents[index].current_load += 1;
                Ok(agents[index].clone())
            })
            .await?;

        log::info!("task {} assigned to agent {} ({})", task.id, chosen.id, chosen.name);
        Ok(chosen)
    }

    /// Release one load slot on the agent and fan the completion out
    /// to the registered integrations. Notification failures are
    /// logged, never surfaced to the caller.
    pub async fn complete(
        &self,
        task_id: TaskId,
        agent_id: AgentId,
        outcome: &ExecutionOutcome,
    ) -> Result<Agent> {
        let agent = self.registry.decrement_load(agent_id).await?;

        let event = CompletionEvent {
            task_id,
            agent_id,
            outcome: outcome.clone(),
        };
        for notifier in &self.notifiers {
            if let Err(err) = notifier.notify(&event).await {
                log::warn!("notification for task {task_id} failed: {err}");
            }
        }

        Ok(agent)
    }

    /// Run a task on its assigned agent through the given executor and
    /// settle the books afterwards.
    pub async fn dispatch(
        &self,
        task: &Task,
        agent_id: AgentId,
        executor: &dyn TaskExecutor,
    ) -> Result<ExecutionOutcome> {
        let outcome = executor.execute(task).await;
        self.complete(task.id, agent_id, &outcome).await?;
        Ok(outcome)
    }
}

/// Pick the best agent for `tag` from the registration-ordered slice.
/// Preferred pool: Running agents with spare capacity whose
/// specialization is the tag itself or General. Exact matches outrank
/// generalists even at a worse load ratio; the balancer corrects the
/// resulting skew later. Within a rank, lowest load ratio wins, and
/// strict comparison keeps the earliest registered agent on ties.
/// Falls back to any available agent when the preferred pool is empty.
fn select_agent(agents: &[Agent], tag: Specialization) -> Option<usize> {
    let mut best: Option<(usize, u8, f64)> = None;

    for (index, agent) in agents.iter().enumerate() {
        if !agent.is_available() {
            continue;
        }
        let rank = if agent.specialization == tag {
            0
        } else if agent.specialization == Specialization::General {
            1
        } else {
            continue;
        };
        let ratio = agent.load_ratio();
        let better = match best {
            None => true,
            Some((_, best_rank, best_ratio)) => {
                rank < best_rank || (rank == best_rank && ratio < best_ratio)
            }
        };
        if better {
            best = Some((index, rank, ratio));
        }
    }

    if best.is_none() {
        for (index, agent) in agents.iter().enumerate() {
            if !agent.is_available() {
                continue;
            }
            let ratio = agent.load_ratio();
            let better = match best {
                None => true,
                Some((_, _, best_ratio)) => ratio < best_ratio,
            };
            if better {
                best = Some((index, 0, ratio));
            }
        }
    }

    best.map(|(index, _, _)| index)
}
