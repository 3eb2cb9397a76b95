use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use foreman::engine::{
    AssignmentEngine, LoadBalancer, PatternTable, ProcessExecutor, RegexFileExtractor,
};
use foreman::integrations::WebhookNotifier;
use foreman::queue::TaskQueue;
use foreman::registry::AgentRegistry;
use foreman::storage::JsonFileStore;
use foreman::types::{AgentId, AgentStatus, Specialization, TaskId, TaskPriority, TaskStatus};
use foreman::Config;

#[derive(Parser)]
#[command(name = "foreman")]
#[command(about = "Task routing and load balancing for specialized agent pools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the agent pool
    Agent {
        #[command(subcommand)]
        command: AgentCommands,
    },
    /// Manage the work queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Run the status API and the periodic balancer
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum AgentCommands {
    /// Register a new agent
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        specialization: Specialization,
        #[arg(long, default_value_t = 3)]
        capacity: u32,
    },
    /// List all agents
    List,
    /// Mark an agent Running
    Start { id: AgentId },
    /// Set an agent's lifecycle status
    Status { id: AgentId, status: AgentStatus },
    /// Record a heartbeat for an agent
    Heartbeat { id: AgentId },
    /// Assign a task, auto-routing unless --agent is given
    Assign {
        task_id: TaskId,
        #[arg(long)]
        agent: Option<AgentId>,
    },
    /// Run one load-rebalancing pass
    Balance,
}

#[derive(Subcommand)]
enum QueueCommands {
    /// Add a task to the queue
    Add {
        description: String,
        #[arg(long, default_value = "normal")]
        priority: TaskPriority,
    },
    /// List queued tasks
    List,
    /// Show the next pending task
    Next,
    /// Update a task's status
    Update { id: TaskId, status: TaskStatus },
    /// Remove a task from the queue
    Remove { id: TaskId },
    /// Assign and execute the next pending task
    Run {
        #[arg(long)]
        agent: Option<AgentId>,
    },
}

struct Context {
    registry: Arc<AgentRegistry>,
    queue: Arc<TaskQueue>,
    config: Config,
}

impl Context {
    async fn open() -> Self {
        let config = Config::load();
        let store = Arc::new(JsonFileStore::new(&config.data_dir));
        let registry = Arc::new(AgentRegistry::open(store.clone()).await);
        let queue = Arc::new(TaskQueue::open(store).await);
        Self {
            registry,
            queue,
            config,
        }
    }

    fn engine(&self) -> AssignmentEngine {
        let mut engine = AssignmentEngine::new(
            self.registry.clone(),
            self.queue.clone(),
            PatternTable::with_defaults(),
            Box::new(RegexFileExtractor),
        );
        if let Some(url) = &self.config.webhook_url {
            engine.add_notifier(Arc::new(WebhookNotifier::new(url)));
        }
        engine
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = Context::open().await;

    match cli.command {
        Commands::Agent { command } => run_agent_command(&ctx, command).await?,
        Commands::Queue { command } => run_queue_command(&ctx, command).await?,
        Commands::Serve { port } => serve(ctx, port).await?,
    }

    Ok(())
}

async fn run_agent_command(ctx: &Context, command: AgentCommands) -> Result<()> {
    match command {
        AgentCommands::Register {
            name,
            specialization,
            capacity,
        } => {
            let agent = ctx.registry.register(name, specialization, capacity).await?;
            println!("Registered agent {} ({})", agent.id, agent.name);
        }
        AgentCommands::List => {
            let agents = ctx.registry.list().await;
            if agents.is_empty() {
                println!("No agents registered");
                return Ok(());
            }
            for agent in agents {
                println!(
                    "{}  {:<16} {:<10} {:<13} {}/{}",
                    agent.id,
                    agent.name,
                    agent.specialization,
                    agent.status,
                    agent.current_load,
                    agent.capacity
                );
            }
        }
        AgentCommands::Start { id } => {
            let agent = ctx.registry.set_status(id, AgentStatus::Running).await?;
            println!("Agent {} is now {}", agent.id, agent.status);
        }
        AgentCommands::Status { id, status } => {
            let agent = ctx.registry.set_status(id, status).await?;
            println!("Agent {} is now {}", agent.id, agent.status);
        }
        AgentCommands::Heartbeat { id } => {
            let agent = ctx.registry.heartbeat(id).await?;
            println!("Heartbeat recorded for agent {}", agent.id);
        }
        AgentCommands::Assign { task_id, agent } => {
            let engine = ctx.engine();
            let chosen = engine.assign(task_id, agent).await?;
            ctx.queue.mark_assigned(task_id, chosen.id).await?;
            println!(
                "Task {} assigned to {} ({}, load {}/{})",
                task_id, chosen.name, chosen.id, chosen.current_load, chosen.capacity
            );
        }
        AgentCommands::Balance => {
            let balancer = LoadBalancer::new(ctx.registry.clone());
            let report = balancer.rebalance().await?;
            if report.moves.is_empty() && report.relieved {
                println!("Nothing to balance");
            } else if !report.relieved {
                println!(
                    "Cannot balance: moved {} unit(s), no receiver has room left",
                    report.moves.len()
                );
            } else {
                println!("Moved {} load unit(s)", report.moves.len());
                for mv in report.moves {
                    println!("  {} -> {}", mv.from, mv.to);
                }
            }
        }
    }

    Ok(())
}

async fn run_queue_command(ctx: &Context, command: QueueCommands) -> Result<()> {
    match command {
        QueueCommands::Add {
            description,
            priority,
        } => {
            let task = ctx.queue.add(description, priority).await?;
            println!("Queued task {} ({})", task.id, task.priority);
        }
        QueueCommands::List => {
            let tasks = ctx.queue.list().await;
            if tasks.is_empty() {
                println!("Queue is empty");
                return Ok(());
            }
            for task in tasks {
                println!(
                    "{}  {:<8} {:<12} {}",
                    task.id, task.priority, task.status, task.description
                );
            }
        }
        QueueCommands::Next => match ctx.queue.next().await {
            Some(task) => println!("{}  {:<8} {}", task.id, task.priority, task.description),
            None => println!("No pending tasks"),
        },
        QueueCommands::Update { id, status } => {
            let task = ctx.queue.update_status(id, status).await?;
            println!("Task {} is now {}", task.id, task.status);
        }
        QueueCommands::Remove { id } => {
            let task = ctx.queue.remove(id).await?;
            println!("Removed task {}", task.id);
        }
        QueueCommands::Run { agent } => {
            let Some(command) = ctx.config.worker_command.clone() else {
                bail!("no worker_command configured; set it in foreman.toml or FOREMAN_WORKER_COMMAND");
            };
            let Some(task) = ctx.queue.next().await else {
                println!("No pending tasks");
                return Ok(());
            };

            let engine = ctx.engine();
            let chosen = engine.assign(task.id, agent).await?;
            ctx.queue.mark_assigned(task.id, chosen.id).await?;
            ctx.queue
                .update_status(task.id, TaskStatus::InProgress)
                .await?;

            let executor = ProcessExecutor::new(command);
            let outcome = engine.dispatch(&task, chosen.id, &executor).await?;

            let status = if outcome.succeeded() {
                TaskStatus::Completed
            } else {
                TaskStatus::Failed
            };
            ctx.queue.update_status(task.id, status).await?;
            println!("Task {} finished: {:?}", task.id, outcome);
        }
    }

    Ok(())
}

async fn serve(ctx: Context, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(ctx.config.port);

    let balancer = Arc::new(LoadBalancer::new(ctx.registry.clone()));
    let balancer_handle = balancer
        .clone()
        .spawn_periodic(std::time::Duration::from_secs(ctx.config.balance_interval_secs));

    // Heartbeat watchdog: flip silent Running agents to Disconnected.
    let registry = ctx.registry.clone();
    let sweep_secs = ctx.config.heartbeat_timeout_secs;
    let timeout = chrono::Duration::seconds(sweep_secs as i64);
    let watchdog = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(sweep_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match registry.mark_stale(timeout).await {
                Ok(stale) if !stale.is_empty() => {
                    log::warn!("{} agent(s) marked disconnected", stale.len());
                }
                Ok(_) => {}
                Err(err) => log::warn!("staleness sweep failed: {err}"),
            }
        }
    });

    let state = foreman::api::AppState {
        registry: ctx.registry.clone(),
        queue: ctx.queue.clone(),
        balancer,
    };
    let result = foreman::api::serve(state, port).await;

    watchdog.abort();
    balancer_handle.stop().await;
    result
}
