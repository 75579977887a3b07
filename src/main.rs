mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use dialoguer::{Confirm, Input};
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wayline_core::config::WaylineConfig;
use wayline_core::event::{EventBus, StreamEvent, StreamEventKind};
use wayline_core::types::{Message, WorkflowState};
use wayline_graph::{GraphExecutor, HumanFeedback, InvokeOptions};

#[derive(Parser)]
#[command(name = "wayline", version, about = "Checkpointed multi-agent workflow runner")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "wayline.toml")]
    config: PathBuf,

    /// Thread ID for checkpoints (auto-generated if not provided)
    #[arg(short, long)]
    thread: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the review workflow, pausing for approval at each draft
    Run {
        /// Approve every draft without prompting
        #[arg(long, short = 'y')]
        auto_approve: bool,
        /// Topic to research and write about
        #[arg(trailing_var_arg = true, required = true)]
        topic: Vec<String>,
    },
    /// Stream workflow events as JSON lines until it completes or pauses
    Stream {
        /// Topic to research and write about
        #[arg(trailing_var_arg = true, required = true)]
        topic: Vec<String>,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("wayline=info,warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "wayline", &mut std::io::stdout());
        return Ok(());
    }

    let config = if cli.config.exists() {
        WaylineConfig::load(&cli.config)?
    } else {
        warn!(path = %cli.config.display(), "No config file found, using defaults");
        WaylineConfig::default()
    };

    let thread_id = cli
        .thread
        .clone()
        .unwrap_or_else(|| format!("run-{}", uuid::Uuid::new_v4().simple()));

    match cli.command {
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Run {
            auto_approve,
            topic,
        } => {
            run_interactive(&config, &thread_id, &topic.join(" "), auto_approve).await?;
        }
        Commands::Stream { topic } => {
            stream_events(&config, &thread_id, &topic.join(" ")).await?;
        }
        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn options(config: &WaylineConfig, thread_id: &str) -> InvokeOptions {
    InvokeOptions::new()
        .thread(thread_id)
        .checkpoint(config.checkpoint.enabled)
}

/// Print agent progress from the event bus to stderr.
fn spawn_progress(bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.kind {
                    StreamEventKind::AgentStart => {
                        eprintln!("[{}]", event.agent_name.as_deref().unwrap_or("?"));
                    }
                    StreamEventKind::Error => {
                        eprintln!("[error: {}]", event.error.as_deref().unwrap_or("unknown"));
                    }
                    _ => {}
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Progress display lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn print_messages(messages: &[Message], from: usize) -> usize {
    for message in messages.iter().skip(from) {
        println!("{:>9}: {}", format!("{:?}", message.role).to_lowercase(), message.content);
    }
    messages.len()
}

async fn ask_feedback(auto_approve: bool) -> anyhow::Result<HumanFeedback> {
    if auto_approve {
        return Ok(HumanFeedback::approve());
    }

    tokio::task::spawn_blocking(|| -> anyhow::Result<HumanFeedback> {
        let approved = Confirm::new()
            .with_prompt("Approve this draft?")
            .default(true)
            .interact()?;
        if approved {
            return Ok(HumanFeedback::approve());
        }

        let note: String = Input::new()
            .with_prompt("What should change?")
            .allow_empty(true)
            .interact_text()?;
        let feedback = HumanFeedback::reject();
        Ok(if note.trim().is_empty() {
            feedback
        } else {
            feedback.with_message(note.trim())
        })
    })
    .await?
}

async fn run_interactive(
    config: &WaylineConfig,
    thread_id: &str,
    topic: &str,
    auto_approve: bool,
) -> anyhow::Result<()> {
    let bus = Arc::new(EventBus::default());
    let executor = demo::build_executor(&config.executor, bus.clone());
    let progress = spawn_progress(&bus);

    info!(thread_id, topic, "Starting review workflow");
    let initial = demo::initial_state(topic, &config.executor);
    let mut state = executor
        .invoke(&initial, demo::START_AGENT, options(config, thread_id))
        .await?;
    let mut shown = print_messages(state.messages(), 0);

    while state.is_waiting_for_approval() {
        let checkpoint = latest_checkpoint_id(&executor, thread_id)?;
        let feedback = ask_feedback(auto_approve).await?;
        state = executor
            .submit_human_feedback(thread_id, &checkpoint, feedback)
            .await?;

        if state.next_agent().is_human() {
            // Rejected with approvals left: revise the draft.
            let checkpoint = latest_checkpoint_id(&executor, thread_id)?;
            state = executor
                .resume_from_checkpoint(thread_id, &checkpoint, Some(demo::REVISION_AGENT))
                .await?;
        }
        shown = print_messages(state.messages(), shown);
    }

    summarize(&executor, thread_id, &state)?;
    drop(executor);
    drop(bus);
    progress.await.ok();
    Ok(())
}

async fn stream_events(config: &WaylineConfig, thread_id: &str, topic: &str) -> anyhow::Result<()> {
    let bus = Arc::new(EventBus::default());
    let executor = demo::build_executor(&config.executor, bus);
    let initial = demo::initial_state(topic, &config.executor);

    let mut final_state: Option<WorkflowState> = None;
    let mut events = executor.stream(&initial, demo::START_AGENT, options(config, thread_id));
    while let Some(event) = events.next().await {
        let event: StreamEvent = event?;
        println!("{}", serde_json::to_string(&event)?);
        if let Some(state) = event.state {
            final_state = Some(*state);
        }
    }
    drop(events);

    if let Some(state) = final_state {
        summarize(&executor, thread_id, &state)?;
    }
    Ok(())
}

fn latest_checkpoint_id(executor: &GraphExecutor, thread_id: &str) -> anyhow::Result<String> {
    let checkpoint = executor
        .checkpoints()
        .latest_checkpoint(thread_id)?
        .context("no checkpoint to resume from; enable [checkpoint] to approve drafts")?;
    Ok(checkpoint.id)
}

fn summarize(executor: &GraphExecutor, thread_id: &str, state: &WorkflowState) -> anyhow::Result<()> {
    let checkpoints = executor.checkpoints().get_checkpoints(thread_id)?;
    if state.is_waiting_for_approval() {
        eprintln!(
            "\n[paused for review on thread {} after {} checkpoints]",
            thread_id,
            checkpoints.len()
        );
    } else {
        eprintln!(
            "\n[done: {} messages, {} approvals, {} checkpoints on thread {}]",
            state.messages().len(),
            state.approval_count(),
            checkpoints.len(),
            thread_id
        );
    }
    Ok(())
}
