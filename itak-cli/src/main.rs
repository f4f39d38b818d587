//! `itak` -- binary entry point for the iTaK agent kernel.
//!
//! Wires every subsystem (rate limiter, tool registry, self-heal engine,
//! MCP client, checkpoint manager, heartbeat monitor, structured logger)
//! behind a minimal interactive stdio adapter, and runs the monologue
//! loop against stdin/stdout until EOF or SIGINT.

mod adapter;
mod config;
mod memory;
mod router;

use adapter::StdioAdapter;
use clap::Parser;
use itak_core::agent::{ExtensionPipeline, MonologueEngine};
use itak_core::checkpoint::CheckpointManager;
use itak_core::heal::SelfHealEngine;
use itak_core::heartbeat::HeartbeatMonitor;
use itak_core::logger::{EventType, Logger, LoggerConfig};
use itak_core::mcp::MCPClient;
use itak_core::ports::AdapterPort;
use itak_core::tools::ToolRegistry;
use itak_security::{RateLimiter, SecretManager};
use itak_types::context::{AgentContext, IterationState};
use itak_types::message::History;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

/// iTaK agent kernel CLI.
#[derive(Parser)]
#[command(name = "itak", about = "iTaK agent kernel CLI", version)]
struct Cli {
    /// Enable verbose (debug-level) diagnostic logging.
    #[arg(short, long)]
    verbose: bool,

    /// Config file path, overriding auto-discovery.
    #[arg(short, long)]
    config: Option<String>,

    /// Send a single message non-interactively and print the reply.
    #[arg(short, long)]
    message: Option<String>,
}

fn init_tracing(verbose: bool, log_dir: &std::path::Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "itak.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .json()
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref());

    let _tracing_guard = init_tracing(cli.verbose, &config.data_dir.join("logs/diagnostics"))?;
    tracing::info!(agent = %config.agent.name, "itak starting");

    let secrets = SecretManager::load(std::path::Path::new(".env"));

    let mut logger = Logger::new(LoggerConfig {
        jsonl_dir: config.data_dir.join("logs"),
        sqlite_path: config.data_dir.join("db").join("logs.db"),
        mask_secrets: true,
    })?;
    secrets.register_with_logger(&mut logger);
    let logger = Arc::new(logger);

    let model_api_key = if config.model.api_key.is_empty() {
        itak_types::secret::SecretString::new(secrets.get(&format!("{}_API_KEY", config.model.provider.to_uppercase()), ""))
    } else {
        config.model.api_key.clone()
    };
    let model_router = Arc::new(router::OpenAiCompatRouter::new(
        config.model.base_url.clone(),
        config.model.model_name.clone(),
        model_api_key,
    ));

    let rate_limiter = Arc::new(RateLimiter::with_default_limits(config.rate_limits.daily_budget_usd));

    let memory = Arc::new(memory::FileMemory::new(config.tools.memory_path.clone()));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(itak_tools::ResponseTool));
    registry.register(Arc::new(itak_tools::UnknownTool));
    registry.register(Arc::new(itak_tools::WebFetchTool::new()));
    registry.register(Arc::new(itak_tools::WebSearchTool::new(config.tools.web_search_endpoint.clone())));
    registry.register(Arc::new(itak_tools::MemorySearchTool::new(memory.clone())));
    registry.register(Arc::new(itak_tools::MemorySaveTool::new(memory.clone())));
    let tools = Arc::new(registry);

    let extensions = Arc::new(ExtensionPipeline::new());
    let self_heal = Arc::new(SelfHealEngine::new(Some(memory.clone()), Some(model_router.clone())));

    let checkpoint_dir = config.data_dir.join("db");
    let checkpoint = Arc::new(CheckpointManager::new(&checkpoint_dir)?);

    let heartbeat = Arc::new(HeartbeatMonitor::new(
        memory.clone(),
        rate_limiter.clone(),
        Duration::from_secs(30),
        Duration::from_secs(120),
        Duration::from_secs(300),
    ));

    let mut engine = MonologueEngine::new(
        config.agent.clone(),
        model_router.clone(),
        rate_limiter.clone(),
        tools,
        extensions,
        self_heal,
    )
    .with_checkpoint(checkpoint.clone())
    .with_heartbeat(heartbeat.clone())
    .with_logger(logger.clone());

    if !config.mcp_servers.is_empty() {
        let mcp = Arc::new(MCPClient::new(config.mcp_servers.clone()));
        let results = mcp.connect_all().await;
        for (name, ok) in &results {
            tracing::info!(server = %name, connected = ok, "mcp server connection attempt");
        }
        engine = engine.with_mcp(mcp);
    }
    let engine = Arc::new(engine);

    let adapter = StdioAdapter;
    let room_id = "local";
    let mut ctx = AgentContext::new(adapter.name(), room_id, "local-user");
    let mut history = History::new();
    let mut iter_state = IterationState::new();

    // Auto-restore policy (SPEC_FULL.md §D.2): the kernel itself performs
    // no restore; this adapter silently restores a checkpoint younger
    // than an hour.
    if let Some(age) = checkpoint.checkpoint_age() {
        if age < 3600.0 {
            if let Some(snapshot) = checkpoint.load() {
                for message in snapshot.history {
                    history.push(message);
                }
                tracing::info!(age_s = age, "restored checkpoint");
            }
        }
    }

    let cancel = tokio_util::sync::CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
                cancel.cancel();
            }
        });
    }
    heartbeat.spawn(
        {
            let checkpoint = checkpoint.clone();
            move || {
                let _ = checkpoint.save(0, room_id, "cli", &History::new(), None, serde_json::json!({}));
            }
        },
        cancel.clone(),
    );

    if let Some(message) = cli.message {
        let reply = engine.run(&mut ctx, &mut history, &mut iter_state, &message).await;
        adapter.send(room_id, &reply).await.ok();
        logger.log(EventType::AgentComplete, Some(&serde_json::json!({"reply": reply})), room_id, "cli", 0, 0.0);
        return Ok(());
    }

    println!("iTaK ready. Type a message and press enter (Ctrl-C to quit).");
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        if cancel.is_cancelled() {
            break;
        }

        let (bytes_read, buf) = tokio::task::spawn_blocking(|| {
            let mut buf = String::new();
            let n = std::io::stdin().lock().read_line(&mut buf)?;
            std::io::Result::Ok((n, buf))
        })
        .await??;

        if bytes_read == 0 {
            break;
        }
        let line = buf.trim_end().to_string();
        if line.trim().is_empty() {
            continue;
        }

        let reply = engine.run(&mut ctx, &mut history, &mut iter_state, &line).await;
        adapter.send(room_id, &reply).await.ok();
    }

    checkpoint.save(
        iter_state.iteration_count,
        room_id,
        "cli",
        &history,
        iter_state.last_response.as_deref(),
        serde_json::json!({}),
    )?;
    heartbeat.stop();
    tracing::info!("itak shutting down");
    Ok(())
}
