//! Avi Agent Service
//!
//! Single HTTP process that:
//! - logs in to the Avi controller once and holds the session
//! - sends chat messages to the configured model backend (Ollama or Mistral)
//! - executes the tool calls the model proposes and returns the folded reply

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use avi_chat::{ChatServiceRouter, ChatState, RequestOrchestrator};
use avi_core::config::{AgentConfig, LogFormat};
use avi_core::CallContext;
use avi_gateway::{AviGateway, ControllerApi, SharedController};
use avi_http::{HttpServer, MiddlewareConfig, RouterBuilder};
use avi_tools::{ToolCatalog, ToolsServiceRouter, ToolsState};

/// Slack between the chat deadline and the HTTP layer's hard timeout
const MIDDLEWARE_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "avi-agent")]
#[command(about = "Natural-language agent for the Avi load-balancer controller")]
struct Args {
    /// Configuration file (YAML or TOML); missing is fine
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Bind address (host:port), overrides server.host/server.port
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level, overrides log.level
    #[arg(long)]
    log_level: Option<String>,

    /// Disable CORS
    #[arg(long)]
    no_cors: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AgentConfig::load(Some(args.config.clone()))
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    init_tracing(&config, args.log_level.as_deref())?;
    info!(
        provider = %config.provider,
        controller = %config.avi.host,
        "Starting Avi agent service"
    );

    // --- 1. Controller session ---

    let login = CallContext::with_timeout(config.avi.timeout());
    let gateway = Arc::new(
        AviGateway::connect(&login, &config.avi)
            .await
            .with_context(|| format!("logging in to controller {}", config.avi.host))?,
    );
    let controller: SharedController = gateway.clone();

    // --- 2. Model backend and tools ---

    let adapter = avi_llm::build_adapter(&config).context("building model adapter")?;
    let catalog = Arc::new(ToolCatalog::standard());
    info!(tools = catalog.len(), "Tool catalog loaded");

    let orchestrator = Arc::new(RequestOrchestrator::new(
        adapter,
        controller,
        catalog.clone(),
    ));

    // --- 3. HTTP ---

    let request_timeout = config.server.request_timeout();
    let chat_state = ChatState::new(orchestrator, request_timeout);
    let router = RouterBuilder::new()
        .mount::<ChatServiceRouter>(avi_chat::create_router(chat_state))
        .mount::<ToolsServiceRouter>(avi_tools::create_router(ToolsState::new(catalog)))
        .build();

    let bind = args.bind.unwrap_or_else(|| config.server.bind_address());
    let server = HttpServer::builder()
        .bind(bind)
        .router(router)
        .middleware(
            MiddlewareConfig::new()
                .cors(!args.no_cors)
                .timeout(request_timeout + MIDDLEWARE_GRACE),
        )
        .build();

    let served = server.serve_with_shutdown(shutdown_signal()).await;

    gateway.close().await;
    info!("Controller session closed");

    served.context("HTTP server failed")?;
    Ok(())
}

fn init_tracing(config: &AgentConfig, cli_level: Option<&str>) -> Result<()> {
    // RUST_LOG wins, then --log-level, then log.level
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => {
            let level = cli_level.unwrap_or(&config.log.level);
            EnvFilter::try_new(format!("{},tower_http=info", level))
                .with_context(|| format!("invalid log level '{}'", level))?
        }
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
