//! reveal_chat - reflective listening practice
//!
//! An automated party opens with a line from a scenario, exchanges a bounded
//! number of messages with a human, then reveals what was really going on and
//! evaluates the human's listening.
//!
//! Runs an HTTP server by default (`reveal_chat serve`); `reveal_chat chat`
//! starts a terminal session instead.

mod api;
mod args;
mod cli;
mod config;
mod db;
mod llm;
mod prompts;
mod rate_limit;
mod runtime;
mod scenario;
mod state_machine;

use api::{create_router, AppState};
use args::{Cli, Command};
use clap::Parser;
use config::AppConfig;
use db::Database;
use llm::{LlmConfig, ModelRegistry};
use rate_limit::DailyRateLimiter;
use runtime::{
    ConversationStore, DatabaseStore, DialogueDriver, DriverSettings, RegistryTextGenerator,
    TextGenerator,
};
use scenario::ScenarioSelector;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Cli::parse();

    // Initialize logging; stdout is reserved for the terminal session
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reveal_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let mut config = AppConfig::from_env()?;
    opts.apply(&mut config);

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;
    tracing::info!(archived = db.count_conversations()?, "Database ready");

    // Initialize LLM registry
    let llm_config = LlmConfig::from_env();
    let llm_registry = Arc::new(ModelRegistry::new(&llm_config));

    if let Some(llm) = llm_registry.default() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm.model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!("No LLM API keys configured. Set OPENAI_API_KEY or LLM_GATEWAY.");
    }

    let selector = Arc::new(ScenarioSelector::builtin());
    tracing::info!(scenarios = selector.len(), "Scenario catalog loaded");

    let generator: Arc<dyn TextGenerator> = Arc::new(RegistryTextGenerator::new(
        Arc::clone(&llm_registry),
        llm_registry.default_model_id().to_string(),
    ));
    let store: Arc<dyn ConversationStore> = Arc::new(DatabaseStore::new(db));
    let driver = Arc::new(DialogueDriver::new(
        generator,
        store,
        Arc::new(DailyRateLimiter::new(config.max_calls_per_day)),
        selector,
        DriverSettings::from_config(&config),
    ));

    if opts.command() == Command::Chat {
        cli::run_chat(&driver).await?;
        return Ok(());
    }

    // Create application state
    let shutdown = CancellationToken::new();
    let state = AppState::new(Arc::clone(&driver), shutdown.clone(), config.session_ttl);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        max_messages = driver.settings().max_messages,
        "reveal_chat server listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
