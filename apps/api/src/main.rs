mod catalog;
mod chat;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod profiles;
mod recommendation;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::chat::memory::PgChatMemory;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::recommendation::scorer::{CourseScorer, HeuristicScorer};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Elective Advisor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.db_max_connections).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_base_url.clone())?;
    info!(
        "LLM client initialized (chat: {}, embeddings: {})",
        llm_client::CHAT_MODEL,
        llm_client::EMBEDDING_MODEL
    );

    let scorer = Arc::new(HeuristicScorer);
    info!("Course scorer: {}", scorer.backend());

    let state = AppState {
        memory: Arc::new(PgChatMemory::new(db.clone())),
        db,
        llm,
        scorer,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
