use std::sync::Arc;

use sqlx::PgPool;

use crate::chat::memory::ChatMemory;
use crate::llm_client::LlmClient;
use crate::recommendation::scorer::CourseScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    /// Pluggable course scorer. Default: HeuristicScorer.
    pub scorer: Arc<dyn CourseScorer>,
    /// Conversation history backend. Default: PgChatMemory.
    pub memory: Arc<dyn ChatMemory>,
}
