//! Axum route handlers for the advisor chat.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::documents::{search_elective_docs, DocChunk};
use crate::catalog::search::{search_courses, SearchFilters};
use crate::chat::context::{build_context, system_prompt};
use crate::chat::memory::{citations_for, NewMessage};
use crate::chat::triggers::should_generate_recommendations;
use crate::errors::AppError;
use crate::llm_client::{ChatMessage, DEFAULT_TEMPERATURE};
use crate::models::chat::{ChatRole, ChatSessionRow, MessageRow};
use crate::models::course::Course;
use crate::profiles::repository::require_profile;
use crate::recommendation::ranking::{recommend_for_profile, CourseRecommendation};
use crate::state::AppState;

/// Prior messages replayed to the model each turn.
const HISTORY_WINDOW: i64 = 6;
const DOC_MATCH_THRESHOLD: f64 = 0.6;
const DOC_MATCH_LIMIT: i32 = 5;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl ChatRequest {
    /// Returns `(message, session_id, user_id)` or a 400 when any is missing.
    pub fn into_parts(self) -> Result<(String, Uuid, Uuid), AppError> {
        match (self.message, self.session_id, self.user_id) {
            (Some(message), Some(session_id), Some(user_id)) if !message.trim().is_empty() => {
                Ok((message, session_id, user_id))
            }
            _ => Err(AppError::Validation("Missing required fields".to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub recommendations: Vec<CourseRecommendation>,
    pub sources: Vec<String>,
    pub used_web_search: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearSessionResponse {
    pub deleted: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/chat
///
/// One advisor turn: retrieves catalog and document context for the message,
/// asks the model, stores both sides of the exchange and, when the message
/// asks for them, attaches ranked course recommendations.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let (message, session_id, user_id) = request.into_parts()?;
    let profile = require_profile(&state.db, user_id).await?;

    let history = state.memory.recent(session_id, HISTORY_WINDOW).await?;

    let filters = SearchFilters {
        skills: profile.goal_tags.clone(),
        ..Default::default()
    };
    let courses = search_courses(&state.db, &message, &filters, None).await?;
    let sources = course_sources(&courses);
    let doc_chunks = retrieve_documents(&state, &message).await;

    let context = build_context(&courses, &doc_chunks, &profile);
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new(ChatRole::System, system_prompt(&profile)));
    messages.extend(history);
    messages.push(ChatMessage::new(
        ChatRole::User,
        format!("{message}\n\nContext:\n{context}"),
    ));

    let reply = state.llm.chat(&messages, DEFAULT_TEMPERATURE).await?;

    let exchange = [
        NewMessage::new(session_id, ChatRole::User, message.as_str()),
        NewMessage::new(session_id, ChatRole::Assistant, reply.as_str())
            .with_citations(citations_for(&doc_chunks)),
    ];
    if let Err(e) = state.memory.append(&exchange).await {
        warn!("Failed to store messages for session {session_id}: {e:#}");
    }

    let recommendations = if should_generate_recommendations(&message) {
        recommend_for_profile(&state.db, state.scorer.as_ref(), &profile, &message).await?
    } else {
        Vec::new()
    };

    info!(
        "Chat turn for session {session_id}: {} courses, {} doc chunks, {} recommendations",
        courses.len(),
        doc_chunks.len(),
        recommendations.len()
    );

    Ok(Json(ChatResponse {
        response: reply,
        recommendations,
        sources,
        used_web_search: false,
    }))
}

/// POST /api/v1/chat/session
///
/// Falls back to an unsaved session id when the database is unavailable so
/// the client can still chat.
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let user_id = request
        .user_id
        .ok_or_else(|| AppError::Validation("User ID is required".to_string()))?;

    let inserted: Result<ChatSessionRow, sqlx::Error> = sqlx::query_as(
        r#"
        INSERT INTO chat_sessions (user_id, title, goal_snapshot)
        VALUES ($1, 'New Chat', '{}'::jsonb)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .fetch_one(&state.db)
    .await;

    let response = match inserted {
        Ok(session) => CreateSessionResponse {
            session_id: session.id,
            error: None,
        },
        Err(e) => {
            warn!("Failed to create chat session for user {user_id}: {e}");
            CreateSessionResponse {
                session_id: Uuid::new_v4(),
                error: Some("Database unavailable, using local session".to_string()),
            }
        }
    };
    Ok(Json(response))
}

/// GET /api/v1/chat/session/:id/messages
pub async fn handle_session_messages(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<MessageRow>>, AppError> {
    Ok(Json(state.memory.history(session_id).await?))
}

/// DELETE /api/v1/chat/session/:id/messages
pub async fn handle_clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ClearSessionResponse>, AppError> {
    let deleted = state.memory.clear(session_id).await?;
    Ok(Json(ClearSessionResponse { deleted }))
}

/// Document retrieval is best-effort: the chat still answers without it.
async fn retrieve_documents(state: &AppState, message: &str) -> Vec<DocChunk> {
    let embedding = match state.llm.embed(message).await {
        Ok(embedding) => embedding,
        Err(e) => {
            warn!("Skipping document retrieval, embedding failed: {e}");
            return Vec::new();
        }
    };

    search_elective_docs(&state.db, &embedding, DOC_MATCH_THRESHOLD, DOC_MATCH_LIMIT)
        .await
        .unwrap_or_else(|e| {
            warn!("Vector search error: {e}");
            Vec::new()
        })
}

/// Distinct course source URLs, in first-seen order.
fn course_sources(courses: &[Course]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for url in courses.iter().filter_map(|c| c.source_url.as_deref()) {
        if !url.is_empty() && !sources.iter().any(|s| s == url) {
            sources.push(url.to_string());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_uses_camel_case_fields() {
        let request: ChatRequest = serde_json::from_value(json!({
            "message": "recommend courses",
            "sessionId": Uuid::nil(),
            "userId": Uuid::nil(),
        }))
        .unwrap();
        let (message, session_id, _) = request.into_parts().unwrap();
        assert_eq!(message, "recommend courses");
        assert_eq!(session_id, Uuid::nil());
    }

    #[test]
    fn test_chat_request_missing_fields_is_validation_error() {
        let request: ChatRequest = serde_json::from_value(json!({"message": "hi"})).unwrap();
        assert!(matches!(request.into_parts(), Err(AppError::Validation(_))));

        let blank: ChatRequest = serde_json::from_value(json!({
            "message": "   ",
            "sessionId": Uuid::nil(),
            "userId": Uuid::nil(),
        }))
        .unwrap();
        assert!(blank.into_parts().is_err());
    }

    #[test]
    fn test_course_sources_are_distinct_and_ordered() {
        let course = |url: Option<&str>| Course {
            source_url: url.map(String::from),
            ..Default::default()
        };
        let courses = vec![
            course(Some("https://a")),
            course(None),
            course(Some("https://b")),
            course(Some("https://a")),
            course(Some("")),
        ];
        assert_eq!(course_sources(&courses), vec!["https://a", "https://b"]);
    }

    #[test]
    fn test_session_response_omits_error_when_saved() {
        let response = CreateSessionResponse {
            session_id: Uuid::nil(),
            error: None,
        };
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"sessionId": Uuid::nil()})
        );
    }
}
