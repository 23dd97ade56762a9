//! Axum route handlers for the Recommendation API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::profiles::repository::require_profile;
use crate::recommendation::ranking::{recommend_for_profile, CourseRecommendation};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<CourseRecommendation>,
    pub scorer_backend: String,
}

/// POST /api/v1/recommendations
///
/// Ranks catalog courses for the user's stored profile.
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, AppError> {
    let profile = require_profile(&state.db, request.user_id).await?;
    let recommendations =
        recommend_for_profile(&state.db, state.scorer.as_ref(), &profile, request.query.trim())
            .await?;

    Ok(Json(RecommendResponse {
        recommendations,
        scorer_backend: state.scorer.backend().to_string(),
    }))
}
