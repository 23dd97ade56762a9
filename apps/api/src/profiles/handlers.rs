use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::UserProfile;
use crate::profiles::repository::{require_profile, upsert_profile};
use crate::recommendation::terms::AcademicTerm;
use crate::state::AppState;

/// GET /api/v1/profiles/:user_id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(require_profile(&state.db, user_id).await?))
}

/// PUT /api/v1/profiles/:user_id
pub async fn handle_put_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(mut profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, AppError> {
    profile.user_id = user_id;
    validate_profile(&profile)?;
    Ok(Json(upsert_profile(&state.db, &profile).await?))
}

/// Rejects values the scorer would otherwise silently treat as defaults.
pub fn validate_profile(profile: &UserProfile) -> Result<(), AppError> {
    if let Some(term) = profile.current_term.as_deref().filter(|t| !t.is_empty()) {
        term.parse::<AcademicTerm>()
            .map_err(|e| AppError::Validation(e.to_string()))?;
    }

    if let Some(max) = profile.max_workload() {
        if !(1.0..=5.0).contains(&max) {
            return Err(AppError::Validation(format!(
                "max_workload must be between 1 and 5, got {max}"
            )));
        }
    }

    Ok(())
}
