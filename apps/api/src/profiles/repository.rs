use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{ProfileRow, UserProfile};

pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
    let row: Option<ProfileRow> = sqlx::query_as("SELECT * FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(UserProfile::from))
}

/// Loads a profile or fails with the message the chat client shows to new users.
pub async fn require_profile(pool: &PgPool, user_id: Uuid) -> Result<UserProfile, AppError> {
    get_profile(pool, user_id).await?.ok_or_else(|| {
        AppError::NotFound(
            "User profile not found. Please complete your profile setup first.".to_string(),
        )
    })
}

pub async fn upsert_profile(pool: &PgPool, profile: &UserProfile) -> Result<UserProfile, sqlx::Error> {
    let row: ProfileRow = sqlx::query_as(
        r#"
        INSERT INTO profiles
            (user_id, username, program, current_term, completed_courses, planned_courses,
             additional_comments, gpa, interests, goal_tags, constraints)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (user_id) DO UPDATE SET
            username = EXCLUDED.username,
            program = EXCLUDED.program,
            current_term = EXCLUDED.current_term,
            completed_courses = EXCLUDED.completed_courses,
            planned_courses = EXCLUDED.planned_courses,
            additional_comments = EXCLUDED.additional_comments,
            gpa = EXCLUDED.gpa,
            interests = EXCLUDED.interests,
            goal_tags = EXCLUDED.goal_tags,
            constraints = EXCLUDED.constraints,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(profile.user_id)
    .bind(&profile.username)
    .bind(&profile.program)
    .bind(&profile.current_term)
    .bind(&profile.completed_courses)
    .bind(&profile.planned_courses)
    .bind(&profile.additional_comments)
    .bind(profile.gpa)
    .bind(&profile.interests)
    .bind(&profile.goal_tags)
    .bind(profile.constraints.as_ref().map(Json))
    .fetch_one(pool)
    .await?;

    info!("Upserted profile for user {}", profile.user_id);
    Ok(row.into())
}
