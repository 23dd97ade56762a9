use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::catalog::search::{search_courses, SearchFilters};
use crate::errors::AppError;
use crate::models::course::Course;
use crate::models::profile::UserProfile;
use crate::recommendation::scorer::{CourseScorer, ScoreResult};

/// Maximum number of recommendations returned per request.
pub const RECOMMENDATION_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecommendation {
    pub course: Course,
    #[serde(flatten)]
    pub result: ScoreResult,
}

/// Scores every candidate against the profile's goal tags and keeps the top
/// `RECOMMENDATION_LIMIT`. Equal scores keep their input order.
pub fn rank_courses(
    scorer: &dyn CourseScorer,
    courses: Vec<Course>,
    profile: &UserProfile,
) -> Vec<CourseRecommendation> {
    let mut ranked: Vec<CourseRecommendation> = courses
        .into_iter()
        .map(|course| {
            let result = scorer.score(&course, profile, &profile.goal_tags);
            CourseRecommendation { course, result }
        })
        .collect();

    // Stable sort: ties keep input order.
    ranked.sort_by(|a, b| b.result.score.cmp(&a.result.score));
    ranked.truncate(RECOMMENDATION_LIMIT);
    ranked
}

/// Searches the catalog for candidates matching `query` and the profile's
/// goal tags, then ranks them.
pub async fn recommend_for_profile(
    pool: &PgPool,
    scorer: &dyn CourseScorer,
    profile: &UserProfile,
    query: &str,
) -> Result<Vec<CourseRecommendation>, AppError> {
    let filters = SearchFilters {
        skills: profile.goal_tags.clone(),
        ..Default::default()
    };
    let candidates = search_courses(pool, query, &filters, None).await?;
    let candidate_count = candidates.len();

    let ranked = rank_courses(scorer, candidates, profile);
    info!(
        "Ranked {candidate_count} candidate courses for user {} with {} scorer, returning {}",
        profile.user_id,
        scorer.backend(),
        ranked.len()
    );
    Ok(ranked)
}
