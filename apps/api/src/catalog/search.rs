use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::models::course::{Course, CourseRow};

pub const DEFAULT_SEARCH_LIMIT: i64 = 20;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    /// Offered-term code (`F`, `W`, `S`).
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub dept: Vec<String>,
    #[serde(default)]
    pub level: Vec<i32>,
    /// Courses must carry every listed skill.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Ceiling on summed weekly workload hours.
    #[serde(default)]
    pub max_workload: Option<f64>,
}

/// Case-insensitive title/description search narrowed by `filters`.
pub async fn search_courses(
    pool: &PgPool,
    query: &str,
    filters: &SearchFilters,
    limit: Option<i64>,
) -> Result<Vec<Course>, sqlx::Error> {
    let mut builder = build_search_query(query, filters, limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
    let rows: Vec<CourseRow> = builder.build_query_as().fetch_all(pool).await?;

    debug!("Course search for '{query}' matched {} rows", rows.len());
    Ok(rows.into_iter().map(Course::from).collect())
}

fn build_search_query<'a>(
    query: &str,
    filters: &'a SearchFilters,
    limit: i64,
) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new("SELECT * FROM courses WHERE TRUE");

    let query = query.trim();
    if !query.is_empty() {
        let pattern = format!("%{query}%");
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(term) = filters.term.as_deref().filter(|t| !t.is_empty()) {
        builder
            .push(" AND terms_offered @> ")
            .push_bind(Json(vec![term.to_string()]));
    }

    if !filters.dept.is_empty() {
        builder.push(" AND dept = ANY(").push_bind(&filters.dept).push(")");
    }

    if !filters.level.is_empty() {
        builder.push(" AND level = ANY(").push_bind(&filters.level).push(")");
    }

    if !filters.skills.is_empty() {
        builder
            .push(" AND skills @> ")
            .push_bind(Json(&filters.skills));
    }

    if let Some(max) = filters.max_workload {
        builder
            .push(
                " AND workload IS NOT NULL AND (\
                 COALESCE((workload->>'reading')::float8, 0) + \
                 COALESCE((workload->>'assignments')::float8, 0) + \
                 COALESCE((workload->>'projects')::float8, 0) + \
                 COALESCE((workload->>'labs')::float8, 0)) <= ",
            )
            .push_bind(max);
    }

    builder.push(" ORDER BY id LIMIT ").push_bind(limit);
    builder
}
