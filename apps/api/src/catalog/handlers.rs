//! Axum route handlers for catalog search and admin uploads.

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::catalog::documents::{ingest_document, DocumentSource};
use crate::catalog::ingest::{
    parse_courses_csv, parse_cse_electives_csv, parse_options_csv, parse_program_json,
    parse_technical_electives_csv, upsert_course_option_maps, upsert_courses, upsert_options,
};
use crate::catalog::search::{search_courses, SearchFilters};
use crate::errors::AppError;
use crate::models::course::Course;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Query string for course search. List filters are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct CourseSearchParams {
    #[serde(default)]
    pub q: String,
    pub term: Option<String>,
    pub dept: Option<String>,
    pub level: Option<String>,
    pub skills: Option<String>,
    pub max_workload: Option<f64>,
    pub limit: Option<i64>,
}

impl CourseSearchParams {
    pub fn filters(&self) -> Result<SearchFilters, AppError> {
        let level = split_list(self.level.as_deref())
            .into_iter()
            .map(|l| {
                l.parse::<i32>()
                    .map_err(|_| AppError::Validation(format!("invalid level '{l}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchFilters {
            term: self.term.clone().filter(|t| !t.is_empty()),
            dept: split_list(self.dept.as_deref()),
            level,
            skills: split_list(self.skills.as_deref()),
            max_workload: self.max_workload,
        })
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ProgramUploadResponse {
    pub message: String,
    pub courses: usize,
    pub programs: usize,
}

#[derive(Debug, Serialize)]
pub struct TechnicalElectivesUploadResponse {
    pub message: String,
    pub courses: usize,
    pub mappings: usize,
}

#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub text: String,
    pub source_url: String,
    pub course_id: Option<String>,
    pub option_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub chunks_stored: usize,
}

struct Upload {
    file_name: Option<String>,
    bytes: Bytes,
}

/// Pulls the `file` field out of a multipart form.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(String::from);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        return Ok(Upload { file_name, bytes });
    }
    Err(AppError::Validation("No file provided".to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/courses
pub async fn handle_search_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseSearchParams>,
) -> Result<Json<Vec<Course>>, AppError> {
    let filters = params.filters()?;
    let courses = search_courses(&state.db, &params.q, &filters, params.limit).await?;
    Ok(Json(courses))
}

/// POST /api/v1/admin/courses/upload
pub async fn handle_upload_courses(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let courses = parse_courses_csv(&upload.bytes)?;
    let count = upsert_courses(&state.db, &courses).await?;

    Ok(Json(UploadResponse {
        message: format!("Successfully uploaded {count} courses"),
        count,
    }))
}

/// POST /api/v1/admin/options/upload
pub async fn handle_upload_options(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let options = parse_options_csv(&upload.bytes)?;
    let count = upsert_options(&state.db, &options).await?;

    Ok(Json(UploadResponse {
        message: format!("Successfully uploaded {count} options"),
        count,
    }))
}

/// POST /api/v1/admin/programs/upload
///
/// Accepts a program-requirements `.json` file and upserts the courses and
/// program options it describes.
pub async fn handle_upload_programs(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProgramUploadResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    if !upload
        .file_name
        .as_deref()
        .is_some_and(|name| name.ends_with(".json"))
    {
        return Err(AppError::Validation("File must be a JSON file".to_string()));
    }

    let document: serde_json::Value = serde_json::from_slice(&upload.bytes)
        .map_err(|e| AppError::Validation(format!("Failed to process JSON file: {e}")))?;
    let import = parse_program_json(&document)?;

    let courses = upsert_courses(&state.db, &import.courses).await?;
    let programs = upsert_options(&state.db, &import.options).await?;

    Ok(Json(ProgramUploadResponse {
        message: format!(
            "Successfully uploaded {courses} courses and {programs} programs from JSON file"
        ),
        courses,
        programs,
    }))
}

/// POST /api/v1/admin/technical-electives/upload
///
/// Upserts the listed courses and the course-option mappings derived from
/// each row's bucket and option.
pub async fn handle_upload_technical_electives(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TechnicalElectivesUploadResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let import = parse_technical_electives_csv(&upload.bytes)?;

    let courses = upsert_courses(&state.db, &import.courses).await?;
    let mappings = upsert_course_option_maps(&state.db, &import.mappings).await?;

    Ok(Json(TechnicalElectivesUploadResponse {
        message: format!(
            "Successfully uploaded {courses} technical electives with {mappings} option mappings"
        ),
        courses,
        mappings,
    }))
}

/// POST /api/v1/admin/cse-electives/upload
pub async fn handle_upload_cse_electives(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let courses = parse_cse_electives_csv(&upload.bytes)?;
    if courses.is_empty() {
        return Err(AppError::Validation("No valid courses found in CSV".to_string()));
    }
    let count = upsert_courses(&state.db, &courses).await?;

    Ok(Json(UploadResponse {
        message: format!("Successfully uploaded {count} CSE electives"),
        count,
    }))
}

/// POST /api/v1/admin/documents
pub async fn handle_ingest_document(
    State(state): State<AppState>,
    Json(request): Json<DocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let source = DocumentSource {
        source_url: &request.source_url,
        course_id: request.course_id.as_deref(),
        option_id: request.option_id.as_deref(),
    };
    let chunks_stored = ingest_document(&state.db, &state.llm, &request.text, &source).await?;

    Ok(Json(DocumentResponse { chunks_stored }))
}
