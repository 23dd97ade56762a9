//! Elective documents: chunked reference text with embeddings, searched by
//! vector similarity to ground chat answers.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::LlmClient;

pub const DEFAULT_CHUNK_SIZE: usize = 1200;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;
/// Chunks this short or shorter carry too little context to embed.
const MIN_CHUNK_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DocChunk {
    pub text: String,
    pub source_url: Option<String>,
    pub similarity: f64,
}

/// Splits text into overlapping windows of `chunk_size` characters. A window
/// that does not reach the end of the text is cut back to its last period or
/// newline when that boundary lies past the window's midpoint.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let mut window = &chars[start..end];

        if end < chars.len() {
            let boundary = window.iter().rposition(|c| *c == '.' || *c == '\n');
            if let Some(boundary) = boundary.filter(|b| *b > chunk_size / 2) {
                window = &window[..=boundary];
            }
        }

        chunks.push(window.iter().collect::<String>().trim().to_string());

        if end == chars.len() {
            break;
        }
        // Always advance, even when the overlap covers the whole window.
        start += window.len().saturating_sub(overlap).max(1);
    }

    chunks
        .into_iter()
        .filter(|c| c.chars().count() > MIN_CHUNK_CHARS)
        .collect()
}

#[derive(Debug, Clone)]
pub struct DocumentSource<'a> {
    pub source_url: &'a str,
    pub course_id: Option<&'a str>,
    pub option_id: Option<&'a str>,
}

/// Chunks, embeds and stores a document. A failed chunk is logged and
/// skipped; the count of stored chunks is returned.
pub async fn ingest_document(
    pool: &PgPool,
    llm: &LlmClient,
    text: &str,
    source: &DocumentSource<'_>,
) -> Result<usize, AppError> {
    let chunks = chunk_text(text, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP);
    let mut stored = 0;

    for (chunk_id, chunk) in chunks.iter().enumerate() {
        let embedding = match llm.embed(chunk).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Failed to embed chunk {chunk_id} of {}: {e}", source.source_url);
                continue;
            }
        };

        let result = sqlx::query(
            r#"
            INSERT INTO elective_docs (course_id, option_id, text, source_url, chunk_id, embedding)
            VALUES ($1, $2, $3, $4, $5, $6::float4[]::vector)
            "#,
        )
        .bind(source.course_id)
        .bind(source.option_id)
        .bind(chunk)
        .bind(source.source_url)
        .bind(chunk_id as i32)
        .bind(&embedding)
        .execute(pool)
        .await;

        match result {
            Ok(_) => stored += 1,
            Err(e) => warn!("Failed to insert chunk {chunk_id} of {}: {e}", source.source_url),
        }
    }

    info!(
        "Stored {stored}/{} chunks from {}",
        chunks.len(),
        source.source_url
    );
    Ok(stored)
}

/// Nearest elective-doc chunks to `query_embedding` above `threshold`.
pub async fn search_elective_docs(
    pool: &PgPool,
    query_embedding: &[f32],
    threshold: f64,
    limit: i32,
) -> Result<Vec<DocChunk>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT text, source_url, similarity::float8 AS similarity
        FROM search_elective_docs($1::float4[]::vector, $2, $3)
        "#,
    )
    .bind(query_embedding)
    .bind(threshold)
    .bind(limit)
    .fetch_all(pool)
    .await
}
