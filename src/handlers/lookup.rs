// src/handlers/lookup.rs

//! Small JSON lookups used by the wizard forms.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        lookup::{SubjectCode, SubjectDetails},
        section::Part,
    },
    services::{paper_store, section_store},
};

/// Stored top-level questions of one part, offered as sub-question parents.
pub async fn parent_questions(
    State(pool): State<SqlitePool>,
    Path((part, paper_id)): Path<(Part, i64)>,
) -> Result<impl IntoResponse, AppError> {
    paper_store::load_paper(&pool, paper_id).await?;
    let options = section_store::parent_options(&pool, paper_id, part).await?;
    Ok(Json(options))
}

#[derive(Debug, Deserialize)]
pub struct SubjectQuery {
    #[serde(default)]
    pub code: String,
}

/// Subject name and duration for an active subject code.
pub async fn subject_details(
    State(pool): State<SqlitePool>,
    Query(params): Query<SubjectQuery>,
) -> Result<Response, AppError> {
    let subject = sqlx::query_as::<_, SubjectCode>(
        r#"
        SELECT id, code, subject_name, duration_hours, is_active FROM subject_codes
        WHERE code = ? AND is_active = 1
        "#,
    )
    .bind(params.code.trim())
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Subject lookup failed: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let Some(subject) = subject else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": "Subject code not found"
            })),
        )
            .into_response());
    };

    Ok(Json(SubjectDetails {
        success: true,
        subject_name: subject.subject_name,
        duration_hours: subject.duration_hours,
    })
    .into_response())
}
