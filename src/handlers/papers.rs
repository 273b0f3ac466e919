// src/handlers/papers.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        paper::HeadingRequest,
        section::{Part, SectionSubmission},
        wizard::WizardStage,
    },
    render::DocumentKind,
    services::{blueprint, paper_store, section_store, wizard_store},
};

/// Lists the most recent papers with their progress.
pub async fn list_papers(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let papers = paper_store::recent_papers(&pool).await?;
    Ok(Json(papers))
}

/// Deletes a paper with all of its sections and questions.
pub async fn delete_paper(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    paper_store::delete_paper(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Opens a new wizard on an existing paper at its first missing section.
pub async fn resume(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    paper_store::load_paper(&pool, id).await?;
    let status = paper_store::paper_status(&pool, id).await?;

    let ctx = wizard_store::create(&pool, Some(id), WizardStage::resume_at(status)).await?;
    tracing::info!("Resumed paper {} at {}", id, ctx.stage.describe());

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "wizard": ctx,
            "status": status,
            "status_label": status.label()
        })),
    ))
}

/// Paper with every saved section, for the review page.
pub async fn review(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let aggregate = paper_store::load_aggregate(&pool, id).await?;
    let status = aggregate.status();

    Ok(Json(json!({
        "paper": aggregate.paper,
        "sections": aggregate.sections,
        "status": status,
        "status_label": status.label()
    })))
}

pub async fn update_heading(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<HeadingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let paper = paper_store::update_heading(&pool, id, &payload).await?;
    Ok(Json(paper))
}

pub async fn get_section(
    State(pool): State<SqlitePool>,
    Path((id, part)): Path<(i64, Part)>,
) -> Result<impl IntoResponse, AppError> {
    paper_store::load_paper(&pool, id).await?;

    let section = paper_store::load_section(&pool, id, part)
        .await?
        .ok_or(AppError::NotFound(format!(
            "{} has not been created for this paper",
            part.title()
        )))?;

    Ok(Json(section))
}

/// Edits a saved section: counts, instructions and the whole question set.
pub async fn update_section(
    State(pool): State<SqlitePool>,
    Path((id, part)): Path<(i64, Part)>,
    Json(payload): Json<SectionSubmission>,
) -> Result<impl IntoResponse, AppError> {
    paper_store::load_paper(&pool, id).await?;

    if paper_store::load_section(&pool, id, part).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "{} has not been created for this paper",
            part.title()
        )));
    }

    let section = section_store::save_section(&pool, id, part, payload.counts, payload.body).await?;
    let paper = paper_store::load_paper(&pool, id).await?;

    Ok(Json(json!({
        "section": section,
        "maximum_mark": paper.maximum_mark
    })))
}

/// Links to the three documents of a paper.
pub async fn downloads(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let paper = paper_store::load_paper(&pool, id).await?;

    let documents: Vec<_> = DocumentKind::ALL
        .iter()
        .map(|kind| {
            json!({
                "kind": kind,
                "title": kind.title(),
                "url": format!("/api/papers/{}/pdf/{}", id, kind.slug()),
                "filename": kind.filename(id)
            })
        })
        .collect();

    Ok(Json(json!({
        "paper": paper,
        "documents": documents
    })))
}

/// Module-wise and level-wise coverage as JSON.
pub async fn get_blueprint(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let aggregate = paper_store::load_aggregate(&pool, id).await?;
    Ok(Json(blueprint::compute(&aggregate)))
}
