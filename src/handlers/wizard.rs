// src/handlers/wizard.rs

//! Step-by-step paper creation.
//!
//! Every handler loads the wizard context by token, asks the stage whether
//! the request fits, does its work and only then stores the next stage. A
//! request for the wrong stage fails before anything is written.

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
        lookup::SectionInstruction,
        paper::HeadingRequest,
        section::{Part, PendingCounts, QuestionsSubmission},
        wizard::{WizardContext, WizardStage},
    },
    services::{paper_store, section_store, wizard_store},
};

fn require_paper(ctx: &WizardContext) -> Result<i64, AppError> {
    ctx.paper_id
        .ok_or(AppError::Conflict("The heading has not been saved yet".to_string()))
}

/// Active instructions offered for `part`.
async fn instructions_for(
    pool: &SqlitePool,
    part: Part,
) -> Result<Vec<SectionInstruction>, AppError> {
    let rows = sqlx::query_as::<_, SectionInstruction>(
        "SELECT id, text, part, is_active FROM section_instructions WHERE part = ? AND is_active = 1 ORDER BY id",
    )
    .bind(part.code())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Opens a wizard at the heading step.
pub async fn start(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let ctx = wizard_store::create(&pool, None, WizardStage::Heading).await?;
    let choices = paper_store::heading_choices(&pool).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "wizard": ctx,
            "choices": choices
        })),
    ))
}

/// Current stage plus what the client needs to render it.
pub async fn get_wizard(
    State(pool): State<SqlitePool>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = wizard_store::load(&pool, &token).await?;

    let body = match ctx.stage {
        WizardStage::Heading => json!({
            "wizard": ctx,
            "choices": paper_store::heading_choices(&pool).await?
        }),
        WizardStage::Counts { part } | WizardStage::Questions { part, .. } => {
            let paper_id = require_paper(&ctx)?;
            json!({
                "wizard": ctx,
                "instructions": instructions_for(&pool, part).await?,
                "choices": section_store::question_choices(&pool).await?,
                "parent_options": section_store::parent_options(&pool, paper_id, part).await?
            })
        }
        WizardStage::Review => {
            let paper_id = require_paper(&ctx)?;
            let aggregate = paper_store::load_aggregate(&pool, paper_id).await?;
            json!({
                "wizard": ctx,
                "paper": aggregate.paper
            })
        }
    };

    Ok(Json(body))
}

/// Saves the heading, creating the paper.
pub async fn submit_heading(
    State(pool): State<SqlitePool>,
    Path(token): Path<String>,
    Json(payload): Json<HeadingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut ctx = wizard_store::load(&pool, &token).await?;
    let next = ctx.stage.after_heading()?;

    let paper = paper_store::create_paper(&pool, &payload).await?;

    ctx.paper_id = Some(paper.id);
    ctx.stage = next;
    wizard_store::save(&pool, &ctx).await?;

    tracing::info!("Paper {} created, wizard at {}", paper.id, ctx.stage.describe());

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "wizard": ctx,
            "paper": paper
        })),
    ))
}

/// Step 0 of a section: counts and marks, kept pending in the wizard.
pub async fn submit_counts(
    State(pool): State<SqlitePool>,
    Path((token, part)): Path<(String, Part)>,
    Json(payload): Json<PendingCounts>,
) -> Result<impl IntoResponse, AppError> {
    let mut ctx = wizard_store::load(&pool, &token).await?;
    let paper_id = require_paper(&ctx)?;

    // Stage first: a wrong-stage request is a conflict even with bad counts.
    ctx.stage.after_counts(part, payload)?;
    let counts = payload.validate(part).map_err(AppError::BadRequest)?;
    ctx.stage = ctx.stage.after_counts(part, counts)?;

    wizard_store::save(&pool, &ctx).await?;

    Ok(Json(json!({
        "wizard": ctx,
        "slots": counts.question_count,
        "choices": section_store::question_choices(&pool).await?,
        "parent_options": section_store::parent_options(&pool, paper_id, part).await?
    })))
}

/// Step 1 of a section: instructions and questions.
pub async fn submit_questions(
    State(pool): State<SqlitePool>,
    Path((token, part)): Path<(String, Part)>,
    Json(payload): Json<QuestionsSubmission>,
) -> Result<impl IntoResponse, AppError> {
    let mut ctx = wizard_store::load(&pool, &token).await?;
    let counts = ctx.stage.pending_counts(part)?;
    let next = ctx.stage.after_questions(part)?;
    let paper_id = require_paper(&ctx)?;

    let section = section_store::save_section(&pool, paper_id, part, counts, payload).await?;
    let paper = paper_store::load_paper(&pool, paper_id).await?;

    ctx.stage = next;
    wizard_store::save(&pool, &ctx).await?;

    tracing::info!(
        "Paper {} saved {}, maximum mark now {}",
        paper_id,
        part.title(),
        paper.maximum_mark
    );

    Ok(Json(json!({
        "wizard": ctx,
        "section": section,
        "maximum_mark": paper.maximum_mark
    })))
}
