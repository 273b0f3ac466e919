// src/services/wizard_store.rs

//! Server-side wizard sessions keyed by an opaque token.

use sqlx::{SqlitePool, types::Json};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::wizard::{WizardContext, WizardSessionRow, WizardStage},
};

/// Opens a new session at `stage`.
pub async fn create(
    pool: &SqlitePool,
    paper_id: Option<i64>,
    stage: WizardStage,
) -> Result<WizardContext, AppError> {
    let token = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO wizard_sessions (token, paper_id, stage) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(paper_id)
        .bind(Json(stage))
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to open wizard session: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::debug!("Opened wizard session at {}", stage.describe());
    Ok(WizardContext {
        token,
        paper_id,
        stage,
    })
}

pub async fn load(pool: &SqlitePool, token: &str) -> Result<WizardContext, AppError> {
    let row = sqlx::query_as::<_, WizardSessionRow>(
        "SELECT token, paper_id, stage FROM wizard_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Wizard session not found".to_string()))?;

    Ok(row.into())
}

/// Stores the new stage (and paper once the heading is saved).
pub async fn save(pool: &SqlitePool, ctx: &WizardContext) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE wizard_sessions
        SET paper_id = ?, stage = ?, updated_at = CURRENT_TIMESTAMP
        WHERE token = ?
        "#,
    )
    .bind(ctx.paper_id)
    .bind(Json(ctx.stage))
    .bind(&ctx.token)
    .execute(pool)
    .await?;

    Ok(())
}
