// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{config::Config, error::AppError, render::DocumentKind, services::paper_store};

/// Streams one of the paper's PDFs.
///
/// Rendering is CPU bound and reads image files, so it runs on the
/// blocking pool. Stored state is only read.
pub async fn download(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Path((id, kind)): Path<(i64, DocumentKind)>,
) -> Result<impl IntoResponse, AppError> {
    let aggregate = paper_store::load_aggregate(&pool, id).await?;
    let media_root = config.media_root.clone();

    let bytes = tokio::task::spawn_blocking(move || kind.render(&aggregate, &media_root))
        .await?
        .map_err(|e| {
            tracing::error!("Failed to render {} for paper {}: {:?}", kind.slug(), id, e);
            e
        })?;

    tracing::debug!("Rendered {} for paper {} ({} bytes)", kind.slug(), id, bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", kind.filename(id)),
            ),
        ],
        bytes,
    ))
}
