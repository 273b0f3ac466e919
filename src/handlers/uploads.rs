// src/handlers/uploads.rs

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use image::ImageFormat;
use serde_json::json;
use uuid::Uuid;

use crate::{config::Config, error::AppError};

/// Directory under the media root that receives question and answer images.
pub const UPLOAD_DIR: &str = "question_images";

fn extension(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("png"),
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::Bmp => Some("bmp"),
        ImageFormat::WebP => Some("webp"),
        _ => None,
    }
}

/// Stores an uploaded image and returns its path relative to the media root.
///
/// The `file` field must decode as an image.
pub async fn upload_image(
    State(config): State<Config>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            data = Some(bytes);
            break;
        }
    }

    let data = data.ok_or(AppError::BadRequest("Missing 'file' field".to_string()))?;

    let format = image::guess_format(&data)
        .map_err(|_| AppError::BadRequest("Upload is not an image".to_string()))?;
    let ext = extension(format)
        .ok_or(AppError::BadRequest("Unsupported image format".to_string()))?;
    image::load_from_memory_with_format(&data, format)
        .map_err(|e| AppError::BadRequest(format!("Image could not be decoded: {}", e)))?;

    let relative = format!("{}/{}.{}", UPLOAD_DIR, Uuid::new_v4(), ext);
    let target = config.media_root.join(&relative);

    if let Some(dir) = target.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            tracing::error!("Failed to create upload directory: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    }
    tokio::fs::write(&target, &data).await.map_err(|e| {
        tracing::error!("Failed to store upload: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!("Stored upload {} ({} bytes)", relative, data.len());

    Ok((StatusCode::CREATED, Json(json!({ "path": relative }))))
}
