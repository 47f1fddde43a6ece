//! Crop image upload and pest detection.

use axum::extract::Multipart;
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::error::{Result, ServerError};

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub disease: String,
    pub confidence: f64,
    pub remedy: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub result: Detection,
}

/// Accept a multipart `image` field and return a detection result.
pub async fn upload(mut multipart: Multipart) -> Result<Json<UploadResponse>> {
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("image").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Invalid image upload: {}", e)))?;
        image = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = image.ok_or_else(|| ServerError::BadRequest("No file".to_string()))?;
    if bytes.is_empty() {
        return Err(ServerError::BadRequest("No file".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ServerError::BadRequest("Image too large".to_string()));
    }

    info!(file = %file_name, size = bytes.len(), "Image received");

    // Placeholder model output.
    Ok(Json(UploadResponse {
        success: true,
        result: Detection {
            disease: "Aphids attack".to_string(),
            confidence: 0.78,
            remedy: "Spray neem oil, remove heavily infested leaves".to_string(),
        },
    }))
}
