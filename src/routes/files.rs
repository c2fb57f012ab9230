use std::path::{Path, PathBuf};

use axum::extract::{Json, Query, State};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PreviewQuery {
    pub path: String,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    pub data_uri: String,
}

/// Returns the file as a `data:` URI for inline display in the viewer.
pub async fn file_preview(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> AppResult<Json<PreviewResponse>> {
    let path = PathBuf::from(&query.path);
    if !path.exists() {
        return Err(AppError::not_found("File not found"));
    }

    let bytes = state.attachments.read(&path).await.map_err(AppError::from)?;
    let mime = preview_mime(&path);
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

    Ok(Json(PreviewResponse {
        success: true,
        data_uri: format!("data:{mime};base64,{encoded}"),
    }))
}

fn preview_mime(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" | "jpg" | "jpeg" | "pdf" => mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
        // The viewer expects the legacy Word MIME for both formats.
        "doc" | "docx" => "application/msword".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}
