//! services/api/src/web/upload.rs
//!
//! PDF upload. Files are written to the configured upload directory under a
//! random name and served back from `/uploads`.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
};
use bytes::Bytes;
use learning_core::{MediaKind, NewMedia, PortResult};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::extract::Json;
use crate::web::schema::{MediaResponse, MessageResponse};
use crate::web::state::AppState;

/// URL prefix under which the upload directory is served.
pub const UPLOADS_PREFIX: &str = "/uploads";

struct UploadForm {
    file_name: String,
    data: Bytes,
    title: String,
    resource_id: i64,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut title = None;
    let mut resource_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
                file = Some((file_name, data));
            }
            "title" | "resource_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field {}: {}", name, e)))?;
                if name == "title" {
                    title = Some(text);
                } else {
                    resource_id = Some(text.trim().parse::<i64>().map_err(|_| {
                        ApiError::BadRequest(format!("Invalid resource_id: {}", text))
                    })?);
                }
            }
            _ => {}
        }
    }

    let (file_name, data) =
        file.ok_or_else(|| ApiError::BadRequest("Multipart form must include a file".to_string()))?;
    Ok(UploadForm {
        file_name,
        data,
        title: title.ok_or_else(|| ApiError::BadRequest("Missing field: title".to_string()))?,
        resource_id: resource_id
            .ok_or_else(|| ApiError::BadRequest("Missing field: resource_id".to_string()))?,
    })
}

fn is_pdf(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Deletes the stored file when its media row could not be created.
async fn discard_on_error<T>(stored: &Path, result: PortResult<T>) -> Result<T, ApiError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(io) = tokio::fs::remove_file(stored).await {
                warn!(file = %stored.display(), error = %io, "Failed to remove orphaned upload");
            }
            Err(e.into())
        }
    }
}

/// POST /pdfs/upload - Store a PDF file and register it under a resource.
#[utoipa::path(
    post,
    path = "/pdfs/upload",
    tag = "pdfs",
    request_body(content_type = "multipart/form-data", description = "Parts: `file` (a .pdf), `title`, `resource_id`."),
    responses(
        (status = 201, description = "PDF stored and registered", body = MediaResponse),
        (status = 400, description = "Missing part or not a PDF", body = MessageResponse),
        (status = 404, description = "Resource not found", body = MessageResponse)
    )
)]
pub async fn upload_pdf_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<MediaResponse>), ApiError> {
    let form = read_form(multipart?).await?;
    if !is_pdf(&form.file_name) {
        return Err(ApiError::BadRequest("Only PDF files are allowed".to_string()));
    }
    let resource = state.db.get_resource(form.resource_id).await?;

    let stored_name = format!("{}.pdf", Uuid::new_v4());
    tokio::fs::create_dir_all(&state.config.upload_dir).await?;
    let stored_path = state.config.upload_dir.join(&stored_name);
    tokio::fs::write(&stored_path, &form.data).await?;

    let created = state
        .db
        .create_media(
            MediaKind::Pdf,
            NewMedia {
                resource_id: resource.id,
                title: form.title,
                url: format!("{}/{}", UPLOADS_PREFIX, stored_name),
                thumbnail: None,
            },
        )
        .await;
    let pdf = discard_on_error(&stored_path, created).await?;
    info!(pdf_id = pdf.id, resource_id = resource.id, bytes = form.data.len(), file = %stored_name, "Stored uploaded PDF");

    Ok((StatusCode::CREATED, Json(pdf.into())))
}
