//! services/api/src/web/content.rs
//!
//! Videos, PDFs and activities. Videos and PDFs share one shape, so their
//! handlers are thin wrappers over the `media_*` helpers.

use axum::{
    extract::State,
    http::StatusCode,
};
use learning_core::MediaKind;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::web::extract::{Json, Path, Query};
use crate::web::schema::{
    ActivityCreateRequest, ActivityResponse, ActivityUpdateRequest, MediaCreateRequest,
    MediaResponse, MediaUpdateRequest, MessageResponse, PaginationQuery,
};
use crate::web::state::AppState;

//=========================================================================================
// Shared Media Helpers
//=========================================================================================

async fn media_create(
    state: &AppState,
    kind: MediaKind,
    req: MediaCreateRequest,
) -> Result<(StatusCode, Json<MediaResponse>), ApiError> {
    let media = state.db.create_media(kind, req.into()).await?;
    info!(kind = kind.label(), id = media.id, resource_id = media.resource_id, "Created media");
    Ok((StatusCode::CREATED, Json(media.into())))
}

async fn media_list(
    state: &AppState,
    kind: MediaKind,
    query: PaginationQuery,
) -> Result<Json<Vec<MediaResponse>>, ApiError> {
    let items = state.db.list_media(kind, query.page()).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

async fn media_get(state: &AppState, kind: MediaKind, id: i64) -> Result<Json<MediaResponse>, ApiError> {
    Ok(Json(state.db.get_media(kind, id).await?.into()))
}

async fn media_update(
    state: &AppState,
    kind: MediaKind,
    id: i64,
    req: MediaUpdateRequest,
) -> Result<Json<MediaResponse>, ApiError> {
    Ok(Json(state.db.update_media(kind, id, req.into()).await?.into()))
}

async fn media_delete(
    state: &AppState,
    kind: MediaKind,
    id: i64,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.delete_media(kind, id).await?;
    info!(kind = kind.label(), id, "Deleted media");
    Ok(Json(MessageResponse::ok(format!("{} deleted successfully", kind.label()))))
}

//=========================================================================================
// Videos
//=========================================================================================

/// POST /videos
#[utoipa::path(
    post,
    path = "/videos",
    tag = "videos",
    request_body = MediaCreateRequest,
    responses(
        (status = 201, description = "Video created", body = MediaResponse),
        (status = 400, description = "Unknown resource", body = MessageResponse)
    )
)]
pub async fn create_video_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MediaCreateRequest>,
) -> Result<(StatusCode, Json<MediaResponse>), ApiError> {
    media_create(&state, MediaKind::Video, req).await
}

/// GET /videos
#[utoipa::path(
    get,
    path = "/videos",
    tag = "videos",
    params(PaginationQuery),
    responses((status = 200, description = "Videos", body = [MediaResponse]))
)]
pub async fn list_videos_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<MediaResponse>>, ApiError> {
    media_list(&state, MediaKind::Video, query).await
}

/// GET /videos/{id}
#[utoipa::path(
    get,
    path = "/videos/{id}",
    tag = "videos",
    params(("id" = i64, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video", body = MediaResponse),
        (status = 404, description = "Video not found", body = MessageResponse)
    )
)]
pub async fn get_video_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MediaResponse>, ApiError> {
    media_get(&state, MediaKind::Video, id).await
}

/// PUT /videos/{id}
#[utoipa::path(
    put,
    path = "/videos/{id}",
    tag = "videos",
    params(("id" = i64, Path, description = "Video id")),
    request_body = MediaUpdateRequest,
    responses(
        (status = 200, description = "Updated video", body = MediaResponse),
        (status = 404, description = "Video not found", body = MessageResponse)
    )
)]
pub async fn update_video_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<MediaUpdateRequest>,
) -> Result<Json<MediaResponse>, ApiError> {
    media_update(&state, MediaKind::Video, id, req).await
}

/// DELETE /videos/{id}
#[utoipa::path(
    delete,
    path = "/videos/{id}",
    tag = "videos",
    params(("id" = i64, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video deleted", body = MessageResponse),
        (status = 404, description = "Video not found", body = MessageResponse)
    )
)]
pub async fn delete_video_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    media_delete(&state, MediaKind::Video, id).await
}

//=========================================================================================
// PDFs
//=========================================================================================

/// POST /pdfs - Registers a PDF by URL. See `/pdfs/upload` for file uploads.
#[utoipa::path(
    post,
    path = "/pdfs",
    tag = "pdfs",
    request_body = MediaCreateRequest,
    responses(
        (status = 201, description = "PDF created", body = MediaResponse),
        (status = 400, description = "Unknown resource", body = MessageResponse)
    )
)]
pub async fn create_pdf_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MediaCreateRequest>,
) -> Result<(StatusCode, Json<MediaResponse>), ApiError> {
    media_create(&state, MediaKind::Pdf, req).await
}

/// GET /pdfs
#[utoipa::path(
    get,
    path = "/pdfs",
    tag = "pdfs",
    params(PaginationQuery),
    responses((status = 200, description = "PDFs", body = [MediaResponse]))
)]
pub async fn list_pdfs_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<MediaResponse>>, ApiError> {
    media_list(&state, MediaKind::Pdf, query).await
}

/// GET /pdfs/{id}
#[utoipa::path(
    get,
    path = "/pdfs/{id}",
    tag = "pdfs",
    params(("id" = i64, Path, description = "PDF id")),
    responses(
        (status = 200, description = "PDF", body = MediaResponse),
        (status = 404, description = "PDF not found", body = MessageResponse)
    )
)]
pub async fn get_pdf_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MediaResponse>, ApiError> {
    media_get(&state, MediaKind::Pdf, id).await
}

/// PUT /pdfs/{id}
#[utoipa::path(
    put,
    path = "/pdfs/{id}",
    tag = "pdfs",
    params(("id" = i64, Path, description = "PDF id")),
    request_body = MediaUpdateRequest,
    responses(
        (status = 200, description = "Updated PDF", body = MediaResponse),
        (status = 404, description = "PDF not found", body = MessageResponse)
    )
)]
pub async fn update_pdf_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<MediaUpdateRequest>,
) -> Result<Json<MediaResponse>, ApiError> {
    media_update(&state, MediaKind::Pdf, id, req).await
}

/// DELETE /pdfs/{id}
#[utoipa::path(
    delete,
    path = "/pdfs/{id}",
    tag = "pdfs",
    params(("id" = i64, Path, description = "PDF id")),
    responses(
        (status = 200, description = "PDF deleted", body = MessageResponse),
        (status = 404, description = "PDF not found", body = MessageResponse)
    )
)]
pub async fn delete_pdf_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    media_delete(&state, MediaKind::Pdf, id).await
}

//=========================================================================================
// Activities
//=========================================================================================

/// POST /activities
#[utoipa::path(
    post,
    path = "/activities",
    tag = "activities",
    request_body = ActivityCreateRequest,
    responses(
        (status = 201, description = "Activity created", body = ActivityResponse),
        (status = 400, description = "Unknown resource", body = MessageResponse)
    )
)]
pub async fn create_activity_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActivityCreateRequest>,
) -> Result<(StatusCode, Json<ActivityResponse>), ApiError> {
    let activity = state.db.create_activity(req.into()).await?;
    info!(activity_id = activity.id, resource_id = activity.resource_id, "Created activity");
    Ok((StatusCode::CREATED, Json(activity.into())))
}

/// GET /activities
#[utoipa::path(
    get,
    path = "/activities",
    tag = "activities",
    params(PaginationQuery),
    responses((status = 200, description = "Activities", body = [ActivityResponse]))
)]
pub async fn list_activities_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<ActivityResponse>>, ApiError> {
    let activities = state.db.list_activities(query.page()).await?;
    Ok(Json(activities.into_iter().map(Into::into).collect()))
}

/// GET /activities/{id}
#[utoipa::path(
    get,
    path = "/activities/{id}",
    tag = "activities",
    params(("id" = i64, Path, description = "Activity id")),
    responses(
        (status = 200, description = "Activity", body = ActivityResponse),
        (status = 404, description = "Activity not found", body = MessageResponse)
    )
)]
pub async fn get_activity_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ActivityResponse>, ApiError> {
    Ok(Json(state.db.get_activity(id).await?.into()))
}

/// PUT /activities/{id}
#[utoipa::path(
    put,
    path = "/activities/{id}",
    tag = "activities",
    params(("id" = i64, Path, description = "Activity id")),
    request_body = ActivityUpdateRequest,
    responses(
        (status = 200, description = "Updated activity", body = ActivityResponse),
        (status = 404, description = "Activity not found", body = MessageResponse)
    )
)]
pub async fn update_activity_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ActivityUpdateRequest>,
) -> Result<Json<ActivityResponse>, ApiError> {
    Ok(Json(state.db.update_activity(id, req.into()).await?.into()))
}

/// DELETE /activities/{id}
#[utoipa::path(
    delete,
    path = "/activities/{id}",
    tag = "activities",
    params(("id" = i64, Path, description = "Activity id")),
    responses(
        (status = 200, description = "Activity deleted", body = MessageResponse),
        (status = 404, description = "Activity not found", body = MessageResponse)
    )
)]
pub async fn delete_activity_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.delete_activity(id).await?;
    info!(activity_id = id, "Deleted activity");
    Ok(Json(MessageResponse::ok("Activity deleted successfully")))
}
