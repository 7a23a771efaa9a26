//! services/api/src/web/catalog.rs
//!
//! Courses, modules and resources: CRUD plus the nested read endpoints.
//! Reads are open to any authenticated user, mutations are routed behind
//! `require_admin`.

use axum::{
    extract::State,
    http::StatusCode,
    Extension,
};
use learning_core::{MediaKind, ProgressEngine, Resource};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::web::extract::{Json, Path, Query};
use crate::web::middleware::CurrentUser;
use crate::web::schema::{
    ActivityResponse, CourseCreateRequest, CourseDetailResponse, CourseResponse,
    CourseUpdateRequest, CourseWithProgressResponse, MediaResponse, MessageResponse,
    ModuleCreateRequest, ModuleDetailResponse, ModuleResponse, ModuleUpdateRequest,
    PaginationQuery, ResourceCreateRequest, ResourceDetailResponse, ResourceResponse,
    ResourceUpdateRequest,
};
use crate::web::state::AppState;

/// Loads a resource's videos, PDFs and activities.
pub(crate) async fn resource_detail(
    state: &AppState,
    resource: Resource,
) -> Result<ResourceDetailResponse, ApiError> {
    let videos = state.db.list_media_by_resource(MediaKind::Video, resource.id).await?;
    let pdfs = state.db.list_media_by_resource(MediaKind::Pdf, resource.id).await?;
    let activities = state.db.list_activities_by_resource(resource.id).await?;
    Ok(ResourceDetailResponse {
        id: resource.id,
        module_id: resource.module_id,
        name: resource.name,
        videos: videos.into_iter().map(MediaResponse::from).collect(),
        pdfs: pdfs.into_iter().map(MediaResponse::from).collect(),
        activities: activities.into_iter().map(ActivityResponse::from).collect(),
    })
}

//=========================================================================================
// Courses
//=========================================================================================

/// POST /courses
#[utoipa::path(
    post,
    path = "/courses",
    tag = "courses",
    request_body = CourseCreateRequest,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 403, description = "Admin access required", body = MessageResponse)
    )
)]
pub async fn create_course_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CourseCreateRequest>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    let course = state.db.create_course(req.into()).await?;
    info!(course_id = course.id, "Created course");
    Ok((StatusCode::CREATED, Json(course.into())))
}

/// GET /courses - Courses with the caller's lock/completion state.
#[utoipa::path(
    get,
    path = "/courses",
    tag = "courses",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Courses with progress", body = [CourseWithProgressResponse]),
        (status = 401, description = "Not authenticated", body = MessageResponse)
    )
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<CourseWithProgressResponse>>, ApiError> {
    let courses = ProgressEngine::new(state.db.as_ref())
        .courses_with_progress(user.id, query.page())
        .await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// GET /courses/{id}
#[utoipa::path(
    get,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = CourseResponse),
        (status = 404, description = "Course not found", body = MessageResponse)
    )
)]
pub async fn get_course_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CourseResponse>, ApiError> {
    Ok(Json(state.db.get_course(id).await?.into()))
}

/// GET /courses/{id}/complete - A course with all of its modules.
#[utoipa::path(
    get,
    path = "/courses/{id}/complete",
    tag = "courses",
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course with modules", body = CourseDetailResponse),
        (status = 404, description = "Course not found", body = MessageResponse)
    )
)]
pub async fn course_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CourseDetailResponse>, ApiError> {
    let course = state.db.get_course(id).await?;
    let modules = state.db.list_modules_by_course(course.id).await?;
    Ok(Json(CourseDetailResponse::new(course, modules)))
}

/// PUT /courses/{id}
#[utoipa::path(
    put,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = i64, Path, description = "Course id")),
    request_body = CourseUpdateRequest,
    responses(
        (status = 200, description = "Updated course", body = CourseResponse),
        (status = 404, description = "Course not found", body = MessageResponse)
    )
)]
pub async fn update_course_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CourseUpdateRequest>,
) -> Result<Json<CourseResponse>, ApiError> {
    Ok(Json(state.db.update_course(id, req.into()).await?.into()))
}

/// DELETE /courses/{id} - Cascades to modules, content and progress.
#[utoipa::path(
    delete,
    path = "/courses/{id}",
    tag = "courses",
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deleted", body = MessageResponse),
        (status = 404, description = "Course not found", body = MessageResponse)
    )
)]
pub async fn delete_course_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.delete_course(id).await?;
    info!(course_id = id, "Deleted course");
    Ok(Json(MessageResponse::ok("Course deleted successfully")))
}

//=========================================================================================
// Modules
//=========================================================================================

/// POST /modules
#[utoipa::path(
    post,
    path = "/modules",
    tag = "modules",
    request_body = ModuleCreateRequest,
    responses(
        (status = 201, description = "Module created", body = ModuleResponse),
        (status = 400, description = "Unknown course", body = MessageResponse),
        (status = 403, description = "Admin access required", body = MessageResponse)
    )
)]
pub async fn create_module_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ModuleCreateRequest>,
) -> Result<(StatusCode, Json<ModuleResponse>), ApiError> {
    let module = state.db.create_module(req.into()).await?;
    info!(module_id = module.id, course_id = module.course_id, "Created module");
    Ok((StatusCode::CREATED, Json(module.into())))
}

/// GET /modules
#[utoipa::path(
    get,
    path = "/modules",
    tag = "modules",
    params(PaginationQuery),
    responses((status = 200, description = "Modules", body = [ModuleResponse]))
)]
pub async fn list_modules_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<ModuleResponse>>, ApiError> {
    let modules = state.db.list_modules(query.page()).await?;
    Ok(Json(modules.into_iter().map(Into::into).collect()))
}

/// GET /modules/{id} - A module with its resources and their content.
#[utoipa::path(
    get,
    path = "/modules/{id}",
    tag = "modules",
    params(("id" = i64, Path, description = "Module id")),
    responses(
        (status = 200, description = "Module with resources", body = ModuleDetailResponse),
        (status = 404, description = "Module not found", body = MessageResponse)
    )
)]
pub async fn get_module_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ModuleDetailResponse>, ApiError> {
    let module = state.db.get_module(id).await?;
    let mut resources = Vec::new();
    for resource in state.db.list_resources_by_module(module.id).await? {
        resources.push(resource_detail(&state, resource).await?);
    }
    Ok(Json(ModuleDetailResponse::new(module, resources)))
}

/// PUT /modules/{id}
#[utoipa::path(
    put,
    path = "/modules/{id}",
    tag = "modules",
    params(("id" = i64, Path, description = "Module id")),
    request_body = ModuleUpdateRequest,
    responses(
        (status = 200, description = "Updated module", body = ModuleResponse),
        (status = 404, description = "Module not found", body = MessageResponse)
    )
)]
pub async fn update_module_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ModuleUpdateRequest>,
) -> Result<Json<ModuleResponse>, ApiError> {
    Ok(Json(state.db.update_module(id, req.into()).await?.into()))
}

/// DELETE /modules/{id}
#[utoipa::path(
    delete,
    path = "/modules/{id}",
    tag = "modules",
    params(("id" = i64, Path, description = "Module id")),
    responses(
        (status = 200, description = "Module deleted", body = MessageResponse),
        (status = 404, description = "Module not found", body = MessageResponse)
    )
)]
pub async fn delete_module_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.delete_module(id).await?;
    info!(module_id = id, "Deleted module");
    Ok(Json(MessageResponse::ok("Module deleted successfully")))
}

/// GET /modules/{id}/resources
#[utoipa::path(
    get,
    path = "/modules/{id}/resources",
    tag = "modules",
    params(("id" = i64, Path, description = "Module id")),
    responses((status = 200, description = "Resources of the module", body = [ResourceResponse]))
)]
pub async fn module_resources_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ResourceResponse>>, ApiError> {
    let resources = state.db.list_resources_by_module(id).await?;
    Ok(Json(resources.into_iter().map(Into::into).collect()))
}

/// GET /modules/{id}/videos
#[utoipa::path(
    get,
    path = "/modules/{id}/videos",
    tag = "modules",
    params(("id" = i64, Path, description = "Module id")),
    responses((status = 200, description = "Videos of the module", body = [MediaResponse]))
)]
pub async fn module_videos_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MediaResponse>>, ApiError> {
    let videos = state.db.list_media_by_module(MediaKind::Video, id).await?;
    Ok(Json(videos.into_iter().map(Into::into).collect()))
}

/// GET /modules/{id}/pdfs
#[utoipa::path(
    get,
    path = "/modules/{id}/pdfs",
    tag = "modules",
    params(("id" = i64, Path, description = "Module id")),
    responses((status = 200, description = "PDFs of the module", body = [MediaResponse]))
)]
pub async fn module_pdfs_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MediaResponse>>, ApiError> {
    let pdfs = state.db.list_media_by_module(MediaKind::Pdf, id).await?;
    Ok(Json(pdfs.into_iter().map(Into::into).collect()))
}

/// GET /modules/{id}/activities
#[utoipa::path(
    get,
    path = "/modules/{id}/activities",
    tag = "modules",
    params(("id" = i64, Path, description = "Module id")),
    responses((status = 200, description = "Activities of the module", body = [ActivityResponse]))
)]
pub async fn module_activities_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ActivityResponse>>, ApiError> {
    let activities = state.db.list_activities_by_module(id).await?;
    Ok(Json(activities.into_iter().map(Into::into).collect()))
}

//=========================================================================================
// Resources
//=========================================================================================

/// POST /resources
#[utoipa::path(
    post,
    path = "/resources",
    tag = "resources",
    request_body = ResourceCreateRequest,
    responses(
        (status = 201, description = "Resource created", body = ResourceResponse),
        (status = 400, description = "Unknown module", body = MessageResponse)
    )
)]
pub async fn create_resource_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResourceCreateRequest>,
) -> Result<(StatusCode, Json<ResourceResponse>), ApiError> {
    let resource = state.db.create_resource(req.into()).await?;
    info!(resource_id = resource.id, module_id = resource.module_id, "Created resource");
    Ok((StatusCode::CREATED, Json(resource.into())))
}

/// GET /resources
#[utoipa::path(
    get,
    path = "/resources",
    tag = "resources",
    params(PaginationQuery),
    responses((status = 200, description = "Resources", body = [ResourceResponse]))
)]
pub async fn list_resources_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<ResourceResponse>>, ApiError> {
    let resources = state.db.list_resources(query.page()).await?;
    Ok(Json(resources.into_iter().map(Into::into).collect()))
}

/// GET /resources/{id}
#[utoipa::path(
    get,
    path = "/resources/{id}",
    tag = "resources",
    params(("id" = i64, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource", body = ResourceResponse),
        (status = 404, description = "Resource not found", body = MessageResponse)
    )
)]
pub async fn get_resource_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ResourceResponse>, ApiError> {
    Ok(Json(state.db.get_resource(id).await?.into()))
}

/// GET /resources/{id}/complete - A resource with its videos, PDFs and activities.
#[utoipa::path(
    get,
    path = "/resources/{id}/complete",
    tag = "resources",
    params(("id" = i64, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource with content", body = ResourceDetailResponse),
        (status = 404, description = "Resource not found", body = MessageResponse)
    )
)]
pub async fn resource_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ResourceDetailResponse>, ApiError> {
    let resource = state.db.get_resource(id).await?;
    Ok(Json(resource_detail(&state, resource).await?))
}

/// PUT /resources/{id}
#[utoipa::path(
    put,
    path = "/resources/{id}",
    tag = "resources",
    params(("id" = i64, Path, description = "Resource id")),
    request_body = ResourceUpdateRequest,
    responses(
        (status = 200, description = "Updated resource", body = ResourceResponse),
        (status = 404, description = "Resource not found", body = MessageResponse)
    )
)]
pub async fn update_resource_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ResourceUpdateRequest>,
) -> Result<Json<ResourceResponse>, ApiError> {
    Ok(Json(state.db.update_resource(id, req.into()).await?.into()))
}

/// DELETE /resources/{id}
#[utoipa::path(
    delete,
    path = "/resources/{id}",
    tag = "resources",
    params(("id" = i64, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource deleted", body = MessageResponse),
        (status = 404, description = "Resource not found", body = MessageResponse)
    )
)]
pub async fn delete_resource_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.delete_resource(id).await?;
    info!(resource_id = id, "Deleted resource");
    Ok(Json(MessageResponse::ok("Resource deleted successfully")))
}
