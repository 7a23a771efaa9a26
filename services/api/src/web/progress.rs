//! services/api/src/web/progress.rs
//!
//! Per-user progress and score endpoints, backed by the core `ProgressEngine`.

use axum::{
    extract::State,
    Extension,
};
use learning_core::{ProgressEngine, ProgressState};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::extract::{Json, Path};
use crate::web::middleware::CurrentUser;
use crate::web::schema::{
    ActivityResponse, CompletionResponse, CourseProgressResponse, MessageResponse,
    ModuleWithProgressResponse, StudentScoreResponse, SubmitActivityRequest, UserProgressRequest,
};
use crate::web::state::AppState;

/// GET /courses/{id}/modules - The course's modules with the caller's state and score.
#[utoipa::path(
    get,
    path = "/courses/{id}/modules",
    tag = "progress",
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Modules with progress", body = [ModuleWithProgressResponse]),
        (status = 404, description = "Course not found", body = MessageResponse)
    )
)]
pub async fn course_modules_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ModuleWithProgressResponse>>, ApiError> {
    let modules = ProgressEngine::new(state.db.as_ref())
        .modules_with_progress(user.id, id)
        .await?;
    Ok(Json(modules.into_iter().map(Into::into).collect()))
}

/// POST /modules/{id}/complete - Complete a module, record its score and unlock what follows.
#[utoipa::path(
    post,
    path = "/modules/{id}/complete",
    tag = "progress",
    params(("id" = i64, Path, description = "Module id")),
    responses(
        (status = 200, description = "Module completed", body = CompletionResponse),
        (status = 404, description = "Module not found", body = MessageResponse)
    )
)]
pub async fn complete_module_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let outcome = ProgressEngine::new(state.db.as_ref())
        .complete_module(user.id, id)
        .await?;
    Ok(Json(CompletionResponse {
        message: "Module completed successfully".to_string(),
        success: true,
        module_id: outcome.module.id,
        user_progress: ProgressState::from(&outcome.progress).into(),
        score: outcome.score.into(),
        unlocked: outcome.unlocked.into(),
        course_completed: outcome.course_completed,
    }))
}

/// POST /modules/{id}/user-progress - Set or clear the caller's completion flag.
#[utoipa::path(
    post,
    path = "/modules/{id}/user-progress",
    tag = "progress",
    params(("id" = i64, Path, description = "Module id")),
    request_body = UserProgressRequest,
    responses(
        (status = 200, description = "Module with updated progress", body = ModuleWithProgressResponse),
        (status = 404, description = "Module not found", body = MessageResponse)
    )
)]
pub async fn module_user_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UserProgressRequest>,
) -> Result<Json<ModuleWithProgressResponse>, ApiError> {
    let module = ProgressEngine::new(state.db.as_ref())
        .set_module_progress(user.id, id, req.completed)
        .await?;
    Ok(Json(module.into()))
}

/// GET /modules/{id}/scores - Every user's score for a module, best first.
#[utoipa::path(
    get,
    path = "/modules/{id}/scores",
    tag = "progress",
    params(("id" = i64, Path, description = "Module id")),
    responses(
        (status = 200, description = "Scores", body = [StudentScoreResponse]),
        (status = 404, description = "Module not found", body = MessageResponse)
    )
)]
pub async fn module_scores_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<StudentScoreResponse>>, ApiError> {
    let module = state.db.get_module(id).await?;
    let scores = state.db.list_scores_for_module(module.id).await?;
    Ok(Json(scores.into_iter().map(Into::into).collect()))
}

/// GET /students/scores - The caller's scores.
#[utoipa::path(
    get,
    path = "/students/scores",
    tag = "progress",
    responses((status = 200, description = "Scores", body = [StudentScoreResponse]))
)]
pub async fn student_scores_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<StudentScoreResponse>>, ApiError> {
    let scores = state.db.list_scores_for_user(user.id).await?;
    Ok(Json(scores.into_iter().map(Into::into).collect()))
}

/// GET /progress - The caller's course → module → resource tree.
#[utoipa::path(
    get,
    path = "/progress",
    tag = "progress",
    responses((status = 200, description = "Progress overview", body = [CourseProgressResponse]))
)]
pub async fn progress_overview_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<CourseProgressResponse>>, ApiError> {
    let tree = ProgressEngine::new(state.db.as_ref())
        .progress_overview(user.id)
        .await?;
    Ok(Json(tree.into_iter().map(Into::into).collect()))
}

/// POST /activities/{id}/submit - Record a submitted activity score.
#[utoipa::path(
    post,
    path = "/activities/{id}/submit",
    tag = "progress",
    params(("id" = i64, Path, description = "Activity id")),
    request_body = SubmitActivityRequest,
    responses(
        (status = 200, description = "Activity after submission", body = ActivityResponse),
        (status = 400, description = "Invalid score", body = MessageResponse),
        (status = 404, description = "Activity not found", body = MessageResponse)
    )
)]
pub async fn submit_activity_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitActivityRequest>,
) -> Result<Json<ActivityResponse>, ApiError> {
    if !req.score.is_finite() {
        return Err(ApiError::BadRequest("Score must be a finite number".to_string()));
    }
    let activity = ProgressEngine::new(state.db.as_ref())
        .submit_activity(user.id, id, req.score)
        .await?;
    Ok(Json(activity.into()))
}
