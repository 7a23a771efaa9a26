//! services/api/src/web/rest.rs
//!
//! Contains the health endpoint and the master definition for the OpenAPI
//! specification.

use utoipa::OpenApi;

use crate::web::extract::Json;
use crate::web::schema::*;
use crate::web::{admin, auth, catalog, content, progress, upload, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        auth::admin_register_handler,
        users::list_users_handler,
        users::get_user_handler,
        users::update_user_handler,
        users::delete_user_handler,
        catalog::create_course_handler,
        catalog::list_courses_handler,
        catalog::get_course_handler,
        catalog::course_detail_handler,
        catalog::update_course_handler,
        catalog::delete_course_handler,
        catalog::create_module_handler,
        catalog::list_modules_handler,
        catalog::get_module_handler,
        catalog::update_module_handler,
        catalog::delete_module_handler,
        catalog::module_resources_handler,
        catalog::module_videos_handler,
        catalog::module_pdfs_handler,
        catalog::module_activities_handler,
        catalog::create_resource_handler,
        catalog::list_resources_handler,
        catalog::get_resource_handler,
        catalog::resource_detail_handler,
        catalog::update_resource_handler,
        catalog::delete_resource_handler,
        content::create_video_handler,
        content::list_videos_handler,
        content::get_video_handler,
        content::update_video_handler,
        content::delete_video_handler,
        content::create_pdf_handler,
        content::list_pdfs_handler,
        content::get_pdf_handler,
        content::update_pdf_handler,
        content::delete_pdf_handler,
        upload::upload_pdf_handler,
        content::create_activity_handler,
        content::list_activities_handler,
        content::get_activity_handler,
        content::update_activity_handler,
        content::delete_activity_handler,
        progress::course_modules_handler,
        progress::complete_module_handler,
        progress::module_user_progress_handler,
        progress::module_scores_handler,
        progress::student_scores_handler,
        progress::progress_overview_handler,
        progress::submit_activity_handler,
        admin::admin_stats_handler,
        admin::make_admin_handler,
        admin::remove_admin_handler,
        admin::admin_panel_handler,
    ),
    components(
        schemas(
            MessageResponse, LoginResponse, RegisterRequest, AdminRegisterRequest, LoginRequest,
            UserResponse, UserUpdateRequest, CourseResponse, CourseCreateRequest,
            CourseUpdateRequest, UserProgressResponse, CourseWithProgressResponse,
            CourseDetailResponse, ModuleResponse, ModuleCreateRequest, ModuleUpdateRequest,
            ModuleWithProgressResponse, ModuleDetailResponse, UserProgressRequest,
            ResourceResponse, ResourceCreateRequest, ResourceUpdateRequest,
            ResourceDetailResponse, MediaResponse, MediaCreateRequest, MediaUpdateRequest,
            ActivityResponse, ActivityCreateRequest, ActivityUpdateRequest,
            SubmitActivityRequest, StudentScoreResponse, UnlockedResponse, CompletionResponse,
            ResourceProgressResponse, ModuleProgressResponse, CourseProgressResponse,
            AdminStatsResponse
        )
    ),
    tags(
        (name = "Learning Platform API", description = "Courses, modules, content, progress and scores.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health
//=========================================================================================

/// GET /health - Liveness probe, no authentication required.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "API is running", body = MessageResponse))
)]
pub async fn health_handler() -> Json<MessageResponse> {
    Json(MessageResponse::ok("API is running successfully"))
}
