pub mod admin;
pub mod auth;
pub mod catalog;
pub mod content;
pub mod extract;
pub mod middleware;
pub mod progress;
pub mod rest;
pub mod schema;
pub mod state;
pub mod upload;
pub mod users;

pub use middleware::{require_admin, require_auth, CurrentUser};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::error::ApiError;

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

/// Builds the complete application: JSON API, uploads, and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler))
        .route("/logout", post(auth::logout_handler));

    // Read and progress routes (any authenticated user)
    let protected_routes = Router::new()
        .route("/me", get(auth::me_handler))
        .route("/courses", get(catalog::list_courses_handler))
        .route("/courses/{id}", get(catalog::get_course_handler))
        .route("/courses/{id}/complete", get(catalog::course_detail_handler))
        .route("/courses/{id}/modules", get(progress::course_modules_handler))
        .route("/modules", get(catalog::list_modules_handler))
        .route("/modules/{id}", get(catalog::get_module_handler))
        .route("/modules/{id}/resources", get(catalog::module_resources_handler))
        .route("/modules/{id}/videos", get(catalog::module_videos_handler))
        .route("/modules/{id}/pdfs", get(catalog::module_pdfs_handler))
        .route("/modules/{id}/activities", get(catalog::module_activities_handler))
        .route("/modules/{id}/complete", post(progress::complete_module_handler))
        .route("/modules/{id}/user-progress", post(progress::module_user_progress_handler))
        .route("/modules/{id}/scores", get(progress::module_scores_handler))
        .route("/resources", get(catalog::list_resources_handler))
        .route("/resources/{id}", get(catalog::get_resource_handler))
        .route("/resources/{id}/complete", get(catalog::resource_detail_handler))
        .route("/videos", get(content::list_videos_handler))
        .route("/videos/{id}", get(content::get_video_handler))
        .route("/pdfs", get(content::list_pdfs_handler))
        .route("/pdfs/{id}", get(content::get_pdf_handler))
        .route("/activities", get(content::list_activities_handler))
        .route("/activities/{id}", get(content::get_activity_handler))
        .route("/activities/{id}/submit", post(progress::submit_activity_handler))
        .route("/progress", get(progress::progress_overview_handler))
        .route("/students/scores", get(progress::student_scores_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Mutations and management (admins only)
    let admin_routes = Router::new()
        .route("/admin", get(admin::admin_panel_handler))
        .route("/admin/register", post(auth::admin_register_handler))
        .route("/admin/stats", get(admin::admin_stats_handler))
        .route("/admin/users/{id}/make-admin", post(admin::make_admin_handler))
        .route("/admin/users/{id}/remove-admin", post(admin::remove_admin_handler))
        .route("/users", get(users::list_users_handler))
        .route(
            "/users/{id}",
            get(users::get_user_handler)
                .put(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        .route("/courses", post(catalog::create_course_handler))
        .route(
            "/courses/{id}",
            put(catalog::update_course_handler).delete(catalog::delete_course_handler),
        )
        .route("/modules", post(catalog::create_module_handler))
        .route(
            "/modules/{id}",
            put(catalog::update_module_handler).delete(catalog::delete_module_handler),
        )
        .route("/resources", post(catalog::create_resource_handler))
        .route(
            "/resources/{id}",
            put(catalog::update_resource_handler)
                .delete(catalog::delete_resource_handler),
        )
        .route("/videos", post(content::create_video_handler))
        .route(
            "/videos/{id}",
            put(content::update_video_handler).delete(content::delete_video_handler),
        )
        .route("/pdfs", post(content::create_pdf_handler))
        .route("/pdfs/upload", post(upload::upload_pdf_handler))
        .route(
            "/pdfs/{id}",
            put(content::update_pdf_handler).delete(content::delete_pdf_handler),
        )
        .route("/activities", post(content::create_activity_handler))
        .route(
            "/activities/{id}",
            put(content::update_activity_handler)
                .delete(content::delete_activity_handler),
        )
        .layer(axum_middleware::from_fn(require_admin))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .fallback(not_found_handler)
        .nest_service(upload::UPLOADS_PREFIX, ServeDir::new(&app_state.config.upload_dir))
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes))
        .layer(cors_layer(&app_state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()))
}
