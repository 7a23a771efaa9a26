//! services/api/src/web/users.rs
//!
//! Admin-only user management.

use axum::{
    extract::State,
    Extension,
};
use learning_core::UserPatch;
use std::sync::Arc;
use tracing::info;

use crate::credentials::hash_password;
use crate::error::ApiError;
use crate::web::auth::validate_email;
use crate::web::extract::{Json, Path, Query};
use crate::web::middleware::CurrentUser;
use crate::web::schema::{MessageResponse, PaginationQuery, UserResponse, UserUpdateRequest};
use crate::web::state::AppState;

/// GET /users - List user accounts.
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Users", body = [UserResponse]),
        (status = 403, description = "Admin access required", body = MessageResponse)
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.db.list_users(query.page()).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// GET /users/{id}
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.db.get_user(id).await?.into()))
}

/// PUT /users/{id} - Partial update; a new password is re-hashed. An admin
/// cannot clear their own admin flag.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Invalid email, email already registered, or self-demotion", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    )
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UserUpdateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if id == caller.id && req.is_admin == Some(false) {
        return Err(ApiError::BadRequest(
            "Cannot remove admin privileges from yourself".to_string(),
        ));
    }
    if let Some(email) = req.email.as_deref() {
        validate_email(email)?;
    }
    let password_hash = match req.password.as_deref() {
        Some(password) if !password.is_empty() => Some(hash_password(password)?),
        Some(_) => return Err(ApiError::BadRequest("Password must not be empty".to_string())),
        None => None,
    };
    let user = state
        .db
        .update_user(
            id,
            UserPatch {
                email: req.email,
                password_hash,
                is_admin: req.is_admin,
            },
        )
        .await?;
    info!(user_id = id, "Updated user");
    Ok(Json(user.into()))
}

/// DELETE /users/{id} - Removes the user with all progress and scores.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.delete_user(id).await?;
    info!(user_id = id, "Deleted user");
    Ok(Json(MessageResponse::ok("User deleted successfully")))
}
