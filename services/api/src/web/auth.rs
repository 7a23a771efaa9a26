//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, and logout.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension,
};
use learning_core::{NewUser, PortError, ProgressEngine};
use std::sync::Arc;
use tracing::{info, warn};

use crate::credentials::{clear_session_cookie, hash_password, verify_password};
use crate::error::ApiError;
use crate::web::extract::Json;
use crate::web::middleware::CurrentUser;
use crate::web::schema::{
    AdminRegisterRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    UserResponse,
};
use crate::web::state::AppState;

//=========================================================================================
// Helpers
//=========================================================================================

pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    if !email.contains('@') || email.trim() != email {
        return Err(ApiError::BadRequest(format!("Invalid email address: {}", email)));
    }
    Ok(())
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    validate_email(email)?;
    if password.is_empty() {
        return Err(ApiError::BadRequest("Password must not be empty".to_string()));
    }
    Ok(())
}

async fn ensure_email_free(state: &AppState, email: &str) -> Result<(), ApiError> {
    match state.db.get_user_by_email(email).await {
        Ok(_) => Err(ApiError::BadRequest("Email already registered".to_string())),
        Err(PortError::NotFound(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /register - Create a new user account. The first account becomes admin.
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Invalid request or email already registered", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_credentials(&req.email, &req.password)?;
    ensure_email_free(&state, &req.email).await?;

    let password_hash = hash_password(&req.password)?;
    let user = state.db.register_user(&req.email, &password_hash).await?;
    let is_admin = user.is_admin;

    ProgressEngine::new(state.db.as_ref())
        .initialize_user(user.id)
        .await?;
    info!(user_id = user.id, is_admin, "Registered user");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /admin/register - Create a user with an explicit admin flag.
#[utoipa::path(
    post,
    path = "/admin/register",
    tag = "admin",
    request_body = AdminRegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Invalid request or email already registered", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse),
        (status = 403, description = "Admin access required", body = MessageResponse)
    )
)]
pub async fn admin_register_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Json(req): Json<AdminRegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_credentials(&req.email, &req.password)?;
    ensure_email_free(&state, &req.email).await?;

    let user = state
        .db
        .create_user(NewUser {
            email: req.email,
            password_hash: hash_password(&req.password)?,
            is_admin: req.is_admin,
        })
        .await?;

    ProgressEngine::new(state.db.as_ref())
        .initialize_user(user.id)
        .await?;
    info!(user_id = user.id, created_by = admin.id, is_admin = user.is_admin, "Admin registered user");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /login - Verify credentials and set the `access_token` cookie.
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Get user by email
    let creds = match state.db.get_user_by_email(&req.email).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => {
            warn!(email = %req.email, "Login attempt for unknown email");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    // 2. Verify password
    if !verify_password(&req.password, &creds.password_hash) {
        warn!(user_id = creds.id, "Login attempt with a wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    // 3. Issue the token and its cookie
    let token = state.tokens.issue(&creds.email)?;
    let cookie = state.tokens.session_cookie(&token, state.config.cookie_secure);
    info!(user_id = creds.id, "User logged in");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            message: "Login successful".to_string(),
            cookie: token,
            success: true,
        }),
    ))
}

/// POST /logout - Clear the session cookie.
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse)
    )
)]
pub async fn logout_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(MessageResponse::ok("Logout successful")),
    )
}

/// GET /me - The authenticated caller.
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse)
    )
)]
pub async fn me_handler(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(user.into())
}
