//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use learning_core::{PortError, User};
use std::sync::Arc;
use tracing::debug;

use crate::credentials::token_from_cookie_header;
use crate::error::ApiError;
use crate::web::state::AppState;

/// The authenticated caller, placed in request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Middleware that resolves the `access_token` cookie to a user.
///
/// If valid, inserts the `CurrentUser` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the token from the cookie header
    let token = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(token_from_cookie_header)
        .ok_or(ApiError::Unauthorized)?;

    // 2. Verify signature and expiry
    let claims = state.tokens.verify(token).ok_or(ApiError::Unauthorized)?;

    // 3. The account must still exist
    let user = match state.db.get_user_by_email(&claims.sub).await {
        Ok(creds) => creds.to_user(),
        Err(PortError::NotFound(_)) => {
            debug!(email = %claims.sub, "Token refers to a missing user");
            return Err(ApiError::Unauthorized);
        }
        Err(e) => return Err(e.into()),
    };

    // 4. Insert the user into request extensions and continue
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Middleware layered inside `require_auth` on admin-only routes.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    match req.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) if user.is_admin => Ok(next.run(req).await),
        Some(_) => Err(ApiError::Forbidden(
            "Admin access required. Only administrators can perform this action.".to_string(),
        )),
        None => Err(ApiError::Unauthorized),
    }
}
