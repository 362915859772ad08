use axum::{
    Extension, Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::{AccessToken, LoginRequest, User};
use deployment::Deployment;
use services::services::password::verify_password;
use utils::response::{ApiResponse, MessageResponse};

use crate::{DeploymentImpl, error::ApiError, http::auth::CurrentUser};

pub async fn login(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<AccessToken>>, ApiError> {
    let credentials = User::find_credentials(&deployment.db().pool, &payload.email).await?;
    let user = match credentials {
        Some((user, hash)) if verify_password(&payload.password, &hash) => user,
        _ => {
            tracing::warn!(email = %payload.email, "Failed login attempt");
            return Err(ApiError::Unauthorized);
        }
    };

    if !user.is_active {
        return Err(ApiError::Forbidden("Inactive user".to_string()));
    }

    let token = deployment.jwt().issue(user.id, &user.role.to_string())?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(ResponseJson(ApiResponse::success(AccessToken::bearer(token))))
}

pub async fn me(
    Extension(current): Extension<CurrentUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(current.0)))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout() -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        "Successfully logged out",
    ))))
}

pub fn public_router() -> Router<DeploymentImpl> {
    Router::new().route("/auth/login", post(login))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
}
