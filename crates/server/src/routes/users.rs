use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    team::Team,
    user::{CreateUser, UpdateUser, User, UserChanges, UserWithTeams},
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::{
    password::hash_password,
    validation::{require_non_blank, validate_email, validate_password},
};
use utils::{
    pagination::Paginated,
    response::{ApiResponse, MessageResponse},
};

use crate::{
    DeploymentImpl, error::ApiError, http::auth::CurrentUser,
    middleware::load_user_middleware, routes::resolve_page,
};

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

pub async fn list_users(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<UserQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<User>>>, ApiError> {
    current.require_admin()?;
    let page = resolve_page(&deployment, query.page, query.page_size)?;
    let (users, total) = User::list(&deployment.db().pool, page).await?;
    Ok(ResponseJson(ApiResponse::success(Paginated::new(
        users, total, page,
    ))))
}

pub async fn create_user(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    current.require_admin()?;
    validate_email(&payload.email)?;
    require_non_blank("Full name", &payload.full_name)?;
    validate_password(&payload.password)?;

    let pool = &deployment.db().pool;
    if User::email_taken(pool, &payload.email, None).await? {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }

    let hashed = hash_password(&payload.password)?;
    let user = User::create(pool, &payload.email, &payload.full_name, hashed, payload.role).await?;
    tracing::info!(user_id = user.id, created_by = current.id(), "Created user");
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn get_user(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<UserWithTeams>>, ApiError> {
    current.require_self_or_admin(user.id)?;
    let teams = Team::find_briefs_for_user(&deployment.db().pool, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(UserWithTeams {
        user,
        teams,
    })))
}

pub async fn update_user(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(user): Extension<User>,
    Json(payload): Json<UpdateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    current.require_self_or_admin(user.id)?;
    if !current.0.is_admin() && (payload.role.is_some() || payload.is_active.is_some()) {
        return Err(ApiError::Forbidden(
            "Only admins can change role or active status".to_string(),
        ));
    }

    let pool = &deployment.db().pool;
    if let Some(email) = payload.email.as_deref() {
        validate_email(email)?;
        if User::email_taken(pool, email, Some(user.id)).await? {
            return Err(ApiError::BadRequest("Email already registered".to_string()));
        }
    }
    if let Some(full_name) = payload.full_name.as_deref() {
        require_non_blank("Full name", full_name)?;
    }
    let hashed_password = match payload.password.as_deref() {
        Some(password) => {
            validate_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let changes = UserChanges {
        email: payload.email,
        full_name: payload.full_name,
        hashed_password,
        role: payload.role,
        is_active: payload.is_active,
    };
    let updated = User::update(pool, user.id, changes).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_user(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    current.require_admin()?;
    if user.id == current.id() {
        return Err(ApiError::BadRequest("Cannot delete yourself".to_string()));
    }

    User::delete(&deployment.db().pool, user.id).await?;
    tracing::info!(user_id = user.id, deleted_by = current.id(), "Deleted user");
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        format!("User {} deleted", user.email),
    ))))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let user_id_router = Router::new()
        .route("/", get(get_user).patch(update_user).delete(delete_user))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_user_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", get(list_users).post(create_user))
        .nest("/{user_id}", user_id_router);

    Router::new().nest("/users", inner)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn admin_creates_user_and_duplicate_email_is_rejected() {
        let app = TestApp::new().await;
        let payload = json!({
            "email": "dev@test.dev",
            "full_name": "Dev",
            "password": "longenough",
            "role": "user"
        });

        let created = app.ok("POST", "/api/v1/users", Some(payload.clone())).await;
        assert_eq!(created["email"], "dev@test.dev");
        assert!(created.get("hashed_password").is_none());

        let (status, json) = app
            .send("POST", "/api/v1/users", Some(&app.admin_token), Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Email already registered");
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let app = TestApp::new().await;
        let (status, _) = app
            .send(
                "POST",
                "/api/v1/users",
                Some(&app.admin_token),
                Some(json!({"email": "x@test.dev", "full_name": "X", "password": "short"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_admin_sees_self_but_not_others() {
        let app = TestApp::new().await;
        let (me, token) = app.user("me@test.dev", false).await;

        let (status, json) = app
            .send("GET", &format!("/api/v1/users/{}", me.id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["teams"], json!([]));

        let (status, _) = app
            .send(
                "GET",
                &format!("/api/v1/users/{}", app.admin.id),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.send("GET", "/api/v1/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn non_admin_cannot_promote_self() {
        let app = TestApp::new().await;
        let (me, token) = app.user("me@test.dev", false).await;

        let (status, _) = app
            .send(
                "PATCH",
                &format!("/api/v1/users/{}", me.id),
                Some(&token),
                Some(json!({"role": "admin"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = app
            .send(
                "PATCH",
                &format!("/api/v1/users/{}", me.id),
                Some(&token),
                Some(json!({"full_name": "Renamed"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["full_name"], "Renamed");
    }

    #[tokio::test]
    async fn admin_cannot_delete_self() {
        let app = TestApp::new().await;
        let (status, json) = app
            .send(
                "DELETE",
                &format!("/api/v1/users/{}", app.admin.id),
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Cannot delete yourself");

        let (other, _) = app.user("gone@test.dev", false).await;
        app.ok("DELETE", &format!("/api/v1/users/{}", other.id), None)
            .await;
        let (status, _) = app
            .send(
                "GET",
                &format!("/api/v1/users/{}", other.id),
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
