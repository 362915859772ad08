use std::str::FromStr;

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    models::{
        release::{CreateRelease, Release, ReleaseWithTasks, UpdateRelease},
        task::Task,
    },
    types::ReleaseStatus,
};
use deployment::Deployment;
use sea_orm::Iterable;
use serde::Deserialize;
use services::services::validation::require_non_blank;
use utils::{
    pagination::Paginated,
    response::{ApiResponse, MessageResponse},
};

use crate::{
    DeploymentImpl, error::ApiError, middleware::load_release_middleware, routes::resolve_page,
};

#[derive(Debug, Deserialize)]
pub struct ReleaseQuery {
    pub status: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

fn parse_status(raw: &str) -> Result<ReleaseStatus, ApiError> {
    ReleaseStatus::from_str(raw).map_err(|_| {
        let allowed: Vec<String> = ReleaseStatus::iter().map(|s| s.to_string()).collect();
        ApiError::BadRequest(format!(
            "Invalid status '{raw}'. Must be one of: {}",
            allowed.join(", ")
        ))
    })
}

fn version_conflict(version: &str) -> ApiError {
    ApiError::BadRequest(format!("Release version {version} already exists"))
}

pub async fn list_releases(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ReleaseQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<Release>>>, ApiError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let page = resolve_page(&deployment, query.page, query.page_size)?;
    let (releases, total) = Release::list(&deployment.db().pool, status, page).await?;
    Ok(ResponseJson(ApiResponse::success(Paginated::new(
        releases, total, page,
    ))))
}

pub async fn create_release(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateRelease>,
) -> Result<ResponseJson<ApiResponse<Release>>, ApiError> {
    require_non_blank("Version", &payload.version)?;
    require_non_blank("Title", &payload.title)?;
    let pool = &deployment.db().pool;
    if Release::version_taken(pool, &payload.version, None).await? {
        return Err(version_conflict(&payload.version));
    }

    let release = Release::create(pool, &payload).await?;
    tracing::info!(release_id = release.id, version = %release.version, "Created release");
    Ok(ResponseJson(ApiResponse::success(release)))
}

pub async fn get_release(
    State(deployment): State<DeploymentImpl>,
    Extension(release): Extension<Release>,
) -> Result<ResponseJson<ApiResponse<ReleaseWithTasks>>, ApiError> {
    let tasks = Task::find_briefs_by_release(&deployment.db().pool, release.id).await?;
    Ok(ResponseJson(ApiResponse::success(ReleaseWithTasks {
        release,
        tasks,
    })))
}

pub async fn update_release(
    State(deployment): State<DeploymentImpl>,
    Extension(release): Extension<Release>,
    Json(payload): Json<UpdateRelease>,
) -> Result<ResponseJson<ApiResponse<Release>>, ApiError> {
    let pool = &deployment.db().pool;
    if let Some(title) = payload.title.as_deref() {
        require_non_blank("Title", title)?;
    }
    if let Some(version) = payload.version.as_deref() {
        require_non_blank("Version", version)?;
        if Release::version_taken(pool, version, Some(release.id)).await? {
            return Err(version_conflict(version));
        }
    }
    let updated = Release::update(pool, release.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_release(
    State(deployment): State<DeploymentImpl>,
    Extension(release): Extension<Release>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    Release::delete(&deployment.db().pool, release.id).await?;
    tracing::info!(release_id = release.id, "Deleted release");
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        format!("Release {} deleted", release.version),
    ))))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let release_id_router = Router::new()
        .route(
            "/",
            get(get_release).patch(update_release).delete(delete_release),
        )
        .layer(from_fn_with_state(
            deployment.clone(),
            load_release_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", get(list_releases).post(create_release))
        .nest("/{release_id}", release_id_router);

    Router::new().nest("/releases", inner)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn version_is_unique_and_status_filter_is_validated() {
        let app = TestApp::new().await;
        let release = app
            .ok(
                "POST",
                "/api/v1/releases",
                Some(json!({"version": "1.0.0", "title": "First", "target_date": "2026-11-01"})),
            )
            .await;
        assert_eq!(release["status"], "planned");
        assert_eq!(release["target_date"], "2026-11-01");

        let (status, json) = app
            .send(
                "POST",
                "/api/v1/releases",
                Some(&app.admin_token),
                Some(json!({"version": "1.0.0", "title": "Again"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Release version 1.0.0 already exists");

        app.ok(
            "POST",
            "/api/v1/releases",
            Some(json!({"version": "1.1.0", "title": "Next", "status": "in_progress"})),
        )
        .await;

        let page = app
            .ok("GET", "/api/v1/releases?status=in_progress", None)
            .await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["items"][0]["version"], "1.1.0");

        let (status, json) = app
            .send(
                "GET",
                "/api/v1/releases?status=shipping",
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("in_progress"));
    }

    #[tokio::test]
    async fn update_keeps_own_version_and_delete_detaches_tasks() {
        let app = TestApp::new().await;
        let release = app
            .ok(
                "POST",
                "/api/v1/releases",
                Some(json!({"version": "2.0", "title": "Big"})),
            )
            .await;
        let uri = format!("/api/v1/releases/{}", release["id"]);

        let updated = app
            .ok(
                "PATCH",
                &uri,
                Some(json!({"version": "2.0", "status": "released", "release_date": "2026-10-01"})),
            )
            .await;
        assert_eq!(updated["status"], "released");

        let team = app
            .ok(
                "POST",
                "/api/v1/teams",
                Some(json!({"name": "Rel", "slug": "rel"})),
            )
            .await;
        let task_type = app
            .ok(
                "POST",
                &format!("/api/v1/task-types?team_id={}", team["id"]),
                Some(json!({"name": "Task", "slug": "task", "workflow": ["todo"]})),
            )
            .await;
        let task = app
            .ok(
                "POST",
                "/api/v1/tasks",
                Some(json!({
                    "title": "Ship it",
                    "team_id": team["id"],
                    "task_type_id": task_type["id"],
                    "release_id": release["id"]
                })),
            )
            .await;

        let detail = app.ok("GET", &uri, None).await;
        assert_eq!(detail["tasks"][0]["id"], task["id"]);

        app.ok("DELETE", &uri, None).await;
        let task = app
            .ok("GET", &format!("/api/v1/tasks/{}", task["id"]), None)
            .await;
        assert!(task["release_id"].is_null());
    }
}
