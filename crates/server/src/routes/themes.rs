use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    project::Project,
    theme::{CreateTheme, Theme, ThemeWithProjects, UpdateTheme},
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::{validation::require_non_blank, workflow::Workflow};
use utils::{
    pagination::Paginated,
    response::{ApiResponse, MessageResponse},
};

use crate::{
    DeploymentImpl, error::ApiError, middleware::load_theme_middleware, routes::resolve_page,
};

#[derive(Debug, Deserialize)]
pub struct ThemeQuery {
    #[serde(default)]
    pub include_archived: bool,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// Configured theme statuses behave like a flat workflow.
fn theme_statuses(deployment: &DeploymentImpl) -> Workflow {
    Workflow::from_stored(&deployment.settings().theme_statuses)
}

pub async fn list_themes(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ThemeQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<Theme>>>, ApiError> {
    let page = resolve_page(&deployment, query.page, query.page_size)?;
    let (themes, total) =
        Theme::list(&deployment.db().pool, query.include_archived, page).await?;
    Ok(ResponseJson(ApiResponse::success(Paginated::new(
        themes, total, page,
    ))))
}

pub async fn list_theme_statuses(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<String>>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(
        deployment.settings().theme_statuses.clone(),
    )))
}

pub async fn create_theme(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateTheme>,
) -> Result<ResponseJson<ApiResponse<Theme>>, ApiError> {
    require_non_blank("Title", &payload.title)?;
    let statuses = theme_statuses(&deployment);
    let status = match payload.status.as_deref() {
        Some(status) => {
            statuses.ensure_contains(status)?;
            status
        }
        None => statuses.initial_status(),
    };

    let theme = Theme::create(&deployment.db().pool, &payload, status).await?;
    tracing::info!(theme_id = theme.id, status = %theme.status, "Created theme");
    Ok(ResponseJson(ApiResponse::success(theme)))
}

pub async fn get_theme(
    State(deployment): State<DeploymentImpl>,
    Extension(theme): Extension<Theme>,
) -> Result<ResponseJson<ApiResponse<ThemeWithProjects>>, ApiError> {
    let projects = Project::find_briefs_by_theme(&deployment.db().pool, theme.id).await?;
    Ok(ResponseJson(ApiResponse::success(ThemeWithProjects {
        theme,
        projects,
    })))
}

pub async fn update_theme(
    State(deployment): State<DeploymentImpl>,
    Extension(theme): Extension<Theme>,
    Json(payload): Json<UpdateTheme>,
) -> Result<ResponseJson<ApiResponse<Theme>>, ApiError> {
    if let Some(title) = payload.title.as_deref() {
        require_non_blank("Title", title)?;
    }
    if let Some(status) = payload.status.as_deref() {
        theme_statuses(&deployment).ensure_contains(status)?;
    }
    let updated = Theme::update(&deployment.db().pool, theme.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_theme(
    State(deployment): State<DeploymentImpl>,
    Extension(theme): Extension<Theme>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    Theme::delete(&deployment.db().pool, theme.id).await?;
    tracing::info!(theme_id = theme.id, "Deleted theme");
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        format!("Theme '{}' deleted", theme.title),
    ))))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let theme_id_router = Router::new()
        .route("/", get(get_theme).patch(update_theme).delete(delete_theme))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_theme_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", get(list_themes).post(create_theme))
        .route("/statuses", get(list_theme_statuses))
        .nest("/{theme_id}", theme_id_router);

    Router::new().nest("/themes", inner)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn new_theme_defaults_to_first_configured_status() {
        let app = TestApp::new().await;
        let theme = app
            .ok(
                "POST",
                "/api/v1/themes",
                Some(json!({"title": "Q4 Initiative"})),
            )
            .await;
        assert_eq!(theme["status"], "active");

        let statuses = app.ok("GET", "/api/v1/themes/statuses", None).await;
        assert_eq!(statuses, json!(["active", "completed", "archived"]));
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let app = TestApp::new().await;
        let (status, json) = app
            .send(
                "POST",
                "/api/v1/themes",
                Some(&app.admin_token),
                Some(json!({"title": "Bad", "status": "paused"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("active"));
    }

    #[tokio::test]
    async fn out_of_range_pages_are_rejected() {
        let app = TestApp::new().await;
        for page in ["18446744073709551615", "300000000000000000"] {
            let (status, json) = app
                .send(
                    "GET",
                    &format!("/api/v1/themes?page={page}"),
                    Some(&app.admin_token),
                    None,
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "page={page}");
            assert_eq!(json["success"], false);
        }
    }

    #[tokio::test]
    async fn archived_themes_need_opt_in_and_pagination_is_reported() {
        let app = TestApp::new().await;
        app.ok("POST", "/api/v1/themes", Some(json!({"title": "Live"})))
            .await;
        app.ok(
            "POST",
            "/api/v1/themes",
            Some(json!({"title": "Old", "status": "archived"})),
        )
        .await;

        let page = app.ok("GET", "/api/v1/themes", None).await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["pages"], 1);

        let page = app
            .ok(
                "GET",
                "/api/v1/themes?include_archived=true&page=1&page_size=1",
                None,
            )
            .await;
        assert_eq!(page["total"], 2);
        assert_eq!(page["pages"], 2);
        assert_eq!(page["items"].as_array().unwrap().len(), 1);

        let (status, _) = app
            .send(
                "GET",
                "/api/v1/themes?page=0",
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deleting_theme_detaches_projects() {
        let app = TestApp::new().await;
        let theme = app
            .ok("POST", "/api/v1/themes", Some(json!({"title": "Umbrella"})))
            .await;
        let project_type = app
            .ok(
                "POST",
                "/api/v1/project-types",
                Some(json!({"name": "Epic", "slug": "epic", "workflow": ["planned", "done"]})),
            )
            .await;
        let project = app
            .ok(
                "POST",
                "/api/v1/projects",
                Some(json!({
                    "title": "Child",
                    "theme_id": theme["id"],
                    "project_type_id": project_type["id"]
                })),
            )
            .await;

        let detail = app
            .ok("GET", &format!("/api/v1/themes/{}", theme["id"]), None)
            .await;
        assert_eq!(detail["projects"][0]["id"], project["id"]);

        app.ok("DELETE", &format!("/api/v1/themes/{}", theme["id"]), None)
            .await;
        let project = app
            .ok("GET", &format!("/api/v1/projects/{}", project["id"]), None)
            .await;
        assert!(project["theme_id"].is_null());
    }
}
