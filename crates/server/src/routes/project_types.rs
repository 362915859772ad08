use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, patch, post},
};
use db::models::{
    project_type::{CreateProjectType, ProjectType, ProjectTypeStats, UpdateProjectType},
    type_field::{
        CreateTypeField, MigrateType, MigrationResult, TypeField, UpdateTypeField, UpdateWorkflow,
    },
};
use deployment::Deployment;
use sea_orm::TransactionTrait;
use serde::Deserialize;
use services::services::{
    type_migration,
    type_schema::{validate_field_update, validate_new_field, validate_type_definition},
    validation::require_non_blank,
};
use utils::{
    pagination::Paginated,
    response::{ApiResponse, MessageResponse},
};

use crate::{
    DeploymentImpl, error::ApiError, http::auth::CurrentUser,
    middleware::load_project_type_middleware, routes::resolve_page,
};

#[derive(Debug, Deserialize)]
pub struct ProjectTypeQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

pub async fn list_project_types(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ProjectTypeQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<ProjectType>>>, ApiError> {
    let page = resolve_page(&deployment, query.page, query.page_size)?;
    let (types, total) = ProjectType::list(&deployment.db().pool, page).await?;
    Ok(ResponseJson(ApiResponse::success(Paginated::new(
        types, total, page,
    ))))
}

pub async fn create_project_type(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Json(mut payload): Json<CreateProjectType>,
) -> Result<ResponseJson<ApiResponse<ProjectType>>, ApiError> {
    current.require_admin()?;
    let workflow = validate_type_definition(
        &payload.name,
        &payload.slug,
        &payload.workflow,
        &payload.fields,
    )?;
    payload.workflow = workflow.into_statuses();

    let tx = deployment.db().pool.begin().await?;
    if ProjectType::slug_exists(&tx, &payload.slug).await? {
        return Err(ApiError::BadRequest(
            "Project type with this slug already exists".to_string(),
        ));
    }
    let project_type = ProjectType::create(&tx, &payload).await?;
    tx.commit().await?;

    tracing::info!(
        project_type_id = project_type.id,
        slug = %project_type.slug,
        fields = project_type.fields.len(),
        "Created project type"
    );
    Ok(ResponseJson(ApiResponse::success(project_type)))
}

pub async fn get_project_type(
    Extension(project_type): Extension<ProjectType>,
) -> Result<ResponseJson<ApiResponse<ProjectType>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(project_type)))
}

pub async fn update_project_type(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(project_type): Extension<ProjectType>,
    Json(payload): Json<UpdateProjectType>,
) -> Result<ResponseJson<ApiResponse<ProjectType>>, ApiError> {
    current.require_admin()?;
    if let Some(name) = payload.name.as_deref() {
        require_non_blank("Name", name)?;
    }
    let updated =
        type_migration::update_project_type(&deployment.db().pool, project_type.id, &payload)
            .await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn update_workflow(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(project_type): Extension<ProjectType>,
    Json(payload): Json<UpdateWorkflow>,
) -> Result<ResponseJson<ApiResponse<ProjectType>>, ApiError> {
    current.require_admin()?;
    let updated = type_migration::update_project_type_workflow(
        &deployment.db().pool,
        project_type.id,
        &payload.workflow,
        &payload.status_mappings,
    )
    .await?;
    tracing::info!(project_type_id = updated.id, workflow = ?updated.workflow, "Updated workflow");
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn get_stats(
    State(deployment): State<DeploymentImpl>,
    Extension(project_type): Extension<ProjectType>,
) -> Result<ResponseJson<ApiResponse<ProjectTypeStats>>, ApiError> {
    let stats = ProjectType::stats(&deployment.db().pool, &project_type).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn migrate_projects(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(project_type): Extension<ProjectType>,
    Json(payload): Json<MigrateType>,
) -> Result<ResponseJson<ApiResponse<MigrationResult>>, ApiError> {
    current.require_admin()?;
    let result =
        type_migration::migrate_project_type(&deployment.db().pool, project_type.id, &payload)
            .await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub async fn delete_project_type(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(project_type): Extension<ProjectType>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    current.require_admin()?;
    type_migration::delete_project_type(&deployment.db().pool, project_type.id).await?;
    tracing::info!(project_type_id = project_type.id, "Deleted project type");
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        format!("Project type '{}' deleted", project_type.name),
    ))))
}

pub async fn add_field(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(project_type): Extension<ProjectType>,
    Json(payload): Json<CreateTypeField>,
) -> Result<ResponseJson<ApiResponse<TypeField>>, ApiError> {
    current.require_admin()?;
    validate_new_field(&project_type.fields, &payload)?;
    let order = payload.effective_order(project_type.fields.len());
    let field =
        ProjectType::add_field(&deployment.db().pool, project_type.id, &payload, order).await?;
    Ok(ResponseJson(ApiResponse::success(field)))
}

pub async fn update_field(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Path((project_type_id, field_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateTypeField>,
) -> Result<ResponseJson<ApiResponse<TypeField>>, ApiError> {
    current.require_admin()?;
    let pool = &deployment.db().pool;
    let field = ProjectType::find_field(pool, project_type_id, field_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Field"))?;
    validate_field_update(&field, &payload)?;
    let updated = ProjectType::update_field(pool, project_type_id, field_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_field(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Path((project_type_id, field_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    current.require_admin()?;
    let pruned =
        type_migration::delete_project_type_field(&deployment.db().pool, project_type_id, field_id)
            .await?;
    tracing::debug!(project_type_id, field_id, pruned, "Deleted project type field");
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        "Field deleted",
    ))))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let project_type_id_router = Router::new()
        .route(
            "/",
            get(get_project_type)
                .patch(update_project_type)
                .delete(delete_project_type),
        )
        .route("/workflow", patch(update_workflow))
        .route("/stats", get(get_stats))
        .route("/migrate", post(migrate_projects))
        .route("/fields", post(add_field))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_project_type_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", get(list_project_types).post(create_project_type))
        .route(
            "/{project_type_id}/fields/{field_id}",
            patch(update_field).delete(delete_field),
        )
        .nest("/{project_type_id}", project_type_id_router);

    Router::new().nest("/project-types", inner)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::test_support::TestApp;

    async fn create_type(app: &TestApp, slug: &str, workflow: &[&str]) -> Value {
        app.ok(
            "POST",
            "/api/v1/project-types",
            Some(json!({
                "name": slug.to_uppercase(),
                "slug": slug,
                "workflow": workflow,
                "fields": [
                    {"key": "budget", "label": "Budget", "field_type": "number"},
                    {"key": "area", "label": "Area", "field_type": "select",
                     "options": ["web", "api"], "order": 9}
                ]
            })),
        )
        .await
    }

    async fn create_project(app: &TestApp, type_id: &Value, title: &str) -> Value {
        app.ok(
            "POST",
            "/api/v1/projects",
            Some(json!({
                "title": title,
                "project_type_id": type_id,
                "custom_data": {"budget": 10, "area": "web"}
            })),
        )
        .await
    }

    #[tokio::test]
    async fn create_orders_fields_and_rejects_duplicate_slug() {
        let app = TestApp::new().await;
        let created = create_type(&app, "initiative", &["planned", "active", "done"]).await;
        assert_eq!(created["fields"][0]["key"], "budget");
        assert_eq!(created["fields"][0]["order"], 0);
        assert_eq!(created["fields"][1]["order"], 9);

        let (status, json) = app
            .send(
                "POST",
                "/api/v1/project-types",
                Some(&app.admin_token),
                Some(json!({"name": "Dup", "slug": "initiative", "workflow": ["a"]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Project type with this slug already exists");

        let (status, _) = app
            .send(
                "POST",
                "/api/v1/project-types",
                Some(&app.admin_token),
                Some(json!({"name": "Dup", "slug": "other", "workflow": ["a", "a"]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn workflow_edit_requires_mappings_for_populated_statuses() {
        let app = TestApp::new().await;
        let project_type = create_type(&app, "epic", &["planned", "active", "done"]).await;
        let id = &project_type["id"];
        let project = create_project(&app, id, "Alpha").await;
        assert_eq!(project["status"], "planned");

        let (status, json) = app
            .send(
                "PATCH",
                &format!("/api/v1/project-types/{id}/workflow"),
                Some(&app.admin_token),
                Some(json!({"workflow": ["todo", "done"]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("planned"));

        let updated = app
            .ok(
                "PATCH",
                &format!("/api/v1/project-types/{id}/workflow"),
                Some(json!({
                    "workflow": ["todo", "done"],
                    "status_mappings": [{"from_status": "planned", "to_status": "todo"}]
                })),
            )
            .await;
        assert_eq!(updated["workflow"], json!(["todo", "done"]));

        let project = app
            .ok("GET", &format!("/api/v1/projects/{}", project["id"]), None)
            .await;
        assert_eq!(project["status"], "todo");

        let stats = app
            .ok("GET", &format!("/api/v1/project-types/{id}/stats"), None)
            .await;
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["by_status"], json!({"todo": 1}));
    }

    #[tokio::test]
    async fn migrate_with_delete_source_moves_projects_and_removes_type() {
        let app = TestApp::new().await;
        let source = create_type(&app, "legacy", &["open", "closed"]).await;
        let target = create_type(&app, "modern", &["new", "finished"]).await;
        let project = create_project(&app, &source["id"], "Old work").await;

        let (status, _) = app
            .send(
                "DELETE",
                &format!("/api/v1/project-types/{}", source["id"]),
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(
                "POST",
                &format!("/api/v1/project-types/{}/migrate", source["id"]),
                Some(&app.admin_token),
                Some(json!({"target_type_id": target["id"], "delete_source": true})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let result = app
            .ok(
                "POST",
                &format!("/api/v1/project-types/{}/migrate", source["id"]),
                Some(json!({
                    "target_type_id": target["id"],
                    "status_mappings": [{"from_status": "open", "to_status": "finished"}],
                    "delete_source": true
                })),
            )
            .await;
        assert_eq!(result["migrated"], 1);
        assert_eq!(result["source_deleted"], true);

        let project = app
            .ok("GET", &format!("/api/v1/projects/{}", project["id"]), None)
            .await;
        assert_eq!(project["project_type_id"], target["id"]);
        assert_eq!(project["status"], "finished");

        let (status, _) = app
            .send(
                "GET",
                &format!("/api/v1/project-types/{}", source["id"]),
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn field_lifecycle_validates_and_prunes_data() {
        let app = TestApp::new().await;
        let project_type = create_type(&app, "program", &["open"]).await;
        let id = &project_type["id"];
        let project = create_project(&app, id, "Tracked").await;

        let (status, _) = app
            .send(
                "POST",
                &format!("/api/v1/project-types/{id}/fields"),
                Some(&app.admin_token),
                Some(json!({"key": "budget", "label": "Again", "field_type": "text"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(
                "POST",
                &format!("/api/v1/project-types/{id}/fields"),
                Some(&app.admin_token),
                Some(json!({"key": "Bad Key", "label": "Bad", "field_type": "text"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let added = app
            .ok(
                "POST",
                &format!("/api/v1/project-types/{id}/fields"),
                Some(json!({"key": "owner", "label": "Owner", "field_type": "text"})),
            )
            .await;
        assert_eq!(added["order"], 2);

        let renamed = app
            .ok(
                "PATCH",
                &format!("/api/v1/project-types/{id}/fields/{}", added["id"]),
                Some(json!({"label": "Lead"})),
            )
            .await;
        assert_eq!(renamed["label"], "Lead");

        let budget_id = &project_type["fields"][0]["id"];
        app.ok(
            "DELETE",
            &format!("/api/v1/project-types/{id}/fields/{budget_id}"),
            None,
        )
        .await;
        let project = app
            .ok("GET", &format!("/api/v1/projects/{}", project["id"]), None)
            .await;
        assert_eq!(project["custom_data"], json!({"area": "web"}));

        let (status, _) = app
            .send(
                "DELETE",
                &format!("/api/v1/project-types/{id}/fields/{budget_id}"),
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn members_cannot_change_schema() {
        let app = TestApp::new().await;
        let (_, token) = app.user("dev@test.dev", false).await;
        let (status, _) = app
            .send(
                "POST",
                "/api/v1/project-types",
                Some(&token),
                Some(json!({"name": "X", "slug": "x", "workflow": ["a"]})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = app
            .send("GET", "/api/v1/project-types", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total"], 0);
    }
}
