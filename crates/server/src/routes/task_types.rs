use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, patch, post},
};
use db::models::{
    task_type::{CreateTaskType, TaskType, TaskTypeStats, UpdateTaskType},
    team::Team,
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
    middleware::load_task_type_middleware, routes::resolve_page,
};

#[derive(Debug, Deserialize)]
pub struct TaskTypeQuery {
    pub team_id: Option<i64>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TeamScope {
    pub team_id: Option<i64>,
}

pub async fn list_task_types(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<TaskTypeQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<TaskType>>>, ApiError> {
    let page = resolve_page(&deployment, query.page, query.page_size)?;
    let (types, total) = TaskType::list(&deployment.db().pool, query.team_id, page).await?;
    Ok(ResponseJson(ApiResponse::success(Paginated::new(
        types, total, page,
    ))))
}

pub async fn create_task_type(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Query(scope): Query<TeamScope>,
    Json(mut payload): Json<CreateTaskType>,
) -> Result<ResponseJson<ApiResponse<TaskType>>, ApiError> {
    current.require_admin()?;
    let team_id = scope
        .team_id
        .ok_or_else(|| ApiError::BadRequest("team_id is required".to_string()))?;
    let workflow = validate_type_definition(
        &payload.name,
        &payload.slug,
        &payload.workflow,
        &payload.fields,
    )?;
    payload.workflow = workflow.into_statuses();

    let tx = deployment.db().pool.begin().await?;
    if Team::find_by_id(&tx, team_id).await?.is_none() {
        return Err(ApiError::not_found("Team"));
    }
    if TaskType::slug_exists(&tx, team_id, &payload.slug).await? {
        return Err(ApiError::BadRequest(
            "Task type with this slug already exists in this team".to_string(),
        ));
    }
    let task_type = TaskType::create(&tx, team_id, &payload).await?;
    tx.commit().await?;

    tracing::info!(
        task_type_id = task_type.id,
        team_id,
        slug = %task_type.slug,
        "Created task type"
    );
    Ok(ResponseJson(ApiResponse::success(task_type)))
}

pub async fn get_task_type(
    Extension(task_type): Extension<TaskType>,
) -> Result<ResponseJson<ApiResponse<TaskType>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(task_type)))
}

pub async fn update_task_type(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(task_type): Extension<TaskType>,
    Json(payload): Json<UpdateTaskType>,
) -> Result<ResponseJson<ApiResponse<TaskType>>, ApiError> {
    current.require_admin()?;
    if let Some(name) = payload.name.as_deref() {
        require_non_blank("Name", name)?;
    }
    let updated =
        type_migration::update_task_type(&deployment.db().pool, task_type.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn update_workflow(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(task_type): Extension<TaskType>,
    Json(payload): Json<UpdateWorkflow>,
) -> Result<ResponseJson<ApiResponse<TaskType>>, ApiError> {
    current.require_admin()?;
    let updated = type_migration::update_task_type_workflow(
        &deployment.db().pool,
        task_type.id,
        &payload.workflow,
        &payload.status_mappings,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn get_stats(
    State(deployment): State<DeploymentImpl>,
    Extension(task_type): Extension<TaskType>,
) -> Result<ResponseJson<ApiResponse<TaskTypeStats>>, ApiError> {
    let stats = TaskType::stats(&deployment.db().pool, &task_type).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

/// Tasks follow the target type into its team.
pub async fn migrate_tasks(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(task_type): Extension<TaskType>,
    Json(payload): Json<MigrateType>,
) -> Result<ResponseJson<ApiResponse<MigrationResult>>, ApiError> {
    current.require_admin()?;
    let result =
        type_migration::migrate_task_type(&deployment.db().pool, task_type.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub async fn delete_task_type(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(task_type): Extension<TaskType>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    current.require_admin()?;
    type_migration::delete_task_type(&deployment.db().pool, task_type.id).await?;
    tracing::info!(task_type_id = task_type.id, "Deleted task type");
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        format!("Task type '{}' deleted", task_type.name),
    ))))
}

pub async fn add_field(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(task_type): Extension<TaskType>,
    Json(payload): Json<CreateTypeField>,
) -> Result<ResponseJson<ApiResponse<TypeField>>, ApiError> {
    current.require_admin()?;
    validate_new_field(&task_type.fields, &payload)?;
    let order = payload.effective_order(task_type.fields.len());
    let field = TaskType::add_field(&deployment.db().pool, task_type.id, &payload, order).await?;
    Ok(ResponseJson(ApiResponse::success(field)))
}

pub async fn update_field(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Path((task_type_id, field_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateTypeField>,
) -> Result<ResponseJson<ApiResponse<TypeField>>, ApiError> {
    current.require_admin()?;
    let pool = &deployment.db().pool;
    let field = TaskType::find_field(pool, task_type_id, field_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Field"))?;
    validate_field_update(&field, &payload)?;
    let updated = TaskType::update_field(pool, task_type_id, field_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_field(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Path((task_type_id, field_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    current.require_admin()?;
    let pruned =
        type_migration::delete_task_type_field(&deployment.db().pool, task_type_id, field_id)
            .await?;
    tracing::debug!(task_type_id, field_id, pruned, "Deleted task type field");
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        "Field deleted",
    ))))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let task_type_id_router = Router::new()
        .route(
            "/",
            get(get_task_type)
                .patch(update_task_type)
                .delete(delete_task_type),
        )
        .route("/workflow", patch(update_workflow))
        .route("/stats", get(get_stats))
        .route("/migrate", post(migrate_tasks))
        .route("/fields", post(add_field))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_task_type_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", get(list_task_types).post(create_task_type))
        .route(
            "/{task_type_id}/fields/{field_id}",
            patch(update_field).delete(delete_field),
        )
        .nest("/{task_type_id}", task_type_id_router);

    Router::new().nest("/task-types", inner)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::test_support::TestApp;

    async fn team(app: &TestApp, slug: &str) -> i64 {
        let team = app
            .ok(
                "POST",
                "/api/v1/teams",
                Some(json!({"name": slug, "slug": slug})),
            )
            .await;
        team["id"].as_i64().unwrap()
    }

    async fn task_type(app: &TestApp, team_id: i64, slug: &str, workflow: &[&str]) -> Value {
        app.ok(
            "POST",
            &format!("/api/v1/task-types?team_id={team_id}"),
            Some(json!({
                "name": slug,
                "slug": slug,
                "workflow": workflow,
                "fields": [{"key": "points", "label": "Points", "field_type": "number"}]
            })),
        )
        .await
    }

    #[tokio::test]
    async fn slug_is_unique_per_team_and_team_is_required() {
        let app = TestApp::new().await;
        let web = team(&app, "web").await;
        let api = team(&app, "api").await;
        task_type(&app, web, "bug", &["open", "closed"]).await;
        task_type(&app, api, "bug", &["open", "closed"]).await;

        let (status, _) = app
            .send(
                "POST",
                &format!("/api/v1/task-types?team_id={web}"),
                Some(&app.admin_token),
                Some(json!({"name": "Bug", "slug": "bug", "workflow": ["open"]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(
                "POST",
                "/api/v1/task-types",
                Some(&app.admin_token),
                Some(json!({"name": "Bug", "slug": "bug2", "workflow": ["open"]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(
                "POST",
                "/api/v1/task-types?team_id=999",
                Some(&app.admin_token),
                Some(json!({"name": "Bug", "slug": "bug3", "workflow": ["open"]})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let page = app
            .ok("GET", &format!("/api/v1/task-types?team_id={web}"), None)
            .await;
        assert_eq!(page["total"], 1);
        let page = app.ok("GET", "/api/v1/task-types", None).await;
        assert_eq!(page["total"], 2);
    }

    #[tokio::test]
    async fn migration_moves_tasks_into_target_team() {
        let app = TestApp::new().await;
        let web = team(&app, "web").await;
        let api = team(&app, "api").await;
        let source = task_type(&app, web, "story", &["todo", "done"]).await;
        let target = task_type(&app, api, "feature", &["queued", "shipped"]).await;

        let task = app
            .ok(
                "POST",
                "/api/v1/tasks",
                Some(json!({
                    "title": "Carry over",
                    "team_id": web,
                    "task_type_id": source["id"],
                    "custom_data": {"points": 3}
                })),
            )
            .await;

        let result = app
            .ok(
                "POST",
                &format!("/api/v1/task-types/{}/migrate", source["id"]),
                Some(json!({"target_type_id": target["id"]})),
            )
            .await;
        assert_eq!(result["migrated"], 1);
        assert_eq!(result["source_deleted"], false);

        let moved = app
            .ok("GET", &format!("/api/v1/tasks/{}", task["id"]), None)
            .await;
        assert_eq!(moved["team_id"], api);
        assert_eq!(moved["task_type_id"], target["id"]);
        assert_eq!(moved["status"], "queued");
        assert_eq!(moved["custom_data"], json!({"points": 3}));

        let stats = app
            .ok(
                "GET",
                &format!("/api/v1/task-types/{}/stats", source["id"]),
                None,
            )
            .await;
        assert_eq!(stats["total"], 0);

        app.ok(
            "DELETE",
            &format!("/api/v1/task-types/{}", source["id"]),
            None,
        )
        .await;
    }

    #[tokio::test]
    async fn patch_workflow_without_mappings_rejects_populated_removal() {
        let app = TestApp::new().await;
        let web = team(&app, "web").await;
        let story = task_type(&app, web, "story", &["todo", "doing", "done"]).await;
        app.ok(
            "POST",
            "/api/v1/tasks",
            Some(json!({"title": "T", "team_id": web, "task_type_id": story["id"]})),
        )
        .await;

        let (status, _) = app
            .send(
                "PATCH",
                &format!("/api/v1/task-types/{}", story["id"]),
                Some(&app.admin_token),
                Some(json!({"workflow": ["doing", "done"]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let updated = app
            .ok(
                "PATCH",
                &format!("/api/v1/task-types/{}", story["id"]),
                Some(json!({"workflow": ["todo", "done"], "color": null})),
            )
            .await;
        assert_eq!(updated["workflow"], json!(["todo", "done"]));
        assert!(updated["color"].is_null());
    }
}
