use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::{
    DbPool,
    models::{
        github_link::GitHubLink,
        project::{AddDependency, Project},
        release::Release,
        task::{CreateTask, Task, TaskBrief, TaskChanges, TaskFilter, TaskWithRelations, UpdateTask},
        task_type::TaskType,
        team::Team,
    },
};
use deployment::Deployment;
use serde::Deserialize;
use serde_json::Value;
use services::services::{
    custom_fields::{as_custom_data, validate_custom_data},
    validation::require_non_blank,
    workflow::Workflow,
};
use utils::{
    pagination::Paginated,
    response::{ApiResponse, MessageResponse},
};

use crate::{
    DeploymentImpl, error::ApiError, middleware::load_task_middleware, routes::resolve_page,
};

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub team_id: Option<i64>,
    pub project_id: Option<i64>,
    pub release_id: Option<i64>,
    pub task_type_id: Option<i64>,
    pub status: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

fn bad_request(message: &str) -> ApiError {
    ApiError::BadRequest(message.to_string())
}

/// Loads the task type and checks that it is owned by `team_id`.
async fn task_type_for_team(
    pool: &DbPool,
    team_id: i64,
    task_type_id: i64,
) -> Result<TaskType, ApiError> {
    if Team::find_by_id(pool, team_id).await?.is_none() {
        return Err(bad_request("Team not found"));
    }
    let task_type = TaskType::find_by_id(pool, task_type_id)
        .await?
        .ok_or_else(|| bad_request("Task type not found"))?;
    if task_type.team_id != team_id {
        return Err(bad_request("Task type does not belong to this team"));
    }
    Ok(task_type)
}

async fn ensure_links_exist(
    pool: &DbPool,
    project_id: Option<i64>,
    release_id: Option<i64>,
) -> Result<(), ApiError> {
    if let Some(project_id) = project_id
        && !Project::exists(pool, project_id).await?
    {
        return Err(bad_request("Project not found"));
    }
    if let Some(release_id) = release_id
        && !Release::exists(pool, release_id).await?
    {
        return Err(bad_request("Release not found"));
    }
    Ok(())
}

async fn with_relations(pool: &DbPool, task: Task) -> Result<TaskWithRelations, ApiError> {
    let dependencies = Task::dependencies(pool, task.id).await?;
    let dependents = Task::dependents(pool, task.id).await?;
    let github_links = GitHubLink::find_by_task(pool, task.id).await?;
    Ok(TaskWithRelations {
        task,
        dependencies,
        dependents,
        github_links,
    })
}

pub async fn list_tasks(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<TaskQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<Task>>>, ApiError> {
    let page = resolve_page(&deployment, query.page, query.page_size)?;
    let filter = TaskFilter {
        team_id: query.team_id,
        project_id: query.project_id,
        release_id: query.release_id,
        task_type_id: query.task_type_id,
        status: query.status,
    };
    let (tasks, total) = Task::list(&deployment.db().pool, &filter, page).await?;
    Ok(ResponseJson(ApiResponse::success(Paginated::new(
        tasks, total, page,
    ))))
}

pub async fn create_task(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    require_non_blank("Title", &payload.title)?;
    let pool = &deployment.db().pool;

    let task_type = task_type_for_team(pool, payload.team_id, payload.task_type_id).await?;
    ensure_links_exist(pool, payload.project_id, payload.release_id).await?;
    let custom_data = validate_custom_data(&task_type.fields, &payload.custom_data)?;
    let workflow = Workflow::from_stored(&task_type.workflow);

    let task = Task::create(
        pool,
        &deployment.settings().task_id_prefix,
        &payload,
        workflow.initial_status(),
        Value::Object(custom_data),
    )
    .await?;
    tracing::info!(task_id = task.id, display_id = %task.display_id, "Created task");
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_task(
    State(deployment): State<DeploymentImpl>,
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<TaskWithRelations>>, ApiError> {
    let task = with_relations(&deployment.db().pool, task).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_task_by_display_id(
    State(deployment): State<DeploymentImpl>,
    Path(display_id): Path<String>,
) -> Result<ResponseJson<ApiResponse<TaskWithRelations>>, ApiError> {
    let pool = &deployment.db().pool;
    let task = Task::find_by_display_id(pool, &display_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task {display_id} not found")))?;
    let task = with_relations(pool, task).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

/// Validates the patch against the task's effective team and type.
///
/// A type change without an explicit status keeps the current status when the
/// new workflow has it and otherwise falls back to the workflow's first entry.
pub async fn update_task(
    State(deployment): State<DeploymentImpl>,
    Extension(task): Extension<Task>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let pool = &deployment.db().pool;
    if let Some(title) = payload.title.as_deref() {
        require_non_blank("Title", title)?;
    }

    let team_id = payload.team_id.unwrap_or(task.team_id);
    let task_type_id = payload.task_type_id.unwrap_or(task.task_type_id);
    let type_changed = task_type_id != task.task_type_id;
    let task_type = if team_id != task.team_id || type_changed {
        task_type_for_team(pool, team_id, task_type_id).await?
    } else {
        TaskType::find_by_id(pool, task_type_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Task type"))?
    };
    ensure_links_exist(
        pool,
        payload.project_id.flatten(),
        payload.release_id.flatten(),
    )
    .await?;

    let workflow = Workflow::from_stored(&task_type.workflow);
    let status = match payload.status {
        Some(status) => {
            workflow.ensure_contains(&status)?;
            Some(status)
        }
        None if type_changed => Some(workflow.coerce_status(&task.status)),
        None => None,
    };

    let custom_data = match payload.custom_data.as_ref() {
        Some(data) => Some(validate_custom_data(&task_type.fields, data)?),
        None if type_changed => Some(validate_custom_data(
            &task_type.fields,
            &as_custom_data(&task.custom_data),
        )?),
        None => None,
    };

    let changes = TaskChanges {
        title: payload.title,
        description: payload.description,
        team_id: payload.team_id,
        task_type_id: payload.task_type_id,
        project_id: payload.project_id,
        release_id: payload.release_id,
        status,
        estimation: payload.estimation,
        custom_data: custom_data.map(Value::Object),
    };
    let updated = Task::update(pool, task.id, changes).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_task(
    State(deployment): State<DeploymentImpl>,
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    Task::delete(&deployment.db().pool, task.id).await?;
    tracing::info!(task_id = task.id, display_id = %task.display_id, "Deleted task");
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        format!("Task {} deleted", task.display_id),
    ))))
}

pub async fn list_dependencies(
    State(deployment): State<DeploymentImpl>,
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskBrief>>>, ApiError> {
    let dependencies = Task::dependencies(&deployment.db().pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(dependencies)))
}

pub async fn add_dependency(
    State(deployment): State<DeploymentImpl>,
    Extension(task): Extension<Task>,
    Json(payload): Json<AddDependency>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskBrief>>>, ApiError> {
    let pool = &deployment.db().pool;
    Task::add_dependency(pool, task.id, payload.depends_on_id).await?;
    let dependencies = Task::dependencies(pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(dependencies)))
}

pub async fn remove_dependency(
    State(deployment): State<DeploymentImpl>,
    Path((task_id, depends_on_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    let removed = Task::remove_dependency(&deployment.db().pool, task_id, depends_on_id).await?;
    if removed == 0 {
        return Err(ApiError::not_found("Dependency"));
    }
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        "Dependency removed",
    ))))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let task_id_router = Router::new()
        .route("/", get(get_task).patch(update_task).delete(delete_task))
        .route(
            "/dependencies",
            get(list_dependencies).post(add_dependency),
        )
        .layer(from_fn_with_state(
            deployment.clone(),
            load_task_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/by-display-id/{display_id}", get(get_task_by_display_id))
        .route(
            "/{task_id}/dependencies/{depends_on_id}",
            delete(remove_dependency),
        )
        .nest("/{task_id}", task_id_router);

    Router::new().nest("/tasks", inner)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::test_support::TestApp;

    struct Fixture {
        team: i64,
        story: Value,
        bug: Value,
        other_team_type: Value,
    }

    async fn fixture(app: &TestApp) -> Fixture {
        let team = app
            .ok(
                "POST",
                "/api/v1/teams",
                Some(json!({"name": "Core", "slug": "core"})),
            )
            .await;
        let other = app
            .ok(
                "POST",
                "/api/v1/teams",
                Some(json!({"name": "Ops", "slug": "ops"})),
            )
            .await;
        let team = team["id"].as_i64().unwrap();
        let story = app
            .ok(
                "POST",
                &format!("/api/v1/task-types?team_id={team}"),
                Some(json!({
                    "name": "Story",
                    "slug": "story",
                    "workflow": ["todo", "review", "done"],
                    "fields": [{"key": "points", "label": "Points", "field_type": "number"}]
                })),
            )
            .await;
        let bug = app
            .ok(
                "POST",
                &format!("/api/v1/task-types?team_id={team}"),
                Some(json!({
                    "name": "Bug",
                    "slug": "bug",
                    "workflow": ["triage", "done"],
                    "fields": [{"key": "severity", "label": "Severity", "field_type": "select",
                                "options": ["low", "high"]}]
                })),
            )
            .await;
        let other_team_type = app
            .ok(
                "POST",
                &format!("/api/v1/task-types?team_id={}", other["id"]),
                Some(json!({"name": "Chore", "slug": "chore", "workflow": ["open"]})),
            )
            .await;
        Fixture {
            team,
            story,
            bug,
            other_team_type,
        }
    }

    async fn create_task(app: &TestApp, team: i64, task_type: &Value, title: &str) -> Value {
        app.ok(
            "POST",
            "/api/v1/tasks",
            Some(json!({
                "title": title,
                "team_id": team,
                "task_type_id": task_type["id"],
                "custom_data": {"points": 2}
            })),
        )
        .await
    }

    #[tokio::test]
    async fn create_assigns_display_id_and_initial_status() {
        let app = TestApp::new().await;
        let fx = fixture(&app).await;
        let first = create_task(&app, fx.team, &fx.story, "First").await;
        let second = create_task(&app, fx.team, &fx.story, "Second").await;
        assert_eq!(first["display_id"], "CORE-1");
        assert_eq!(second["display_id"], "CORE-2");
        assert_eq!(first["status"], "todo");
        assert_eq!(first["custom_data"], json!({"points": 2}));

        let found = app
            .ok("GET", "/api/v1/tasks/by-display-id/core-2", None)
            .await;
        assert_eq!(found["id"], second["id"]);
        assert_eq!(found["github_links"], json!([]));

        let (status, _) = app
            .send(
                "GET",
                "/api/v1/tasks/by-display-id/CORE-99",
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_rejects_mismatched_team_and_missing_links() {
        let app = TestApp::new().await;
        let fx = fixture(&app).await;
        let cases = [
            json!({"title": "X", "team_id": fx.team, "task_type_id": fx.other_team_type["id"]}),
            json!({"title": "X", "team_id": 999, "task_type_id": fx.story["id"]}),
            json!({"title": "X", "team_id": fx.team, "task_type_id": fx.story["id"],
                   "project_id": 999}),
            json!({"title": "X", "team_id": fx.team, "task_type_id": fx.story["id"],
                   "release_id": 999}),
            json!({"title": "X", "team_id": fx.team, "task_type_id": fx.story["id"],
                   "custom_data": {"points": "many"}}),
        ];
        for body in cases {
            let (status, _) = app
                .send("POST", "/api/v1/tasks", Some(&app.admin_token), Some(body))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn type_change_coerces_status_and_revalidates_data() {
        let app = TestApp::new().await;
        let fx = fixture(&app).await;
        let task = create_task(&app, fx.team, &fx.story, "Switch").await;
        let uri = format!("/api/v1/tasks/{}", task["id"]);

        app.ok("PATCH", &uri, Some(json!({"status": "done"}))).await;

        let retyped = app
            .ok("PATCH", &uri, Some(json!({"task_type_id": fx.bug["id"]})))
            .await;
        assert_eq!(retyped["status"], "done");
        assert_eq!(retyped["custom_data"], json!({}));

        let back = app
            .ok(
                "PATCH",
                &uri,
                Some(json!({"task_type_id": fx.story["id"], "status": "review"})),
            )
            .await;
        assert_eq!(back["status"], "review");

        let retyped = app
            .ok("PATCH", &uri, Some(json!({"task_type_id": fx.bug["id"]})))
            .await;
        assert_eq!(retyped["status"], "triage");

        let (status, _) = app
            .send(
                "PATCH",
                &uri,
                Some(&app.admin_token),
                Some(json!({"status": "review"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(
                "PATCH",
                &uri,
                Some(&app.admin_token),
                Some(json!({"task_type_id": fx.other_team_type["id"]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn patch_clears_nullable_fields_and_tracks_project() {
        let app = TestApp::new().await;
        let fx = fixture(&app).await;
        let project_type = app
            .ok(
                "POST",
                "/api/v1/project-types",
                Some(json!({"name": "Epic", "slug": "epic", "workflow": ["open"]})),
            )
            .await;
        let project = app
            .ok(
                "POST",
                "/api/v1/projects",
                Some(json!({"title": "Parent", "project_type_id": project_type["id"]})),
            )
            .await;
        let task = create_task(&app, fx.team, &fx.story, "Child").await;
        let uri = format!("/api/v1/tasks/{}", task["id"]);

        let linked = app
            .ok(
                "PATCH",
                &uri,
                Some(json!({"project_id": project["id"], "estimation": 5.5})),
            )
            .await;
        assert_eq!(linked["project_id"], project["id"]);
        let detail = app
            .ok("GET", &format!("/api/v1/projects/{}", project["id"]), None)
            .await;
        assert_eq!(detail["tasks"][0]["id"], task["id"]);

        let cleared = app
            .ok(
                "PATCH",
                &uri,
                Some(json!({"project_id": null, "estimation": null})),
            )
            .await;
        assert!(cleared["project_id"].is_null());
        assert!(cleared["estimation"].is_null());
        assert_eq!(cleared["title"], "Child");
    }

    #[tokio::test]
    async fn dependencies_are_listed_both_ways() {
        let app = TestApp::new().await;
        let fx = fixture(&app).await;
        let a = create_task(&app, fx.team, &fx.story, "A").await;
        let b = create_task(&app, fx.team, &fx.story, "B").await;

        let deps = app
            .ok(
                "POST",
                &format!("/api/v1/tasks/{}/dependencies", a["id"]),
                Some(json!({"depends_on_id": b["id"]})),
            )
            .await;
        assert_eq!(deps[0]["display_id"], b["display_id"]);

        let (status, _) = app
            .send(
                "POST",
                &format!("/api/v1/tasks/{}/dependencies", b["id"]),
                Some(&app.admin_token),
                Some(json!({"depends_on_id": a["id"]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let detail = app
            .ok("GET", &format!("/api/v1/tasks/{}", b["id"]), None)
            .await;
        assert_eq!(detail["dependents"][0]["id"], a["id"]);

        app.ok(
            "DELETE",
            &format!("/api/v1/tasks/{}/dependencies/{}", a["id"], b["id"]),
            None,
        )
        .await;
        app.ok("DELETE", &format!("/api/v1/tasks/{}", a["id"]), None)
            .await;
        let (status, _) = app
            .send(
                "GET",
                &format!("/api/v1/tasks/{}", a["id"]),
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
