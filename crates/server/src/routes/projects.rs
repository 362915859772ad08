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
        project::{
            AddDependency, CreateProject, Project, ProjectBrief, ProjectChanges, ProjectFilter,
            ProjectWithRelations, UpdateProject,
        },
        project_type::ProjectType,
        task::Task,
        theme::Theme,
    },
};
use deployment::Deployment;
use serde::Deserialize;
use serde_json::Value;
use services::services::{
    custom_fields::validate_custom_data, validation::require_non_blank, workflow::Workflow,
};
use utils::{
    pagination::Paginated,
    response::{ApiResponse, MessageResponse},
};

use crate::{
    DeploymentImpl, error::ApiError, middleware::load_project_middleware, routes::resolve_page,
};

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub theme_id: Option<i64>,
    pub project_type_id: Option<i64>,
    pub status: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

async fn ensure_theme_exists(pool: &DbPool, theme_id: i64) -> Result<(), ApiError> {
    if Theme::exists(pool, theme_id).await? {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Theme not found".to_string()))
    }
}

pub async fn list_projects(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ProjectQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<Project>>>, ApiError> {
    let page = resolve_page(&deployment, query.page, query.page_size)?;
    let filter = ProjectFilter {
        theme_id: query.theme_id,
        project_type_id: query.project_type_id,
        status: query.status,
    };
    let (projects, total) = Project::list(&deployment.db().pool, &filter, page).await?;
    Ok(ResponseJson(ApiResponse::success(Paginated::new(
        projects, total, page,
    ))))
}

pub async fn create_project(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    require_non_blank("Title", &payload.title)?;
    let pool = &deployment.db().pool;

    let project_type = ProjectType::find_by_id(pool, payload.project_type_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Project type not found".to_string()))?;
    if let Some(theme_id) = payload.theme_id {
        ensure_theme_exists(pool, theme_id).await?;
    }
    let custom_data = validate_custom_data(&project_type.fields, &payload.custom_data)?;
    let workflow = Workflow::from_stored(&project_type.workflow);

    let project = Project::create(
        pool,
        &payload,
        workflow.initial_status(),
        Value::Object(custom_data),
    )
    .await?;
    tracing::info!(
        project_id = project.id,
        project_type_id = project_type.id,
        "Created project"
    );
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn get_project(
    State(deployment): State<DeploymentImpl>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<ProjectWithRelations>>, ApiError> {
    let pool = &deployment.db().pool;
    let theme = match project.theme_id {
        Some(theme_id) => Theme::find_by_id(pool, theme_id)
            .await?
            .map(|theme| theme.brief()),
        None => None,
    };
    let project_type = ProjectType::find_by_id(pool, project.project_type_id).await?;
    let dependencies = Project::dependencies(pool, project.id).await?;
    let dependents = Project::dependents(pool, project.id).await?;
    let tasks = Task::find_briefs_by_project(pool, project.id).await?;

    Ok(ResponseJson(ApiResponse::success(ProjectWithRelations {
        project,
        theme,
        project_type,
        dependencies,
        dependents,
        tasks,
    })))
}

pub async fn update_project(
    State(deployment): State<DeploymentImpl>,
    Extension(project): Extension<Project>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let pool = &deployment.db().pool;
    if let Some(title) = payload.title.as_deref() {
        require_non_blank("Title", title)?;
    }
    if let Some(Some(theme_id)) = payload.theme_id {
        ensure_theme_exists(pool, theme_id).await?;
    }

    let project_type = ProjectType::find_by_id(pool, project.project_type_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project type"))?;
    if let Some(status) = payload.status.as_deref() {
        Workflow::from_stored(&project_type.workflow).ensure_contains(status)?;
    }
    let custom_data = match payload.custom_data.as_ref() {
        Some(data) => Some(Value::Object(validate_custom_data(
            &project_type.fields,
            data,
        )?)),
        None => None,
    };

    let changes = ProjectChanges {
        title: payload.title,
        description: payload.description,
        theme_id: payload.theme_id,
        status: payload.status,
        custom_data,
    };
    let updated = Project::update(pool, project.id, changes).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_project(
    State(deployment): State<DeploymentImpl>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    Project::delete(&deployment.db().pool, project.id).await?;
    tracing::info!(project_id = project.id, "Deleted project");
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        format!("Project '{}' deleted", project.title),
    ))))
}

pub async fn list_dependencies(
    State(deployment): State<DeploymentImpl>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectBrief>>>, ApiError> {
    let dependencies = Project::dependencies(&deployment.db().pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(dependencies)))
}

pub async fn add_dependency(
    State(deployment): State<DeploymentImpl>,
    Extension(project): Extension<Project>,
    Json(payload): Json<AddDependency>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectBrief>>>, ApiError> {
    let pool = &deployment.db().pool;
    Project::add_dependency(pool, project.id, payload.depends_on_id).await?;
    let dependencies = Project::dependencies(pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(dependencies)))
}

pub async fn remove_dependency(
    State(deployment): State<DeploymentImpl>,
    Path((project_id, depends_on_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    let removed =
        Project::remove_dependency(&deployment.db().pool, project_id, depends_on_id).await?;
    if removed == 0 {
        return Err(ApiError::not_found("Dependency"));
    }
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        "Dependency removed",
    ))))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let project_id_router = Router::new()
        .route(
            "/",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route(
            "/dependencies",
            get(list_dependencies).post(add_dependency),
        )
        .layer(from_fn_with_state(
            deployment.clone(),
            load_project_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/{project_id}/dependencies/{depends_on_id}",
            delete(remove_dependency),
        )
        .nest("/{project_id}", project_id_router);

    Router::new().nest("/projects", inner)
}
