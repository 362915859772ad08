use std::future::Future;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use db::{
    DBService, DbErr,
    models::{
        project::Project, project_type::ProjectType, release::Release, task::Task,
        task_type::TaskType, team::Team, theme::Theme, user::User,
    },
};
use deployment::Deployment;

use crate::error::ApiError;

pub trait ModelLoaderDeps {
    fn db_service(&self) -> &DBService;
}

impl<D> ModelLoaderDeps for D
where
    D: Deployment,
{
    fn db_service(&self) -> &DBService {
        self.db()
    }
}

/// Resolves a lookup to the record or a 404 envelope.
pub async fn require_model<M, Fut>(
    model_name: &'static str,
    model_id: i64,
    load_future: Fut,
) -> Result<M, ApiError>
where
    Fut: Future<Output = Result<Option<M>, DbErr>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::debug!(model_id, "{model_name} not found");
            Err(ApiError::not_found(model_name))
        }
        Err(error) => {
            tracing::error!(model_id, "Failed to fetch {model_name}: {error}");
            Err(ApiError::Database(error))
        }
    }
}

async fn load_request_extension<M, Fut>(
    request: Request,
    next: Next,
    model_name: &'static str,
    model_id: i64,
    load_future: Fut,
) -> Result<Response, ApiError>
where
    M: Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<M>, DbErr>>,
{
    let model = require_model(model_name, model_id, load_future).await?;
    let mut request = request;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

macro_rules! model_loader {
    ($fn_name:ident, $model:ty, $label:literal) => {
        pub async fn $fn_name<S>(
            State(deployment): State<S>,
            Path(id): Path<i64>,
            request: Request,
            next: Next,
        ) -> Result<Response, ApiError>
        where
            S: ModelLoaderDeps,
        {
            load_request_extension(
                request,
                next,
                $label,
                id,
                <$model>::find_by_id(&deployment.db_service().pool, id),
            )
            .await
        }
    };
}

model_loader!(load_user_middleware, User, "User");
model_loader!(load_team_middleware, Team, "Team");
model_loader!(load_theme_middleware, Theme, "Theme");
model_loader!(load_project_type_middleware, ProjectType, "Project type");
model_loader!(load_task_type_middleware, TaskType, "Task type");
model_loader!(load_project_middleware, Project, "Project");
model_loader!(load_task_middleware, Task, "Task");
model_loader!(load_release_middleware, Release, "Release");
