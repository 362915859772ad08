use db::models::{
    project::AddDependency,
    task::{CreateTask, Task, TaskBrief, TaskWithRelations, UpdateTask},
};
use reqwest::Method;
use utils::{
    pagination::{PageParams, Paginated},
    response::MessageResponse,
};

use super::ApiClient;
use crate::{
    cache::{Mutation, QueryParams, Resource},
    error::ClientError,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListFilter {
    pub team_id: Option<i64>,
    pub project_id: Option<i64>,
    pub release_id: Option<i64>,
    pub task_type_id: Option<i64>,
    pub status: Option<String>,
}

impl TaskListFilter {
    fn params(&self, page: PageParams) -> QueryParams {
        QueryParams::new()
            .with_opt("team_id", self.team_id)
            .with_opt("project_id", self.project_id)
            .with_opt("release_id", self.release_id)
            .with_opt("task_type_id", self.task_type_id)
            .with_opt("status", self.status.as_deref())
            .with_page(page)
    }
}

impl ApiClient {
    pub async fn list_tasks(
        &self,
        filter: &TaskListFilter,
        page: PageParams,
    ) -> Result<Paginated<Task>, ClientError> {
        self.get(Resource::Tasks, "/tasks", filter.params(page)).await
    }

    pub async fn get_task(&self, task_id: i64) -> Result<TaskWithRelations, ClientError> {
        self.get(
            Resource::Tasks,
            &format!("/tasks/{task_id}"),
            QueryParams::new(),
        )
        .await
    }

    /// Looks a task up by its `PREFIX-N` id; matching is case-insensitive.
    pub async fn get_task_by_display_id(
        &self,
        display_id: &str,
    ) -> Result<TaskWithRelations, ClientError> {
        self.get(
            Resource::Tasks,
            &format!("/tasks/by-display-id/{display_id}"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn create_task(&self, payload: &CreateTask) -> Result<Task, ClientError> {
        self.mutate(Method::POST, "/tasks", Some(payload), Mutation::Task)
            .await
    }

    pub async fn update_task(&self, task_id: i64, payload: &UpdateTask) -> Result<Task, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/tasks/{task_id}"),
            Some(payload),
            Mutation::Task,
        )
        .await
    }

    /// Sends a patch that carries only the new status.
    pub async fn set_task_status(&self, task_id: i64, status: &str) -> Result<Task, ClientError> {
        let payload = UpdateTask {
            status: Some(status.to_string()),
            ..Default::default()
        };
        self.update_task(task_id, &payload).await
    }

    pub async fn delete_task(&self, task_id: i64) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/tasks/{task_id}"),
            None::<&()>,
            Mutation::Task,
        )
        .await
    }

    pub async fn list_task_dependencies(&self, task_id: i64) -> Result<Vec<TaskBrief>, ClientError> {
        self.get(
            Resource::Tasks,
            &format!("/tasks/{task_id}/dependencies"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn add_task_dependency(
        &self,
        task_id: i64,
        depends_on_id: i64,
    ) -> Result<Vec<TaskBrief>, ClientError> {
        self.mutate(
            Method::POST,
            &format!("/tasks/{task_id}/dependencies"),
            Some(&AddDependency { depends_on_id }),
            Mutation::Task,
        )
        .await
    }

    pub async fn remove_task_dependency(
        &self,
        task_id: i64,
        depends_on_id: i64,
    ) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/tasks/{task_id}/dependencies/{depends_on_id}"),
            None::<&()>,
            Mutation::Task,
        )
        .await
    }
}
