use db::models::{
    project_type::{CreateProjectType, ProjectType, ProjectTypeStats, UpdateProjectType},
    task_type::{CreateTaskType, TaskType, TaskTypeStats, UpdateTaskType},
    type_field::{
        CreateTypeField, MigrateType, MigrationResult, TypeField, UpdateTypeField, UpdateWorkflow,
    },
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

impl ApiClient {
    pub async fn list_project_types(
        &self,
        page: PageParams,
    ) -> Result<Paginated<ProjectType>, ClientError> {
        self.get(
            Resource::ProjectTypes,
            "/project-types",
            QueryParams::new().with_page(page),
        )
        .await
    }

    pub async fn get_project_type(&self, id: i64) -> Result<ProjectType, ClientError> {
        self.get(
            Resource::ProjectTypes,
            &format!("/project-types/{id}"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn project_type_stats(&self, id: i64) -> Result<ProjectTypeStats, ClientError> {
        self.get(
            Resource::ProjectTypes,
            &format!("/project-types/{id}/stats"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn create_project_type(
        &self,
        payload: &CreateProjectType,
    ) -> Result<ProjectType, ClientError> {
        self.mutate(
            Method::POST,
            "/project-types",
            Some(payload),
            Mutation::ProjectType,
        )
        .await
    }

    pub async fn update_project_type(
        &self,
        id: i64,
        payload: &UpdateProjectType,
    ) -> Result<ProjectType, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/project-types/{id}"),
            Some(payload),
            Mutation::ProjectType,
        )
        .await
    }

    pub async fn update_project_type_workflow(
        &self,
        id: i64,
        payload: &UpdateWorkflow,
    ) -> Result<ProjectType, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/project-types/{id}/workflow"),
            Some(payload),
            Mutation::ProjectType,
        )
        .await
    }

    pub async fn migrate_project_type(
        &self,
        id: i64,
        payload: &MigrateType,
    ) -> Result<MigrationResult, ClientError> {
        self.mutate(
            Method::POST,
            &format!("/project-types/{id}/migrate"),
            Some(payload),
            Mutation::ProjectType,
        )
        .await
    }

    pub async fn delete_project_type(&self, id: i64) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/project-types/{id}"),
            None::<&()>,
            Mutation::ProjectType,
        )
        .await
    }

    pub async fn add_project_type_field(
        &self,
        id: i64,
        payload: &CreateTypeField,
    ) -> Result<TypeField, ClientError> {
        self.mutate(
            Method::POST,
            &format!("/project-types/{id}/fields"),
            Some(payload),
            Mutation::ProjectType,
        )
        .await
    }

    pub async fn update_project_type_field(
        &self,
        id: i64,
        field_id: i64,
        payload: &UpdateTypeField,
    ) -> Result<TypeField, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/project-types/{id}/fields/{field_id}"),
            Some(payload),
            Mutation::ProjectType,
        )
        .await
    }

    pub async fn delete_project_type_field(
        &self,
        id: i64,
        field_id: i64,
    ) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/project-types/{id}/fields/{field_id}"),
            None::<&()>,
            Mutation::ProjectType,
        )
        .await
    }

    pub async fn list_task_types(
        &self,
        team_id: Option<i64>,
        page: PageParams,
    ) -> Result<Paginated<TaskType>, ClientError> {
        let params = QueryParams::new()
            .with_opt("team_id", team_id)
            .with_page(page);
        self.get(Resource::TaskTypes, "/task-types", params).await
    }

    pub async fn get_task_type(&self, id: i64) -> Result<TaskType, ClientError> {
        self.get(
            Resource::TaskTypes,
            &format!("/task-types/{id}"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn task_type_stats(&self, id: i64) -> Result<TaskTypeStats, ClientError> {
        self.get(
            Resource::TaskTypes,
            &format!("/task-types/{id}/stats"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn create_task_type(
        &self,
        team_id: i64,
        payload: &CreateTaskType,
    ) -> Result<TaskType, ClientError> {
        self.mutate_with_query(
            Method::POST,
            "/task-types",
            QueryParams::new().with("team_id", team_id),
            Some(payload),
            Mutation::TaskType,
        )
        .await
    }

    pub async fn update_task_type(
        &self,
        id: i64,
        payload: &UpdateTaskType,
    ) -> Result<TaskType, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/task-types/{id}"),
            Some(payload),
            Mutation::TaskType,
        )
        .await
    }

    pub async fn update_task_type_workflow(
        &self,
        id: i64,
        payload: &UpdateWorkflow,
    ) -> Result<TaskType, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/task-types/{id}/workflow"),
            Some(payload),
            Mutation::TaskType,
        )
        .await
    }

    pub async fn migrate_task_type(
        &self,
        id: i64,
        payload: &MigrateType,
    ) -> Result<MigrationResult, ClientError> {
        self.mutate(
            Method::POST,
            &format!("/task-types/{id}/migrate"),
            Some(payload),
            Mutation::TaskType,
        )
        .await
    }

    pub async fn delete_task_type(&self, id: i64) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/task-types/{id}"),
            None::<&()>,
            Mutation::TaskType,
        )
        .await
    }

    pub async fn add_task_type_field(
        &self,
        id: i64,
        payload: &CreateTypeField,
    ) -> Result<TypeField, ClientError> {
        self.mutate(
            Method::POST,
            &format!("/task-types/{id}/fields"),
            Some(payload),
            Mutation::TaskType,
        )
        .await
    }

    pub async fn update_task_type_field(
        &self,
        id: i64,
        field_id: i64,
        payload: &UpdateTypeField,
    ) -> Result<TypeField, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/task-types/{id}/fields/{field_id}"),
            Some(payload),
            Mutation::TaskType,
        )
        .await
    }

    pub async fn delete_task_type_field(
        &self,
        id: i64,
        field_id: i64,
    ) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/task-types/{id}/fields/{field_id}"),
            None::<&()>,
            Mutation::TaskType,
        )
        .await
    }
}
