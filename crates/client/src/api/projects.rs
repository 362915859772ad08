use db::models::project::{
    AddDependency, CreateProject, Project, ProjectBrief, ProjectWithRelations, UpdateProject,
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
pub struct ProjectListFilter {
    pub theme_id: Option<i64>,
    pub project_type_id: Option<i64>,
    pub status: Option<String>,
}

impl ProjectListFilter {
    fn params(&self, page: PageParams) -> QueryParams {
        QueryParams::new()
            .with_opt("theme_id", self.theme_id)
            .with_opt("project_type_id", self.project_type_id)
            .with_opt("status", self.status.as_deref())
            .with_page(page)
    }
}

impl ApiClient {
    pub async fn list_projects(
        &self,
        filter: &ProjectListFilter,
        page: PageParams,
    ) -> Result<Paginated<Project>, ClientError> {
        self.get(Resource::Projects, "/projects", filter.params(page))
            .await
    }

    pub async fn get_project(&self, project_id: i64) -> Result<ProjectWithRelations, ClientError> {
        self.get(
            Resource::Projects,
            &format!("/projects/{project_id}"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn create_project(&self, payload: &CreateProject) -> Result<Project, ClientError> {
        self.mutate(Method::POST, "/projects", Some(payload), Mutation::Project)
            .await
    }

    pub async fn update_project(
        &self,
        project_id: i64,
        payload: &UpdateProject,
    ) -> Result<Project, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/projects/{project_id}"),
            Some(payload),
            Mutation::Project,
        )
        .await
    }

    pub async fn delete_project(&self, project_id: i64) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/projects/{project_id}"),
            None::<&()>,
            Mutation::Project,
        )
        .await
    }

    pub async fn list_project_dependencies(
        &self,
        project_id: i64,
    ) -> Result<Vec<ProjectBrief>, ClientError> {
        self.get(
            Resource::Projects,
            &format!("/projects/{project_id}/dependencies"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn add_project_dependency(
        &self,
        project_id: i64,
        depends_on_id: i64,
    ) -> Result<Vec<ProjectBrief>, ClientError> {
        self.mutate(
            Method::POST,
            &format!("/projects/{project_id}/dependencies"),
            Some(&AddDependency { depends_on_id }),
            Mutation::Project,
        )
        .await
    }

    pub async fn remove_project_dependency(
        &self,
        project_id: i64,
        depends_on_id: i64,
    ) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/projects/{project_id}/dependencies/{depends_on_id}"),
            None::<&()>,
            Mutation::Project,
        )
        .await
    }
}
