use db::models::github_link::{CreateGitHubLink, GitHubLink};
use reqwest::Method;
use utils::response::MessageResponse;

use super::ApiClient;
use crate::{
    cache::{Mutation, QueryParams, Resource},
    error::ClientError,
};

impl ApiClient {
    pub async fn list_github_links(&self, task_id: i64) -> Result<Vec<GitHubLink>, ClientError> {
        self.get(
            Resource::GitHubLinks,
            &format!("/github/links/{task_id}"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn create_github_link(
        &self,
        task_id: i64,
        payload: &CreateGitHubLink,
    ) -> Result<GitHubLink, ClientError> {
        self.mutate(
            Method::POST,
            &format!("/github/links/{task_id}"),
            Some(payload),
            Mutation::GitHubLink,
        )
        .await
    }

    pub async fn delete_github_link(
        &self,
        task_id: i64,
        link_id: i64,
    ) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/github/links/{task_id}/{link_id}"),
            None::<&()>,
            Mutation::GitHubLink,
        )
        .await
    }
}
