use db::{
    models::release::{CreateRelease, Release, ReleaseWithTasks, UpdateRelease},
    types::ReleaseStatus,
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
    pub async fn list_releases(
        &self,
        status: Option<ReleaseStatus>,
        page: PageParams,
    ) -> Result<Paginated<Release>, ClientError> {
        let params = QueryParams::new().with_opt("status", status).with_page(page);
        self.get(Resource::Releases, "/releases", params).await
    }

    pub async fn get_release(&self, release_id: i64) -> Result<ReleaseWithTasks, ClientError> {
        self.get(
            Resource::Releases,
            &format!("/releases/{release_id}"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn create_release(&self, payload: &CreateRelease) -> Result<Release, ClientError> {
        self.mutate(Method::POST, "/releases", Some(payload), Mutation::Release)
            .await
    }

    pub async fn update_release(
        &self,
        release_id: i64,
        payload: &UpdateRelease,
    ) -> Result<Release, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/releases/{release_id}"),
            Some(payload),
            Mutation::Release,
        )
        .await
    }

    pub async fn delete_release(&self, release_id: i64) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/releases/{release_id}"),
            None::<&()>,
            Mutation::Release,
        )
        .await
    }
}
