use db::models::theme::{CreateTheme, Theme, ThemeWithProjects, UpdateTheme};
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
    pub async fn list_themes(
        &self,
        include_archived: bool,
        page: PageParams,
    ) -> Result<Paginated<Theme>, ClientError> {
        let params = QueryParams::new()
            .with("include_archived", include_archived)
            .with_page(page);
        self.get(Resource::Themes, "/themes", params).await
    }

    pub async fn theme_statuses(&self) -> Result<Vec<String>, ClientError> {
        self.get(Resource::Themes, "/themes/statuses", QueryParams::new())
            .await
    }

    pub async fn get_theme(&self, theme_id: i64) -> Result<ThemeWithProjects, ClientError> {
        self.get(
            Resource::Themes,
            &format!("/themes/{theme_id}"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn create_theme(&self, payload: &CreateTheme) -> Result<Theme, ClientError> {
        self.mutate(Method::POST, "/themes", Some(payload), Mutation::Theme)
            .await
    }

    pub async fn update_theme(
        &self,
        theme_id: i64,
        payload: &UpdateTheme,
    ) -> Result<Theme, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/themes/{theme_id}"),
            Some(payload),
            Mutation::Theme,
        )
        .await
    }

    pub async fn delete_theme(&self, theme_id: i64) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/themes/{theme_id}"),
            None::<&()>,
            Mutation::Theme,
        )
        .await
    }
}
