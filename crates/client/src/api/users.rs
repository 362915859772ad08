use db::models::user::{CreateUser, UpdateUser, User, UserWithTeams};
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
    pub async fn list_users(&self, page: PageParams) -> Result<Paginated<User>, ClientError> {
        self.get(Resource::Users, "/users", QueryParams::new().with_page(page))
            .await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<UserWithTeams, ClientError> {
        self.get(Resource::Users, &format!("/users/{user_id}"), QueryParams::new())
            .await
    }

    pub async fn create_user(&self, payload: &CreateUser) -> Result<User, ClientError> {
        self.mutate(Method::POST, "/users", Some(payload), Mutation::User)
            .await
    }

    pub async fn update_user(&self, user_id: i64, payload: &UpdateUser) -> Result<User, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/users/{user_id}"),
            Some(payload),
            Mutation::User,
        )
        .await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/users/{user_id}"),
            None::<&()>,
            Mutation::User,
        )
        .await
    }
}
