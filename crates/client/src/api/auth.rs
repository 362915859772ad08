use db::models::user::{AccessToken, LoginRequest, User};
use reqwest::Method;
use utils::response::MessageResponse;

use super::ApiClient;
use crate::{
    cache::{Mutation, QueryParams, Resource},
    error::ClientError,
};

impl ApiClient {
    /// Exchanges credentials for a token, stores it and loads the current user.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let credentials = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let token: AccessToken = self
            .mutate(Method::POST, "/auth/login", Some(&credentials), Mutation::Session)
            .await?;
        self.session.set_token(token.access_token)?;

        let user = self.me().await?;
        self.session.set_user(user.clone())?;
        tracing::info!(user_id = user.id, "Logged in");
        Ok(user)
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.get(Resource::CurrentUser, "/auth/me", QueryParams::new())
            .await
    }

    /// Tokens are stateless; the server call only confirms the logout.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result: Result<MessageResponse, _> = self
            .mutate(Method::POST, "/auth/logout", None::<&()>, Mutation::Session)
            .await;
        self.force_logout();
        match result {
            Ok(_) | Err(ClientError::Unauthorized) => Ok(()),
            Err(err) => Err(err),
        }
    }
}
