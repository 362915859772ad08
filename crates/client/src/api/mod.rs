//! Typed access to the Core PM REST API.
//!
//! Reads go through the [`QueryCache`]; every mutation invalidates the
//! resources it may have changed. Requests are sent exactly once.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use utils::response::ApiResponse;

use crate::{
    cache::{Mutation, QueryCache, QueryKey, QueryParams, Resource},
    error::ClientError,
    session::SessionStore,
};

mod auth;
mod github;
mod projects;
mod releases;
mod tasks;
mod teams;
mod themes;
mod types;
mod users;

pub use projects::ProjectListFilter;
pub use tasks::TaskListFilter;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
    cache: QueryCache,
}

impl ApiClient {
    /// `base_url` is the server origin, e.g. `http://127.0.0.1:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: SessionStore::in_memory(),
            cache: QueryCache::default(),
        }
    }

    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = session;
        self
    }

    pub fn with_cache(mut self, cache: QueryCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            API_PREFIX,
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and unwraps the `{success, data, message}` envelope.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let (client, request) = builder.build_split();
        let request = request.map_err(|source| ClientError::Transport {
            url: "<invalid request>".to_string(),
            source,
        })?;
        let url = request.url().to_string();
        let method = request.method().clone();

        let response = client
            .execute(request)
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(%method, url = %url, "Request unauthorized, clearing session");
            self.force_logout();
            return Err(ClientError::Unauthorized);
        }

        let envelope: ApiResponse<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Api {
                    status,
                    message: String::from_utf8_lossy(&body).trim().to_string(),
                });
            }
            Err(source) => return Err(ClientError::Decode { url, source }),
        };

        if !status.is_success() || !envelope.is_success() {
            let message = envelope.message().unwrap_or("Unknown error").to_string();
            tracing::debug!(%method, url = %url, status = status.as_u16(), %message, "API error");
            return Err(ClientError::Api { status, message });
        }
        envelope.into_data().ok_or(ClientError::MissingData(url))
    }

    fn force_logout(&self) {
        if let Err(err) = self.session.clear() {
            tracing::error!(error = %err, "Failed to clear session");
        }
        self.cache.clear();
    }

    async fn get<T>(&self, resource: Resource, path: &str, params: QueryParams) -> Result<T, ClientError>
    where
        T: Serialize + DeserializeOwned,
    {
        let key = QueryKey::new(resource, path, params);
        self.cache
            .get_or_fetch(key.clone(), || async {
                let mut builder = self.request(Method::GET, &key.path);
                if !key.params.is_empty() {
                    builder = builder.query(&key.params.pairs());
                }
                self.send(builder).await
            })
            .await
    }

    async fn mutate<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        mutation: Mutation,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.mutate_with_query(method, path, QueryParams::new(), body, mutation)
            .await
    }

    async fn mutate_with_query<T, B>(
        &self,
        method: Method,
        path: &str,
        params: QueryParams,
        body: Option<&B>,
        mutation: Mutation,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self.request(method, path);
        if !params.is_empty() {
            builder = builder.query(&params.pairs());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let result = self.send(builder).await;
        if result.is_ok() {
            self.cache.invalidate_after(mutation).await;
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod test_server;
