//! Read-through cache for list and detail queries.
//!
//! Entries are keyed by resource, path and query parameters. Mutations drop
//! every entry of the resources they affect; there is no partial patching.

use std::{collections::BTreeMap, future::Future, sync::Arc, time::Duration};

use moka::future::Cache;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use utils::pagination::PageParams;

use crate::error::ClientError;

const DEFAULT_CAPACITY: u64 = 512;
const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    CurrentUser,
    Users,
    Teams,
    Board,
    Themes,
    ProjectTypes,
    TaskTypes,
    Projects,
    Tasks,
    Releases,
    GitHubLinks,
}

/// Sorted query parameters; equal filters produce equal keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn with_page(self, page: PageParams) -> Self {
        self.with_opt("page", page.page)
            .with_opt("page_size", page.page_size)
    }

    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: Resource,
    pub path: String,
    pub params: QueryParams,
}

impl QueryKey {
    pub fn new(resource: Resource, path: impl Into<String>, params: QueryParams) -> Self {
        Self {
            resource,
            path: path.into(),
            params,
        }
    }
}

/// What a mutation touched, for invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Session,
    User,
    Team,
    Theme,
    ProjectType,
    TaskType,
    Project,
    Task,
    Release,
    GitHubLink,
}

/// Resources whose cached reads may be stale after `mutation`.
pub fn invalidation_targets(mutation: Mutation) -> &'static [Resource] {
    use Resource::*;
    match mutation {
        Mutation::Session => &[CurrentUser, Users],
        Mutation::User => &[Users, Teams, CurrentUser],
        Mutation::Team => &[Teams, TaskTypes, Board, Tasks],
        Mutation::Theme => &[Themes, Projects],
        Mutation::ProjectType => &[ProjectTypes, Projects],
        Mutation::TaskType => &[TaskTypes, Tasks, Board],
        Mutation::Project => &[Projects, Themes, Tasks],
        Mutation::Task => &[Tasks, Projects, Releases, Board],
        Mutation::Release => &[Releases, Tasks],
        Mutation::GitHubLink => &[GitHubLinks, Tasks],
    }
}

#[derive(Debug, Clone)]
pub struct QueryCache {
    inner: Cache<QueryKey, Arc<Value>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl QueryCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.inner.get(key).await.is_some()
    }

    /// Returns the cached value for `key`, or runs `fetch` and stores its result.
    /// Failed fetches are not cached.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, ClientError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if let Some(cached) = self.inner.get(&key).await {
            match T::deserialize(cached.as_ref()) {
                Ok(value) => {
                    tracing::trace!(resource = ?key.resource, path = %key.path, "Query cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    tracing::debug!(path = %key.path, error = %err, "Dropping unreadable cache entry");
                    self.inner.invalidate(&key).await;
                }
            }
        }

        let value = fetch().await?;
        if let Ok(json) = serde_json::to_value(&value) {
            self.inner.insert(key, Arc::new(json)).await;
        }
        Ok(value)
    }

    pub async fn invalidate_resources(&self, resources: &[Resource]) {
        let stale: Vec<Arc<QueryKey>> = self
            .inner
            .iter()
            .filter(|(key, _)| resources.contains(&key.resource))
            .map(|(key, _)| key)
            .collect();
        for key in stale {
            self.inner.invalidate(key.as_ref()).await;
        }
        tracing::debug!(?resources, "Invalidated cached queries");
    }

    pub async fn invalidate_after(&self, mutation: Mutation) {
        self.invalidate_resources(invalidation_targets(mutation))
            .await;
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}
