use async_trait::async_trait;
use config::Settings;
use db::{DBService, DbErr};
use services::services::github::TaskIdMatcher;
use thiserror::Error;
use utils::pagination::{Page, PageParams, PaginationError};
use utils_jwt::JwtService;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("invalid task id prefix: {0}")]
    TaskIdPrefix(#[from] regex::Error),
}

/// Shared runtime handles every route needs.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn settings(&self) -> &Settings;

    fn db(&self) -> &DBService;

    fn jwt(&self) -> &JwtService;

    fn task_ids(&self) -> &TaskIdMatcher;

    /// Resolves list query parameters against the configured page size limits.
    fn page(&self, params: PageParams) -> Result<Page, PaginationError> {
        let settings = self.settings();
        params.resolve(settings.default_page_size, settings.max_page_size)
    }
}
