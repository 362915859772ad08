use deployment::Deployment;
use utils::pagination::{Page, PageParams};

use crate::{DeploymentImpl, error::ApiError};

pub mod auth;
pub mod board;
pub mod github;
pub mod health;
pub mod project_types;
pub mod projects;
pub mod releases;
pub mod task_types;
pub mod tasks;
pub mod teams;
pub mod themes;
pub mod users;

/// Validates raw `page` / `page_size` query values against the configured limits.
pub(crate) fn resolve_page(
    deployment: &DeploymentImpl,
    page: Option<u64>,
    page_size: Option<u64>,
) -> Result<Page, ApiError> {
    Ok(deployment.page(PageParams { page, page_size })?)
}
