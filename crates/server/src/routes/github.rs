use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::{
    github_link::{CreateGitHubLink, GitHubLink},
    task::Task,
};
use deployment::Deployment;
use secrecy::ExposeSecret;
use services::services::{
    github::{PullRequestEvent, WebhookOutcome, process_pull_request_event, verify_signature},
    validation::require_non_blank,
};
use utils::response::{ApiResponse, MessageResponse};

use crate::{DeploymentImpl, error::ApiError, middleware::load_task_middleware};

const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const EVENT_HEADER: &str = "x-github-event";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Receives GitHub deliveries. Only `pull_request` events mutate anything.
pub async fn handle_webhook(
    State(deployment): State<DeploymentImpl>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ResponseJson<ApiResponse<WebhookOutcome>>, ApiError> {
    if let Some(secret) = deployment.settings().github_webhook_secret.as_ref() {
        let signature = header_str(&headers, SIGNATURE_HEADER).unwrap_or_default();
        if !verify_signature(secret.expose_secret().as_bytes(), &body, signature) {
            tracing::warn!(
                has_signature = !signature.is_empty(),
                "Rejected webhook with invalid signature"
            );
            return Err(ApiError::Unauthorized);
        }
    }

    let event = header_str(&headers, EVENT_HEADER).unwrap_or_default();
    if event != "pull_request" {
        tracing::debug!(event, "Ignoring webhook event");
        return Ok(ResponseJson(ApiResponse::success(
            WebhookOutcome::acknowledged(format!("Event '{event}' ignored")),
        )));
    }

    let payload: PullRequestEvent = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("Invalid webhook payload: {err}")))?;
    let outcome =
        process_pull_request_event(&deployment.db().pool, deployment.task_ids(), &payload).await?;
    Ok(ResponseJson(ApiResponse::success(outcome)))
}

pub async fn list_links(
    State(deployment): State<DeploymentImpl>,
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Vec<GitHubLink>>>, ApiError> {
    let links = GitHubLink::find_by_task(&deployment.db().pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(links)))
}

pub async fn create_link(
    State(deployment): State<DeploymentImpl>,
    Extension(task): Extension<Task>,
    Json(payload): Json<CreateGitHubLink>,
) -> Result<ResponseJson<ApiResponse<GitHubLink>>, ApiError> {
    require_non_blank("Repository owner", &payload.repository_owner)?;
    require_non_blank("Repository name", &payload.repository_name)?;
    require_non_blank("URL", &payload.url)?;
    let link = GitHubLink::create(&deployment.db().pool, task.id, &payload).await?;
    tracing::info!(task_id = task.id, link_id = link.id, "Created GitHub link");
    Ok(ResponseJson(ApiResponse::success(link)))
}

pub async fn delete_link(
    State(deployment): State<DeploymentImpl>,
    Path((task_id, link_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    let removed = GitHubLink::delete(&deployment.db().pool, task_id, link_id).await?;
    if removed == 0 {
        return Err(ApiError::not_found("GitHub link"));
    }
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        "GitHub link deleted",
    ))))
}

/// Unauthenticated; deliveries are checked by signature instead.
pub fn webhook_router() -> Router<DeploymentImpl> {
    Router::new().route("/github/webhook", post(handle_webhook))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let task_links_router = Router::new()
        .route("/", get(list_links).post(create_link))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_task_middleware::<DeploymentImpl>,
        ));

    Router::new()
        .route("/github/links/{task_id}/{link_id}", delete(delete_link))
        .nest("/github/links/{task_id}", task_links_router)
}
