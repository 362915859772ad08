use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{
    DbPool,
    models::{task::Task, task_type::TaskType, team::Team},
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::board::Board;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

/// A card dropped onto a column of the board.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DropTask {
    pub task_id: i64,
    pub status: String,
}

async fn load_board(pool: &DbPool, team_slug: &str) -> Result<Board, ApiError> {
    let team = Team::find_by_slug(pool, team_slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Team"))?;
    let task_types = TaskType::find_by_team(pool, team.id).await?;
    let tasks = Task::find_by_team(pool, team.id).await?;
    Ok(Board::build(team.brief(), &task_types, tasks))
}

pub async fn get_board(
    State(deployment): State<DeploymentImpl>,
    Path(team_slug): Path<String>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    let board = load_board(&deployment.db().pool, &team_slug).await?;
    Ok(ResponseJson(ApiResponse::success(board)))
}

/// Applies a drop as a single status update; dropping in place changes nothing.
pub async fn drop_task(
    State(deployment): State<DeploymentImpl>,
    Path(team_slug): Path<String>,
    Json(payload): Json<DropTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let pool = &deployment.db().pool;
    let board = load_board(pool, &team_slug).await?;

    let task = match board.drop_task(payload.task_id, &payload.status)? {
        Some(update) => {
            tracing::debug!(task_id = update.task_id, status = %update.status, "Board drop");
            Task::update_status(pool, update.task_id, &update.status).await?
        }
        None => Task::find_by_id(pool, payload.task_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Task"))?,
    };
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/board/{team_slug}", get(get_board))
        .route("/board/{team_slug}/drop", post(drop_task))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn board_groups_tasks_and_drop_sets_only_status() {
        let app = TestApp::new().await;
        let team = app
            .ok(
                "POST",
                "/api/v1/teams",
                Some(json!({"name": "Platform", "slug": "platform"})),
            )
            .await;
        let task_type = app
            .ok(
                "POST",
                &format!("/api/v1/task-types?team_id={}", team["id"]),
                Some(json!({
                    "name": "Story",
                    "slug": "story",
                    "workflow": ["backlog", "doing", "done"]
                })),
            )
            .await;
        let task = app
            .ok(
                "POST",
                "/api/v1/tasks",
                Some(json!({
                    "title": "Card",
                    "description": "keep me",
                    "team_id": team["id"],
                    "task_type_id": task_type["id"],
                    "estimation": 3.0
                })),
            )
            .await;

        let board = app.ok("GET", "/api/v1/board/platform", None).await;
        let columns = board["lanes"][0]["columns"].as_array().unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0]["status"], "backlog");
        assert_eq!(columns[0]["tasks"][0]["id"], task["id"]);

        let moved = app
            .ok(
                "POST",
                "/api/v1/board/platform/drop",
                Some(json!({"task_id": task["id"], "status": "done"})),
            )
            .await;
        assert_eq!(moved["status"], "done");
        assert_eq!(moved["title"], task["title"]);
        assert_eq!(moved["description"], task["description"]);
        assert_eq!(moved["estimation"], task["estimation"]);

        let (status, _) = app
            .send(
                "POST",
                "/api/v1/board/platform/drop",
                Some(&app.admin_token),
                Some(json!({"task_id": task["id"], "status": "shipped"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_team_slug_is_not_found() {
        let app = TestApp::new().await;
        let (status, _) = app
            .send("GET", "/api/v1/board/nobody", Some(&app.admin_token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
