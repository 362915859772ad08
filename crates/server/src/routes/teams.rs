use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::{
    team::{
        AddTeamMember, CreateTeam, Team, TeamMember, TeamStats, TeamWithMembers, UpdateTeam,
    },
    user::User,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::{
    team::delete_team as delete_team_with_reassignment,
    validation::{require_non_blank, validate_slug},
};
use utils::{
    pagination::Paginated,
    response::{ApiResponse, MessageResponse},
};

use crate::{
    DeploymentImpl, error::ApiError, http::auth::CurrentUser,
    middleware::load_team_middleware, routes::resolve_page,
};

#[derive(Debug, Deserialize)]
pub struct TeamQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTeamQuery {
    pub reassign_tasks_to: Option<i64>,
}

pub async fn list_teams(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<TeamQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<Team>>>, ApiError> {
    let page = resolve_page(&deployment, query.page, query.page_size)?;
    let (teams, total) = Team::list(&deployment.db().pool, page).await?;
    Ok(ResponseJson(ApiResponse::success(Paginated::new(
        teams, total, page,
    ))))
}

pub async fn create_team(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CreateTeam>,
) -> Result<ResponseJson<ApiResponse<Team>>, ApiError> {
    current.require_admin()?;
    require_non_blank("Name", &payload.name)?;
    validate_slug(&payload.slug)?;

    let pool = &deployment.db().pool;
    if Team::find_by_slug(pool, &payload.slug).await?.is_some() {
        return Err(ApiError::BadRequest(
            "Team with this slug already exists".to_string(),
        ));
    }

    let team = Team::create(pool, &payload).await?;
    tracing::info!(team_id = team.id, slug = %team.slug, "Created team");
    Ok(ResponseJson(ApiResponse::success(team)))
}

pub async fn get_team(
    State(deployment): State<DeploymentImpl>,
    Extension(team): Extension<Team>,
) -> Result<ResponseJson<ApiResponse<TeamWithMembers>>, ApiError> {
    let members = Team::members(&deployment.db().pool, team.id).await?;
    Ok(ResponseJson(ApiResponse::success(TeamWithMembers {
        team,
        members,
    })))
}

pub async fn update_team(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(team): Extension<Team>,
    Json(payload): Json<UpdateTeam>,
) -> Result<ResponseJson<ApiResponse<Team>>, ApiError> {
    current.require_admin()?;
    if let Some(name) = payload.name.as_deref() {
        require_non_blank("Name", name)?;
    }
    let updated = Team::update(&deployment.db().pool, team.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_team(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(team): Extension<Team>,
    Query(query): Query<DeleteTeamQuery>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    current.require_admin()?;
    let outcome =
        delete_team_with_reassignment(&deployment.db().pool, team.id, query.reassign_tasks_to)
            .await?;

    let message = if outcome.reassigned > 0 {
        format!(
            "Team {} deleted, {} tasks reassigned",
            outcome.team_name, outcome.reassigned
        )
    } else {
        format!("Team {} deleted", outcome.team_name)
    };
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        message,
    ))))
}

pub async fn get_team_stats(
    State(deployment): State<DeploymentImpl>,
    Extension(team): Extension<Team>,
) -> Result<ResponseJson<ApiResponse<TeamStats>>, ApiError> {
    let stats = Team::stats(&deployment.db().pool, &team).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn list_members(
    State(deployment): State<DeploymentImpl>,
    Extension(team): Extension<Team>,
) -> Result<ResponseJson<ApiResponse<Vec<TeamMember>>>, ApiError> {
    let members = Team::members(&deployment.db().pool, team.id).await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

pub async fn add_member(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Extension(team): Extension<Team>,
    Json(payload): Json<AddTeamMember>,
) -> Result<ResponseJson<ApiResponse<TeamMember>>, ApiError> {
    current.require_admin()?;
    let pool = &deployment.db().pool;
    if User::find_by_id(pool, payload.user_id).await?.is_none() {
        return Err(ApiError::not_found("User"));
    }
    if Team::is_member(pool, team.id, payload.user_id).await? {
        return Err(ApiError::BadRequest(
            "User is already a member of this team".to_string(),
        ));
    }

    let member = Team::add_member(pool, team.id, payload.user_id).await?;
    tracing::info!(team_id = team.id, user_id = payload.user_id, "Added team member");
    Ok(ResponseJson(ApiResponse::success(member)))
}

pub async fn remove_member(
    State(deployment): State<DeploymentImpl>,
    Extension(current): Extension<CurrentUser>,
    Path((team_id, user_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<MessageResponse>>, ApiError> {
    current.require_admin()?;
    let removed = Team::remove_member(&deployment.db().pool, team_id, user_id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("Team membership not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(MessageResponse::new(
        "Member removed from team",
    ))))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let team_id_router = Router::new()
        .route("/", get(get_team).patch(update_team).delete(delete_team))
        .route("/stats", get(get_team_stats))
        .route("/members", get(list_members).post(add_member))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_team_middleware::<DeploymentImpl>,
        ));

    let inner = Router::new()
        .route("/", get(list_teams).post(create_team))
        .route("/{team_id}/members/{user_id}", delete(remove_member))
        .nest("/{team_id}", team_id_router);

    Router::new().nest("/teams", inner)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::test_support::TestApp;

    async fn create_team(app: &TestApp, slug: &str) -> i64 {
        let team = app
            .ok(
                "POST",
                "/api/v1/teams",
                Some(json!({"name": slug.to_uppercase(), "slug": slug})),
            )
            .await;
        team["id"].as_i64().unwrap()
    }

    async fn create_task_type(app: &TestApp, team_id: i64, slug: &str) -> Value {
        app.ok(
            "POST",
            &format!("/api/v1/task-types?team_id={team_id}"),
            Some(json!({
                "name": slug,
                "slug": slug,
                "workflow": ["todo", "doing", "done"]
            })),
        )
        .await
    }

    #[tokio::test]
    async fn slug_must_be_valid_and_unique() {
        let app = TestApp::new().await;
        create_team(&app, "backend").await;

        let (status, json) = app
            .send(
                "POST",
                "/api/v1/teams",
                Some(&app.admin_token),
                Some(json!({"name": "Again", "slug": "backend"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Team with this slug already exists");

        let (status, _) = app
            .send(
                "POST",
                "/api/v1/teams",
                Some(&app.admin_token),
                Some(json!({"name": "Bad", "slug": "Bad Slug"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn members_can_be_added_once_and_removed() {
        let app = TestApp::new().await;
        let team_id = create_team(&app, "web").await;
        let (user, _) = app.user("dev@test.dev", false).await;

        let member = app
            .ok(
                "POST",
                &format!("/api/v1/teams/{team_id}/members"),
                Some(json!({"user_id": user.id})),
            )
            .await;
        assert_eq!(member["user"]["email"], "dev@test.dev");

        let (status, _) = app
            .send(
                "POST",
                &format!("/api/v1/teams/{team_id}/members"),
                Some(&app.admin_token),
                Some(json!({"user_id": user.id})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let stats = app
            .ok("GET", &format!("/api/v1/teams/{team_id}/stats"), None)
            .await;
        assert_eq!(stats["member_count"], 1);

        app.ok(
            "DELETE",
            &format!("/api/v1/teams/{team_id}/members/{}", user.id),
            None,
        )
        .await;
        let (status, _) = app
            .send(
                "DELETE",
                &format!("/api/v1/teams/{team_id}/members/{}", user.id),
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_team_with_tasks_requires_reassignment() {
        let app = TestApp::new().await;
        let source = create_team(&app, "alpha").await;
        let target = create_team(&app, "beta").await;
        let source_type = create_task_type(&app, source, "story").await;
        create_task_type(&app, target, "story").await;

        let task = app
            .ok(
                "POST",
                "/api/v1/tasks",
                Some(json!({
                    "title": "Move me",
                    "team_id": source,
                    "task_type_id": source_type["id"],
                })),
            )
            .await;

        let (status, json) = app
            .send(
                "DELETE",
                &format!("/api/v1/teams/{source}"),
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("1 tasks"));

        let (status, _) = app
            .send(
                "DELETE",
                &format!("/api/v1/teams/{source}?reassign_tasks_to={source}"),
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        app.ok(
            "DELETE",
            &format!("/api/v1/teams/{source}?reassign_tasks_to={target}"),
            None,
        )
        .await;

        let moved = app
            .ok("GET", &format!("/api/v1/tasks/{}", task["id"]), None)
            .await;
        assert_eq!(moved["team_id"], target);
        assert_eq!(moved["status"], "todo");

        let (status, _) = app
            .send(
                "GET",
                &format!("/api/v1/teams/{source}"),
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_admin_cannot_create_team() {
        let app = TestApp::new().await;
        let (_, token) = app.user("dev@test.dev", false).await;
        let (status, _) = app
            .send(
                "POST",
                "/api/v1/teams",
                Some(&token),
                Some(json!({"name": "X", "slug": "x"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
