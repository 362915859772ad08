use db::models::team::{
    AddTeamMember, CreateTeam, Team, TeamMember, TeamStats, TeamWithMembers, UpdateTeam,
};
use reqwest::Method;
use services::services::board::Board;
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
    pub async fn list_teams(&self, page: PageParams) -> Result<Paginated<Team>, ClientError> {
        self.get(Resource::Teams, "/teams", QueryParams::new().with_page(page))
            .await
    }

    pub async fn get_team(&self, team_id: i64) -> Result<TeamWithMembers, ClientError> {
        self.get(Resource::Teams, &format!("/teams/{team_id}"), QueryParams::new())
            .await
    }

    pub async fn team_stats(&self, team_id: i64) -> Result<TeamStats, ClientError> {
        self.get(
            Resource::Teams,
            &format!("/teams/{team_id}/stats"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn create_team(&self, payload: &CreateTeam) -> Result<Team, ClientError> {
        self.mutate(Method::POST, "/teams", Some(payload), Mutation::Team)
            .await
    }

    pub async fn update_team(&self, team_id: i64, payload: &UpdateTeam) -> Result<Team, ClientError> {
        self.mutate(
            Method::PATCH,
            &format!("/teams/{team_id}"),
            Some(payload),
            Mutation::Team,
        )
        .await
    }

    /// A team that still has tasks can only be deleted with a reassignment target.
    pub async fn delete_team(
        &self,
        team_id: i64,
        reassign_tasks_to: Option<i64>,
    ) -> Result<MessageResponse, ClientError> {
        self.mutate_with_query(
            Method::DELETE,
            &format!("/teams/{team_id}"),
            QueryParams::new().with_opt("reassign_tasks_to", reassign_tasks_to),
            None::<&()>,
            Mutation::Team,
        )
        .await
    }

    pub async fn list_team_members(&self, team_id: i64) -> Result<Vec<TeamMember>, ClientError> {
        self.get(
            Resource::Teams,
            &format!("/teams/{team_id}/members"),
            QueryParams::new(),
        )
        .await
    }

    pub async fn add_team_member(
        &self,
        team_id: i64,
        payload: &AddTeamMember,
    ) -> Result<TeamMember, ClientError> {
        self.mutate(
            Method::POST,
            &format!("/teams/{team_id}/members"),
            Some(payload),
            Mutation::Team,
        )
        .await
    }

    pub async fn remove_team_member(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<MessageResponse, ClientError> {
        self.mutate(
            Method::DELETE,
            &format!("/teams/{team_id}/members/{user_id}"),
            None::<&()>,
            Mutation::Team,
        )
        .await
    }

    pub async fn board(&self, team_slug: &str) -> Result<Board, ClientError> {
        self.get(
            Resource::Board,
            &format!("/board/{team_slug}"),
            QueryParams::new(),
        )
        .await
    }
}
