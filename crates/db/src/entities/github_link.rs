use sea_orm::entity::prelude::*;

use crate::types::{GitHubLinkType, GitHubPrStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "github_links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub task_id: i64,
    pub link_type: GitHubLinkType,
    pub repository_owner: String,
    pub repository_name: String,
    pub pr_number: Option<i64>,
    pub pr_title: Option<String>,
    pub pr_status: Option<GitHubPrStatus>,
    pub branch_name: Option<String>,
    pub commit_sha: Option<String>,
    pub url: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
