use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    entities::github_link,
    types::{GitHubLinkType, GitHubPrStatus},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GitHubLink {
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
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateGitHubLink {
    pub link_type: GitHubLinkType,
    pub repository_owner: String,
    pub repository_name: String,
    pub pr_number: Option<i64>,
    pub pr_title: Option<String>,
    pub pr_status: Option<GitHubPrStatus>,
    pub branch_name: Option<String>,
    pub commit_sha: Option<String>,
    pub url: String,
}

/// Pull request state reported by a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub repository_owner: String,
    pub repository_name: String,
    pub number: i64,
    pub title: String,
    pub status: GitHubPrStatus,
    pub branch_name: Option<String>,
    pub url: String,
}

impl GitHubLink {
    fn from_model(model: github_link::Model) -> Self {
        Self {
            id: model.id,
            task_id: model.task_id,
            link_type: model.link_type,
            repository_owner: model.repository_owner,
            repository_name: model.repository_name,
            pr_number: model.pr_number,
            pr_title: model.pr_title,
            pr_status: model.pr_status,
            branch_name: model.branch_name,
            commit_sha: model.commit_sha,
            url: model.url,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_by_task<C: ConnectionTrait>(
        db: &C,
        task_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = github_link::Entity::find()
            .filter(github_link::Column::TaskId.eq(task_id))
            .order_by_asc(github_link::Column::CreatedAt)
            .order_by_asc(github_link::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        task_id: i64,
        data: &CreateGitHubLink,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = github_link::ActiveModel {
            task_id: Set(task_id),
            link_type: Set(data.link_type),
            repository_owner: Set(data.repository_owner.clone()),
            repository_name: Set(data.repository_name.clone()),
            pr_number: Set(data.pr_number),
            pr_title: Set(data.pr_title.clone()),
            pr_status: Set(data.pr_status),
            branch_name: Set(data.branch_name.clone()),
            commit_sha: Set(data.commit_sha.clone()),
            url: Set(data.url.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    /// Creates or refreshes the pull-request link of a task.
    pub async fn upsert_pull_request<C: ConnectionTrait>(
        db: &C,
        task_id: i64,
        pr: &PullRequestRef,
    ) -> Result<Self, DbErr> {
        let existing = github_link::Entity::find()
            .filter(github_link::Column::TaskId.eq(task_id))
            .filter(github_link::Column::LinkType.eq(GitHubLinkType::PullRequest))
            .filter(github_link::Column::RepositoryOwner.eq(pr.repository_owner.as_str()))
            .filter(github_link::Column::RepositoryName.eq(pr.repository_name.as_str()))
            .filter(github_link::Column::PrNumber.eq(pr.number))
            .one(db)
            .await?;

        let Some(record) = existing else {
            return Self::create(
                db,
                task_id,
                &CreateGitHubLink {
                    link_type: GitHubLinkType::PullRequest,
                    repository_owner: pr.repository_owner.clone(),
                    repository_name: pr.repository_name.clone(),
                    pr_number: Some(pr.number),
                    pr_title: Some(pr.title.clone()),
                    pr_status: Some(pr.status),
                    branch_name: pr.branch_name.clone(),
                    commit_sha: None,
                    url: pr.url.clone(),
                },
            )
            .await;
        };

        let mut active: github_link::ActiveModel = record.into();
        active.pr_title = Set(Some(pr.title.clone()));
        active.pr_status = Set(Some(pr.status));
        active.branch_name = Set(pr.branch_name.clone());
        active.url = Set(pr.url.clone());
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    pub async fn delete<C: ConnectionTrait>(
        db: &C,
        task_id: i64,
        link_id: i64,
    ) -> Result<u64, DbErr> {
        let result = github_link::Entity::delete_many()
            .filter(github_link::Column::Id.eq(link_id))
            .filter(github_link::Column::TaskId.eq(task_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
