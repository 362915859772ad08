use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::pagination::Page;

use crate::{
    entities::{task, task_type, team, team_member},
    models::user::{User, UserBrief},
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct TeamBrief {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TeamMember {
    pub team_id: i64,
    pub user_id: i64,
    #[ts(type = "Date")]
    pub joined_at: DateTime<Utc>,
    pub user: Option<UserBrief>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TeamWithMembers {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct TeamStats {
    pub team_id: i64,
    pub name: String,
    pub task_count: u64,
    pub task_type_count: u64,
    pub member_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTeam {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateTeam {
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::patch::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AddTeamMember {
    pub user_id: i64,
}

impl Team {
    fn from_model(model: team::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub fn brief(&self) -> TeamBrief {
        TeamBrief {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = team::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_by_slug<C: ConnectionTrait>(
        db: &C,
        slug: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = team::Entity::find()
            .filter(team::Column::Slug.eq(slug))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn list<C: ConnectionTrait>(db: &C, page: Page) -> Result<(Vec<Self>, u64), DbErr> {
        let query = team::Entity::find().order_by_asc(team::Column::Name);
        let total = query.clone().count(db).await?;
        let records = query
            .offset(page.offset())
            .limit(page.page_size)
            .all(db)
            .await?;
        Ok((records.into_iter().map(Self::from_model).collect(), total))
    }

    pub async fn create<C: ConnectionTrait>(db: &C, data: &CreateTeam) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = team::ActiveModel {
            name: Set(data.name.clone()),
            slug: Set(data.slug.clone()),
            description: Set(data.description.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: i64,
        payload: &UpdateTeam,
    ) -> Result<Self, DbErr> {
        let record = team::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Team not found".to_string()))?;

        let mut active: team::ActiveModel = record.into();
        if let Some(name) = payload.name.clone() {
            active.name = Set(name);
        }
        if let Some(description) = payload.description.clone() {
            active.description = Set(description);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = team::Entity::delete_many()
            .filter(team::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn stats<C: ConnectionTrait>(db: &C, team: &Team) -> Result<TeamStats, DbErr> {
        let task_count = task::Entity::find()
            .filter(task::Column::TeamId.eq(team.id))
            .count(db)
            .await?;
        let task_type_count = task_type::Entity::find()
            .filter(task_type::Column::TeamId.eq(team.id))
            .count(db)
            .await?;
        let member_count = team_member::Entity::find()
            .filter(team_member::Column::TeamId.eq(team.id))
            .count(db)
            .await?;
        Ok(TeamStats {
            team_id: team.id,
            name: team.name.clone(),
            task_count,
            task_type_count,
            member_count,
        })
    }

    pub async fn members<C: ConnectionTrait>(
        db: &C,
        team_id: i64,
    ) -> Result<Vec<TeamMember>, DbErr> {
        let records = team_member::Entity::find()
            .filter(team_member::Column::TeamId.eq(team_id))
            .order_by_asc(team_member::Column::JoinedAt)
            .all(db)
            .await?;
        let users =
            User::find_briefs(db, records.iter().map(|member| member.user_id).collect()).await?;

        Ok(records
            .into_iter()
            .map(|member| TeamMember {
                team_id: member.team_id,
                user_id: member.user_id,
                joined_at: member.joined_at.into(),
                user: users.iter().find(|user| user.id == member.user_id).cloned(),
            })
            .collect())
    }

    pub async fn is_member<C: ConnectionTrait>(
        db: &C,
        team_id: i64,
        user_id: i64,
    ) -> Result<bool, DbErr> {
        let count = team_member::Entity::find()
            .filter(team_member::Column::TeamId.eq(team_id))
            .filter(team_member::Column::UserId.eq(user_id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn add_member<C: ConnectionTrait>(
        db: &C,
        team_id: i64,
        user_id: i64,
    ) -> Result<TeamMember, DbErr> {
        let active = team_member::ActiveModel {
            team_id: Set(team_id),
            user_id: Set(user_id),
            joined_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        let user = User::find_briefs(db, vec![user_id]).await?.into_iter().next();
        Ok(TeamMember {
            team_id: model.team_id,
            user_id: model.user_id,
            joined_at: model.joined_at.into(),
            user,
        })
    }

    pub async fn remove_member<C: ConnectionTrait>(
        db: &C,
        team_id: i64,
        user_id: i64,
    ) -> Result<u64, DbErr> {
        let result = team_member::Entity::delete_many()
            .filter(team_member::Column::TeamId.eq(team_id))
            .filter(team_member::Column::UserId.eq(user_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn find_briefs_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
    ) -> Result<Vec<TeamBrief>, DbErr> {
        let team_ids: Vec<i64> = team_member::Entity::find()
            .select_only()
            .column(team_member::Column::TeamId)
            .filter(team_member::Column::UserId.eq(user_id))
            .into_tuple()
            .all(db)
            .await?;
        if team_ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = team::Entity::find()
            .filter(team::Column::Id.is_in(team_ids))
            .order_by_asc(team::Column::Name)
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(|model| Self::from_model(model).brief())
            .collect())
    }
}
