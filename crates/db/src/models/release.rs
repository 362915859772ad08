use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::pagination::Page;

use crate::{entities::release, models::task::TaskBrief, types::ReleaseStatus};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Release {
    pub id: i64,
    pub version: String,
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub release_date: Option<NaiveDate>,
    pub status: ReleaseStatus,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReleaseWithTasks {
    #[serde(flatten)]
    pub release: Release,
    pub tasks: Vec<TaskBrief>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateRelease {
    pub version: String,
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: ReleaseStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateRelease {
    pub version: Option<String>,
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::patch::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "utils::patch::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub target_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "utils::patch::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub release_date: Option<Option<NaiveDate>>,
    pub status: Option<ReleaseStatus>,
}

impl Release {
    fn from_model(model: release::Model) -> Self {
        Self {
            id: model.id,
            version: model.version,
            title: model.title,
            description: model.description,
            target_date: model.target_date,
            release_date: model.release_date,
            status: model.status,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = release::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn exists<C: ConnectionTrait>(db: &C, id: i64) -> Result<bool, DbErr> {
        let count = release::Entity::find()
            .filter(release::Column::Id.eq(id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn version_taken<C: ConnectionTrait>(
        db: &C,
        version: &str,
        except_id: Option<i64>,
    ) -> Result<bool, DbErr> {
        let mut query = release::Entity::find().filter(release::Column::Version.eq(version));
        if let Some(id) = except_id {
            query = query.filter(release::Column::Id.ne(id));
        }
        Ok(query.count(db).await? > 0)
    }

    pub async fn list<C: ConnectionTrait>(
        db: &C,
        status: Option<ReleaseStatus>,
        page: Page,
    ) -> Result<(Vec<Self>, u64), DbErr> {
        let mut query = release::Entity::find()
            .order_by_desc(release::Column::CreatedAt)
            .order_by_desc(release::Column::Id);
        if let Some(status) = status {
            query = query.filter(release::Column::Status.eq(status));
        }
        let total = query.clone().count(db).await?;
        let records = query
            .offset(page.offset())
            .limit(page.page_size)
            .all(db)
            .await?;
        Ok((records.into_iter().map(Self::from_model).collect(), total))
    }

    pub async fn create<C: ConnectionTrait>(db: &C, data: &CreateRelease) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = release::ActiveModel {
            version: Set(data.version.clone()),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            target_date: Set(data.target_date),
            release_date: Set(data.release_date),
            status: Set(data.status),
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
        payload: &UpdateRelease,
    ) -> Result<Self, DbErr> {
        let record = release::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Release not found".to_string()))?;

        let mut active: release::ActiveModel = record.into();
        if let Some(version) = payload.version.clone() {
            active.version = Set(version);
        }
        if let Some(title) = payload.title.clone() {
            active.title = Set(title);
        }
        if let Some(description) = payload.description.clone() {
            active.description = Set(description);
        }
        if let Some(target_date) = payload.target_date {
            active.target_date = Set(target_date);
        }
        if let Some(release_date) = payload.release_date {
            active.release_date = Set(release_date);
        }
        if let Some(status) = payload.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = release::Entity::delete_many()
            .filter(release::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
