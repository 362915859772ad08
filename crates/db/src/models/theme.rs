use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::pagination::Page;

use crate::{entities::theme, models::project::ProjectBrief};

/// Status hidden from theme listings unless explicitly requested.
pub const ARCHIVED_STATUS: &str = "archived";

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Theme {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ThemeBrief {
    pub id: i64,
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ThemeWithProjects {
    #[serde(flatten)]
    pub theme: Theme,
    pub projects: Vec<ProjectBrief>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTheme {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateTheme {
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::patch::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
}

impl Theme {
    fn from_model(model: theme::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            status: model.status,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub fn brief(&self) -> ThemeBrief {
        ThemeBrief {
            id: self.id,
            title: self.title.clone(),
            status: self.status.clone(),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = theme::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn exists<C: ConnectionTrait>(db: &C, id: i64) -> Result<bool, DbErr> {
        let count = theme::Entity::find()
            .filter(theme::Column::Id.eq(id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn find_by_title<C: ConnectionTrait>(
        db: &C,
        title: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = theme::Entity::find()
            .filter(theme::Column::Title.eq(title))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn list<C: ConnectionTrait>(
        db: &C,
        include_archived: bool,
        page: Page,
    ) -> Result<(Vec<Self>, u64), DbErr> {
        let mut query = theme::Entity::find()
            .order_by_desc(theme::Column::CreatedAt)
            .order_by_desc(theme::Column::Id);
        if !include_archived {
            query = query.filter(theme::Column::Status.ne(ARCHIVED_STATUS));
        }
        let total = query.clone().count(db).await?;
        let records = query
            .offset(page.offset())
            .limit(page.page_size)
            .all(db)
            .await?;
        Ok((records.into_iter().map(Self::from_model).collect(), total))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTheme,
        status: &str,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = theme::ActiveModel {
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            status: Set(status.to_string()),
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
        payload: &UpdateTheme,
    ) -> Result<Self, DbErr> {
        let record = theme::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Theme not found".to_string()))?;

        let mut active: theme::ActiveModel = record.into();
        if let Some(title) = payload.title.clone() {
            active.title = Set(title);
        }
        if let Some(description) = payload.description.clone() {
            active.description = Set(description);
        }
        if let Some(status) = payload.status.clone() {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = theme::Entity::delete_many()
            .filter(theme::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
