use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::pagination::Page;

use crate::{entities::user, models::team::TeamBrief, types::UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct UserBrief {
    pub id: i64,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserWithTeams {
    #[serde(flatten)]
    pub user: User,
    pub teams: Vec<TeamBrief>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

impl AccessToken {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateUser {
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// Column values written by [`User::update`]; the password is already hashed.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub hashed_password: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn brief(&self) -> UserBrief {
        UserBrief {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    /// Returns the user together with its stored password hash.
    pub async fn find_credentials<C: ConnectionTrait>(
        db: &C,
        email: &str,
    ) -> Result<Option<(Self, String)>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(db)
            .await?;
        Ok(record.map(|model| {
            let hash = model.hashed_password.clone();
            (Self::from_model(model), hash)
        }))
    }

    pub async fn email_taken<C: ConnectionTrait>(
        db: &C,
        email: &str,
        except_id: Option<i64>,
    ) -> Result<bool, DbErr> {
        let mut query =
            user::Entity::find().filter(user::Column::Email.eq(email.trim().to_lowercase()));
        if let Some(id) = except_id {
            query = query.filter(user::Column::Id.ne(id));
        }
        Ok(query.count(db).await? > 0)
    }

    pub async fn list<C: ConnectionTrait>(db: &C, page: Page) -> Result<(Vec<Self>, u64), DbErr> {
        let query = user::Entity::find().order_by_asc(user::Column::Id);
        let total = query.clone().count(db).await?;
        let records = query
            .offset(page.offset())
            .limit(page.page_size)
            .all(db)
            .await?;
        Ok((records.into_iter().map(Self::from_model).collect(), total))
    }

    pub async fn find_briefs<C: ConnectionTrait>(
        db: &C,
        ids: Vec<i64>,
    ) -> Result<Vec<UserBrief>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .order_by_asc(user::Column::Id)
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(|model| Self::from_model(model).brief())
            .collect())
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        email: &str,
        full_name: &str,
        hashed_password: String,
        role: UserRole,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = user::ActiveModel {
            email: Set(email.trim().to_lowercase()),
            hashed_password: Set(hashed_password),
            full_name: Set(full_name.to_string()),
            role: Set(role),
            is_active: Set(true),
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
        changes: UserChanges,
    ) -> Result<Self, DbErr> {
        let record = user::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        let mut active: user::ActiveModel = record.into();
        if let Some(email) = changes.email {
            active.email = Set(email.trim().to_lowercase());
        }
        if let Some(full_name) = changes.full_name {
            active.full_name = Set(full_name);
        }
        if let Some(hash) = changes.hashed_password {
            active.hashed_password = Set(hash);
        }
        if let Some(role) = changes.role {
            active.role = Set(role);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = user::Entity::delete_many()
            .filter(user::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
