use sea_orm::{JsonValue, entity::prelude::*};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub display_id: String,
    pub project_id: Option<i64>,
    pub team_id: i64,
    pub task_type_id: i64,
    pub release_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub estimation: Option<f64>,
    pub custom_data: JsonValue,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
