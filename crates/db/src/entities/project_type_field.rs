use sea_orm::{JsonValue, entity::prelude::*};

use crate::types::FieldType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "project_type_fields")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub project_type_id: i64,
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    pub options: Option<JsonValue>,
    pub required: bool,
    pub order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
