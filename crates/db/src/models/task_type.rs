use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::pagination::Page;

use crate::{
    entities::{task, task_type, task_type_field},
    models::type_field::{
        CreateTypeField, StatusCounts, TypeField, UpdateTypeField, count_statuses,
        options_to_json, workflow_from_json, workflow_to_json,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaskType {
    pub id: i64,
    pub team_id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub workflow: Vec<String>,
    pub color: Option<String>,
    pub fields: Vec<TypeField>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTaskType {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub workflow: Vec<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub fields: Vec<CreateTypeField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateTaskType {
    pub name: Option<String>,
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
    pub color: Option<Option<String>>,
    pub workflow: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskTypeStats {
    pub task_type_id: i64,
    pub name: String,
    pub workflow: Vec<String>,
    pub total: u64,
    pub by_status: StatusCounts,
}

impl TaskType {
    fn from_model(model: task_type::Model, fields: Vec<TypeField>) -> Result<Self, DbErr> {
        Ok(Self {
            id: model.id,
            team_id: model.team_id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            workflow: workflow_from_json(model.workflow)?,
            color: model.color,
            fields,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let Some(record) = task_type::Entity::find_by_id(id).one(db).await? else {
            return Ok(None);
        };
        let fields = Self::fields(db, record.id).await?;
        Self::from_model(record, fields).map(Some)
    }

    pub async fn slug_exists<C: ConnectionTrait>(
        db: &C,
        team_id: i64,
        slug: &str,
    ) -> Result<bool, DbErr> {
        let count = task_type::Entity::find()
            .filter(task_type::Column::TeamId.eq(team_id))
            .filter(task_type::Column::Slug.eq(slug))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn list<C: ConnectionTrait>(
        db: &C,
        team_id: Option<i64>,
        page: Page,
    ) -> Result<(Vec<Self>, u64), DbErr> {
        let mut query = task_type::Entity::find()
            .order_by_asc(task_type::Column::Name)
            .order_by_asc(task_type::Column::Id);
        if let Some(team_id) = team_id {
            query = query.filter(task_type::Column::TeamId.eq(team_id));
        }
        let total = query.clone().count(db).await?;
        let records = query
            .offset(page.offset())
            .limit(page.page_size)
            .all(db)
            .await?;

        let mut types = Vec::with_capacity(records.len());
        for record in records {
            let fields = Self::fields(db, record.id).await?;
            types.push(Self::from_model(record, fields)?);
        }
        Ok((types, total))
    }

    /// All task types owned by a team, ordered by name.
    pub async fn find_by_team<C: ConnectionTrait>(
        db: &C,
        team_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = task_type::Entity::find()
            .filter(task_type::Column::TeamId.eq(team_id))
            .order_by_asc(task_type::Column::Name)
            .order_by_asc(task_type::Column::Id)
            .all(db)
            .await?;

        let mut types = Vec::with_capacity(records.len());
        for record in records {
            let fields = Self::fields(db, record.id).await?;
            types.push(Self::from_model(record, fields)?);
        }
        Ok(types)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        team_id: i64,
        data: &CreateTaskType,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = task_type::ActiveModel {
            team_id: Set(team_id),
            name: Set(data.name.clone()),
            slug: Set(data.slug.clone()),
            description: Set(data.description.clone()),
            workflow: Set(workflow_to_json(&data.workflow)),
            color: Set(data.color.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        for (index, field) in data.fields.iter().enumerate() {
            Self::add_field(db, model.id, field, field.effective_order(index)).await?;
        }

        let fields = Self::fields(db, model.id).await?;
        Self::from_model(model, fields)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: i64,
        payload: &UpdateTaskType,
    ) -> Result<Self, DbErr> {
        let record = task_type::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task type not found".to_string()))?;

        let mut active: task_type::ActiveModel = record.into();
        if let Some(name) = payload.name.clone() {
            active.name = Set(name);
        }
        if let Some(description) = payload.description.clone() {
            active.description = Set(description);
        }
        if let Some(color) = payload.color.clone() {
            active.color = Set(color);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        let fields = Self::fields(db, updated.id).await?;
        Self::from_model(updated, fields)
    }

    pub async fn set_workflow<C: ConnectionTrait>(
        db: &C,
        id: i64,
        workflow: &[String],
    ) -> Result<Self, DbErr> {
        let record = task_type::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task type not found".to_string()))?;

        let mut active: task_type::ActiveModel = record.into();
        active.workflow = Set(workflow_to_json(workflow));
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        let fields = Self::fields(db, updated.id).await?;
        Self::from_model(updated, fields)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = task_type::Entity::delete_many()
            .filter(task_type::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn status_counts<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<StatusCounts, DbErr> {
        let statuses: Vec<String> = task::Entity::find()
            .select_only()
            .column(task::Column::Status)
            .filter(task::Column::TaskTypeId.eq(id))
            .into_tuple()
            .all(db)
            .await?;
        Ok(count_statuses(statuses))
    }

    pub async fn stats<C: ConnectionTrait>(
        db: &C,
        task_type: &TaskType,
    ) -> Result<TaskTypeStats, DbErr> {
        let by_status = Self::status_counts(db, task_type.id).await?;
        Ok(TaskTypeStats {
            task_type_id: task_type.id,
            name: task_type.name.clone(),
            workflow: task_type.workflow.clone(),
            total: by_status.values().sum(),
            by_status,
        })
    }

    pub async fn fields<C: ConnectionTrait>(
        db: &C,
        task_type_id: i64,
    ) -> Result<Vec<TypeField>, DbErr> {
        let records = task_type_field::Entity::find()
            .filter(task_type_field::Column::TaskTypeId.eq(task_type_id))
            .order_by_asc(task_type_field::Column::Order)
            .order_by_asc(task_type_field::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(TypeField::from).collect())
    }

    pub async fn find_field<C: ConnectionTrait>(
        db: &C,
        task_type_id: i64,
        field_id: i64,
    ) -> Result<Option<TypeField>, DbErr> {
        let record = task_type_field::Entity::find()
            .filter(task_type_field::Column::Id.eq(field_id))
            .filter(task_type_field::Column::TaskTypeId.eq(task_type_id))
            .one(db)
            .await?;
        Ok(record.map(TypeField::from))
    }

    pub async fn add_field<C: ConnectionTrait>(
        db: &C,
        task_type_id: i64,
        field: &CreateTypeField,
        order: i32,
    ) -> Result<TypeField, DbErr> {
        let active = task_type_field::ActiveModel {
            task_type_id: Set(task_type_id),
            key: Set(field.key.clone()),
            label: Set(field.label.clone()),
            field_type: Set(field.field_type),
            options: Set(options_to_json(field.options.as_ref())),
            required: Set(field.required),
            order: Set(order),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(TypeField::from(model))
    }

    pub async fn update_field<C: ConnectionTrait>(
        db: &C,
        task_type_id: i64,
        field_id: i64,
        payload: &UpdateTypeField,
    ) -> Result<TypeField, DbErr> {
        let record = task_type_field::Entity::find()
            .filter(task_type_field::Column::Id.eq(field_id))
            .filter(task_type_field::Column::TaskTypeId.eq(task_type_id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Field not found".to_string()))?;

        let mut active: task_type_field::ActiveModel = record.into();
        if let Some(label) = payload.label.clone() {
            active.label = Set(label);
        }
        if let Some(field_type) = payload.field_type {
            active.field_type = Set(field_type);
        }
        if let Some(options) = payload.options.as_ref() {
            active.options = Set(options_to_json(options.as_ref()));
        }
        if let Some(required) = payload.required {
            active.required = Set(required);
        }
        if let Some(order) = payload.order {
            active.order = Set(order);
        }

        let updated = active.update(db).await?;
        Ok(TypeField::from(updated))
    }

    pub async fn delete_field<C: ConnectionTrait>(
        db: &C,
        task_type_id: i64,
        field_id: i64,
    ) -> Result<u64, DbErr> {
        let result = task_type_field::Entity::delete_many()
            .filter(task_type_field::Column::Id.eq(field_id))
            .filter(task_type_field::Column::TaskTypeId.eq(task_type_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
