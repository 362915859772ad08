use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::pagination::Page;

use crate::{
    entities::{project, project_type, project_type_field},
    models::type_field::{
        CreateTypeField, StatusCounts, TypeField, UpdateTypeField, count_statuses,
        options_to_json, workflow_from_json, workflow_to_json,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProjectType {
    pub id: i64,
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
pub struct CreateProjectType {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub workflow: Vec<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub fields: Vec<CreateTypeField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateProjectType {
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
pub struct ProjectTypeStats {
    pub project_type_id: i64,
    pub name: String,
    pub workflow: Vec<String>,
    pub total: u64,
    pub by_status: StatusCounts,
}

impl ProjectType {
    fn from_model(model: project_type::Model, fields: Vec<TypeField>) -> Result<Self, DbErr> {
        Ok(Self {
            id: model.id,
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
        let Some(record) = project_type::Entity::find_by_id(id).one(db).await? else {
            return Ok(None);
        };
        let fields = Self::fields(db, record.id).await?;
        Self::from_model(record, fields).map(Some)
    }

    pub async fn slug_exists<C: ConnectionTrait>(db: &C, slug: &str) -> Result<bool, DbErr> {
        let count = project_type::Entity::find()
            .filter(project_type::Column::Slug.eq(slug))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn list<C: ConnectionTrait>(db: &C, page: Page) -> Result<(Vec<Self>, u64), DbErr> {
        let query = project_type::Entity::find().order_by_asc(project_type::Column::Name);
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

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateProjectType,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = project_type::ActiveModel {
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

    /// Updates descriptive columns; workflow changes go through [`Self::set_workflow`].
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: i64,
        payload: &UpdateProjectType,
    ) -> Result<Self, DbErr> {
        let record = project_type::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Project type not found".to_string()))?;

        let mut active: project_type::ActiveModel = record.into();
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
        let record = project_type::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Project type not found".to_string()))?;

        let mut active: project_type::ActiveModel = record.into();
        active.workflow = Set(workflow_to_json(workflow));
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        let fields = Self::fields(db, updated.id).await?;
        Self::from_model(updated, fields)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = project_type::Entity::delete_many()
            .filter(project_type::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn status_counts<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<StatusCounts, DbErr> {
        let statuses: Vec<String> = project::Entity::find()
            .select_only()
            .column(project::Column::Status)
            .filter(project::Column::ProjectTypeId.eq(id))
            .into_tuple()
            .all(db)
            .await?;
        Ok(count_statuses(statuses))
    }

    pub async fn stats<C: ConnectionTrait>(
        db: &C,
        project_type: &ProjectType,
    ) -> Result<ProjectTypeStats, DbErr> {
        let by_status = Self::status_counts(db, project_type.id).await?;
        Ok(ProjectTypeStats {
            project_type_id: project_type.id,
            name: project_type.name.clone(),
            workflow: project_type.workflow.clone(),
            total: by_status.values().sum(),
            by_status,
        })
    }

    pub async fn fields<C: ConnectionTrait>(
        db: &C,
        project_type_id: i64,
    ) -> Result<Vec<TypeField>, DbErr> {
        let records = project_type_field::Entity::find()
            .filter(project_type_field::Column::ProjectTypeId.eq(project_type_id))
            .order_by_asc(project_type_field::Column::Order)
            .order_by_asc(project_type_field::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(TypeField::from).collect())
    }

    pub async fn find_field<C: ConnectionTrait>(
        db: &C,
        project_type_id: i64,
        field_id: i64,
    ) -> Result<Option<TypeField>, DbErr> {
        let record = project_type_field::Entity::find()
            .filter(project_type_field::Column::Id.eq(field_id))
            .filter(project_type_field::Column::ProjectTypeId.eq(project_type_id))
            .one(db)
            .await?;
        Ok(record.map(TypeField::from))
    }

    pub async fn add_field<C: ConnectionTrait>(
        db: &C,
        project_type_id: i64,
        field: &CreateTypeField,
        order: i32,
    ) -> Result<TypeField, DbErr> {
        let active = project_type_field::ActiveModel {
            project_type_id: Set(project_type_id),
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
        project_type_id: i64,
        field_id: i64,
        payload: &UpdateTypeField,
    ) -> Result<TypeField, DbErr> {
        let record = project_type_field::Entity::find()
            .filter(project_type_field::Column::Id.eq(field_id))
            .filter(project_type_field::Column::ProjectTypeId.eq(project_type_id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Field not found".to_string()))?;

        let mut active: project_type_field::ActiveModel = record.into();
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
        project_type_id: i64,
        field_id: i64,
    ) -> Result<u64, DbErr> {
        let result = project_type_field::Entity::delete_many()
            .filter(project_type_field::Column::Id.eq(field_id))
            .filter(project_type_field::Column::ProjectTypeId.eq(project_type_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::types::FieldType;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    fn epic() -> CreateProjectType {
        CreateProjectType {
            name: "Epic".to_string(),
            slug: "epic".to_string(),
            description: None,
            workflow: vec!["draft".into(), "active".into(), "done".into()],
            color: Some("#7c3aed".to_string()),
            fields: vec![
                CreateTypeField {
                    key: "owner".to_string(),
                    label: "Owner".to_string(),
                    field_type: FieldType::Text,
                    options: None,
                    required: false,
                    order: Some(5),
                },
                CreateTypeField {
                    key: "size".to_string(),
                    label: "Size".to_string(),
                    field_type: FieldType::Select,
                    options: Some(vec!["s".into(), "m".into(), "l".into()]),
                    required: true,
                    order: None,
                },
            ],
        }
    }

    #[tokio::test]
    async fn create_persists_workflow_and_ordered_fields() {
        let db = setup_db().await;
        let created = ProjectType::create(&db, &epic()).await.unwrap();

        assert_eq!(created.workflow, vec!["draft", "active", "done"]);
        let keys: Vec<_> = created.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["size", "owner"]);
        assert_eq!(
            created.fields[0].options.as_deref(),
            Some(&["s".to_string(), "m".to_string(), "l".to_string()][..])
        );

        assert!(ProjectType::slug_exists(&db, "epic").await.unwrap());
        assert!(ProjectType::create(&db, &epic()).await.is_err());
    }

    #[tokio::test]
    async fn field_updates_and_deletes_are_scoped_to_type() {
        let db = setup_db().await;
        let created = ProjectType::create(&db, &epic()).await.unwrap();
        let field_id = created.fields[1].id;

        let patch = UpdateTypeField {
            label: Some("Owner team".to_string()),
            required: Some(true),
            ..Default::default()
        };
        let updated = ProjectType::update_field(&db, created.id, field_id, &patch)
            .await
            .unwrap();
        assert_eq!(updated.label, "Owner team");
        assert!(updated.required);
        assert_eq!(updated.key, "owner");

        let wrong_type = ProjectType::update_field(&db, created.id + 1, field_id, &patch).await;
        assert!(matches!(wrong_type, Err(DbErr::RecordNotFound(_))));

        assert_eq!(
            ProjectType::delete_field(&db, created.id, field_id).await.unwrap(),
            1
        );
        assert_eq!(ProjectType::fields(&db, created.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn set_workflow_replaces_steps() {
        let db = setup_db().await;
        let created = ProjectType::create(&db, &epic()).await.unwrap();

        let updated = ProjectType::set_workflow(&db, created.id, &["open".into(), "closed".into()])
            .await
            .unwrap();
        assert_eq!(updated.workflow, vec!["open", "closed"]);

        let stats = ProjectType::stats(&db, &updated).await.unwrap();
        assert_eq!(stats.total, 0);
        assert!(stats.by_status.is_empty());
    }
}
