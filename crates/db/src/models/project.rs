use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JsonValue,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utils::pagination::Page;

use crate::{
    entities::{project, project_dependency},
    models::{
        dependency::{DependencyError, validate_new_edge},
        project_type::ProjectType,
        task::TaskBrief,
        theme::ThemeBrief,
    },
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Dependency project not found")]
    DependencyNotFound,
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Project {
    pub id: i64,
    pub theme_id: Option<i64>,
    pub project_type_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    #[ts(type = "Record<string, unknown>")]
    pub custom_data: JsonValue,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ProjectBrief {
    pub id: i64,
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProjectWithRelations {
    #[serde(flatten)]
    pub project: Project,
    pub theme: Option<ThemeBrief>,
    pub project_type: Option<ProjectType>,
    pub dependencies: Vec<ProjectBrief>,
    pub dependents: Vec<ProjectBrief>,
    pub tasks: Vec<TaskBrief>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub theme_id: Option<i64>,
    pub project_type_id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateProject {
    pub title: String,
    pub description: Option<String>,
    pub theme_id: Option<i64>,
    pub project_type_id: i64,
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub custom_data: serde_json::Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateProject {
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
    pub theme_id: Option<Option<i64>>,
    pub status: Option<String>,
    #[ts(type = "Record<string, unknown> | null")]
    pub custom_data: Option<serde_json::Map<String, JsonValue>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AddDependency {
    pub depends_on_id: i64,
}

/// Validated column values for [`Project::update`].
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub theme_id: Option<Option<i64>>,
    pub status: Option<String>,
    pub custom_data: Option<JsonValue>,
}

impl Project {
    fn from_model(model: project::Model) -> Self {
        Self {
            id: model.id,
            theme_id: model.theme_id,
            project_type_id: model.project_type_id,
            title: model.title,
            description: model.description,
            status: model.status,
            custom_data: model.custom_data,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub fn brief(&self) -> ProjectBrief {
        ProjectBrief {
            id: self.id,
            title: self.title.clone(),
            status: self.status.clone(),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn exists<C: ConnectionTrait>(db: &C, id: i64) -> Result<bool, DbErr> {
        let count = project::Entity::find()
            .filter(project::Column::Id.eq(id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn list<C: ConnectionTrait>(
        db: &C,
        filter: &ProjectFilter,
        page: Page,
    ) -> Result<(Vec<Self>, u64), DbErr> {
        let mut query = project::Entity::find()
            .order_by_desc(project::Column::CreatedAt)
            .order_by_desc(project::Column::Id);
        if let Some(theme_id) = filter.theme_id {
            query = query.filter(project::Column::ThemeId.eq(theme_id));
        }
        if let Some(project_type_id) = filter.project_type_id {
            query = query.filter(project::Column::ProjectTypeId.eq(project_type_id));
        }
        if let Some(status) = filter.status.as_deref() {
            query = query.filter(project::Column::Status.eq(status));
        }
        let total = query.clone().count(db).await?;
        let records = query
            .offset(page.offset())
            .limit(page.page_size)
            .all(db)
            .await?;
        Ok((records.into_iter().map(Self::from_model).collect(), total))
    }

    pub async fn find_by_type<C: ConnectionTrait>(
        db: &C,
        project_type_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = project::Entity::find()
            .filter(project::Column::ProjectTypeId.eq(project_type_id))
            .order_by_asc(project::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn count_by_type<C: ConnectionTrait>(
        db: &C,
        project_type_id: i64,
    ) -> Result<u64, DbErr> {
        project::Entity::find()
            .filter(project::Column::ProjectTypeId.eq(project_type_id))
            .count(db)
            .await
    }

    pub async fn find_briefs_by_theme<C: ConnectionTrait>(
        db: &C,
        theme_id: i64,
    ) -> Result<Vec<ProjectBrief>, DbErr> {
        let records = project::Entity::find()
            .filter(project::Column::ThemeId.eq(theme_id))
            .order_by_desc(project::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(|model| Self::from_model(model).brief())
            .collect())
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateProject,
        status: &str,
        custom_data: JsonValue,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = project::ActiveModel {
            theme_id: Set(data.theme_id),
            project_type_id: Set(data.project_type_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            status: Set(status.to_string()),
            custom_data: Set(custom_data),
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
        changes: ProjectChanges,
    ) -> Result<Self, DbErr> {
        let record = project::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let mut active: project::ActiveModel = record.into();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(theme_id) = changes.theme_id {
            active.theme_id = Set(theme_id);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        if let Some(custom_data) = changes.custom_data {
            active.custom_data = Set(custom_data);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    /// Moves a project onto another type with an already resolved status and data.
    pub async fn retype<C: ConnectionTrait>(
        db: &C,
        id: i64,
        project_type_id: i64,
        status: &str,
        custom_data: JsonValue,
    ) -> Result<Self, DbErr> {
        let record = project::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let mut active: project::ActiveModel = record.into();
        active.project_type_id = Set(project_type_id);
        active.status = Set(status.to_string());
        active.custom_data = Set(custom_data);
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    pub async fn remap_status<C: ConnectionTrait>(
        db: &C,
        project_type_id: i64,
        from_status: &str,
        to_status: &str,
    ) -> Result<u64, DbErr> {
        let records = project::Entity::find()
            .filter(project::Column::ProjectTypeId.eq(project_type_id))
            .filter(project::Column::Status.eq(from_status))
            .all(db)
            .await?;
        let now = Utc::now();
        let mut updated = 0;
        for record in records {
            let mut active: project::ActiveModel = record.into();
            active.status = Set(to_status.to_string());
            active.updated_at = Set(now.into());
            active.update(db).await?;
            updated += 1;
        }
        Ok(updated)
    }

    /// Removes `key` from `custom_data` of every project of the given type.
    pub async fn prune_custom_data_key<C: ConnectionTrait>(
        db: &C,
        project_type_id: i64,
        key: &str,
    ) -> Result<u64, DbErr> {
        let records = project::Entity::find()
            .filter(project::Column::ProjectTypeId.eq(project_type_id))
            .all(db)
            .await?;
        let mut pruned = 0;
        for record in records {
            let mut data = record.custom_data.clone();
            let removed = data
                .as_object_mut()
                .and_then(|map| map.remove(key))
                .is_some();
            if !removed {
                continue;
            }
            let mut active: project::ActiveModel = record.into();
            active.custom_data = Set(data);
            active.update(db).await?;
            pruned += 1;
        }
        Ok(pruned)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = project::Entity::delete_many()
            .filter(project::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn dependency_edges<C: ConnectionTrait>(db: &C) -> Result<Vec<(i64, i64)>, DbErr> {
        project_dependency::Entity::find()
            .select_only()
            .column(project_dependency::Column::ProjectId)
            .column(project_dependency::Column::DependsOnId)
            .into_tuple()
            .all(db)
            .await
    }

    pub async fn add_dependency<C: ConnectionTrait>(
        db: &C,
        id: i64,
        depends_on_id: i64,
    ) -> Result<(), ProjectError> {
        if !Self::exists(db, id).await? {
            return Err(ProjectError::ProjectNotFound);
        }
        if id != depends_on_id && !Self::exists(db, depends_on_id).await? {
            return Err(ProjectError::DependencyNotFound);
        }
        let edges = Self::dependency_edges(db).await?;
        validate_new_edge(&edges, id, depends_on_id)?;

        project_dependency::ActiveModel {
            project_id: Set(id),
            depends_on_id: Set(depends_on_id),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    pub async fn remove_dependency<C: ConnectionTrait>(
        db: &C,
        id: i64,
        depends_on_id: i64,
    ) -> Result<u64, DbErr> {
        let result = project_dependency::Entity::delete_many()
            .filter(project_dependency::Column::ProjectId.eq(id))
            .filter(project_dependency::Column::DependsOnId.eq(depends_on_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Projects this project depends on.
    pub async fn dependencies<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Vec<ProjectBrief>, DbErr> {
        let ids: Vec<i64> = project_dependency::Entity::find()
            .select_only()
            .column(project_dependency::Column::DependsOnId)
            .filter(project_dependency::Column::ProjectId.eq(id))
            .into_tuple()
            .all(db)
            .await?;
        Self::briefs_by_ids(db, ids).await
    }

    /// Projects that depend on this project.
    pub async fn dependents<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Vec<ProjectBrief>, DbErr> {
        let ids: Vec<i64> = project_dependency::Entity::find()
            .select_only()
            .column(project_dependency::Column::ProjectId)
            .filter(project_dependency::Column::DependsOnId.eq(id))
            .into_tuple()
            .all(db)
            .await?;
        Self::briefs_by_ids(db, ids).await
    }

    async fn briefs_by_ids<C: ConnectionTrait>(
        db: &C,
        ids: Vec<i64>,
    ) -> Result<Vec<ProjectBrief>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = project::Entity::find()
            .filter(project::Column::Id.is_in(ids))
            .order_by_asc(project::Column::Id)
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(|model| Self::from_model(model).brief())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;
    use serde_json::json;

    use super::*;
    use crate::models::{
        project_type::{CreateProjectType, ProjectType},
        theme::{CreateTheme, Theme},
    };

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn initiative(db: &sea_orm::DatabaseConnection) -> ProjectType {
        ProjectType::create(
            db,
            &CreateProjectType {
                name: "Initiative".to_string(),
                slug: "initiative".to_string(),
                description: None,
                workflow: vec!["planning".into(), "active".into(), "done".into()],
                color: None,
                fields: Vec::new(),
            },
        )
        .await
        .unwrap()
    }

    async fn project(
        db: &sea_orm::DatabaseConnection,
        project_type_id: i64,
        title: &str,
        theme_id: Option<i64>,
    ) -> Project {
        Project::create(
            db,
            &CreateProject {
                title: title.to_string(),
                description: None,
                theme_id,
                project_type_id,
                custom_data: Default::default(),
            },
            "planning",
            json!({"owner": "ada", "budget": 3}),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn dependency_rules_are_enforced() {
        let db = setup_db().await;
        let kind = initiative(&db).await;
        let a = project(&db, kind.id, "A", None).await;
        let b = project(&db, kind.id, "B", None).await;
        let c = project(&db, kind.id, "C", None).await;

        Project::add_dependency(&db, a.id, b.id).await.unwrap();
        Project::add_dependency(&db, b.id, c.id).await.unwrap();

        assert!(matches!(
            Project::add_dependency(&db, c.id, a.id).await,
            Err(ProjectError::Dependency(DependencyError::Cycle))
        ));
        assert!(matches!(
            Project::add_dependency(&db, a.id, b.id).await,
            Err(ProjectError::Dependency(DependencyError::AlreadyExists))
        ));
        assert!(matches!(
            Project::add_dependency(&db, a.id, a.id).await,
            Err(ProjectError::Dependency(DependencyError::SelfDependency))
        ));
        assert!(matches!(
            Project::add_dependency(&db, a.id, 999).await,
            Err(ProjectError::DependencyNotFound)
        ));
        assert!(matches!(
            Project::add_dependency(&db, 999, a.id).await,
            Err(ProjectError::ProjectNotFound)
        ));

        assert_eq!(Project::dependencies(&db, a.id).await.unwrap(), vec![b.brief()]);
        assert_eq!(Project::dependents(&db, c.id).await.unwrap(), vec![b.brief()]);

        assert_eq!(Project::remove_dependency(&db, a.id, b.id).await.unwrap(), 1);
        assert_eq!(Project::remove_dependency(&db, a.id, b.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_theme_detaches_projects() {
        let db = setup_db().await;
        let kind = initiative(&db).await;
        let theme = Theme::create(
            &db,
            &CreateTheme {
                title: "Q1".to_string(),
                description: None,
                status: None,
            },
            "active",
        )
        .await
        .unwrap();
        let linked = project(&db, kind.id, "Linked", Some(theme.id)).await;

        assert_eq!(
            Project::find_briefs_by_theme(&db, theme.id).await.unwrap(),
            vec![linked.brief()]
        );

        Theme::delete(&db, theme.id).await.unwrap();
        let reloaded = Project::find_by_id(&db, linked.id).await.unwrap().unwrap();
        assert_eq!(reloaded.theme_id, None);
    }

    #[tokio::test]
    async fn remap_and_prune_touch_only_matching_records() {
        let db = setup_db().await;
        let kind = initiative(&db).await;
        let first = project(&db, kind.id, "First", None).await;
        let second = project(&db, kind.id, "Second", None).await;
        Project::update(
            &db,
            second.id,
            ProjectChanges {
                status: Some("active".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(
            Project::remap_status(&db, kind.id, "planning", "done").await.unwrap(),
            1
        );
        let counts = ProjectType::status_counts(&db, kind.id).await.unwrap();
        assert_eq!(counts.get("done"), Some(&1));
        assert_eq!(counts.get("active"), Some(&1));

        assert_eq!(
            Project::prune_custom_data_key(&db, kind.id, "owner").await.unwrap(),
            2
        );
        let reloaded = Project::find_by_id(&db, first.id).await.unwrap().unwrap();
        assert_eq!(reloaded.custom_data, json!({"budget": 3}));

        assert!(ProjectType::delete(&db, kind.id).await.is_err());
    }
}
