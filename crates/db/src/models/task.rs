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
    entities::{task, task_dependency},
    models::{
        dependency::{DependencyError, validate_new_edge},
        github_link::GitHubLink,
    },
    retry::retry_on_unique_violation,
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Dependency task not found")]
    DependencyNotFound,
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: i64,
    pub display_id: String,
    pub project_id: Option<i64>,
    pub team_id: i64,
    pub task_type_id: i64,
    pub release_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub estimation: Option<f64>,
    #[ts(type = "Record<string, unknown>")]
    pub custom_data: JsonValue,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct TaskBrief {
    pub id: i64,
    pub display_id: String,
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaskWithRelations {
    #[serde(flatten)]
    pub task: Task,
    pub dependencies: Vec<TaskBrief>,
    pub dependents: Vec<TaskBrief>,
    pub github_links: Vec<GitHubLink>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub team_id: Option<i64>,
    pub project_id: Option<i64>,
    pub release_id: Option<i64>,
    pub task_type_id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub team_id: i64,
    pub task_type_id: i64,
    pub project_id: Option<i64>,
    pub release_id: Option<i64>,
    pub estimation: Option<f64>,
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub custom_data: serde_json::Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateTask {
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::patch::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub description: Option<Option<String>>,
    pub team_id: Option<i64>,
    pub task_type_id: Option<i64>,
    #[serde(
        default,
        deserialize_with = "utils::patch::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub project_id: Option<Option<i64>>,
    #[serde(
        default,
        deserialize_with = "utils::patch::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub release_id: Option<Option<i64>>,
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::patch::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub estimation: Option<Option<f64>>,
    #[ts(type = "Record<string, unknown> | null")]
    pub custom_data: Option<serde_json::Map<String, JsonValue>>,
}

/// Validated column values for [`Task::update`].
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub team_id: Option<i64>,
    pub task_type_id: Option<i64>,
    pub project_id: Option<Option<i64>>,
    pub release_id: Option<Option<i64>>,
    pub status: Option<String>,
    pub estimation: Option<Option<f64>>,
    pub custom_data: Option<JsonValue>,
}

impl Task {
    fn from_model(model: task::Model) -> Self {
        Self {
            id: model.id,
            display_id: model.display_id,
            project_id: model.project_id,
            team_id: model.team_id,
            task_type_id: model.task_type_id,
            release_id: model.release_id,
            title: model.title,
            description: model.description,
            status: model.status,
            estimation: model.estimation,
            custom_data: model.custom_data,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub fn brief(&self) -> TaskBrief {
        TaskBrief {
            id: self.id,
            display_id: self.display_id.clone(),
            title: self.title.clone(),
            status: self.status.clone(),
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    /// Display ids are stored upper-cased, so lookups ignore case.
    pub async fn find_by_display_id<C: ConnectionTrait>(
        db: &C,
        display_id: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::DisplayId.eq(display_id.trim().to_uppercase()))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_many_by_display_ids<C: ConnectionTrait>(
        db: &C,
        display_ids: &[String],
    ) -> Result<Vec<Self>, DbErr> {
        if display_ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = task::Entity::find()
            .filter(task::Column::DisplayId.is_in(display_ids.iter().map(|id| id.to_uppercase())))
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn exists<C: ConnectionTrait>(db: &C, id: i64) -> Result<bool, DbErr> {
        let count = task::Entity::find()
            .filter(task::Column::Id.eq(id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn list<C: ConnectionTrait>(
        db: &C,
        filter: &TaskFilter,
        page: Page,
    ) -> Result<(Vec<Self>, u64), DbErr> {
        let mut query = task::Entity::find()
            .order_by_desc(task::Column::CreatedAt)
            .order_by_desc(task::Column::Id);
        if let Some(team_id) = filter.team_id {
            query = query.filter(task::Column::TeamId.eq(team_id));
        }
        if let Some(project_id) = filter.project_id {
            query = query.filter(task::Column::ProjectId.eq(project_id));
        }
        if let Some(release_id) = filter.release_id {
            query = query.filter(task::Column::ReleaseId.eq(release_id));
        }
        if let Some(task_type_id) = filter.task_type_id {
            query = query.filter(task::Column::TaskTypeId.eq(task_type_id));
        }
        if let Some(status) = filter.status.as_deref() {
            query = query.filter(task::Column::Status.eq(status));
        }
        let total = query.clone().count(db).await?;
        let records = query
            .offset(page.offset())
            .limit(page.page_size)
            .all(db)
            .await?;
        Ok((records.into_iter().map(Self::from_model).collect(), total))
    }

    /// Every task of a team, oldest first.
    pub async fn find_by_team<C: ConnectionTrait>(
        db: &C,
        team_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = task::Entity::find()
            .filter(task::Column::TeamId.eq(team_id))
            .order_by_asc(task::Column::CreatedAt)
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_type<C: ConnectionTrait>(
        db: &C,
        task_type_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = task::Entity::find()
            .filter(task::Column::TaskTypeId.eq(task_type_id))
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn count_by_team<C: ConnectionTrait>(db: &C, team_id: i64) -> Result<u64, DbErr> {
        task::Entity::find()
            .filter(task::Column::TeamId.eq(team_id))
            .count(db)
            .await
    }

    pub async fn count_by_type<C: ConnectionTrait>(
        db: &C,
        task_type_id: i64,
    ) -> Result<u64, DbErr> {
        task::Entity::find()
            .filter(task::Column::TaskTypeId.eq(task_type_id))
            .count(db)
            .await
    }

    pub async fn find_briefs_by_project<C: ConnectionTrait>(
        db: &C,
        project_id: i64,
    ) -> Result<Vec<TaskBrief>, DbErr> {
        let records = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_id))
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(|model| Self::from_model(model).brief())
            .collect())
    }

    pub async fn find_briefs_by_release<C: ConnectionTrait>(
        db: &C,
        release_id: i64,
    ) -> Result<Vec<TaskBrief>, DbErr> {
        let records = task::Entity::find()
            .filter(task::Column::ReleaseId.eq(release_id))
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(|model| Self::from_model(model).brief())
            .collect())
    }

    async fn next_number<C: ConnectionTrait>(db: &C) -> Result<i64, DbErr> {
        let last: Option<i64> = task::Entity::find()
            .select_only()
            .column(task::Column::Id)
            .order_by_desc(task::Column::Id)
            .into_tuple()
            .one(db)
            .await?;
        Ok(last.unwrap_or(0) + 1)
    }

    /// Inserts a task with a fresh `PREFIX-N` display id.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        prefix: &str,
        data: &CreateTask,
        status: &str,
        custom_data: JsonValue,
    ) -> Result<Self, DbErr> {
        let custom_data = &custom_data;
        let model = retry_on_unique_violation(|attempt| async move {
            let number = Self::next_number(db).await? + attempt as i64;
            let now = Utc::now();
            let active = task::ActiveModel {
                display_id: Set(format!("{}-{}", prefix.to_uppercase(), number)),
                project_id: Set(data.project_id),
                team_id: Set(data.team_id),
                task_type_id: Set(data.task_type_id),
                release_id: Set(data.release_id),
                title: Set(data.title.clone()),
                description: Set(data.description.clone()),
                status: Set(status.to_string()),
                estimation: Set(data.estimation),
                custom_data: Set(custom_data.clone()),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            };
            active.insert(db).await
        })
        .await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: i64,
        changes: TaskChanges,
    ) -> Result<Self, DbErr> {
        let record = task::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let mut active: task::ActiveModel = record.into();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(team_id) = changes.team_id {
            active.team_id = Set(team_id);
        }
        if let Some(task_type_id) = changes.task_type_id {
            active.task_type_id = Set(task_type_id);
        }
        if let Some(project_id) = changes.project_id {
            active.project_id = Set(project_id);
        }
        if let Some(release_id) = changes.release_id {
            active.release_id = Set(release_id);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        if let Some(estimation) = changes.estimation {
            active.estimation = Set(estimation);
        }
        if let Some(custom_data) = changes.custom_data {
            active.custom_data = Set(custom_data);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    pub async fn update_status<C: ConnectionTrait>(
        db: &C,
        id: i64,
        status: &str,
    ) -> Result<Self, DbErr> {
        Self::update(
            db,
            id,
            TaskChanges {
                status: Some(status.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Moves a task onto another team/type with an already resolved status and data.
    pub async fn retype<C: ConnectionTrait>(
        db: &C,
        id: i64,
        team_id: i64,
        task_type_id: i64,
        status: &str,
        custom_data: JsonValue,
    ) -> Result<Self, DbErr> {
        Self::update(
            db,
            id,
            TaskChanges {
                team_id: Some(team_id),
                task_type_id: Some(task_type_id),
                status: Some(status.to_string()),
                custom_data: Some(custom_data),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn remap_status<C: ConnectionTrait>(
        db: &C,
        task_type_id: i64,
        from_status: &str,
        to_status: &str,
    ) -> Result<u64, DbErr> {
        let records = task::Entity::find()
            .filter(task::Column::TaskTypeId.eq(task_type_id))
            .filter(task::Column::Status.eq(from_status))
            .all(db)
            .await?;
        let now = Utc::now();
        let mut updated = 0;
        for record in records {
            let mut active: task::ActiveModel = record.into();
            active.status = Set(to_status.to_string());
            active.updated_at = Set(now.into());
            active.update(db).await?;
            updated += 1;
        }
        Ok(updated)
    }

    /// Removes `key` from `custom_data` of every task of the given type.
    pub async fn prune_custom_data_key<C: ConnectionTrait>(
        db: &C,
        task_type_id: i64,
        key: &str,
    ) -> Result<u64, DbErr> {
        let records = task::Entity::find()
            .filter(task::Column::TaskTypeId.eq(task_type_id))
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
            let mut active: task::ActiveModel = record.into();
            active.custom_data = Set(data);
            active.update(db).await?;
            pruned += 1;
        }
        Ok(pruned)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = task::Entity::delete_many()
            .filter(task::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn dependency_edges<C: ConnectionTrait>(db: &C) -> Result<Vec<(i64, i64)>, DbErr> {
        task_dependency::Entity::find()
            .select_only()
            .column(task_dependency::Column::TaskId)
            .column(task_dependency::Column::DependsOnId)
            .into_tuple()
            .all(db)
            .await
    }

    pub async fn add_dependency<C: ConnectionTrait>(
        db: &C,
        id: i64,
        depends_on_id: i64,
    ) -> Result<(), TaskError> {
        if !Self::exists(db, id).await? {
            return Err(TaskError::TaskNotFound);
        }
        if id != depends_on_id && !Self::exists(db, depends_on_id).await? {
            return Err(TaskError::DependencyNotFound);
        }
        let edges = Self::dependency_edges(db).await?;
        validate_new_edge(&edges, id, depends_on_id)?;

        task_dependency::ActiveModel {
            task_id: Set(id),
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
        let result = task_dependency::Entity::delete_many()
            .filter(task_dependency::Column::TaskId.eq(id))
            .filter(task_dependency::Column::DependsOnId.eq(depends_on_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Tasks this task depends on.
    pub async fn dependencies<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Vec<TaskBrief>, DbErr> {
        let ids: Vec<i64> = task_dependency::Entity::find()
            .select_only()
            .column(task_dependency::Column::DependsOnId)
            .filter(task_dependency::Column::TaskId.eq(id))
            .into_tuple()
            .all(db)
            .await?;
        Self::briefs_by_ids(db, ids).await
    }

    /// Tasks blocked on this task.
    pub async fn dependents<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Vec<TaskBrief>, DbErr> {
        let ids: Vec<i64> = task_dependency::Entity::find()
            .select_only()
            .column(task_dependency::Column::TaskId)
            .filter(task_dependency::Column::DependsOnId.eq(id))
            .into_tuple()
            .all(db)
            .await?;
        Self::briefs_by_ids(db, ids).await
    }

    async fn briefs_by_ids<C: ConnectionTrait>(
        db: &C,
        ids: Vec<i64>,
    ) -> Result<Vec<TaskBrief>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = task::Entity::find()
            .filter(task::Column::Id.is_in(ids))
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(|model| Self::from_model(model).brief())
            .collect())
    }
}
