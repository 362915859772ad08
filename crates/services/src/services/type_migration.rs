//! Workflow edits, type migration and schema changes that touch records.
//!
//! Each operation runs inside one transaction so a failed remap never leaves
//! records split across two workflows.

use db::{
    DbErr, DbPool,
    models::{
        project::Project,
        project_type::{ProjectType, UpdateProjectType},
        task::Task,
        task_type::{TaskType, UpdateTaskType},
        type_field::{MigrateType, MigrationResult, StatusMapping, TypeField},
    },
};
use sea_orm::TransactionTrait;
use thiserror::Error;

use super::{
    custom_fields::reshape_custom_data,
    migration_plan::MigrationPlan,
    workflow::{Workflow, WorkflowError, resolve_status_mappings},
};

#[derive(Debug, Error)]
pub enum TypeMigrationError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("{0} not found")]
    SourceNotFound(&'static str),
    #[error("Target {0} not found")]
    TargetNotFound(&'static str),
    #[error("Cannot migrate to the same {0}")]
    SameType(&'static str),
    #[error("Field not found")]
    FieldNotFound,
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("Cannot delete {kind} with {count} existing records. Migrate them first")]
    InUse { kind: &'static str, count: u64 },
}

const PROJECT_TYPE: &str = "project type";
const TASK_TYPE: &str = "task type";

/// Replaces a project type's workflow, remapping records in removed statuses.
pub async fn update_project_type_workflow(
    pool: &DbPool,
    project_type_id: i64,
    workflow: &[String],
    mappings: &[StatusMapping],
) -> Result<ProjectType, TypeMigrationError> {
    let workflow = Workflow::new(workflow)?;
    let tx = pool.begin().await?;

    if ProjectType::find_by_id(&tx, project_type_id).await?.is_none() {
        return Err(TypeMigrationError::SourceNotFound("Project type"));
    }
    let counts = ProjectType::status_counts(&tx, project_type_id).await?;
    let resolved = resolve_status_mappings(&counts, mappings, &workflow)?;
    for (from, to) in &resolved {
        let moved = Project::remap_status(&tx, project_type_id, from, to).await?;
        tracing::debug!(project_type_id, from, to, moved, "Remapped project status");
    }
    let updated = ProjectType::set_workflow(&tx, project_type_id, workflow.statuses()).await?;

    tx.commit().await?;
    Ok(updated)
}

/// Applies a PATCH; a workflow change follows the same removed-status rule with no mappings.
pub async fn update_project_type(
    pool: &DbPool,
    project_type_id: i64,
    payload: &UpdateProjectType,
) -> Result<ProjectType, TypeMigrationError> {
    let tx = pool.begin().await?;

    if ProjectType::find_by_id(&tx, project_type_id).await?.is_none() {
        return Err(TypeMigrationError::SourceNotFound("Project type"));
    }
    if let Some(workflow) = payload.workflow.as_ref() {
        let workflow = Workflow::new(workflow)?;
        let counts = ProjectType::status_counts(&tx, project_type_id).await?;
        resolve_status_mappings(&counts, &[], &workflow)?;
        ProjectType::set_workflow(&tx, project_type_id, workflow.statuses()).await?;
    }
    let updated = ProjectType::update(&tx, project_type_id, payload).await?;

    tx.commit().await?;
    Ok(updated)
}

/// Moves every project of `source_id` onto the target type.
///
/// With `delete_source` every populated status must be mapped and the source
/// type is removed in the same transaction.
pub async fn migrate_project_type(
    pool: &DbPool,
    source_id: i64,
    payload: &MigrateType,
) -> Result<MigrationResult, TypeMigrationError> {
    let tx = pool.begin().await?;

    let source = ProjectType::find_by_id(&tx, source_id)
        .await?
        .ok_or(TypeMigrationError::SourceNotFound("Source project type"))?;
    let target = ProjectType::find_by_id(&tx, payload.target_type_id)
        .await?
        .ok_or(TypeMigrationError::TargetNotFound(PROJECT_TYPE))?;
    if target.id == source.id {
        return Err(TypeMigrationError::SameType(PROJECT_TYPE));
    }

    let counts = ProjectType::status_counts(&tx, source.id).await?;
    let plan = MigrationPlan::new(
        &counts,
        &payload.status_mappings,
        &Workflow::from_stored(&target.workflow),
    )?;
    if payload.delete_source {
        plan.ensure_complete()?;
    }

    let mut migrated = 0;
    for project in Project::find_by_type(&tx, source.id).await? {
        let status = plan.target_status(&project.status);
        let custom_data = reshape_custom_data(&target.fields, &project.custom_data);
        Project::retype(&tx, project.id, target.id, status, custom_data).await?;
        migrated += 1;
    }
    if payload.delete_source {
        ProjectType::delete(&tx, source.id).await?;
    }

    tx.commit().await?;
    tracing::info!(
        source_id,
        target_id = target.id,
        migrated,
        source_deleted = payload.delete_source,
        "Migrated projects between types"
    );
    Ok(MigrationResult {
        migrated,
        source_deleted: payload.delete_source,
    })
}

pub async fn delete_project_type(
    pool: &DbPool,
    project_type_id: i64,
) -> Result<(), TypeMigrationError> {
    let tx = pool.begin().await?;
    if ProjectType::find_by_id(&tx, project_type_id).await?.is_none() {
        return Err(TypeMigrationError::SourceNotFound("Project type"));
    }
    let count = Project::count_by_type(&tx, project_type_id).await?;
    if count > 0 {
        return Err(TypeMigrationError::InUse {
            kind: PROJECT_TYPE,
            count,
        });
    }
    ProjectType::delete(&tx, project_type_id).await?;
    tx.commit().await?;
    Ok(())
}

/// Deletes a field definition and prunes its key from every project's data.
pub async fn delete_project_type_field(
    pool: &DbPool,
    project_type_id: i64,
    field_id: i64,
) -> Result<u64, TypeMigrationError> {
    let tx = pool.begin().await?;
    let field: TypeField = ProjectType::find_field(&tx, project_type_id, field_id)
        .await?
        .ok_or(TypeMigrationError::FieldNotFound)?;
    ProjectType::delete_field(&tx, project_type_id, field_id).await?;
    let pruned = Project::prune_custom_data_key(&tx, project_type_id, &field.key).await?;
    tx.commit().await?;
    Ok(pruned)
}

pub async fn update_task_type_workflow(
    pool: &DbPool,
    task_type_id: i64,
    workflow: &[String],
    mappings: &[StatusMapping],
) -> Result<TaskType, TypeMigrationError> {
    let workflow = Workflow::new(workflow)?;
    let tx = pool.begin().await?;

    if TaskType::find_by_id(&tx, task_type_id).await?.is_none() {
        return Err(TypeMigrationError::SourceNotFound("Task type"));
    }
    let counts = TaskType::status_counts(&tx, task_type_id).await?;
    let resolved = resolve_status_mappings(&counts, mappings, &workflow)?;
    for (from, to) in &resolved {
        let moved = Task::remap_status(&tx, task_type_id, from, to).await?;
        tracing::debug!(task_type_id, from, to, moved, "Remapped task status");
    }
    let updated = TaskType::set_workflow(&tx, task_type_id, workflow.statuses()).await?;

    tx.commit().await?;
    Ok(updated)
}

pub async fn update_task_type(
    pool: &DbPool,
    task_type_id: i64,
    payload: &UpdateTaskType,
) -> Result<TaskType, TypeMigrationError> {
    let tx = pool.begin().await?;

    if TaskType::find_by_id(&tx, task_type_id).await?.is_none() {
        return Err(TypeMigrationError::SourceNotFound("Task type"));
    }
    if let Some(workflow) = payload.workflow.as_ref() {
        let workflow = Workflow::new(workflow)?;
        let counts = TaskType::status_counts(&tx, task_type_id).await?;
        resolve_status_mappings(&counts, &[], &workflow)?;
        TaskType::set_workflow(&tx, task_type_id, workflow.statuses()).await?;
    }
    let updated = TaskType::update(&tx, task_type_id, payload).await?;

    tx.commit().await?;
    Ok(updated)
}

/// Moves every task of `source_id` onto the target type and its team.
pub async fn migrate_task_type(
    pool: &DbPool,
    source_id: i64,
    payload: &MigrateType,
) -> Result<MigrationResult, TypeMigrationError> {
    let tx = pool.begin().await?;

    let source = TaskType::find_by_id(&tx, source_id)
        .await?
        .ok_or(TypeMigrationError::SourceNotFound("Source task type"))?;
    let target = TaskType::find_by_id(&tx, payload.target_type_id)
        .await?
        .ok_or(TypeMigrationError::TargetNotFound(TASK_TYPE))?;
    if target.id == source.id {
        return Err(TypeMigrationError::SameType(TASK_TYPE));
    }

    let counts = TaskType::status_counts(&tx, source.id).await?;
    let plan = MigrationPlan::new(
        &counts,
        &payload.status_mappings,
        &Workflow::from_stored(&target.workflow),
    )?;
    if payload.delete_source {
        plan.ensure_complete()?;
    }

    let mut migrated = 0;
    for task in Task::find_by_type(&tx, source.id).await? {
        let status = plan.target_status(&task.status);
        let custom_data = reshape_custom_data(&target.fields, &task.custom_data);
        Task::retype(&tx, task.id, target.team_id, target.id, status, custom_data).await?;
        migrated += 1;
    }
    if payload.delete_source {
        TaskType::delete(&tx, source.id).await?;
    }

    tx.commit().await?;
    tracing::info!(
        source_id,
        target_id = target.id,
        migrated,
        source_deleted = payload.delete_source,
        "Migrated tasks between types"
    );
    Ok(MigrationResult {
        migrated,
        source_deleted: payload.delete_source,
    })
}

pub async fn delete_task_type(pool: &DbPool, task_type_id: i64) -> Result<(), TypeMigrationError> {
    let tx = pool.begin().await?;
    if TaskType::find_by_id(&tx, task_type_id).await?.is_none() {
        return Err(TypeMigrationError::SourceNotFound("Task type"));
    }
    let count = Task::count_by_type(&tx, task_type_id).await?;
    if count > 0 {
        return Err(TypeMigrationError::InUse {
            kind: TASK_TYPE,
            count,
        });
    }
    TaskType::delete(&tx, task_type_id).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn delete_task_type_field(
    pool: &DbPool,
    task_type_id: i64,
    field_id: i64,
) -> Result<u64, TypeMigrationError> {
    let tx = pool.begin().await?;
    let field = TaskType::find_field(&tx, task_type_id, field_id)
        .await?
        .ok_or(TypeMigrationError::FieldNotFound)?;
    TaskType::delete_field(&tx, task_type_id, field_id).await?;
    let pruned = Task::prune_custom_data_key(&tx, task_type_id, &field.key).await?;
    tx.commit().await?;
    Ok(pruned)
}
