//! Team removal with optional task reassignment.

use std::collections::HashMap;

use db::{
    DbErr, DbPool,
    models::{task::Task, task_type::TaskType, team::Team},
};
use sea_orm::TransactionTrait;
use thiserror::Error;

use super::{custom_fields::reshape_custom_data, workflow::Workflow};

#[derive(Debug, Error)]
pub enum TeamDeletionError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Team not found")]
    TeamNotFound,
    #[error(
        "Team has {0} tasks. Provide reassign_tasks_to with a target team ID to move tasks before deletion"
    )]
    TasksRequireReassignment(u64),
    #[error("Target team for reassignment not found")]
    TargetNotFound,
    #[error("Cannot reassign tasks to the same team")]
    SameTeam,
    #[error("Target team has no task types to receive tasks")]
    TargetHasNoTaskTypes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamDeletion {
    pub team_name: String,
    pub reassigned: u64,
}

/// Picks the target type for each source type: same slug first, else the
/// target team's first type by name.
fn map_task_types(source: &[TaskType], target: &[TaskType]) -> HashMap<i64, usize> {
    source
        .iter()
        .map(|source_type| {
            let index = target
                .iter()
                .position(|candidate| candidate.slug == source_type.slug)
                .unwrap_or(0);
            (source_type.id, index)
        })
        .collect()
}

/// Deletes a team. Teams that still own tasks need `reassign_to`; the tasks
/// move over in the same transaction as the delete.
pub async fn delete_team(
    pool: &DbPool,
    team_id: i64,
    reassign_to: Option<i64>,
) -> Result<TeamDeletion, TeamDeletionError> {
    let tx = pool.begin().await?;

    let team = Team::find_by_id(&tx, team_id)
        .await?
        .ok_or(TeamDeletionError::TeamNotFound)?;
    let task_count = Task::count_by_team(&tx, team_id).await?;

    let mut reassigned = 0;
    if task_count > 0 {
        let target_id = reassign_to.ok_or(TeamDeletionError::TasksRequireReassignment(task_count))?;
        if target_id == team_id {
            return Err(TeamDeletionError::SameTeam);
        }
        let target = Team::find_by_id(&tx, target_id)
            .await?
            .ok_or(TeamDeletionError::TargetNotFound)?;
        let target_types = TaskType::find_by_team(&tx, target.id).await?;
        if target_types.is_empty() {
            return Err(TeamDeletionError::TargetHasNoTaskTypes);
        }
        let source_types = TaskType::find_by_team(&tx, team_id).await?;
        let type_map = map_task_types(&source_types, &target_types);

        for task in Task::find_by_team(&tx, team_id).await? {
            let index = type_map.get(&task.task_type_id).copied().unwrap_or(0);
            let new_type = &target_types[index];
            let status = Workflow::from_stored(&new_type.workflow).coerce_status(&task.status);
            let custom_data = reshape_custom_data(&new_type.fields, &task.custom_data);
            Task::retype(&tx, task.id, target.id, new_type.id, &status, custom_data).await?;
            reassigned += 1;
        }
        tracing::info!(team_id, target_id, reassigned, "Reassigned tasks before team deletion");
    }

    Team::delete(&tx, team_id).await?;
    tx.commit().await?;

    Ok(TeamDeletion {
        team_name: team.name,
        reassigned,
    })
}
