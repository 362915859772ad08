//! Migrate-then-delete for project and task types.
//!
//! The plan is checked locally first so an incomplete mapping never reaches
//! the server; the server then migrates and deletes in one transaction.

use db::models::type_field::{MigrateType, MigrationResult, StatusCounts, StatusMapping};
use services::services::{migration_plan::MigrationPlan, workflow::Workflow};

use crate::{api::ApiClient, error::ClientError};

fn complete_plan(
    by_status: &StatusCounts,
    mappings: &[StatusMapping],
    target_workflow: &[String],
) -> Result<(), ClientError> {
    let plan = MigrationPlan::new(by_status, mappings, &Workflow::from_stored(target_workflow))?;
    plan.ensure_complete()?;
    Ok(())
}

impl ApiClient {
    pub async fn migrate_and_delete_project_type(
        &self,
        source_id: i64,
        target_id: i64,
        status_mappings: Vec<StatusMapping>,
    ) -> Result<MigrationResult, ClientError> {
        let stats = self.project_type_stats(source_id).await?;
        let target = self.get_project_type(target_id).await?;
        complete_plan(&stats.by_status, &status_mappings, &target.workflow)?;

        let result = self
            .migrate_project_type(
                source_id,
                &MigrateType {
                    target_type_id: target_id,
                    status_mappings,
                    delete_source: true,
                },
            )
            .await?;
        tracing::info!(
            source_id,
            target_id,
            migrated = result.migrated,
            "Project type migrated and deleted"
        );
        Ok(result)
    }

    pub async fn migrate_and_delete_task_type(
        &self,
        source_id: i64,
        target_id: i64,
        status_mappings: Vec<StatusMapping>,
    ) -> Result<MigrationResult, ClientError> {
        let stats = self.task_type_stats(source_id).await?;
        let target = self.get_task_type(target_id).await?;
        complete_plan(&stats.by_status, &status_mappings, &target.workflow)?;

        let result = self
            .migrate_task_type(
                source_id,
                &MigrateType {
                    target_type_id: target_id,
                    status_mappings,
                    delete_source: true,
                },
            )
            .await?;
        tracing::info!(
            source_id,
            target_id,
            migrated = result.migrated,
            "Task type migrated and deleted"
        );
        Ok(result)
    }
}
