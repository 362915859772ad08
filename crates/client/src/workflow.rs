//! Step picker for a record's workflow.
//!
//! Transitions are unguarded: any step may be selected from any other.

use db::models::{
    project::{Project, UpdateProject},
    project_type::ProjectType,
    task::Task,
    task_type::TaskType,
};
use services::services::workflow::{Workflow, WorkflowError, WorkflowStep};

use crate::{api::ApiClient, error::ClientError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSelector {
    workflow: Workflow,
    current: String,
}

impl WorkflowSelector {
    pub fn new(workflow: &[String], current: impl Into<String>) -> Self {
        Self {
            workflow: Workflow::from_stored(workflow),
            current: current.into(),
        }
    }

    pub fn for_task(task: &Task, task_type: &TaskType) -> Self {
        Self::new(&task_type.workflow, task.status.clone())
    }

    pub fn for_project(project: &Project, project_type: &ProjectType) -> Self {
        Self::new(&project_type.workflow, project.status.clone())
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn steps(&self) -> Vec<WorkflowStep> {
        self.workflow.step_states(&self.current)
    }

    /// Status to send for a click on `status`; `None` when it is already current.
    pub fn select(&self, status: &str) -> Result<Option<String>, WorkflowError> {
        self.workflow.ensure_contains(status)?;
        if status == self.current {
            Ok(None)
        } else {
            Ok(Some(status.to_string()))
        }
    }
}

impl ApiClient {
    /// Issues a single status update for a step click on a task.
    pub async fn select_task_status(
        &self,
        task: &Task,
        task_type: &TaskType,
        status: &str,
    ) -> Result<Option<Task>, ClientError> {
        match WorkflowSelector::for_task(task, task_type).select(status)? {
            Some(status) => self.set_task_status(task.id, &status).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn select_project_status(
        &self,
        project: &Project,
        project_type: &ProjectType,
        status: &str,
    ) -> Result<Option<Project>, ClientError> {
        let Some(status) = WorkflowSelector::for_project(project, project_type).select(status)?
        else {
            return Ok(None);
        };
        let payload = UpdateProject {
            status: Some(status),
            ..Default::default()
        };
        self.update_project(project.id, &payload).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use services::services::workflow::StepState;

    use super::*;

    fn workflow() -> Vec<String> {
        ["Backlog", "In Progress", "Review", "Done"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn steps_follow_the_current_position() {
        let selector = WorkflowSelector::new(&workflow(), "Review");
        let states: Vec<StepState> = selector.steps().into_iter().map(|step| step.state).collect();
        assert_eq!(
            states,
            vec![
                StepState::Completed,
                StepState::Completed,
                StepState::Current,
                StepState::Upcoming
            ]
        );
    }

    #[test]
    fn selection_is_unguarded_but_stays_in_workflow() {
        let selector = WorkflowSelector::new(&workflow(), "Done");
        assert_eq!(selector.select("Backlog"), Ok(Some("Backlog".to_string())));
        assert_eq!(selector.select("Done"), Ok(None));
        assert!(matches!(
            selector.select("Shipped"),
            Err(WorkflowError::InvalidStatus { .. })
        ));
    }
}
