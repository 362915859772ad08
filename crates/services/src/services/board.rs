//! Kanban read model: tasks grouped by task type and workflow status.

use db::models::{task::Task, task_type::TaskType, team::TeamBrief};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("Task {0} is not on this board")]
    TaskNotFound(i64),
    #[error("Column '{status}' does not exist for task type {task_type_id}")]
    UnknownColumn { task_type_id: i64, status: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardColumn {
    pub status: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardLane {
    pub task_type_id: i64,
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
    pub columns: Vec<BoardColumn>,
    /// Tasks whose status is not part of the workflow.
    pub unplaced: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Board {
    pub team: TeamBrief,
    pub lanes: Vec<BoardLane>,
}

/// The only mutation a card drop produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct TaskStatusUpdate {
    pub task_id: i64,
    pub status: String,
}

impl BoardLane {
    fn new(task_type: &TaskType) -> Self {
        Self {
            task_type_id: task_type.id,
            name: task_type.name.clone(),
            slug: task_type.slug.clone(),
            color: task_type.color.clone(),
            columns: task_type
                .workflow
                .iter()
                .map(|status| BoardColumn {
                    status: status.clone(),
                    tasks: Vec::new(),
                })
                .collect(),
            unplaced: Vec::new(),
        }
    }

    fn place(&mut self, task: Task) {
        match self
            .columns
            .iter_mut()
            .find(|column| column.status == task.status)
        {
            Some(column) => column.tasks.push(task),
            None => self.unplaced.push(task),
        }
    }

    fn find_task(&self, task_id: i64) -> Option<&Task> {
        self.columns
            .iter()
            .flat_map(|column| column.tasks.iter())
            .chain(self.unplaced.iter())
            .find(|task| task.id == task_id)
    }
}

impl Board {
    /// Groups `tasks` into one lane per task type, keeping creation order
    /// inside each column.
    pub fn build(team: TeamBrief, task_types: &[TaskType], tasks: Vec<Task>) -> Self {
        let mut lanes: Vec<BoardLane> = task_types.iter().map(BoardLane::new).collect();
        let mut tasks = tasks;
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        for task in tasks {
            match lanes
                .iter_mut()
                .find(|lane| lane.task_type_id == task.task_type_id)
            {
                Some(lane) => lane.place(task),
                None => tracing::warn!(
                    task_id = task.id,
                    task_type_id = task.task_type_id,
                    "Task type missing from board"
                ),
            }
        }

        Self { team, lanes }
    }

    /// Resolves a card drop into a status update.
    ///
    /// Returns `Ok(None)` when the card is dropped onto its current column.
    pub fn drop_task(
        &self,
        task_id: i64,
        column: &str,
    ) -> Result<Option<TaskStatusUpdate>, BoardError> {
        let (lane, task) = self
            .lanes
            .iter()
            .find_map(|lane| lane.find_task(task_id).map(|task| (lane, task)))
            .ok_or(BoardError::TaskNotFound(task_id))?;

        if !lane.columns.iter().any(|c| c.status == column) {
            return Err(BoardError::UnknownColumn {
                task_type_id: lane.task_type_id,
                status: column.to_string(),
            });
        }
        if task.status == column {
            return Ok(None);
        }
        Ok(Some(TaskStatusUpdate {
            task_id,
            status: column.to_string(),
        }))
    }
}
