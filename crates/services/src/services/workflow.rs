//! Ordered status lists attached to project and task types.
//!
//! The first entry is the default status for new records. Transitions are
//! unguarded: any status in the workflow may follow any other.

use std::collections::{BTreeMap, HashSet};

use db::models::type_field::{StatusCounts, StatusMapping};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Workflow must contain at least one status")]
    Empty,
    #[error("Workflow statuses cannot be blank")]
    BlankStatus,
    #[error("Duplicate workflow status: {0}")]
    DuplicateStatus(String),
    #[error("Invalid status '{status}'. Must be one of: {}", .allowed.join(", "))]
    InvalidStatus { status: String, allowed: Vec<String> },
    #[error("Status mappings required for: {}", .0.join(", "))]
    UnmappedStatuses(Vec<String>),
    #[error("Mapping target '{0}' is not part of the target workflow")]
    InvalidMappingTarget(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    statuses: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Completed,
    Current,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct WorkflowStep {
    pub status: String,
    pub state: StepState,
}

impl Workflow {
    /// Validates and trims a raw status list.
    pub fn new<I, S>(statuses: I) -> Result<Self, WorkflowError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut cleaned = Vec::new();
        for status in statuses {
            let status = status.as_ref().trim();
            if status.is_empty() {
                return Err(WorkflowError::BlankStatus);
            }
            if !seen.insert(status.to_string()) {
                return Err(WorkflowError::DuplicateStatus(status.to_string()));
            }
            cleaned.push(status.to_string());
        }
        if cleaned.is_empty() {
            return Err(WorkflowError::Empty);
        }
        Ok(Self { statuses: cleaned })
    }

    /// Wraps a workflow already persisted by a type; skips validation.
    pub fn from_stored(statuses: &[String]) -> Self {
        Self {
            statuses: statuses.to_vec(),
        }
    }

    pub fn statuses(&self) -> &[String] {
        &self.statuses
    }

    pub fn into_statuses(self) -> Vec<String> {
        self.statuses
    }

    /// Default status for records entering the workflow.
    pub fn initial_status(&self) -> &str {
        self.statuses.first().map(String::as_str).unwrap_or_default()
    }

    pub fn contains(&self, status: &str) -> bool {
        self.statuses.iter().any(|s| s == status)
    }

    pub fn position(&self, status: &str) -> Option<usize> {
        self.statuses.iter().position(|s| s == status)
    }

    pub fn ensure_contains(&self, status: &str) -> Result<(), WorkflowError> {
        if self.contains(status) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidStatus {
                status: status.to_string(),
                allowed: self.statuses.clone(),
            })
        }
    }

    /// Per-step progress relative to `current`. An off-workflow status marks
    /// every step upcoming.
    pub fn step_states(&self, current: &str) -> Vec<WorkflowStep> {
        let current_index = self.position(current);
        self.statuses
            .iter()
            .enumerate()
            .map(|(index, status)| {
                let state = match current_index {
                    Some(current) if index < current => StepState::Completed,
                    Some(current) if index == current => StepState::Current,
                    _ => StepState::Upcoming,
                };
                WorkflowStep {
                    status: status.clone(),
                    state,
                }
            })
            .collect()
    }

    /// Statuses of `self` that `next` no longer contains.
    pub fn removed_statuses(&self, next: &Workflow) -> Vec<String> {
        self.statuses
            .iter()
            .filter(|status| !next.contains(status))
            .cloned()
            .collect()
    }

    /// Keeps `current` when it belongs to this workflow, else the initial status.
    pub fn coerce_status(&self, current: &str) -> String {
        if self.contains(current) {
            current.to_string()
        } else {
            self.initial_status().to_string()
        }
    }
}

/// Validates `mappings` against `target` and keeps those whose source has records.
///
/// Every populated status that `target` does not contain must be mapped.
pub fn resolve_status_mappings(
    counts: &StatusCounts,
    mappings: &[StatusMapping],
    target: &Workflow,
) -> Result<BTreeMap<String, String>, WorkflowError> {
    let mut resolved = BTreeMap::new();
    for mapping in mappings {
        if !target.contains(&mapping.to_status) {
            return Err(WorkflowError::InvalidMappingTarget(mapping.to_status.clone()));
        }
        if counts.get(&mapping.from_status).copied().unwrap_or(0) > 0
            && mapping.from_status != mapping.to_status
        {
            resolved.insert(mapping.from_status.clone(), mapping.to_status.clone());
        }
    }

    let unmapped: Vec<String> = counts
        .iter()
        .filter(|(status, count)| {
            **count > 0 && !target.contains(status) && !resolved.contains_key(*status)
        })
        .map(|(status, _)| status.clone())
        .collect();
    if !unmapped.is_empty() {
        return Err(WorkflowError::UnmappedStatuses(unmapped));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(entries: &[(&str, u64)]) -> StatusCounts {
        entries
            .iter()
            .map(|(status, count)| (status.to_string(), *count))
            .collect()
    }

    fn mapping(from: &str, to: &str) -> StatusMapping {
        StatusMapping {
            from_status: from.to_string(),
            to_status: to.to_string(),
        }
    }

    #[test]
    fn new_trims_and_rejects_bad_lists() {
        let workflow = Workflow::new([" todo ", "done"]).unwrap();
        assert_eq!(workflow.statuses(), ["todo", "done"]);
        assert_eq!(workflow.initial_status(), "todo");

        assert_eq!(Workflow::new(Vec::<String>::new()), Err(WorkflowError::Empty));
        assert_eq!(Workflow::new(["todo", " "]), Err(WorkflowError::BlankStatus));
        assert_eq!(
            Workflow::new(["todo", "todo"]),
            Err(WorkflowError::DuplicateStatus("todo".to_string()))
        );
    }

    #[test]
    fn step_states_compare_by_index() {
        let workflow = Workflow::new(["backlog", "doing", "review", "done"]).unwrap();
        let states: Vec<_> = workflow
            .step_states("review")
            .into_iter()
            .map(|step| step.state)
            .collect();
        assert_eq!(
            states,
            vec![
                StepState::Completed,
                StepState::Completed,
                StepState::Current,
                StepState::Upcoming
            ]
        );

        assert!(
            workflow
                .step_states("archived")
                .iter()
                .all(|step| step.state == StepState::Upcoming)
        );
    }

    #[test]
    fn coerce_and_membership() {
        let workflow = Workflow::new(["open", "closed"]).unwrap();
        assert_eq!(workflow.coerce_status("closed"), "closed");
        assert_eq!(workflow.coerce_status("doing"), "open");
        assert!(workflow.ensure_contains("open").is_ok());
        assert!(matches!(
            workflow.ensure_contains("doing"),
            Err(WorkflowError::InvalidStatus { .. })
        ));
        let next = Workflow::new(["open", "won't fix"]).unwrap();
        assert_eq!(workflow.removed_statuses(&next), vec!["closed"]);
    }

    #[test]
    fn populated_removed_statuses_must_be_mapped() {
        let target = Workflow::new(["todo", "done"]).unwrap();
        let populated = counts(&[("todo", 2), ("review", 1), ("blocked", 0)]);

        assert_eq!(
            resolve_status_mappings(&populated, &[], &target),
            Err(WorkflowError::UnmappedStatuses(vec!["review".to_string()]))
        );
        assert_eq!(
            resolve_status_mappings(&populated, &[mapping("review", "qa")], &target),
            Err(WorkflowError::InvalidMappingTarget("qa".to_string()))
        );

        let resolved = resolve_status_mappings(
            &populated,
            &[mapping("review", "done"), mapping("blocked", "todo")],
            &target,
        )
        .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.get("review").map(String::as_str), Some("done"));
    }
}
