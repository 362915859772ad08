//! Status plan for moving every record of one type onto another.

use std::collections::BTreeMap;

use db::models::type_field::{StatusCounts, StatusMapping};

use super::workflow::{Workflow, WorkflowError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    mappings: BTreeMap<String, String>,
    populated: Vec<String>,
    default_status: String,
}

impl MigrationPlan {
    /// Validates mapping targets against the target workflow.
    ///
    /// Mappings for statuses without records are accepted and ignored.
    pub fn new(
        source_counts: &StatusCounts,
        mappings: &[StatusMapping],
        target: &Workflow,
    ) -> Result<Self, WorkflowError> {
        let mut resolved = BTreeMap::new();
        for mapping in mappings {
            if !target.contains(&mapping.to_status) {
                return Err(WorkflowError::InvalidMappingTarget(mapping.to_status.clone()));
            }
            resolved.insert(mapping.from_status.clone(), mapping.to_status.clone());
        }

        let populated = source_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(status, _)| status.clone())
            .collect();

        Ok(Self {
            mappings: resolved,
            populated,
            default_status: target.initial_status().to_string(),
        })
    }

    /// Status a record in `source_status` receives; unmapped records land on
    /// the target's initial status.
    pub fn target_status(&self, source_status: &str) -> &str {
        self.mappings
            .get(source_status)
            .map(String::as_str)
            .unwrap_or(&self.default_status)
    }

    pub fn unmapped_statuses(&self) -> Vec<String> {
        self.populated
            .iter()
            .filter(|status| !self.mappings.contains_key(*status))
            .cloned()
            .collect()
    }

    /// Required before the source type is deleted: every populated status
    /// must carry an explicit mapping.
    pub fn ensure_complete(&self) -> Result<(), WorkflowError> {
        let unmapped = self.unmapped_statuses();
        if unmapped.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::UnmappedStatuses(unmapped))
        }
    }
}
