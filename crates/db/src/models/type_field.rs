//! Field schema and workflow shapes shared by project and task types.

use std::collections::BTreeMap;

use sea_orm::{DbErr, JsonValue};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    entities::{project_type_field, task_type_field},
    types::FieldType,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct TypeField {
    pub id: i64,
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    pub options: Option<Vec<String>>,
    pub required: bool,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTypeField {
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: Option<i32>,
}

/// Field keys are immutable; rename by deleting and re-adding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateTypeField {
    pub label: Option<String>,
    pub field_type: Option<FieldType>,
    #[serde(
        default,
        deserialize_with = "utils::patch::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub options: Option<Option<Vec<String>>>,
    pub required: Option<bool>,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct StatusMapping {
    #[serde(alias = "old_status")]
    pub from_status: String,
    #[serde(alias = "new_status")]
    pub to_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateWorkflow {
    pub workflow: Vec<String>,
    #[serde(default)]
    pub status_mappings: Vec<StatusMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MigrateType {
    /// Also accepted as `target_project_type_id` / `target_task_type_id`.
    #[serde(alias = "target_project_type_id", alias = "target_task_type_id")]
    pub target_type_id: i64,
    #[serde(default)]
    pub status_mappings: Vec<StatusMapping>,
    #[serde(default)]
    pub delete_source: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MigrationResult {
    pub migrated: u64,
    pub source_deleted: bool,
}

/// Record counts per status for one type.
pub type StatusCounts = BTreeMap<String, u64>;

pub(crate) fn count_statuses(statuses: Vec<String>) -> StatusCounts {
    let mut counts = StatusCounts::new();
    for status in statuses {
        *counts.entry(status).or_insert(0) += 1;
    }
    counts
}

pub(crate) fn workflow_from_json(value: JsonValue) -> Result<Vec<String>, DbErr> {
    serde_json::from_value(value).map_err(|err| DbErr::Custom(format!("invalid workflow: {err}")))
}

pub(crate) fn workflow_to_json(workflow: &[String]) -> JsonValue {
    JsonValue::from(workflow.to_vec())
}

pub(crate) fn options_from_json(value: Option<JsonValue>) -> Option<Vec<String>> {
    value.and_then(|value| serde_json::from_value(value).ok())
}

pub(crate) fn options_to_json(options: Option<&Vec<String>>) -> Option<JsonValue> {
    options.map(|options| JsonValue::from(options.clone()))
}

impl From<project_type_field::Model> for TypeField {
    fn from(model: project_type_field::Model) -> Self {
        Self {
            id: model.id,
            key: model.key,
            label: model.label,
            field_type: model.field_type,
            options: options_from_json(model.options),
            required: model.required,
            order: model.order,
        }
    }
}

impl From<task_type_field::Model> for TypeField {
    fn from(model: task_type_field::Model) -> Self {
        Self {
            id: model.id,
            key: model.key,
            label: model.label,
            field_type: model.field_type,
            options: options_from_json(model.options),
            required: model.required,
            order: model.order,
        }
    }
}

impl CreateTypeField {
    /// Position used when the payload omits `order`.
    pub fn effective_order(&self, index: usize) -> i32 {
        self.order
            .unwrap_or_else(|| i32::try_from(index).unwrap_or(i32::MAX))
    }
}
