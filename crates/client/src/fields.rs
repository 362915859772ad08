//! Editor state for a record's custom fields.

use db::models::type_field::TypeField;
use serde_json::Value;
use services::services::custom_fields::{
    CustomData, CustomFieldError, InputKind, as_custom_data, clear_field_value, input_kind,
    set_field_value, validate_custom_data,
};

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInput {
    pub key: String,
    pub label: String,
    pub kind: InputKind,
    pub required: bool,
    pub options: Vec<String>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct CustomFieldForm {
    fields: Vec<TypeField>,
    data: CustomData,
}

impl CustomFieldForm {
    pub fn new(fields: &[TypeField], custom_data: &Value) -> Self {
        let mut fields = fields.to_vec();
        fields.sort_by_key(|field| (field.order, field.id));
        Self {
            fields,
            data: as_custom_data(custom_data),
        }
    }

    /// One input per field, in field order.
    pub fn inputs(&self) -> Vec<FieldInput> {
        self.fields
            .iter()
            .map(|field| FieldInput {
                key: field.key.clone(),
                label: field.label.clone(),
                kind: input_kind(field.field_type),
                required: field.required,
                options: field.options.clone().unwrap_or_default(),
                value: self.data.get(&field.key).cloned(),
            })
            .collect()
    }

    /// Empty values remove the key.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), CustomFieldError> {
        set_field_value(&self.fields, &mut self.data, key, value)
    }

    pub fn clear(&mut self, key: &str) -> Option<Value> {
        clear_field_value(&mut self.data, key)
    }

    /// Stored keys that no longer have a field definition.
    pub fn orphaned_keys(&self) -> Vec<String> {
        self.data
            .keys()
            .filter(|key| !self.fields.iter().any(|field| &field.key == *key))
            .cloned()
            .collect()
    }

    /// The map to send as `custom_data`; orphaned keys are dropped and
    /// required fields enforced.
    pub fn submit(&self) -> Result<CustomData, CustomFieldError> {
        validate_custom_data(&self.fields, &self.data)
    }
}
