//! Custom field schemas and the `custom_data` maps they shape.

use chrono::NaiveDate;
use db::{models::type_field::TypeField, types::FieldType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use ts_rs::TS;

use super::validation::{ValidationError, validate_field_key};

pub type CustomData = Map<String, Value>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CustomFieldError {
    #[error(transparent)]
    InvalidKey(#[from] ValidationError),
    #[error("Field '{0}' requires a non-empty list of options")]
    MissingOptions(String),
    #[error("Field '{0}' is required")]
    Required(String),
    #[error("Invalid value for field '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("Unknown field '{0}'")]
    UnknownField(String),
}

/// Editor widget used for a field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    TextInput,
    TextArea,
    NumberInput,
    Select,
    MultiSelect,
    UrlInput,
    DatePicker,
    Checkbox,
}

pub fn input_kind(field_type: FieldType) -> InputKind {
    match field_type {
        FieldType::Text => InputKind::TextInput,
        FieldType::Textarea => InputKind::TextArea,
        FieldType::Number => InputKind::NumberInput,
        FieldType::Select => InputKind::Select,
        FieldType::Multiselect => InputKind::MultiSelect,
        FieldType::Url => InputKind::UrlInput,
        FieldType::Date => InputKind::DatePicker,
        FieldType::Checkbox => InputKind::Checkbox,
    }
}

/// Checks a field definition before it is stored.
pub fn validate_field_definition(
    key: &str,
    field_type: FieldType,
    options: Option<&[String]>,
) -> Result<(), CustomFieldError> {
    validate_field_key(key)?;
    if field_type.has_options() {
        let has_options = options
            .map(|options| options.iter().any(|option| !option.trim().is_empty()))
            .unwrap_or(false);
        if !has_options {
            return Err(CustomFieldError::MissingOptions(key.to_string()));
        }
    }
    Ok(())
}

fn invalid(field: &TypeField, reason: impl Into<String>) -> CustomFieldError {
    CustomFieldError::InvalidValue {
        key: field.key.clone(),
        reason: reason.into(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn is_http_url(text: &str) -> bool {
    url::Url::parse(text)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

/// Validates a single value against its field definition.
pub fn validate_value(field: &TypeField, value: &Value) -> Result<(), CustomFieldError> {
    let options = field.options.as_deref().unwrap_or_default();
    match field.field_type {
        FieldType::Text | FieldType::Textarea => {
            if !value.is_string() {
                return Err(invalid(field, "expected a string"));
            }
        }
        FieldType::Number => {
            if !value.is_number() {
                return Err(invalid(field, "expected a number"));
            }
        }
        FieldType::Checkbox => {
            if !value.is_boolean() {
                return Err(invalid(field, "expected true or false"));
            }
        }
        FieldType::Url => match value.as_str() {
            Some(text) if is_http_url(text) => {}
            _ => return Err(invalid(field, "expected an http(s) URL")),
        },
        FieldType::Date => match value.as_str() {
            Some(text) if NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok() => {}
            _ => return Err(invalid(field, "expected a date formatted YYYY-MM-DD")),
        },
        FieldType::Select => match value.as_str() {
            Some(choice) if options.iter().any(|option| option == choice) => {}
            _ => return Err(invalid(field, format!("expected one of: {}", options.join(", ")))),
        },
        FieldType::Multiselect => {
            let Some(choices) = value.as_array() else {
                return Err(invalid(field, "expected a list of options"));
            };
            for choice in choices {
                let known = choice
                    .as_str()
                    .map(|choice| options.iter().any(|option| option == choice))
                    .unwrap_or(false);
                if !known {
                    return Err(invalid(
                        field,
                        format!("expected values from: {}", options.join(", ")),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Returns the cleaned map stored for a record.
///
/// Keys without a field definition and null values are dropped; every
/// remaining value is type-checked and required fields must be non-empty.
pub fn validate_custom_data(
    fields: &[TypeField],
    data: &CustomData,
) -> Result<CustomData, CustomFieldError> {
    let mut cleaned = CustomData::new();
    for field in fields {
        match data.get(&field.key) {
            Some(value) if !is_empty_value(value) => {
                validate_value(field, value)?;
                cleaned.insert(field.key.clone(), value.clone());
            }
            _ if field.required => return Err(CustomFieldError::Required(field.key.clone())),
            _ => {}
        }
    }
    Ok(cleaned)
}

/// Keeps the values of `data` that are valid under `fields`, without
/// enforcing required fields. Used when records move to another type.
pub fn reshape_custom_data(fields: &[TypeField], data: &Value) -> Value {
    let mut reshaped = CustomData::new();
    if let Some(map) = data.as_object() {
        for field in fields {
            if let Some(value) = map.get(&field.key)
                && !is_empty_value(value)
                && validate_value(field, value).is_ok()
            {
                reshaped.insert(field.key.clone(), value.clone());
            }
        }
    }
    Value::Object(reshaped)
}

/// Writes an edited value under the field's key.
pub fn set_field_value(
    fields: &[TypeField],
    data: &mut CustomData,
    key: &str,
    value: Value,
) -> Result<(), CustomFieldError> {
    let field = fields
        .iter()
        .find(|field| field.key == key)
        .ok_or_else(|| CustomFieldError::UnknownField(key.to_string()))?;
    if is_empty_value(&value) {
        data.remove(key);
        return Ok(());
    }
    validate_value(field, &value)?;
    data.insert(key.to_string(), value);
    Ok(())
}

pub fn clear_field_value(data: &mut CustomData, key: &str) -> Option<Value> {
    data.remove(key)
}

/// Reads a stored `custom_data` value as a map; anything else is empty.
pub fn as_custom_data(value: &Value) -> CustomData {
    value.as_object().cloned().unwrap_or_default()
}
