//! Checks applied to project and task type definitions before they are stored.

use std::collections::HashSet;

use db::models::type_field::{CreateTypeField, TypeField, UpdateTypeField};
use thiserror::Error;

use super::{
    custom_fields::{CustomFieldError, validate_field_definition},
    validation::{ValidationError, require_non_blank, validate_slug},
    workflow::{Workflow, WorkflowError},
};

#[derive(Debug, Error)]
pub enum TypeSchemaError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    CustomField(#[from] CustomFieldError),
    #[error("Field key '{0}' already exists")]
    DuplicateKey(String),
}

pub fn validate_type_definition(
    name: &str,
    slug: &str,
    workflow: &[String],
    fields: &[CreateTypeField],
) -> Result<Workflow, TypeSchemaError> {
    require_non_blank("Name", name)?;
    validate_slug(slug)?;
    let workflow = Workflow::new(workflow)?;

    let mut keys = HashSet::new();
    for field in fields {
        validate_new_field_shape(field)?;
        if !keys.insert(field.key.as_str()) {
            return Err(TypeSchemaError::DuplicateKey(field.key.clone()));
        }
    }
    Ok(workflow)
}

/// Validates a field added to a type that already has `existing` fields.
pub fn validate_new_field(
    existing: &[TypeField],
    field: &CreateTypeField,
) -> Result<(), TypeSchemaError> {
    validate_new_field_shape(field)?;
    if existing.iter().any(|current| current.key == field.key) {
        return Err(TypeSchemaError::DuplicateKey(field.key.clone()));
    }
    Ok(())
}

/// Validates the field as it would look after `patch` is applied.
pub fn validate_field_update(
    current: &TypeField,
    patch: &UpdateTypeField,
) -> Result<(), TypeSchemaError> {
    if let Some(label) = patch.label.as_deref() {
        require_non_blank("Label", label)?;
    }
    let field_type = patch.field_type.unwrap_or(current.field_type);
    let options = match &patch.options {
        Some(options) => options.as_deref(),
        None => current.options.as_deref(),
    };
    validate_field_definition(&current.key, field_type, options)?;
    Ok(())
}

fn validate_new_field_shape(field: &CreateTypeField) -> Result<(), TypeSchemaError> {
    require_non_blank("Label", &field.label)?;
    validate_field_definition(&field.key, field.field_type, field.options.as_deref())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use db::types::FieldType;

    use super::*;

    fn field(key: &str, field_type: FieldType, options: Option<Vec<&str>>) -> CreateTypeField {
        CreateTypeField {
            key: key.to_string(),
            label: key.to_uppercase(),
            field_type,
            options: options.map(|o| o.into_iter().map(str::to_string).collect()),
            required: false,
            order: None,
        }
    }

    fn workflow(statuses: &[&str]) -> Vec<String> {
        statuses.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rejects_duplicate_keys_and_bad_slugs() {
        let fields = vec![
            field("priority", FieldType::Text, None),
            field("priority", FieldType::Number, None),
        ];
        let err = validate_type_definition("Feature", "feature", &workflow(&["todo"]), &fields)
            .unwrap_err();
        assert!(matches!(err, TypeSchemaError::DuplicateKey(key) if key == "priority"));

        let err = validate_type_definition("Feature", "Feature!", &workflow(&["todo"]), &[])
            .unwrap_err();
        assert!(matches!(
            err,
            TypeSchemaError::Validation(ValidationError::InvalidSlug)
        ));
    }

    #[test]
    fn select_fields_need_options() {
        let err = validate_type_definition(
            "Bug",
            "bug",
            &workflow(&["open", "closed"]),
            &[field("severity", FieldType::Select, None)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TypeSchemaError::CustomField(CustomFieldError::MissingOptions(_))
        ));

        let ok = validate_type_definition(
            "Bug",
            "bug",
            &workflow(&["open", "closed"]),
            &[field("severity", FieldType::Select, Some(vec!["low", "high"]))],
        )
        .unwrap();
        assert_eq!(ok.initial_status(), "open");
    }

    #[test]
    fn switching_to_select_without_options_is_rejected() {
        let current = TypeField {
            id: 1,
            key: "area".to_string(),
            label: "Area".to_string(),
            field_type: FieldType::Text,
            options: None,
            required: false,
            order: 0,
        };
        let patch = UpdateTypeField {
            field_type: Some(FieldType::Multiselect),
            ..Default::default()
        };
        assert!(validate_field_update(&current, &patch).is_err());

        let patch = UpdateTypeField {
            field_type: Some(FieldType::Multiselect),
            options: Some(Some(vec!["api".to_string()])),
            ..Default::default()
        };
        assert!(validate_field_update(&current, &patch).is_ok());
    }

    #[test]
    fn new_field_cannot_reuse_existing_key() {
        let existing = vec![TypeField {
            id: 1,
            key: "area".to_string(),
            label: "Area".to_string(),
            field_type: FieldType::Text,
            options: None,
            required: false,
            order: 0,
        }];
        let err = validate_new_field(&existing, &field("area", FieldType::Text, None)).unwrap_err();
        assert!(matches!(err, TypeSchemaError::DuplicateKey(_)));
        assert!(validate_new_field(&existing, &field("owner", FieldType::Text, None)).is_ok());
    }
}
