//! Structural validation of projected responses against step schemas.
use crate::schema::{FieldType, ObjectSchema, Schema};
use serde::Serialize;
use serde_json::{Map, Value};

/// First structural violation found in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON path of the offending value, rooted at `$`.
    pub path: String,
    pub message: String,
}

impl Violation {
    fn at(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Check a response object against its schema.
///
/// Fields are visited in declaration order, depth first; undeclared keys are
/// checked last. The first violation encountered is returned.
pub fn validate(schema: &Schema, payload: &Map<String, Value>) -> Result<(), Violation> {
    validate_object(&schema.root, payload, "$")
}

fn validate_object(
    schema: &ObjectSchema,
    object: &Map<String, Value>,
    path: &str,
) -> Result<(), Violation> {
    for field in &schema.fields {
        let field_path = format!("{path}.{}", field.name);
        match object.get(field.name) {
            Some(value) => validate_value(&field.ty, value, &field_path)?,
            None if field.required => {
                return Err(Violation::at(&field_path, "required field is missing"));
            }
            None => {}
        }
    }
    if schema.closed {
        if let Some(key) = object.keys().find(|key| schema.field(key).is_none()) {
            return Err(Violation::at(
                &format!("{path}.{key}"),
                "field is not declared by the schema",
            ));
        }
    }
    Ok(())
}

fn validate_value(ty: &FieldType, value: &Value, path: &str) -> Result<(), Violation> {
    match (ty, value) {
        (FieldType::String { max_len }, Value::String(text)) => {
            let len = text.chars().count();
            match max_len {
                Some(max_len) if len > *max_len => Err(Violation::at(
                    path,
                    format!("string of {len} characters exceeds maxLength {max_len}"),
                )),
                _ => Ok(()),
            }
        }
        (FieldType::Enum { values }, Value::String(text)) => {
            if values.contains(&text.as_str()) {
                Ok(())
            } else {
                Err(Violation::at(
                    path,
                    format!("{text:?} is not one of {}", values.join(", ")),
                ))
            }
        }
        (FieldType::Boolean, Value::Bool(_)) => Ok(()),
        (FieldType::Array { items, max_items }, Value::Array(elements)) => {
            if let Some(max_items) = max_items {
                if elements.len() > *max_items {
                    return Err(Violation::at(
                        path,
                        format!(
                            "array of {} items exceeds maxItems {max_items}",
                            elements.len()
                        ),
                    ));
                }
            }
            for (idx, element) in elements.iter().enumerate() {
                validate_value(items, element, &format!("{path}[{idx}]"))?;
            }
            Ok(())
        }
        (FieldType::Object(schema), Value::Object(object)) => {
            validate_object(schema, object, path)
        }
        (FieldType::Map { values }, Value::Object(object)) => {
            for (key, entry) in object {
                validate_value(values, entry, &format!("{path}.{key}"))?;
            }
            Ok(())
        }
        (expected, actual) => Err(Violation::at(
            path,
            format!("expected {}, found {}", expected.label(), json_type(actual)),
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
