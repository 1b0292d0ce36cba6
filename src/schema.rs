//! Response schemas for each workflow step.
//!
//! Schemas are expressed in a small structural vocabulary (strings, enums,
//! booleans, arrays, objects, and string-keyed maps) rather than as raw JSON
//! Schema documents. The registry renders them to JSON Schema when a provider
//! or the CLI needs the standard form.
use crate::error::ProtocolError;
use crate::step::StepId;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Legal values for low/medium/high ratings.
pub const LEVELS: &[&str] = &["low", "medium", "high"];

/// Structural type of a single value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Free text, optionally bounded in characters.
    String { max_len: Option<usize> },
    /// Text restricted to a closed set of values.
    Enum { values: &'static [&'static str] },
    Boolean,
    Array {
        items: Box<FieldType>,
        max_items: Option<usize>,
    },
    Object(ObjectSchema),
    /// Object with caller-chosen keys whose values share one type.
    Map { values: Box<FieldType> },
}

impl FieldType {
    pub fn text() -> Self {
        Self::String { max_len: None }
    }

    pub fn bounded_text(max_len: usize) -> Self {
        Self::String {
            max_len: Some(max_len),
        }
    }

    pub fn one_of(values: &'static [&'static str]) -> Self {
        Self::Enum { values }
    }

    pub fn array(items: FieldType, max_items: usize) -> Self {
        Self::Array {
            items: Box::new(items),
            max_items: Some(max_items),
        }
    }

    pub fn text_list(max_items: usize) -> Self {
        Self::array(Self::text(), max_items)
    }

    pub fn map_of(values: FieldType) -> Self {
        Self::Map {
            values: Box::new(values),
        }
    }

    /// Name used in violation messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::String { .. } | Self::Enum { .. } => "string",
            Self::Boolean => "boolean",
            Self::Array { .. } => "array",
            Self::Object(_) | Self::Map { .. } => "object",
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            Self::String { max_len } => {
                let mut schema = json!({ "type": "string" });
                if let Some(max_len) = max_len {
                    schema["maxLength"] = json!(max_len);
                }
                schema
            }
            Self::Enum { values } => json!({ "type": "string", "enum": values }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Array { items, max_items } => {
                let mut schema = json!({ "type": "array", "items": items.to_json_schema() });
                if let Some(max_items) = max_items {
                    schema["maxItems"] = json!(max_items);
                }
                schema
            }
            Self::Object(object) => object.to_json_schema(),
            Self::Map { values } => json!({
                "type": "object",
                "additionalProperties": values.to_json_schema(),
            }),
        }
    }
}

/// A named property of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

impl Field {
    pub fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }

    pub fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
        }
    }
}

/// Object with declared properties. Closed objects reject undeclared keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    pub fields: Vec<Field>,
    pub closed: bool,
}

impl ObjectSchema {
    pub fn closed(fields: Vec<Field>) -> Self {
        Self {
            fields,
            closed: true,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(field.name.to_string(), field.ty.to_json_schema());
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name)
            .collect();
        json!({
            "type": "object",
            "required": required,
            "properties": properties,
            "additionalProperties": !self.closed,
        })
    }
}

/// Structural contract a step's response must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub step: StepId,
    pub root: ObjectSchema,
}

impl Schema {
    pub fn required_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.root
            .fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.root.fields.iter().map(|field| field.name)
    }

    /// Render as a JSON Schema document (draft 2020-12 keywords only).
    pub fn to_json_schema(&self) -> Value {
        let mut schema = self.root.to_json_schema();
        schema["title"] = json!(self.step.as_str());
        schema
    }
}

/// Immutable lookup from step to schema.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<StepId, Schema>,
}

impl SchemaRegistry {
    /// Registry holding the schema of every workflow step.
    pub fn builtin() -> Self {
        Self::from_schemas([
            clarify_schema(),
            assessment_toggle_schema(),
            subassessments_schema(),
            prompt_doctor_schema(),
        ])
    }

    pub fn from_schemas(schemas: impl IntoIterator<Item = Schema>) -> Self {
        Self {
            schemas: schemas
                .into_iter()
                .map(|schema| (schema.step, schema))
                .collect(),
        }
    }

    pub fn get(&self, step: StepId) -> Result<&Schema, ProtocolError> {
        self.schemas
            .get(&step)
            .ok_or_else(|| ProtocolError::UnknownStep(step.to_string()))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn clarifying_questions() -> Field {
    Field::required("clarifying_questions", FieldType::text_list(3))
}

fn defer_signal() -> Field {
    Field::required("defer_to_next_step_signal", FieldType::Boolean)
}

fn brief_summary() -> Field {
    Field::required("brief_summary", FieldType::bounded_text(1000))
}

fn notes() -> Field {
    Field::optional("notes", FieldType::text())
}

fn clarify_schema() -> Schema {
    Schema {
        step: StepId::Clarify,
        root: ObjectSchema::closed(vec![
            brief_summary(),
            Field::required("assumption_gaps", FieldType::text_list(6)),
            clarifying_questions(),
            defer_signal(),
            Field::required("initial_response", FieldType::bounded_text(300)),
            Field::optional("focus_area", FieldType::bounded_text(200)),
            Field::optional("purpose", FieldType::bounded_text(200)),
            Field::optional("industry", FieldType::bounded_text(200)),
            Field::optional("geography", FieldType::bounded_text(200)),
            Field::optional("time_horizon", FieldType::bounded_text(200)),
            Field::optional("decision_outcomes", FieldType::text_list(5)),
            notes(),
        ]),
    }
}

fn assessment_toggle_schema() -> Schema {
    let recommendation = ObjectSchema::closed(vec![
        Field::required("id", FieldType::text()),
        Field::required("label", FieldType::text()),
        Field::required("reason", FieldType::bounded_text(300)),
        Field::required("priority", FieldType::one_of(LEVELS)),
    ]);
    Schema {
        step: StepId::AssessmentToggle,
        root: ObjectSchema::closed(vec![
            brief_summary(),
            Field::required(
                "recommended_assessments",
                FieldType::array(FieldType::Object(recommendation), 10),
            ),
            clarifying_questions(),
            defer_signal(),
            notes(),
        ]),
    }
}

fn subassessments_schema() -> Schema {
    let subassessment = ObjectSchema::closed(vec![
        Field::required("name", FieldType::text()),
        Field::required("why_it_matters", FieldType::bounded_text(280)),
        Field::required("required_inputs", FieldType::text_list(6)),
        Field::required("effort", FieldType::one_of(LEVELS)),
    ]);
    Schema {
        step: StepId::Subassessments,
        root: ObjectSchema::closed(vec![
            brief_summary(),
            Field::required(
                "subassessments_by_assessment",
                FieldType::map_of(FieldType::array(FieldType::Object(subassessment), 10)),
            ),
            clarifying_questions(),
            defer_signal(),
            notes(),
        ]),
    }
}

fn prompt_doctor_schema() -> Schema {
    Schema {
        step: StepId::PromptDoctor,
        root: ObjectSchema::closed(vec![
            Field::required("reframed_prompt", FieldType::bounded_text(500)),
            Field::required("missing_elements", FieldType::text_list(8)),
            Field::required("confirm_question", FieldType::bounded_text(140)),
        ]),
    }
}
