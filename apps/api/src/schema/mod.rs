//! Schema descriptors: a declarative description of the object a model is
//! asked to produce.
//!
//! One descriptor serves two purposes: `describe()` renders it for the
//! prompt, and `validate()` checks the model's reply against it before
//! deserialising into the typed target.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::llm_client::strip_json_fences;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A string. Absent or null becomes `""`.
    Text,
    /// A string, number or bool, normalised to a string.
    Scalar,
    /// A list of strings. Absent or null becomes `[]`.
    TextList,
    /// A list of objects with the given fields. Absent or null becomes `[]`.
    ObjectList(Vec<FieldSpec>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    pub name: &'static str,
    /// Task instruction placed ahead of the schema in the prompt.
    pub instruction: &'static str,
    pub fields: Vec<FieldSpec>,
}

/// Validation diagnostics, one `path: problem` line per issue.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", .problems.join("; "))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

impl ValidationError {
    fn single(problem: impl Into<String>) -> Self {
        Self {
            problems: vec![problem.into()],
        }
    }
}

impl SchemaDescriptor {
    /// Renders a JSON-Schema-like description. Key order is stable, so the
    /// same descriptor always yields byte-identical prompt text.
    pub fn describe(&self) -> String {
        let doc = object_schema(&self.fields);
        serde_json::to_string_pretty(&doc).unwrap_or_else(|_| doc.to_string())
    }

    /// Parses `raw` model output and checks it against the descriptor.
    pub fn validate<T: DeserializeOwned>(&self, raw: &str) -> Result<T, ValidationError> {
        let text = strip_json_fences(raw);
        if text.is_empty() {
            return Err(ValidationError::single("$: response was empty"));
        }

        let value: Value = serde_json::from_str(text)
            .map_err(|e| ValidationError::single(format!("$: not valid JSON ({e})")))?;

        let mut problems = Vec::new();
        let normalised = normalise_object(&self.fields, &value, "$", &mut problems);
        if !problems.is_empty() {
            return Err(ValidationError { problems });
        }

        serde_json::from_value(normalised)
            .map_err(|e| ValidationError::single(format!("$: {e}")))
    }
}

fn object_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    for field in fields {
        properties.insert(field.name.to_string(), field_schema(field));
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": fields.iter().map(|f| f.name).collect::<Vec<_>>(),
    })
}

fn field_schema(field: &FieldSpec) -> Value {
    match &field.kind {
        FieldKind::Text => json!({ "type": "string", "description": field.description }),
        FieldKind::Scalar => json!({
            "type": ["string", "number", "boolean"],
            "description": field.description,
        }),
        FieldKind::TextList => json!({
            "type": "array",
            "items": { "type": "string" },
            "description": field.description,
        }),
        FieldKind::ObjectList(inner) => json!({
            "type": "array",
            "items": object_schema(inner),
            "description": field.description,
        }),
    }
}

fn normalise_object(
    fields: &[FieldSpec],
    value: &Value,
    path: &str,
    problems: &mut Vec<String>,
) -> Value {
    let Some(obj) = value.as_object() else {
        problems.push(format!("{path}: expected an object, got {}", type_name(value)));
        return Value::Null;
    };

    // Undeclared keys are dropped rather than rejected.
    let mut out = Map::new();
    for field in fields {
        let field_path = format!("{path}.{}", field.name);
        let raw = obj.get(field.name).unwrap_or(&Value::Null);
        out.insert(
            field.name.to_string(),
            normalise_field(&field.kind, raw, &field_path, problems),
        );
    }
    Value::Object(out)
}

fn normalise_field(kind: &FieldKind, value: &Value, path: &str, problems: &mut Vec<String>) -> Value {
    match (kind, value) {
        (FieldKind::Text | FieldKind::Scalar, Value::Null) => Value::String(String::new()),
        (FieldKind::Text | FieldKind::Scalar, Value::String(s)) => Value::String(s.clone()),
        (FieldKind::Scalar, Value::Number(n)) => Value::String(n.to_string()),
        (FieldKind::Scalar, Value::Bool(b)) => Value::String(b.to_string()),
        (FieldKind::TextList | FieldKind::ObjectList(_), Value::Null) => Value::Array(vec![]),
        (FieldKind::TextList, Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => out.push(Value::String(s.clone())),
                    other => problems.push(format!(
                        "{path}[{i}]: expected a string, got {}",
                        type_name(other)
                    )),
                }
            }
            Value::Array(out)
        }
        (FieldKind::ObjectList(inner), Value::Array(items)) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| normalise_object(inner, item, &format!("{path}[{i}]"), problems))
                .collect(),
        ),
        (kind, other) => {
            let expected = match kind {
                FieldKind::Text => "a string",
                FieldKind::Scalar => "a string, number or boolean",
                FieldKind::TextList => "a list of strings",
                FieldKind::ObjectList(_) => "a list of objects",
            };
            problems.push(format!("{path}: expected {expected}, got {}", type_name(other)));
            Value::Null
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
