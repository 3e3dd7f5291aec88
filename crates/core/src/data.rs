//! Collected form payloads.

use serde_json::{Map, Value};

use crate::path::value_to_field_string;
use crate::validation::{FieldAccessor, SelectedFile};

/// Data collected from a form, ready to hand to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum FormData {
    /// Field name → trimmed value (an array for repeated `name[]` fields).
    Plain(Map<String, Value>),
    /// Ordered text and file parts, used when files are selected.
    Multipart(Vec<FormPart>),
    /// An arbitrary JSON payload produced by a pre-submit hook.
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub value: PartValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartValue {
    Text(String),
    File(SelectedFile),
}

impl FormData {
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }

    /// JSON view of the payload. File parts are rendered as their names.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Plain(map) => Value::Object(map.clone()),
            Self::Json(value) => value.clone(),
            Self::Multipart(parts) => {
                let mut map = Map::new();
                for part in parts {
                    let rendered = match &part.value {
                        PartValue::Text(text) => Value::String(text.clone()),
                        PartValue::File(file) => Value::String(file.name.clone()),
                    };
                    push_value(&mut map, &part.name, rendered);
                }
                Value::Object(map)
            }
        }
    }
}

/// Insert `value` under `name`; repeated `name[]` keys accumulate into an array.
pub fn push_value(map: &mut Map<String, Value>, name: &str, value: Value) {
    if name.ends_with("[]") {
        match map.get_mut(name) {
            Some(Value::Array(items)) => items.push(value),
            _ => {
                map.insert(name.to_string(), Value::Array(vec![value]));
            }
        }
    } else {
        map.insert(name.to_string(), value);
    }
}

/// Text seen by validation: arrays of repeated values join with `,`.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_field_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => value_to_field_string(other),
    }
}

impl FieldAccessor for FormData {
    fn text(&self, field: &str) -> Option<String> {
        match self {
            Self::Plain(map) => map.get(field).and_then(field_text),
            Self::Json(value) => value.get(field).and_then(field_text),
            Self::Multipart(parts) => {
                let texts: Vec<&str> = parts
                    .iter()
                    .filter(|p| p.name == field)
                    .filter_map(|p| match &p.value {
                        PartValue::Text(text) => Some(text.as_str()),
                        PartValue::File(_) => None,
                    })
                    .collect();
                if texts.is_empty() {
                    None
                } else if field.ends_with("[]") {
                    Some(texts.join(","))
                } else {
                    texts.last().map(|t| t.to_string())
                }
            }
        }
    }

    fn files(&self, field: &str) -> Option<Vec<SelectedFile>> {
        let Self::Multipart(parts) = self else {
            return None;
        };
        let files: Vec<SelectedFile> = parts
            .iter()
            .filter(|p| p.name == field)
            .filter_map(|p| match &p.value {
                PartValue::File(file) => Some(file.clone()),
                PartValue::Text(_) => None,
            })
            .collect();
        (!files.is_empty()).then_some(files)
    }
}
