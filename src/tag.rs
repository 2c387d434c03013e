use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::error::MetaError;

static BINARY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(Binary data (\d+) bytes").unwrap());

static DATE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}[:\-]\d{2}[:\-]\d{2}([ T]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+\-]\d{2}:?\d{2})?)?$")
        .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Scalar(Scalar),
    DateLike { raw_value: String },
    Binary { length: Option<u64> },
    Nested(BTreeMap<String, TagValue>),
    Sequence(Vec<TagValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Bool(bool),
}

impl TagValue {
    pub fn text(value: impl Into<String>) -> Self {
        TagValue::Scalar(Scalar::Text(value.into()))
    }

    pub fn date(raw_value: impl Into<String>) -> Self {
        TagValue::DateLike {
            raw_value: raw_value.into(),
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, TagValue::Binary { .. })
    }

    pub fn is_structured(&self) -> bool {
        match self {
            TagValue::Nested(_) => true,
            TagValue::Sequence(items) => items.iter().any(TagValue::is_structured),
            _ => false,
        }
    }

    pub fn as_scalar_text(&self) -> Option<String> {
        match self {
            TagValue::Scalar(Scalar::Text(text)) => Some(text.clone()),
            TagValue::Scalar(Scalar::Number(number)) => Some(number.to_string()),
            TagValue::Scalar(Scalar::Bool(flag)) => Some(flag.to_string()),
            _ => None,
        }
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(flag) => Some(TagValue::Scalar(Scalar::Bool(*flag))),
            Value::Number(number) => Some(TagValue::Scalar(Scalar::Number(number.clone()))),
            Value::String(text) => Some(decode_string(text)),
            Value::Array(items) => Some(TagValue::Sequence(
                items.iter().filter_map(TagValue::from_json).collect(),
            )),
            Value::Object(map) => Some(decode_object(map)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            TagValue::Scalar(Scalar::Text(text)) => Value::String(text.clone()),
            TagValue::Scalar(Scalar::Number(number)) => Value::Number(number.clone()),
            TagValue::Scalar(Scalar::Bool(flag)) => Value::Bool(*flag),
            TagValue::DateLike { raw_value } => Value::String(raw_value.clone()),
            TagValue::Binary { length } => match length {
                Some(length) => Value::String(format!("(Binary data {length} bytes)")),
                None => Value::String("(Binary data)".to_string()),
            },
            TagValue::Nested(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            TagValue::Sequence(items) => Value::Array(items.iter().map(TagValue::to_json).collect()),
        }
    }
}

fn decode_string(text: &str) -> TagValue {
    if let Some(captures) = BINARY_MARKER.captures(text) {
        return TagValue::Binary {
            length: captures[1].parse().ok(),
        };
    }
    if DATE_SHAPE.is_match(text) {
        return TagValue::date(text);
    }
    TagValue::text(text)
}

fn decode_object(map: &Map<String, Value>) -> TagValue {
    match map.get("_ctor").and_then(Value::as_str) {
        Some("BinaryField") => TagValue::Binary {
            length: map.get("bytes").and_then(Value::as_u64),
        },
        Some("ExifDateTime" | "ExifDate" | "ExifTime") => {
            match map.get("rawValue").and_then(Value::as_str) {
                Some(raw) => TagValue::date(raw),
                None => TagValue::date(""),
            }
        }
        _ => TagValue::Nested(
            map.iter()
                .filter_map(|(key, value)| {
                    TagValue::from_json(value).map(|value| (key.clone(), value))
                })
                .collect(),
        ),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRecord {
    tags: BTreeMap<String, TagValue>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tool_json(value: &Value) -> Result<Self, MetaError> {
        let object = match value {
            Value::Array(items) => match items.as_slice() {
                [Value::Object(object)] => object,
                _ => {
                    return Err(MetaError::Read(format!(
                        "expected exactly one metadata object, got {} entries",
                        items.len()
                    )));
                }
            },
            Value::Object(object) => object,
            _ => {
                return Err(MetaError::Read(
                    "metadata output is not a JSON object".to_string(),
                ));
            }
        };
        Ok(object
            .iter()
            .filter_map(|(key, value)| TagValue::from_json(value).map(|value| (key.clone(), value)))
            .collect())
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.tags.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagValue)> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn with(&self, name: impl Into<String>, value: TagValue) -> Self {
        let mut tags = self.tags.clone();
        tags.insert(name.into(), value);
        Self { tags }
    }
}

impl FromIterator<(String, TagValue)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (String, TagValue)>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, TagValue)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (&'a str, TagValue)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }
}
