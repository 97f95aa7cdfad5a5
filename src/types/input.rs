//! Raw assessment input as handed over by the form

use crate::catalog::Field;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single user-supplied value: a bounded integer or a category label.
///
/// Any other JSON value lands in `Other` so the field it was sent for can
/// be named when it is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(i64),
    Label(String),
    Other(serde_json::Value),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Label(label) => f.write_str(label),
            RawValue::Other(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Number(value.into())
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Label(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Label(value)
    }
}

/// Field name to raw value, for one completed form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    fields: BTreeMap<String, RawValue>,
}

impl RawInput {
    /// Create an empty input
    pub fn new() -> Self {
        Self::default()
    }

    /// Input holding the value every form widget starts at
    pub fn with_form_defaults() -> Self {
        Field::ALL
            .iter()
            .fold(Self::new(), |input, field| {
                input.with(field.name(), field.initial_value())
            })
    }

    /// Set a field, replacing any previous value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<RawValue> {
        self.fields.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawInput
where
    K: Into<String>,
    V: Into<RawValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Scoring request as received from the message bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRequest {
    /// Caller-chosen identifier echoed in the result
    #[serde(default = "new_request_id")]
    pub request_id: String,

    /// Completed form values
    pub fields: RawInput,
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl AssessmentRequest {
    /// Create a request with a fresh identifier
    pub fn new(fields: RawInput) -> Self {
        Self {
            request_id: new_request_id(),
            fields,
        }
    }
}
