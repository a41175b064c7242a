//! Flat wire shapes expected by the job-execution service.

use serde::{Deserialize, Serialize};

/// A single field of a wire object: a key paired with either a literal
/// string or a reference to another emitted object's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireField {
    pub key: String,
    #[serde(flatten)]
    pub value: WireFieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireFieldValue {
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "refValue")]
    Ref(String),
}

/// A definition node in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireObject {
    pub id: String,
    pub name: String,
    pub fields: Vec<WireField>,
}

/// A declared parameter in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireParameter {
    pub id: String,
    pub attributes: Vec<WireField>,
}

/// A parameter value binding in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireValue {
    pub id: String,
    #[serde(rename = "stringValue")]
    pub string_value: String,
}

impl WireField {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        WireField {
            key: key.into(),
            value: WireFieldValue::String(value.into()),
        }
    }

    pub fn reference(key: impl Into<String>, target: impl Into<String>) -> Self {
        WireField {
            key: key.into(),
            value: WireFieldValue::Ref(target.into()),
        }
    }
}
