//! Definition tree → wire list translation.

use serde_json::Value;

use crate::error::DefinitionError;
use crate::types::{WireField, WireObject, WireParameter, WireValue};

/// Flatten the required `objects` section into wire objects.
///
/// Each element must carry an `id`; `name` defaults to the id. Remaining
/// key/value pairs become fields in sorted-key order. List values expand
/// to multiple fields sharing the key; a single-key `{"ref": id}` map
/// becomes a reference field.
pub fn to_wire_objects(definition: &Value) -> Result<Vec<WireObject>, DefinitionError> {
    let elements = definition
        .get("objects")
        .and_then(Value::as_array)
        .ok_or(DefinitionError::MissingObjects)?;

    let mut objects = Vec::with_capacity(elements.len());
    for element in elements {
        let (id, fields) = flatten_element(element, &["id", "name"])?;
        let name = element
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&id)
            .to_string();
        objects.push(WireObject { id, name, fields });
    }
    Ok(objects)
}

/// Flatten the optional `parameters` section. An absent section is an
/// empty result, not an error.
pub fn to_wire_parameters(definition: &Value) -> Result<Vec<WireParameter>, DefinitionError> {
    let Some(elements) = definition.get("parameters").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let mut parameters = Vec::with_capacity(elements.len());
    for element in elements {
        let (id, attributes) = flatten_element(element, &["id"])?;
        parameters.push(WireParameter { id, attributes });
    }
    Ok(parameters)
}

/// Expand the optional `values` mapping into `{id, stringValue}` bindings,
/// preserving list order for list-valued entries.
pub fn to_wire_values(definition: &Value) -> Result<Vec<WireValue>, DefinitionError> {
    let Some(entries) = definition.get("values").and_then(Value::as_object) else {
        return Ok(Vec::new());
    };

    let mut values = Vec::new();
    for (id, value) in entries {
        match value {
            Value::Array(items) => {
                for item in items {
                    values.push(WireValue {
                        id: id.clone(),
                        string_value: scalar_to_string(item).ok_or_else(|| {
                            unsupported(id, item)
                        })?,
                    });
                }
            }
            other => values.push(WireValue {
                id: id.clone(),
                string_value: scalar_to_string(other).ok_or_else(|| unsupported(id, other))?,
            }),
        }
    }
    Ok(values)
}

/// Pull the id out of a definition element and flatten every key not in
/// `consumed` into wire fields, sorted by key.
fn flatten_element(
    element: &Value,
    consumed: &[&str],
) -> Result<(String, Vec<WireField>), DefinitionError> {
    let map = element.as_object().ok_or_else(|| DefinitionError::MissingId {
        element: element.to_string(),
    })?;

    let id = map
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| DefinitionError::MissingId {
            element: element.to_string(),
        })?
        .to_string();

    // serde_json's map is already key-ordered; keep the explicit sort so
    // the ordering contract survives a map implementation change.
    let mut keys: Vec<&String> = map
        .keys()
        .filter(|k| !consumed.contains(&k.as_str()))
        .collect();
    keys.sort();

    let mut fields = Vec::new();
    for key in keys {
        fields.extend(parse_each_field(key, &map[key])?);
    }
    Ok((id, fields))
}

fn parse_each_field(key: &str, value: &Value) -> Result<Vec<WireField>, DefinitionError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| convert_single_field(key, item))
            .collect(),
        other => Ok(vec![convert_single_field(key, other)?]),
    }
}

fn convert_single_field(key: &str, value: &Value) -> Result<WireField, DefinitionError> {
    if let Value::Object(map) = value {
        if map.len() == 1
            && let Some(target) = map.get("ref").and_then(Value::as_str)
        {
            return Ok(WireField::reference(key, target));
        }
        return Err(unsupported(key, value));
    }

    scalar_to_string(value)
        .map(|s| WireField::string(key, s))
        .ok_or_else(|| unsupported(key, value))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn unsupported(key: &str, value: &Value) -> DefinitionError {
    DefinitionError::UnsupportedValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
