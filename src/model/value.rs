//! Deserializers for the record store's loosely-typed field values
//!
//! The store encodes "no value" as the literal `false` for every field type,
//! singular references as `[id, label]` pairs and multi-references as id
//! arrays. These helpers turn that into `Option`/`Vec` shapes and reject
//! anything else so structural mismatches fail at the connector boundary.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A singular reference as returned by a search call: `[id, label]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: i64,
    pub label: String,
}

fn is_absent(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Bool(false))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Text or selection field; `false` becomes `None`
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        v if is_absent(&v) => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(D::Error::custom(format!(
            "expected text or false, found {}",
            describe(&other)
        ))),
    }
}

/// Translatable text; per-locale objects collapse to their first value
pub fn translatable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        v if is_absent(&v) => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Object(map) => match map.into_iter().next() {
            Some((_, Value::String(s))) => Ok(s),
            Some((_, v)) if is_absent(&v) => Ok(String::new()),
            Some((locale, other)) => Err(D::Error::custom(format!(
                "expected text for locale '{locale}', found {}",
                describe(&other)
            ))),
            None => Ok(String::new()),
        },
        other => Err(D::Error::custom(format!(
            "expected translatable text, found {}",
            describe(&other)
        ))),
    }
}

/// Numeric field kept in its wire representation; `false` becomes `None`
pub fn number<'de, D>(deserializer: D) -> Result<Option<serde_json::Number>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        v if is_absent(&v) => Ok(None),
        Value::Number(n) => Ok(Some(n)),
        other => Err(D::Error::custom(format!(
            "expected number or false, found {}",
            describe(&other)
        ))),
    }
}

/// Floating point field; `false` becomes `None`
pub fn float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number(deserializer)?.and_then(|n| n.as_f64()))
}

/// Integer field; `false` becomes `None`
pub fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match number(deserializer)? {
        None => Ok(None),
        Some(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected integer, found {n}"))),
    }
}

/// Boolean field; `null` reads as `false`
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        other => Err(D::Error::custom(format!(
            "expected boolean, found {}",
            describe(&other)
        ))),
    }
}

/// Singular reference: `[id, label]` or `false`
pub fn many2one<'de, D>(deserializer: D) -> Result<Option<Reference>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        v if is_absent(&v) => Ok(None),
        Value::Array(pair) if pair.len() == 2 => {
            let id = pair[0]
                .as_i64()
                .ok_or_else(|| D::Error::custom("reference id is not an integer"))?;
            let label = match &pair[1] {
                Value::String(s) => s.clone(),
                v if is_absent(v) => String::new(),
                other => {
                    return Err(D::Error::custom(format!(
                        "reference label must be text, found {}",
                        describe(other)
                    )));
                }
            };
            Ok(Some(Reference { id, label }))
        }
        other => Err(D::Error::custom(format!(
            "expected [id, label] pair or false, found {}",
            describe(&other)
        ))),
    }
}

/// Multi-reference: ordered id list or `false`
pub fn many2many<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        v if is_absent(&v) => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_i64()
                    .ok_or_else(|| D::Error::custom("reference id list holds a non-integer"))
            })
            .collect(),
        other => Err(D::Error::custom(format!(
            "expected id list or false, found {}",
            describe(&other)
        ))),
    }
}
