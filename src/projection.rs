//! Field projection: the `fields` query parameter, normalized into one validated set.
//!
//! `fields=a&fields=b`, `fields=a,b` and any mix of the two are equivalent. Names are external
//! (camelCase). Output objects always follow the entity's declared field order.

use crate::config::Entity;
use crate::error::AppError;
use crate::mapper::Row;
use serde_json::{Map, Value};

pub const FIELDS_PARAM: &str = "fields";

/// Validated projection. Holds internal field names in declared order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSet {
    fields: Vec<String>,
}

impl FieldSet {
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Every raw `fields` value from a query string, in order of appearance.
pub fn raw_fields(query: &[(String, String)]) -> Vec<&str> {
    query
        .iter()
        .filter(|(k, _)| k == FIELDS_PARAM)
        .map(|(_, v)| v.as_str())
        .collect()
}

/// Resolve raw `fields` values against the entity. `None` means no projection was requested.
pub fn resolve(entity: &Entity, raw: &[&str]) -> Result<Option<FieldSet>, AppError> {
    let mut requested = Vec::new();
    for name in raw.iter().flat_map(|v| v.split(',')).map(str::trim).filter(|n| !n.is_empty()) {
        let field = entity.field_by_api_name(name).ok_or_else(|| {
            AppError::BadRequest(format!("querystring/{} has unknown property '{}'", FIELDS_PARAM, name))
        })?;
        requested.push(field.name.as_str());
    }
    if requested.is_empty() {
        return Ok(None);
    }
    let fields = entity
        .fields
        .iter()
        .filter(|f| requested.contains(&f.name.as_str()))
        .map(|f| f.name.clone())
        .collect();
    Ok(Some(FieldSet { fields }))
}

/// Shape a mapper row into a response object: external names, declared order, projected.
/// A projected field the row does not carry is rendered as null so the key set always
/// equals the projection.
pub fn shape(entity: &Entity, row: &Row, fields: Option<&FieldSet>) -> Value {
    let mut out = Map::new();
    for field in &entity.fields {
        if fields.map_or(true, |set| set.contains(&field.name)) {
            let value = row.get(&field.name).cloned().unwrap_or(Value::Null);
            out.insert(field.api_name.clone(), value);
        }
    }
    Value::Object(out)
}
