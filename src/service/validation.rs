//! Request body validation against the synthesized input schemas.
//!
//! Only the subset of JSON Schema the synthesizer emits is interpreted: `type: object`,
//! `properties` (with `type`, `nullable`, `format`), `required` and
//! `additionalProperties: false`. Additional properties are removed rather than rejected.
//! Whole-valued floats sent for integer properties are rewritten as integers.

use crate::config::Entity;
use crate::error::AppError;
use crate::mapper::Row;
use crate::query::matches_format;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Parse a raw request body into a JSON value.
    pub fn parse_body(bytes: &[u8]) -> Result<Value, AppError> {
        serde_json::from_slice(bytes).map_err(|_| AppError::BadRequest("body must be valid JSON".into()))
    }

    /// Validate `body` against `schema` and return it keyed by internal field names.
    pub fn validate(entity: &Entity, schema: &Value, body: Value) -> Result<Row, AppError> {
        let Value::Object(mut body) = body else {
            return Err(AppError::BadRequest("body must be object".into()));
        };

        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if !body.contains_key(name) {
                    return Err(AppError::BadRequest(format!(
                        "body must have required property '{}'",
                        name
                    )));
                }
            }
        }

        let empty = serde_json::Map::new();
        let properties = schema.get("properties").and_then(Value::as_object).unwrap_or(&empty);
        body.retain(|name, _| properties.contains_key(name));

        let mut row = Row::new();
        for (name, mut value) in body {
            if let Some(property) = properties.get(&name) {
                value = validate_property(&name, property, value)?;
            }
            if let Some(field) = entity.field_by_api_name(&name) {
                row.insert(field.name.clone(), value);
            }
        }
        Ok(row)
    }
}

/// Check one property and return the value as it should be stored.
fn validate_property(name: &str, property: &Value, value: Value) -> Result<Value, AppError> {
    let nullable = property.get("nullable").and_then(Value::as_bool).unwrap_or(false);
    let expected = property.get("type").and_then(Value::as_str).unwrap_or("string");
    if value.is_null() {
        if nullable {
            return Ok(value);
        }
        return Err(type_error(name, expected));
    }
    let value = match expected {
        "string" if value.is_string() => value,
        "integer" => as_integer(&value).ok_or_else(|| type_error(name, expected))?,
        "number" if value.is_number() => value,
        "boolean" if value.is_boolean() => value,
        "string" | "number" | "boolean" => return Err(type_error(name, expected)),
        _ => value,
    };
    if let Some(format) = property.get("format").and_then(Value::as_str) {
        if !value.as_str().map(|s| matches_format(format, s)).unwrap_or(false) {
            return Err(AppError::BadRequest(format!(
                "body/{} must match format \"{}\"",
                name, format
            )));
        }
    }
    Ok(value)
}

/// Integers pass through; whole floats such as `1.0` become `1`.
fn as_integer(value: &Value) -> Option<Value> {
    if value.is_i64() || value.is_u64() {
        return Some(value.clone());
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        None
    }
}

fn type_error(name: &str, expected: &str) -> AppError {
    AppError::BadRequest(format!("body/{} must be {}", name, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, ApiConfig, EntityMetadata, FieldMetadata, FieldType};
    use crate::schema::synthesize;
    use serde_json::json;
    use std::sync::Arc;

    fn pages() -> Arc<Entity> {
        let meta = EntityMetadata::new("pages", "id")
            .with_field(FieldMetadata::new("id", FieldType::Integer).with_default())
            .with_field(FieldMetadata::new("title", FieldType::String))
            .with_field(FieldMetadata::new("long_text", FieldType::String).nullable())
            .with_field(FieldMetadata::new("views", FieldType::Integer).with_default())
            .with_field(FieldMetadata::new("published_at", FieldType::Timestamp).nullable())
            .with_field(FieldMetadata::new("issued_on", FieldType::Date).nullable())
            .with_field(FieldMetadata::new("token", FieldType::Uuid).nullable());
        resolve(&[meta], &ApiConfig::default()).unwrap().entities[0].clone()
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::BadRequest(m) => m,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn maps_external_names_and_strips_unknown_properties() {
        let entity = pages();
        let schema = synthesize(&entity).create_input;
        let row = RequestValidator::validate(
            &entity,
            &schema,
            json!({ "id": 9, "title": "Hello", "longText": "x", "extra": true }),
        )
        .unwrap();
        assert_eq!(Value::Object(row), json!({ "title": "Hello", "long_text": "x" }));
    }

    #[test]
    fn missing_required_property() {
        let entity = pages();
        let schema = synthesize(&entity).create_input;
        let err = RequestValidator::validate(&entity, &schema, json!({ "tilte": "Hello" })).unwrap_err();
        assert_eq!(message(err), "body must have required property 'title'");
    }

    #[test]
    fn type_and_format_errors() {
        let entity = pages();
        let schema = synthesize(&entity).update_input;
        let cases = [
            (json!({ "title": 3 }), "body/title must be string"),
            (json!({ "title": null }), "body/title must be string"),
            (json!({ "views": 1.5 }), "body/views must be integer"),
            (json!({ "publishedAt": "soon" }), "body/publishedAt must match format \"date-time\""),
            (json!({ "issuedOn": "2024-13-01" }), "body/issuedOn must match format \"date\""),
            (json!({ "token": "not-a-uuid" }), "body/token must match format \"uuid\""),
            (json!([1, 2]), "body must be object"),
        ];
        for (body, expected) in cases {
            let err = RequestValidator::validate(&entity, &schema, body).unwrap_err();
            assert_eq!(message(err), expected);
        }
    }

    #[test]
    fn nullable_and_partial_updates_pass() {
        let entity = pages();
        let schema = synthesize(&entity).update_input;
        let row = RequestValidator::validate(
            &entity,
            &schema,
            json!({ "longText": null, "publishedAt": "2024-05-01T10:00:00Z" }),
        )
        .unwrap();
        assert_eq!(row.len(), 2);
        assert!(RequestValidator::validate(&entity, &schema, json!({})).unwrap().is_empty());
    }

    #[test]
    fn whole_floats_are_stored_as_integers() {
        let entity = pages();
        let schema = synthesize(&entity).update_input;
        let row = RequestValidator::validate(&entity, &schema, json!({ "views": 1.0 })).unwrap();
        assert_eq!(row["views"], json!(1));
        assert_eq!(
            crate::sql::PgBindValue::from_json(&row["views"]),
            crate::sql::PgBindValue::Text("1".into())
        );
        let err = RequestValidator::validate(&entity, &schema, json!({ "views": 1e300 })).unwrap_err();
        assert_eq!(message(err), "body/views must be integer");
    }

    #[test]
    fn dates_and_uuids_pass() {
        let entity = pages();
        let schema = synthesize(&entity).update_input;
        let row = RequestValidator::validate(
            &entity,
            &schema,
            json!({ "issuedOn": "2024-05-01", "token": "5f0c6a4e-2d1b-4a8e-9b57-0f3c2d1e4a6b" }),
        )
        .unwrap();
        assert_eq!(row["issued_on"], json!("2024-05-01"));
    }

    #[test]
    fn invalid_json() {
        assert_eq!(
            message(RequestValidator::parse_body(b"{nope").unwrap_err()),
            "body must be valid JSON"
        );
    }
}
