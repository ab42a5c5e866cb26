//! JSON Schema synthesis per entity. The same schema values feed request validation and the
//! OpenAPI components, so documentation and behavior share one source.

use crate::config::{Entity, Field, FieldType};
use crate::projection::FieldSet;
use serde_json::{json, Map, Value};

#[derive(Clone, Debug, PartialEq)]
pub struct EntitySchemas {
    /// Every field; the row as stored.
    pub full: Value,
    /// Every field but the primary key; required = non-nullable without default.
    pub create_input: Value,
    /// Same fields as `create_input`, nothing required.
    pub update_input: Value,
}

pub fn full_name(entity: &Entity) -> String {
    entity.type_name.clone()
}

pub fn create_input_name(entity: &Entity) -> String {
    format!("{}CreateInput", entity.type_name)
}

pub fn update_input_name(entity: &Entity) -> String {
    format!("{}UpdateInput", entity.type_name)
}

/// Schema of a single field value. Relation fields are plain scalars.
pub fn field_schema(field: &Field) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), json!(field.field_type.json_type()));
    if let Some(format) = field.field_type.format() {
        schema.insert("format".into(), json!(format));
    }
    if field.nullable {
        schema.insert("nullable".into(), json!(true));
    }
    Value::Object(schema)
}

fn object<'a>(fields: impl Iterator<Item = &'a Field>, required: impl Fn(&Field) -> bool, closed: bool) -> Value {
    let mut properties = Map::new();
    let mut required_names = Vec::new();
    for field in fields {
        properties.insert(field.api_name.clone(), field_schema(field));
        if required(field) {
            required_names.push(json!(field.api_name));
        }
    }
    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    if !required_names.is_empty() {
        schema.insert("required".into(), Value::Array(required_names));
    }
    if closed {
        schema.insert("additionalProperties".into(), json!(false));
    }
    Value::Object(schema)
}

pub fn synthesize(entity: &Entity) -> EntitySchemas {
    EntitySchemas {
        full: object(entity.fields.iter(), |f| !f.nullable, false),
        create_input: object(entity.input_fields(), Field::required_on_create, true),
        update_input: object(entity.input_fields(), |_| false, true),
    }
}

/// Output schema of one request: `full` narrowed to the projected fields. Documentation keeps
/// advertising the full shape; this is for callers that want the exact per-request shape.
pub fn project(entity: &Entity, fields: Option<&FieldSet>) -> Value {
    match fields {
        None => object(entity.fields.iter(), |f| !f.nullable, false),
        Some(set) => object(
            entity.fields.iter().filter(|f| set.contains(&f.name)),
            |f| !f.nullable,
            false,
        ),
    }
}
