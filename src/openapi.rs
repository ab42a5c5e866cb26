//! OpenAPI 3.0 document assembly from route descriptors and entity schemas.
//!
//! The document and the router consume the same [`RouteDescriptor`] list, so every documented
//! operation is served and every served operation is documented.

use crate::config::{Entity, OpenApiInfo, ResolvedModel};
use crate::mapper::FilterOp;
use crate::projection::FIELDS_PARAM;
use crate::query::{LIMIT_PARAM, OFFSET_PARAM, ORDER_BY_PREFIX, TOTAL_COUNT_PARAM, WHERE_PREFIX};
use crate::routes::{Operation, RouteDescriptor};
use crate::schema::{self, EntitySchemas};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub const OPENAPI_VERSION: &str = "3.0.3";
pub const BAD_REQUEST_SCHEMA: &str = "BadRequest";

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

fn query_param(name: &str, schema: Value) -> Value {
    json!({ "name": name, "in": "query", "required": false, "schema": schema })
}

fn fields_param(entity: &Entity) -> Value {
    let names: Vec<&str> = entity.fields.iter().map(|f| f.api_name.as_str()).collect();
    query_param(
        FIELDS_PARAM,
        json!({
            "oneOf": [
                { "type": "string" },
                { "type": "array", "items": { "type": "string", "enum": names } }
            ]
        }),
    )
}

fn list_params(entity: &Entity) -> Vec<Value> {
    let mut params = vec![
        query_param(LIMIT_PARAM, json!({ "type": "integer", "minimum": 0 })),
        query_param(OFFSET_PARAM, json!({ "type": "integer", "minimum": 0 })),
        query_param(TOTAL_COUNT_PARAM, json!({ "type": "boolean" })),
    ];
    for field in &entity.fields {
        params.push(query_param(
            &format!("{}{}", ORDER_BY_PREFIX, field.api_name),
            json!({ "type": "string", "enum": ["asc", "desc"] }),
        ));
    }
    for field in &entity.fields {
        let mut value = schema::field_schema(field);
        if let Some(obj) = value.as_object_mut() {
            obj.remove("nullable");
        }
        for op in FilterOp::ALL {
            let schema = if op.is_list() { json!({ "type": "string" }) } else { value.clone() };
            params.push(query_param(
                &format!("{}{}.{}", WHERE_PREFIX, field.api_name, op.as_str()),
                schema,
            ));
        }
    }
    params
}

fn id_param(entity: &Entity) -> Value {
    let mut schema = schema::field_schema(entity.primary_key());
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("nullable");
    }
    json!({ "name": "id", "in": "path", "required": true, "schema": schema })
}

fn operation(route: &RouteDescriptor, entity: &Entity) -> Value {
    let mut op = Map::new();
    op.insert("operationId".into(), json!(route.operation_id));
    op.insert("tags".into(), json!([entity.name]));
    op.insert("summary".into(), json!(route.operation.summary(entity)));

    let mut params = Vec::new();
    if route.operation.is_item() {
        params.push(id_param(entity));
    }
    params.push(fields_param(entity));
    if route.operation == Operation::List {
        params.extend(list_params(entity));
    }
    op.insert("parameters".into(), Value::Array(params));

    if let Some(ref input) = route.input_schema {
        op.insert(
            "requestBody".into(),
            json!({
                "required": true,
                "content": { "application/json": { "schema": schema_ref(input) } }
            }),
        );
    }

    let body = if route.operation == Operation::List {
        json!({ "type": "array", "items": schema_ref(&route.output_schema) })
    } else {
        schema_ref(&route.output_schema)
    };
    let mut ok = Map::new();
    ok.insert("description".into(), json!("Default Response"));
    match route.operation {
        Operation::Create => {
            ok.insert(
                "headers".into(),
                json!({ "Location": { "schema": { "type": "string" }, "description": "URL of the new resource" } }),
            );
        }
        Operation::List => {
            ok.insert(
                "headers".into(),
                json!({ "X-Total-Count": { "schema": { "type": "integer" }, "description": "Set when totalCount=true" } }),
            );
        }
        _ => {}
    }
    ok.insert("content".into(), json!({ "application/json": { "schema": body } }));

    let mut responses = Map::new();
    responses.insert("200".into(), Value::Object(ok));
    responses.insert(
        "400".into(),
        json!({
            "description": "Bad Request",
            "content": { "application/json": { "schema": schema_ref(BAD_REQUEST_SCHEMA) } }
        }),
    );
    if route.operation.is_item() {
        responses.insert("404".into(), json!({ "description": "Not Found" }));
    }
    op.insert("responses".into(), Value::Object(responses));
    Value::Object(op)
}

fn bad_request_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "statusCode": { "type": "integer" },
            "error": { "type": "string" },
            "message": { "type": "string" }
        },
        "required": ["statusCode", "error", "message"]
    })
}

/// Build the document. Output is deterministic for a given model: paths follow route order and
/// components follow entity order.
pub fn assemble(
    model: &ResolvedModel,
    schemas: &HashMap<String, Arc<EntitySchemas>>,
    routes: &[RouteDescriptor],
    info: &OpenApiInfo,
) -> Value {
    let mut paths: Map<String, Value> = Map::new();
    for route in routes {
        let Some(entity) = model.entity(&route.entity) else {
            tracing::warn!(entity = %route.entity, "route references an unknown entity, not documented");
            continue;
        };
        let entry = paths.entry(route.path.clone()).or_insert_with(|| json!({}));
        if let Some(obj) = entry.as_object_mut() {
            obj.insert(route.method.as_str().to_lowercase(), operation(route, entity));
        }
    }

    let mut components: Map<String, Value> = Map::new();
    for entity in &model.entities {
        let Some(entity_schemas) = schemas.get(&entity.name) else {
            continue;
        };
        components.insert(schema::full_name(entity), entity_schemas.full.clone());
        components.insert(schema::create_input_name(entity), entity_schemas.create_input.clone());
        components.insert(schema::update_input_name(entity), entity_schemas.update_input.clone());
    }
    components.insert(BAD_REQUEST_SCHEMA.into(), bad_request_schema());

    json!({
        "openapi": OPENAPI_VERSION,
        "info": {
            "title": info.title,
            "description": info.description,
            "version": info.version
        },
        "paths": paths,
        "components": { "schemas": components }
    })
}
