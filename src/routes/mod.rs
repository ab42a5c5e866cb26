//! Route descriptors: the single list of (entity, operation, method, path) that both the axum
//! router and the OpenAPI document are built from.

mod documentation;
mod entity;

pub use documentation::documentation_routes;
pub use entity::entity_routes;

use crate::config::{ApiConfig, Entity, ResolvedModel};
use crate::schema;
use axum::http::Method;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Read,
    /// POST on the item path.
    Update,
    /// PUT on the item path; same semantics as `Update`.
    Replace,
    Delete,
}

impl Operation {
    /// Registration and documentation order.
    pub const ALL: [Operation; 6] = [
        Operation::List,
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Replace,
        Operation::Delete,
    ];

    pub fn method(&self) -> Method {
        match self {
            Operation::List | Operation::Read => Method::GET,
            Operation::Create | Operation::Update => Method::POST,
            Operation::Replace => Method::PUT,
            Operation::Delete => Method::DELETE,
        }
    }

    /// Addressed by primary key (`/{entity}/{id}`).
    pub fn is_item(&self) -> bool {
        !matches!(self, Operation::List | Operation::Create)
    }

    pub fn operation_id(&self, entity: &Entity) -> String {
        let t = &entity.type_name;
        match self {
            Operation::List => format!("get{}List", t),
            Operation::Create => format!("create{}", t),
            Operation::Read => format!("get{}ById", t),
            Operation::Update => format!("update{}", t),
            Operation::Replace => format!("replace{}", t),
            Operation::Delete => format!("delete{}", t),
        }
    }

    pub fn summary(&self, entity: &Entity) -> String {
        match self {
            Operation::List => format!("Get {}.", entity.name),
            Operation::Create => format!("Create {}.", entity.singular),
            Operation::Read => format!("Get {} by id.", entity.singular),
            Operation::Update => format!("Update {}.", entity.singular),
            Operation::Replace => format!("Replace {}.", entity.singular),
            Operation::Delete => format!("Delete {}.", entity.singular),
        }
    }

    /// Component name of the request body schema, if the operation takes a body.
    pub fn input_schema(&self, entity: &Entity) -> Option<String> {
        match self {
            Operation::Create => Some(schema::create_input_name(entity)),
            Operation::Update | Operation::Replace => Some(schema::update_input_name(entity)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub entity: String,
    pub operation: Operation,
    pub method: Method,
    /// OpenAPI template form, prefix included: `/api/pages/{id}`.
    pub path: String,
    pub operation_id: String,
    pub input_schema: Option<String>,
    /// Component name of the entity shape returned (an array of it for `List`).
    pub output_schema: String,
}

impl RouteDescriptor {
    /// Path in axum's syntax: `/api/pages/:id`.
    pub fn axum_path(&self) -> String {
        self.path.replace("{id}", ":id")
    }
}

pub fn collection_path(entity: &Entity, config: &ApiConfig) -> String {
    format!("{}/{}", config.normalized_prefix(), entity.name)
}

/// All routes of all entities, in metadata order then [`Operation::ALL`] order.
pub fn describe(model: &ResolvedModel, config: &ApiConfig) -> Vec<RouteDescriptor> {
    let mut routes = Vec::with_capacity(model.len() * Operation::ALL.len());
    for entity in &model.entities {
        let collection = collection_path(entity, config);
        for operation in Operation::ALL {
            let path = if operation.is_item() {
                format!("{}/{{id}}", collection)
            } else {
                collection.clone()
            };
            routes.push(RouteDescriptor {
                entity: entity.name.clone(),
                operation,
                method: operation.method(),
                path,
                operation_id: operation.operation_id(entity),
                input_schema: operation.input_schema(entity),
                output_schema: schema::full_name(entity),
            });
        }
    }
    routes
}
