//! Shared application state for all routes. Everything here is read-only after startup.

use crate::config::Entity;
use crate::mapper::Mapper;
use crate::schema::EntitySchemas;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub mapper: Arc<dyn Mapper>,
    /// OpenAPI document, built once.
    pub document: Arc<Value>,
}

/// The entity a generated route serves, attached to each route as a request extension.
#[derive(Clone)]
pub struct BoundEntity {
    pub entity: Arc<Entity>,
    pub schemas: Arc<EntitySchemas>,
    /// e.g. "/api/pages"; `Location` headers are built from it.
    pub collection_path: String,
}
