//! Wiring: resolved model -> route descriptors + schemas + OpenAPI document -> axum router.

use crate::config::{load_from_mapper, ApiConfig, ResolvedModel};
use crate::error::AppError;
use crate::mapper::Mapper;
use crate::openapi;
use crate::routes::{self, collection_path, RouteDescriptor};
use crate::schema::{self, EntitySchemas};
use crate::state::{AppState, BoundEntity};
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Everything derived from the model before any route is registered.
pub struct Generated {
    pub routes: Vec<RouteDescriptor>,
    pub schemas: HashMap<String, Arc<EntitySchemas>>,
    pub document: Value,
}

pub fn generate(model: &ResolvedModel, config: &ApiConfig) -> Generated {
    let schemas: HashMap<String, Arc<EntitySchemas>> = model
        .entities
        .iter()
        .map(|e| (e.name.clone(), Arc::new(schema::synthesize(e))))
        .collect();
    let routes = routes::describe(model, config);
    let document = openapi::assemble(model, &schemas, &routes, &config.info);
    Generated {
        routes,
        schemas,
        document,
    }
}

/// Build the application router for an already resolved model.
pub fn router(mapper: Arc<dyn Mapper>, model: ResolvedModel, config: ApiConfig) -> Router {
    let generated = generate(&model, &config);

    let bound: HashMap<String, BoundEntity> = model
        .entities
        .iter()
        .filter_map(|entity| {
            let schemas = generated.schemas.get(&entity.name)?.clone();
            Some((
                entity.name.clone(),
                BoundEntity {
                    entity: entity.clone(),
                    schemas,
                    collection_path: collection_path(entity, &config),
                },
            ))
        })
        .collect();

    tracing::info!(
        entities = model.len(),
        routes = generated.routes.len(),
        docs = %config.documentation_path,
        "generated REST API"
    );

    let body_limit = config.body_limit;
    let app = routes::entity_routes(&generated.routes, &bound).merge(routes::documentation_routes(&config));
    let state = AppState {
        mapper,
        document: Arc::new(generated.document),
    };
    app.layer(RequestBodyLimitLayer::new(body_limit)).with_state(state)
}

/// Discover metadata through the mapper, resolve it, and build the router.
pub async fn build(mapper: Arc<dyn Mapper>, config: ApiConfig) -> Result<Router, AppError> {
    let model = load_from_mapper(mapper.as_ref(), &config).await?;
    Ok(router(mapper, model, config))
}
