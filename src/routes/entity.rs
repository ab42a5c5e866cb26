//! Entity CRUD routes built from route descriptors.
//! Each path gets one method router; the served entity travels as a request extension so the
//! handlers stay generic.

use crate::handlers::entity::{create, delete as delete_handler, list, read, update};
use crate::routes::{Operation, RouteDescriptor};
use crate::state::{AppState, BoundEntity};
use axum::{routing::MethodRouter, Extension, Router};
use std::collections::{BTreeMap, HashMap};

fn attach(router: MethodRouter<AppState>, operation: Operation) -> MethodRouter<AppState> {
    match operation {
        Operation::List => router.get(list),
        Operation::Create => router.post(create),
        Operation::Read => router.get(read),
        Operation::Update => router.post(update),
        Operation::Replace => router.put(update),
        Operation::Delete => router.delete(delete_handler),
    }
}

/// Register exactly the given descriptors. `bound` maps entity names to their runtime data.
pub fn entity_routes(routes: &[RouteDescriptor], bound: &HashMap<String, BoundEntity>) -> Router<AppState> {
    let mut by_path: BTreeMap<String, (&str, MethodRouter<AppState>)> = BTreeMap::new();
    for route in routes {
        let method_router = match by_path.remove(&route.axum_path()) {
            Some((_, existing)) => existing,
            None => MethodRouter::new(),
        };
        by_path.insert(
            route.axum_path(),
            (route.entity.as_str(), attach(method_router, route.operation)),
        );
    }

    let mut router = Router::new();
    for (path, (entity, method_router)) in by_path {
        let Some(bound) = bound.get(entity) else {
            tracing::warn!(entity = %entity, path = %path, "no entity bound for route, skipping");
            continue;
        };
        tracing::info!(entity = %entity, path = %path, "registering entity route");
        router = router.route(&path, method_router.layer(Extension(bound.clone())));
    }
    router
}
