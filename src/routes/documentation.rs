//! OpenAPI document route.

use crate::config::ApiConfig;
use crate::handlers::documentation::documentation;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn documentation_routes(config: &ApiConfig) -> Router<AppState> {
    Router::new().route(&config.documentation_path, get(documentation))
}
