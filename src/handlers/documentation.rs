use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::Value;

pub async fn documentation(State(state): State<AppState>) -> Json<Value> {
    Json(state.document.as_ref().clone())
}
