//! Entity CRUD handlers: create, read, list, update, delete.

use crate::error::AppError;
use crate::query;
use crate::service::{CrudService, RequestValidator};
use crate::state::{AppState, BoundEntity};
use axum::{
    body::Bytes,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

pub const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("x-total-count");

/// Everything but RFC 3986 unreserved characters is escaped in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;
type IdPath = Result<Path<String>, PathRejection>;

fn id_segment(id: &Value) -> String {
    match id {
        Value::String(s) => utf8_percent_encode(s, PATH_SEGMENT).to_string(),
        other => other.to_string(),
    }
}

/// Extractor rejections are reported in the same envelope as validation errors.
fn query_pairs(query: QueryPairs) -> Result<Vec<(String, String)>, AppError> {
    query
        .map(|Query(pairs)| pairs)
        .map_err(|_| AppError::BadRequest("querystring must be a valid query string".into()))
}

fn path_id(bound: &BoundEntity, path: IdPath) -> Result<Value, AppError> {
    match path {
        Ok(Path(raw)) => query::parse_id(&bound.entity, &raw),
        Err(_) => Err(AppError::BadRequest(format!(
            "params/id must be {}",
            bound.entity.primary_key().field_type.json_type()
        ))),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Extension(bound): Extension<BoundEntity>,
    params: QueryPairs,
) -> Result<Response, AppError> {
    let params = query_pairs(params)?;
    let parsed = query::parse_list(&bound.entity, &params)?;
    let listed = CrudService::list(state.mapper.as_ref(), &bound.entity, &parsed).await?;
    let mut response = Json(listed.rows).into_response();
    if let Some(total) = listed.total_count {
        response.headers_mut().insert(TOTAL_COUNT_HEADER, HeaderValue::from(total));
    }
    Ok(response)
}

pub async fn create(
    State(state): State<AppState>,
    Extension(bound): Extension<BoundEntity>,
    params: QueryPairs,
    body: Bytes,
) -> Result<Response, AppError> {
    let body = RequestValidator::parse_body(&body)?;
    let values = RequestValidator::validate(&bound.entity, &bound.schemas.create_input, body)?;
    let fields = query::parse_fields(&bound.entity, &query_pairs(params)?)?;
    let created = CrudService::create(state.mapper.as_ref(), &bound.entity, values, fields.as_ref()).await?;

    let location = format!("{}/{}", bound.collection_path, id_segment(&created.id));
    let mut response = Json(created.body).into_response();
    match HeaderValue::from_str(&location) {
        Ok(value) => {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Err(_) => tracing::warn!(location = %location, "created row id is not a valid header value"),
    }
    Ok(response)
}

pub async fn read(
    State(state): State<AppState>,
    Extension(bound): Extension<BoundEntity>,
    path: IdPath,
    params: QueryPairs,
) -> Result<Response, AppError> {
    let id = path_id(&bound, path)?;
    let fields = query::parse_fields(&bound.entity, &query_pairs(params)?)?;
    let row = CrudService::read(state.mapper.as_ref(), &bound.entity, &id, fields.as_ref()).await?;
    Ok(Json(row).into_response())
}

/// Serves both POST and PUT on the item path.
pub async fn update(
    State(state): State<AppState>,
    Extension(bound): Extension<BoundEntity>,
    path: IdPath,
    params: QueryPairs,
    body: Bytes,
) -> Result<Response, AppError> {
    let id = path_id(&bound, path)?;
    let body = RequestValidator::parse_body(&body)?;
    let values = RequestValidator::validate(&bound.entity, &bound.schemas.update_input, body)?;
    let fields = query::parse_fields(&bound.entity, &query_pairs(params)?)?;
    let row = CrudService::update(state.mapper.as_ref(), &bound.entity, &id, values, fields.as_ref()).await?;
    Ok(Json(row).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(bound): Extension<BoundEntity>,
    path: IdPath,
    params: QueryPairs,
) -> Result<Response, AppError> {
    let id = path_id(&bound, path)?;
    let fields = query::parse_fields(&bound.entity, &query_pairs(params)?)?;
    let row = CrudService::delete(state.mapper.as_ref(), &bound.entity, &id, fields.as_ref()).await?;
    Ok(Json(row).into_response())
}
