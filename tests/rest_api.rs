use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sql_openapi::config::{EntityMetadata, FieldMetadata, FieldType};
use sql_openapi::{build, ApiConfig, MemoryMapper};
use std::sync::Arc;
use tower::ServiceExt;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn pages() -> EntityMetadata {
    EntityMetadata::new("pages", "id")
        .with_field(FieldMetadata::new("id", FieldType::Integer).with_default())
        .with_field(FieldMetadata::new("title", FieldType::String))
}

fn blog() -> Vec<EntityMetadata> {
    vec![
        EntityMetadata::new("categories", "id")
            .with_field(FieldMetadata::new("id", FieldType::Integer).with_default())
            .with_field(FieldMetadata::new("name", FieldType::String)),
        EntityMetadata::new("posts", "id")
            .with_field(FieldMetadata::new("id", FieldType::Integer).with_default())
            .with_field(FieldMetadata::new("title", FieldType::String))
            .with_field(FieldMetadata::new("body", FieldType::String).nullable())
            .with_field(FieldMetadata::new("category_id", FieldType::Integer).nullable())
            .with_relation("category_id", "categories"),
    ]
}

async fn app(metadata: Vec<EntityMetadata>) -> Router {
    app_with(metadata, ApiConfig::default()).await
}

async fn app_with(metadata: Vec<EntityMetadata>, config: ApiConfig) -> Router {
    build(Arc::new(MemoryMapper::new(metadata)), config).await.unwrap()
}

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    raw: String,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_str(&self.raw).unwrap()
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        raw: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

async fn get(router: &Router, uri: &str) -> Reply {
    send(router, Method::GET, uri, None).await
}

async fn post(router: &Router, uri: &str, body: Value) -> Reply {
    send(router, Method::POST, uri, Some(body)).await
}

// ── Wire contract ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_row_and_location() {
    let router = app(vec![pages()]).await;
    let reply = post(&router, "/pages", json!({ "title": "Hello" })).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.raw, r#"{"id":1,"title":"Hello"}"#);
    assert_eq!(reply.headers[header::LOCATION], "/pages/1");

    let second = post(&router, "/pages", json!({ "title": "World" })).await;
    assert_eq!(second.headers[header::LOCATION], "/pages/2");
}

#[tokio::test]
async fn projection_encodings() {
    let router = app(vec![pages()]).await;
    post(&router, "/pages", json!({ "title": "Hello" })).await;

    let one = get(&router, "/pages/1?fields=title").await;
    assert_eq!(one.status, StatusCode::OK);
    assert_eq!(one.raw, r#"{"title":"Hello"}"#);

    let repeated = get(&router, "/pages/1?fields=title&fields=id").await;
    let comma = get(&router, "/pages/1?fields=title,id").await;
    let absent = get(&router, "/pages/1").await;
    assert_eq!(repeated.raw, r#"{"id":1,"title":"Hello"}"#);
    assert_eq!(comma.raw, repeated.raw);
    assert_eq!(absent.raw, repeated.raw);
}

#[tokio::test]
async fn unknown_projection_field_is_rejected() {
    let router = app(vec![pages()]).await;
    post(&router, "/pages", json!({ "title": "Hello" })).await;
    let reply = get(&router, "/pages/1?fields=nope").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["message"], "querystring/fields has unknown property 'nope'");
}

#[tokio::test]
async fn missing_row_is_an_empty_404() {
    let router = app(vec![pages()]).await;
    let reply = get(&router, "/pages/999").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.raw.is_empty());
}

#[tokio::test]
async fn misspelled_required_field() {
    let router = app(vec![pages()]).await;
    let reply = post(&router, "/pages", json!({ "tilte": "Hello" })).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.json(),
        json!({
            "statusCode": 400,
            "error": "Bad Request",
            "message": "body must have required property 'title'"
        })
    );
}

#[tokio::test]
async fn malformed_bodies() {
    let router = app(vec![pages()]).await;

    let wrong_type = post(&router, "/pages", json!({ "title": 5 })).await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_type.json()["message"], "body/title must be string");

    let not_object = post(&router, "/pages", json!(["title"])).await;
    assert_eq!(not_object.json()["message"], "body must be object");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/pages")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_id_is_a_client_error() {
    let router = app(vec![pages()]).await;
    let reply = get(&router, "/pages/abc").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["message"], "params/id must be integer");
}

#[tokio::test]
async fn undecodable_id_uses_the_error_envelope() {
    let router = app(vec![pages()]).await;
    for method in [Method::GET, Method::DELETE] {
        let reply = send(&router, method, "/pages/%FF", None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            reply.json(),
            json!({ "statusCode": 400, "error": "Bad Request", "message": "params/id must be integer" })
        );
    }
}

fn events() -> EntityMetadata {
    EntityMetadata::new("events", "id")
        .with_field(FieldMetadata::new("id", FieldType::Uuid).with_default())
        .with_field(FieldMetadata::new("held_on", FieldType::Date))
        .with_field(FieldMetadata::new("starts_at", FieldType::Timestamp).nullable())
}

#[tokio::test]
async fn uuid_keys_and_dates() {
    let router = app(vec![events()]).await;
    let created = post(
        &router,
        "/events",
        json!({ "heldOn": "2024-05-01", "startsAt": "2024-05-01T09:30:00+02:00" }),
    )
    .await;
    assert_eq!(created.status, StatusCode::OK);
    let id = created.json()["id"].as_str().unwrap().to_string();
    let location = created.headers[header::LOCATION].to_str().unwrap().to_string();
    assert_eq!(location, format!("/events/{}", id));

    let read = get(&router, &location).await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.raw, created.raw);

    let bad_key = get(&router, "/events/not-a-uuid").await;
    assert_eq!(bad_key.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_key.json()["message"], "params/id must match format \"uuid\"");

    let bad_date = post(&router, "/events", json!({ "heldOn": "2024-05-01T00:00:00Z" })).await;
    assert_eq!(bad_date.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_date.json()["message"], "body/heldOn must match format \"date\"");

    let filtered = get(&router, "/events?where.heldOn.eq=2024-05-01").await;
    assert_eq!(filtered.status, StatusCode::OK);
    assert_eq!(filtered.json().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn whole_float_integers_are_stored_as_integers() {
    let router = app(blog()).await;
    post(&router, "/categories", json!({ "name": "news" })).await;
    let created = post(&router, "/posts", json!({ "title": "T", "categoryId": 1.0 })).await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.json()["categoryId"], json!(1));
}

// ── Properties ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_read_echoes_supplied_values() {
    let router = app(blog()).await;
    post(&router, "/categories", json!({ "name": "news" })).await;
    let created = post(
        &router,
        "/posts",
        json!({ "title": "T", "body": "B", "categoryId": 1 }),
    )
    .await;
    assert_eq!(created.status, StatusCode::OK);
    let read = get(&router, "/posts/1").await;
    assert_eq!(read.raw, created.raw);
    assert_eq!(read.json(), json!({ "id": 1, "title": "T", "body": "B", "categoryId": 1 }));
}

#[tokio::test]
async fn omitted_nullable_field_is_null() {
    let router = app(blog()).await;
    let created = post(&router, "/posts", json!({ "title": "T" })).await;
    assert_eq!(created.json(), json!({ "id": 1, "title": "T", "body": null, "categoryId": null }));
}

#[tokio::test]
async fn extra_properties_and_pk_are_ignored_on_create() {
    let router = app(vec![pages()]).await;
    let created = post(&router, "/pages", json!({ "id": 77, "title": "Hello", "extra": true })).await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.raw, r#"{"id":1,"title":"Hello"}"#);
}

#[tokio::test]
async fn not_found_symmetry() {
    let router = app(vec![pages()]).await;
    let body = json!({ "title": "x" });
    assert_eq!(get(&router, "/pages/5").await.status, StatusCode::NOT_FOUND);
    assert_eq!(post(&router, "/pages/5", body.clone()).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        send(&router, Method::PUT, "/pages/5", Some(body)).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        send(&router, Method::DELETE, "/pages/5", None).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn update_and_replace() {
    let router = app(blog()).await;
    post(&router, "/posts", json!({ "title": "T", "body": "B" })).await;

    let updated = post(&router, "/posts/1", json!({ "title": "T2" })).await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json(), json!({ "id": 1, "title": "T2", "body": "B", "categoryId": null }));

    let replaced = send(&router, Method::PUT, "/posts/1?fields=body", Some(json!({ "body": null }))).await;
    assert_eq!(replaced.status, StatusCode::OK);
    assert_eq!(replaced.json(), json!({ "body": null }));

    let non_null = post(&router, "/posts/1", json!({ "title": null })).await;
    assert_eq!(non_null.status, StatusCode::BAD_REQUEST);
    assert_eq!(non_null.json()["message"], "body/title must be string");

    let empty = post(&router, "/posts/1", json!({})).await;
    assert_eq!(empty.json(), json!({ "id": 1, "title": "T2", "body": null, "categoryId": null }));
}

#[tokio::test]
async fn delete_returns_prior_state() {
    let router = app(blog()).await;
    post(&router, "/posts", json!({ "title": "T", "body": "B" })).await;
    post(&router, "/posts", json!({ "title": "U" })).await;

    let before = get(&router, "/posts/1").await;
    let deleted = send(&router, Method::DELETE, "/posts/1", None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.raw, before.raw);
    assert_eq!(get(&router, "/posts/1").await.status, StatusCode::NOT_FOUND);

    let projected_before = get(&router, "/posts/2?fields=title").await;
    let projected = send(&router, Method::DELETE, "/posts/2?fields=title", None).await;
    assert_eq!(projected.raw, projected_before.raw);
    assert_eq!(projected.json(), json!({ "title": "U" }));
}

#[tokio::test]
async fn pagination_slices_in_insertion_order() {
    let router = app(vec![pages()]).await;
    for title in ["a", "b", "c", "d", "e"] {
        post(&router, "/pages", json!({ "title": title })).await;
    }
    let slice = get(&router, "/pages?limit=2&offset=1").await;
    assert_eq!(slice.status, StatusCode::OK);
    assert_eq!(slice.json(), json!([{ "id": 2, "title": "b" }, { "id": 3, "title": "c" }]));

    let all = get(&router, "/pages").await;
    assert_eq!(all.json().as_array().unwrap().len(), 5);
    assert!(all.headers.get("x-total-count").is_none());

    let bad = get(&router, "/pages?limit=-1").await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.json()["message"], "querystring/limit must be >= 0");
}

#[tokio::test]
async fn list_filters_ordering_and_total_count() {
    let router = app(vec![pages()]).await;
    for title in ["b", "a", "c", "a"] {
        post(&router, "/pages", json!({ "title": title })).await;
    }

    let filtered = get(&router, "/pages?where.title.eq=a&fields=id").await;
    assert_eq!(filtered.json(), json!([{ "id": 2 }, { "id": 4 }]));

    let listed = get(&router, "/pages?where.title.in=a,c&fields=id").await;
    assert_eq!(listed.json(), json!([{ "id": 2 }, { "id": 3 }, { "id": 4 }]));

    let ordered = get(&router, "/pages?orderby.title=desc&fields=title").await;
    assert_eq!(
        ordered.json(),
        json!([{ "title": "c" }, { "title": "b" }, { "title": "a" }, { "title": "a" }])
    );

    let counted = get(&router, "/pages?where.id.gt=1&limit=1&totalCount=true").await;
    assert_eq!(counted.json().as_array().unwrap().len(), 1);
    assert_eq!(counted.headers["x-total-count"], "3");

    let unknown = get(&router, "/pages?where.nope.eq=1").await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.json()["message"], "querystring has unknown property 'where.nope.eq'");
}

#[tokio::test]
async fn relation_fields_follow_projection() {
    let router = app(blog()).await;
    post(&router, "/categories", json!({ "name": "news" })).await;
    post(&router, "/posts", json!({ "title": "T", "categoryId": 1 })).await;

    let plain = get(&router, "/posts/1?fields=title").await;
    assert_eq!(plain.json(), json!({ "title": "T" }));

    let with_relation = get(&router, "/posts/1?fields=title,categoryId").await;
    assert_eq!(with_relation.json(), json!({ "title": "T", "categoryId": 1 }));

    let full = get(&router, "/posts/1").await;
    assert_eq!(full.json()["categoryId"], 1);
}

#[tokio::test]
async fn persistence_failures_are_opaque() {
    let router = app(blog()).await;
    let reply = post(&router, "/posts", json!({ "title": "T", "categoryId": 42 })).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        reply.json(),
        json!({
            "statusCode": 500,
            "error": "Internal Server Error",
            "message": "Internal Server Error"
        })
    );
}

#[tokio::test]
async fn routes_honor_prefix_and_ignore() {
    let config = ApiConfig::default().with_prefix("/api/").with_ignore("categories");
    let metadata = vec![
        EntityMetadata::new("categories", "id")
            .with_field(FieldMetadata::new("id", FieldType::Integer).with_default()),
        pages(),
    ];
    let router = app_with(metadata, config).await;

    let created = post(&router, "/api/pages", json!({ "title": "Hello" })).await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.headers[header::LOCATION], "/api/pages/1");
    assert_eq!(get(&router, "/pages/1").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&router, "/api/categories").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let mut config = ApiConfig::default();
    config.body_limit = 16;
    let router = app_with(vec![pages()], config).await;
    let reply = post(&router, "/pages", json!({ "title": "a title well past sixteen bytes" })).await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
}
