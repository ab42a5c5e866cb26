use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sql_openapi::config::{resolve, EntityMetadata, FieldMetadata, FieldType};
use sql_openapi::{build, describe, generate, ApiConfig, MemoryMapper, OpenApiInfo};
use std::collections::BTreeSet;
use std::sync::Arc;
use tower::ServiceExt;

fn metadata() -> Vec<EntityMetadata> {
    vec![
        EntityMetadata::new("categories", "id")
            .with_field(FieldMetadata::new("id", FieldType::Integer).with_default())
            .with_field(FieldMetadata::new("name", FieldType::String)),
        EntityMetadata::new("pages", "id")
            .with_field(FieldMetadata::new("id", FieldType::Integer).with_default())
            .with_field(FieldMetadata::new("title", FieldType::String))
            .with_field(FieldMetadata::new("body_text", FieldType::String).nullable())
            .with_field(FieldMetadata::new("published_at", FieldType::Timestamp).with_default())
            .with_field(FieldMetadata::new("category_id", FieldType::Integer).nullable())
            .with_relation("category_id", "categories"),
    ]
}

async fn fetch_document(router: Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn router(config: ApiConfig) -> Router {
    let mapper = MemoryMapper::new(metadata()).with_default("pages", "published_at", json!("2024-01-01T00:00:00Z"));
    build(Arc::new(mapper), config).await.unwrap()
}

#[tokio::test]
async fn served_at_documentation_path() {
    let (status, doc) = fetch_document(router(ApiConfig::default()).await, "/documentation/json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["openapi"], "3.0.3");
    assert_eq!(
        doc["info"],
        json!({
            "title": "Entity REST API",
            "description": "Exposing a SQL database as REST",
            "version": "1.0.0"
        })
    );
}

#[tokio::test]
async fn custom_info_and_path() {
    let mut config = ApiConfig::default().with_info(OpenApiInfo {
        title: "Simple Title".into(),
        description: "Simple Description".into(),
        version: "42.42.42".into(),
    });
    config.documentation_path = "/docs.json".into();
    let (status, doc) = fetch_document(router(config).await, "/docs.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["info"]["title"], "Simple Title");
    assert_eq!(doc["info"]["description"], "Simple Description");
    assert_eq!(doc["info"]["version"], "42.42.42");
}

#[tokio::test]
async fn document_is_deterministic() {
    let (_, first) = fetch_document(router(ApiConfig::default()).await, "/documentation/json").await;
    let (_, second) = fetch_document(router(ApiConfig::default()).await, "/documentation/json").await;
    assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
}

#[test]
fn entity_schemas() {
    let config = ApiConfig::default();
    let model = resolve(&metadata(), &config).unwrap();
    let doc = generate(&model, &config).document;
    let schemas = &doc["components"]["schemas"];

    assert_eq!(
        schemas["Page"],
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "integer" },
                "title": { "type": "string" },
                "bodyText": { "type": "string", "nullable": true },
                "publishedAt": { "type": "string", "format": "date-time" },
                "categoryId": { "type": "integer", "nullable": true }
            },
            "required": ["id", "title", "publishedAt"]
        })
    );
    assert_eq!(schemas["PageCreateInput"]["required"], json!(["title"]));
    assert!(schemas["PageCreateInput"]["properties"]["id"].is_null());
    assert_eq!(schemas["PageCreateInput"]["additionalProperties"], json!(false));
    assert!(schemas["PageUpdateInput"]["required"].is_null());
    assert!(schemas["Category"].is_object());
}

/// Every documented (method, path) is served, and every served route is documented.
#[tokio::test]
async fn documentation_matches_registered_routes() {
    let config = ApiConfig::default().with_prefix("api");
    let model = resolve(&metadata(), &config).unwrap();
    let routes = describe(&model, &config);
    let (_, doc) = fetch_document(router(config.clone()).await, "/documentation/json").await;

    let documented: BTreeSet<(String, String)> = doc["paths"]
        .as_object()
        .unwrap()
        .iter()
        .flat_map(|(path, item)| {
            item.as_object()
                .unwrap()
                .keys()
                .map(move |method| (method.to_uppercase(), path.clone()))
        })
        .collect();
    let described: BTreeSet<(String, String)> =
        routes.iter().map(|r| (r.method.to_string(), r.path.clone())).collect();
    assert_eq!(documented, described);
    assert!(documented.contains(&("GET".to_string(), "/api/pages/{id}".to_string())));

    let app = router(config).await;
    for route in &routes {
        let uri = route.path.replace("{id}", "1");
        let mut request = Request::builder().method(route.method.clone()).uri(&uri);
        let body = if route.input_schema.is_some() {
            request = request.header("content-type", "application/json");
            Body::from(r#"{"name":"n","title":"t"}"#)
        } else {
            Body::empty()
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{} {} is documented but not served", route.method, uri);
    }
}
