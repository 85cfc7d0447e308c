use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use partial_response::store::MemoryStore;
use partial_response::{build_app, seed, ReduceOptions, StoreFilter};

fn seeded_app(options: ReduceOptions) -> axum::Router {
    let store = MemoryStore::new();
    seed::load_seed_data(&store).expect("seed data should load");
    build_app(store, options)
}

async fn send(app: axum::Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(uri: &str) -> (StatusCode, Value) {
    send(seeded_app(ReduceOptions::default()), Method::GET, uri).await
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_full_record_without_fields() {
    let (status, body) = get("/entities/User/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"content": {"id": 2, "name": "Bob", "email": "bob@example.com"}})
    );
}

#[tokio::test]
async fn test_scalar_selection_on_single_entity() {
    let (status, body) = get("/entities/User/1?fields=name").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"content": {"name": "Ann"}}));
}

#[tokio::test]
async fn test_nested_selection_on_collection() {
    let (status, body) = get("/entities/User?fields=name,orders(id,total)").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"content": [
            {"name": "Ann", "order": [{"id": 10, "total": 120.5}, {"id": 12, "total": 18.25}]},
            {"name": "Bob", "order": [{"id": 11, "total": 35.0}]},
            {"name": "Cecilia", "order": []}
        ]})
    );
}

#[tokio::test]
async fn test_belongs_to_chain() {
    let (status, body) =
        get("/entities/LineItem/102?fields=sku,order(status,user(name,addresses(city)))").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"content": {
            "sku": "BELL",
            "order": {
                "status": "open",
                "user": {"name": "Bob", "address": [{"city": "Uppsala"}]}
            }
        }})
    );
}

#[tokio::test]
async fn test_parse_errors_are_bad_requests() {
    for uri in [
        "/entities/User/1?fields=a()",
        "/entities/User/1?fields=,name",
        "/entities/User/1?fields=orders(id",
        "/entities/User/1?fields=name)",
        "/entities/User/1?fields=name1",
    ] {
        let (status, body) = get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].as_str().unwrap().starts_with("Fields parameter"), "{}", uri);
    }
}

#[tokio::test]
async fn test_deeply_nested_fields_are_rejected_not_fatal() {
    // stays under the URI length limit of the http crate
    let levels = 5_000;
    let uri = format!(
        "/entities/User/1?fields={}name{}",
        "orders(".repeat(levels),
        ")".repeat(levels)
    );

    let (status, body) = get(&uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Fields parameter nests deeper than 64 levels"));
}

#[tokio::test]
async fn test_unknown_field_is_a_bad_request() {
    let (status, body) = get("/entities/User/1?fields=name,password").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User doesn't have password");
}

#[tokio::test]
async fn test_fields_on_non_get_is_rejected() {
    let app = seeded_app(ReduceOptions::default());
    // GET routes also answer HEAD, which must not carry a selection
    let (status, _) = send(app, Method::HEAD, "/entities/User/1?fields=name").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let app = seeded_app(ReduceOptions::default());
    let (status, _) = send(app, Method::HEAD, "/entities/User/1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_entity_and_row() {
    let (status, _) = get("/entities/Invoice/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get("/entities/User/99?fields=name").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User '99' not found");
}

#[tokio::test]
async fn test_fetch_failure_fails_the_request_unless_configured() {
    let store = MemoryStore::new();
    seed::load_seed_data(&store).unwrap();
    store.fail_on("Order", StoreFilter::new().where_eq("userId", json!(2)));
    let app = build_app(store, ReduceOptions::default());

    let (status, body) = send(app, Method::GET, "/entities/User?fields=name,orders(id)").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("element 1:"));

    let store = MemoryStore::new();
    seed::load_seed_data(&store).unwrap();
    store.fail_on("Order", StoreFilter::new().where_eq("userId", json!(2)));
    let options = ReduceOptions {
        empty_on_fetch_failure: true,
        ..ReduceOptions::default()
    };
    let app = build_app(store, options);

    let (status, body) = send(app, Method::GET, "/entities/User?fields=name,orders(id)").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"][1], json!({"name": "Bob", "order": []}));
}

#[tokio::test]
async fn test_fields_preview_and_schema() {
    let (status, body) = get("/fields/parse?fields=name,address(city,zip)").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"fields": {"name": true, "address": {"city": true, "zip": true}}, "depth": 2})
    );

    let (status, body) = get("/schema/Order").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_many"][0]["name"], "line_items");
    assert_eq!(body["belongs_to"][0]["foreign_key"], "userId");
}
