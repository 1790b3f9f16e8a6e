use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use hako_core::NewUser;
use hako_server::dto::{ErrorResponse, ItemResponse, UserResponse};
use hako_server::{router, ServerState};
use hako_store::{UserStore, OWNER_BATCH_SIZE};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    app_with(UserStore::in_memory(false).unwrap())
}

fn app_with(store: UserStore) -> Router {
    router(Arc::new(ServerState::new(store)))
}

async fn send_raw(app: &Router, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).unwrap()
}

async fn create_user(app: &Router, email: &str) -> UserResponse {
    let (status, body) = send(
        app,
        Method::POST,
        "/users/",
        Some(json!({ "email": email, "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    parse(&body)
}

async fn create_item(app: &Router, user_id: i64, title: &str) -> ItemResponse {
    let (status, body) = send(
        app,
        Method::POST,
        &format!("/users/{user_id}/items/"),
        Some(json!({ "title": title, "description": "desc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    parse(&body)
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_create_user_hides_password() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/users/",
        Some(json!({ "email": "alice@example.com", "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = parse(&body);
    assert_eq!(
        value,
        json!({ "id": 1, "email": "alice@example.com", "is_active": true, "items": [] })
    );
}

#[tokio::test]
async fn test_duplicate_email_is_bad_request() {
    let app = app();
    create_user(&app, "alice@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/users/",
        Some(json!({ "email": "alice@example.com", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.detail, "Email already registered");
}

#[tokio::test]
async fn test_get_user_includes_items() {
    let app = app();
    let alice = create_user(&app, "alice@example.com").await;
    let pen = create_item(&app, alice.id, "pen").await;
    assert_eq!(pen.owner_id, alice.id);
    assert_eq!(pen.description.as_deref(), Some("desc"));

    let (status, body) = send(&app, Method::GET, &format!("/users/{}", alice.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let user: UserResponse = parse(&body);
    assert_eq!(user.items, vec![pen]);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/users/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.detail, "User not found");

    let (status, _) = send(
        &app,
        Method::POST,
        "/users/99/items/",
        Some(json!({ "title": "orphan" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_user_id_is_unprocessable() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/users/abc", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_users_paging_and_items() {
    let app = app();
    let alice = create_user(&app, "alice@example.com").await;
    let bob = create_user(&app, "bob@example.com").await;
    create_user(&app, "carol@example.com").await;
    create_item(&app, bob.id, "cup").await;

    let (status, body) = send(&app, Method::GET, "/users/", None).await;
    assert_eq!(status, StatusCode::OK);
    let users: Vec<UserResponse> = parse(&body);
    assert_eq!(users.len(), 3);
    assert_eq!(users[0].id, alice.id);
    assert!(users[0].items.is_empty());
    assert_eq!(users[1].items.len(), 1);

    let (_, body) = send(&app, Method::GET, "/users/?skip=1&limit=1", None).await;
    let users: Vec<UserResponse> = parse(&body);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "bob@example.com");
}

#[tokio::test]
async fn test_list_items() {
    let app = app();
    let alice = create_user(&app, "alice@example.com").await;
    let bob = create_user(&app, "bob@example.com").await;
    create_item(&app, alice.id, "pen").await;
    create_item(&app, bob.id, "cup").await;

    let (status, body) = send(&app, Method::GET, "/items/", None).await;
    assert_eq!(status, StatusCode::OK);
    let items: Vec<ItemResponse> = parse(&body);
    assert_eq!(
        items.iter().map(|i| i.title.as_str()).collect::<Vec<_>>(),
        vec!["pen", "cup"]
    );

    let (_, body) = send(&app, Method::GET, "/items?limit=1", None).await;
    let items: Vec<ItemResponse> = parse(&body);
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_item_without_description() {
    let app = app();
    let alice = create_user(&app, "alice@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/users/{}/items", alice.id),
        Some(json!({ "title": "pen" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = parse(&body);
    assert_eq!(value["description"], Value::Null);
}

#[tokio::test]
async fn test_validation_failures_are_unprocessable() {
    let app = app();
    let alice = create_user(&app, "alice@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/users/{}/items/", alice.id),
        Some(json!({ "title": "t".repeat(31) })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = parse(&body);
    assert!(error.detail.contains("title"));

    let (status, _) = send(&app, Method::GET, "/items/?skip=-1", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, Method::GET, "/users/?limit=many", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        Method::POST,
        "/users/",
        Some(json!({ "email": "no-password@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_file_backed_state_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = hako_config::ServerConfig {
        database_path: dir.path().join("hako.db"),
        ..Default::default()
    };

    {
        let app = router(Arc::new(ServerState::from_config(&config).unwrap()));
        create_user(&app, "alice@example.com").await;
    }

    let app = router(Arc::new(ServerState::from_config(&config).unwrap()));
    let (_, body) = send(&app, Method::GET, "/users/", None).await;
    let users: Vec<UserResponse> = parse(&body);
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn test_malformed_json_keeps_status_with_detail_body() {
    let app = app();

    let (status, body) = send_raw(&app, "/users/", Some("application/json"), "{\"email\": ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert!(!error.detail.is_empty());

    let (status, body) = send_raw(
        &app,
        "/users/",
        None,
        r#"{"email": "alice@example.com", "password": "secret"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let error: ErrorResponse = parse(&body);
    assert!(!error.detail.is_empty());

    let (_, body) = send(&app, Method::GET, "/users/", None).await;
    let users: Vec<UserResponse> = parse(&body);
    assert!(users.is_empty());
}

#[tokio::test]
async fn test_list_users_page_larger_than_one_batch() {
    let store = UserStore::in_memory(false).unwrap();
    let count = OWNER_BATCH_SIZE * 2 + 3;
    let mut last_id = 0;
    for i in 0..count {
        last_id = store
            .create_user(&NewUser {
                email: format!("user{i}@example.com"),
                password: "secret".into(),
            })
            .unwrap()
            .id;
    }
    let app = app_with(store);
    let item = create_item(&app, last_id, "pen").await;

    let (status, body) = send(&app, Method::GET, &format!("/users/?limit={}", count * 2), None).await;
    assert_eq!(status, StatusCode::OK);
    let users: Vec<UserResponse> = parse(&body);
    assert_eq!(users.len(), count);
    assert_eq!(users[count - 1].items, vec![item]);
    assert!(users[0].items.is_empty());
}
