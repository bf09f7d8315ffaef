#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Once;
use tower::ServiceExt;

use patient_registry_api::api::{create_app, AppState};
use patient_registry_domain::config::AppConfig;
use patient_registry_domain::testing::test_auth_config;

// Initialize tracing once for all tests
static INIT: Once = Once::new();

pub fn initialize() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info")
            .with_test_writer()
            .try_init();
    });
}

pub fn test_config(require_auth: bool) -> AppConfig {
    AppConfig {
        require_auth,
        app_env: "test".to_string(),
        auth: test_auth_config(),
        ..AppConfig::default()
    }
}

/// Gateway with bearer auth on the patient and search routes
pub fn test_app() -> Router {
    initialize();
    create_app(AppState::new(test_config(true)))
}

/// Gateway with every route public
pub fn open_app() -> Router {
    initialize();
    create_app(AppState::new(test_config(false)))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Run one request through a clone of the router
pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse { status, headers, body }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request(Method::GET, uri, token, None)
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    request(Method::POST, uri, token, Some(body))
}

pub fn login_form(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={}&password={}", username, password)))
        .unwrap()
}

/// Register `username` with password `testpass123` and log in.
/// Returns (access_token, refresh_token).
pub async fn register_and_login(app: &Router, username: &str) -> (String, String) {
    let registered = send(
        app,
        post_json(
            "/auth/register",
            None,
            serde_json::json!({
                "email": format!("{}@example.com", username),
                "username": username,
                "password": "testpass123",
                "full_name": "Test User",
            }),
        ),
    )
    .await;
    assert_eq!(registered.status, StatusCode::OK, "{:?}", registered.body);

    let login = send(app, login_form(username, "testpass123")).await;
    assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);

    (
        login.body["access_token"].as_str().unwrap().to_string(),
        login.body["refresh_token"].as_str().unwrap().to_string(),
    )
}

/// Body for a valid patient
pub fn patient_body(name: &str, cpf: &str) -> Value {
    serde_json::json!({
        "name": name,
        "cpf": cpf,
        "birth_date": "1990-01-01",
        "gender": "M",
        "email": "joao@example.com",
        "phone": "(11) 99999-9999",
        "address": {
            "street": "Rua das Flores",
            "number": "123",
            "city": "São Paulo",
            "state": "SP",
            "zip_code": "01234-567"
        },
        "medical_conditions": ["Hipertensão"],
        "medications": ["Losartana"],
        "allergies": []
    })
}
